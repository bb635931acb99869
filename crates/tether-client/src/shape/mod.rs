//! Shape trees: wire descriptors, derived geometry and drawable nodes.

mod descriptor;
mod geometry;
mod node;

pub use descriptor::{
    GroupDescriptor, LeafDescriptor, ShapeDescriptor, WireMatrix, matrix_from_wire,
};
pub use geometry::{FaceSpan, FaceTable, GeometryError, build_mesh, flat_normals, vertex_count};
pub use node::{GroupShape, LeafShape, ShapeNode};
