//! GPU rendering subsystem.
//!
//! Renderers consume `scene` draw streams and issue GPU commands via wgpu.
//! Each renderer is responsible for its own GPU resources (pipelines, buffers,
//! uploaded meshes and textures).
//!
//! Convention:
//! - right-handed world space, +Y up
//! - matrices are column-major (`glam::Mat4`), depth range 0..1

mod ctx;
mod mesh;
mod view;

pub use ctx::{RenderCtx, RenderTarget};
pub use mesh::MeshRenderer;
pub use view::SceneView;

pub use wgpu::Color;
