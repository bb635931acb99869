//! Scene (draw stream) types.
//!
//! Responsibilities:
//! - store renderer-agnostic draw items for one frame, in submission order
//! - define the CPU-side mesh and texture resources that draw items reference
//!
//! Resources are shared through `Arc`; renderers key their GPU copies by
//! [`ResourceKey`] and drop them once the last CPU handle is gone.

mod image;
mod key;
mod list;
mod mesh;

pub use image::TextureImage;
pub use key::ResourceKey;
pub use list::{DrawItem, DrawList};
pub use mesh::{MeshData, NORMAL_FLOATS, VERTEX_FLOATS};
