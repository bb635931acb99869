//! Tether engine crate.
//!
//! Owns the platform + GPU runtime pieces used by the client: window and event
//! loop, wgpu device, input state, the renderer-agnostic draw stream and the
//! textured mesh renderer.

pub mod core;
pub mod device;
pub mod input;
pub mod logging;
pub mod render;
pub mod scene;
pub mod window;

pub use glam;
