//! Input subsystem.
//!
//! Public API is platform-agnostic and does not expose winit types.
//! The runtime translates platform events into `InputEvent`s (see
//! `platform::winit`) and folds them into an `InputState`.

pub mod platform;
mod state;
mod types;

pub use state::{InputSnapshot, InputState};
pub use types::{
    InputEvent,
    Key,
    KeyState,
    MouseButton,
    MouseButtonState,
    MouseWheelDelta,
    PointerMoveEvent,
};
