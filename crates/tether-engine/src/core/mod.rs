//! Core engine-facing contracts.
//!
//! This module defines the interface between the runtime (platform loop) and
//! the application: the [`App`] callbacks and the per-callback [`FrameCtx`].

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
