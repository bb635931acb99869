use winit::event::WindowEvent;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by higher layers.
///
/// The runtime polls continuously: `on_pump` runs once per event-loop
/// iteration and is where the application does its own I/O. Rendering is up to
/// the application (`FrameCtx::render`); `on_redraw` only fires when the
/// platform asks for the window contents again (expose, resize).
pub trait App {
    /// Called for every window event, after input state has been updated.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Called when the user asks to close the window. Returning `Continue`
    /// keeps the window open.
    fn on_close_requested(&mut self) -> AppControl {
        AppControl::Exit
    }

    /// Called once per event-loop iteration.
    fn on_pump(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// Called when the platform requests a redraw.
    fn on_redraw(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let _ = ctx;
        AppControl::Continue
    }
}
