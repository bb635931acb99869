//! Glue between the engine runtime and the protocol dispatcher.

use anyhow::anyhow;
use tether_engine::core::{App, AppControl, FrameCtx};
use tether_engine::render::MeshRenderer;
use tether_engine::scene::DrawList;

use crate::config::ViewSetup;
use crate::controller::ControllerReport;
use crate::protocol::{Dispatcher, Endpoint, Flow};
use crate::transport::{Received, Transport, TransportError};

/// Upper bound on messages handled per event-loop iteration, so window events
/// still get through while the server floods.
const MAX_MESSAGES_PER_PUMP: usize = 4096;

pub struct ClientApp<T: Transport> {
    transport: T,
    dispatcher: Dispatcher,
    renderer: MeshRenderer,
    view: ViewSetup,
    failure: Option<anyhow::Error>,
}

impl<T: Transport> ClientApp<T> {
    pub fn new(transport: T, view: ViewSetup) -> Self {
        Self {
            transport,
            dispatcher: Dispatcher::new(),
            renderer: MeshRenderer::new(),
            view,
            failure: None,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The error that stopped the session, if any.
    pub fn take_failure(&mut self) -> Option<anyhow::Error> {
        self.failure.take()
    }

    fn fail(&mut self, err: anyhow::Error) -> AppControl {
        log::error!("session failed: {err:#}");
        self.transport.close();
        self.failure = Some(err);
        AppControl::Exit
    }

    fn finish(&mut self) -> AppControl {
        self.transport.close();
        AppControl::Exit
    }
}

impl<T: Transport> App for ClientApp<T> {
    fn on_close_requested(&mut self) -> AppControl {
        if !self.dispatcher.close_requested() {
            return AppControl::Continue;
        }
        log::info!("window closed");
        self.finish()
    }

    fn on_pump(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        for _ in 0..MAX_MESSAGES_PER_PUMP {
            let text = match self.transport.poll() {
                Ok(Received::Message(text)) => text,
                Ok(Received::Idle) => break,
                Ok(Received::Closed) => {
                    return self.fail(anyhow!("server closed the connection before the session ended"));
                }
                Err(e) => return self.fail(anyhow::Error::new(e).context("connection lost")),
            };

            let mut endpoint = AppEndpoint::new(&mut self.transport, ctx, &mut self.renderer, &self.view);
            let result = self.dispatcher.handle_text(&text, &mut endpoint);
            let (presented, surface_lost) = (endpoint.presented, endpoint.surface_lost);

            match result {
                Ok(Flow::Continue) => {}
                Ok(Flow::Terminated) => return self.finish(),
                Err(e) => return self.fail(anyhow::Error::new(e)),
            }
            if surface_lost {
                return self.fail(anyhow!("unrecoverable surface error"));
            }
            // One frame per iteration.
            if presented {
                break;
            }
        }
        AppControl::Continue
    }

    fn on_redraw(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let mut endpoint = AppEndpoint::new(&mut self.transport, ctx, &mut self.renderer, &self.view);
        self.dispatcher.redraw(&mut endpoint);
        if endpoint.surface_lost {
            return self.fail(anyhow!("unrecoverable surface error"));
        }
        AppControl::Continue
    }
}

/// Endpoint backed by the live transport, window input and GPU.
struct AppEndpoint<'e, 'a, 'w, T> {
    transport: &'e mut T,
    ctx: &'e mut FrameCtx<'a, 'w>,
    renderer: &'e mut MeshRenderer,
    view: &'e ViewSetup,
    presented: bool,
    surface_lost: bool,
}

impl<'e, 'a, 'w, T: Transport> AppEndpoint<'e, 'a, 'w, T> {
    fn new(
        transport: &'e mut T,
        ctx: &'e mut FrameCtx<'a, 'w>,
        renderer: &'e mut MeshRenderer,
        view: &'e ViewSetup,
    ) -> Self {
        Self {
            transport,
            ctx,
            renderer,
            view,
            presented: false,
            surface_lost: false,
        }
    }
}

impl<T: Transport> Endpoint for AppEndpoint<'_, '_, '_, T> {
    fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.transport.send_text(text)
    }

    fn capture_controller(&mut self) -> ControllerReport {
        ControllerReport::from_snapshot(&self.ctx.input.take_snapshot())
    }

    fn present(&mut self, frame: &DrawList) {
        let renderer = &mut *self.renderer;
        let setup = *self.view;

        let control = self.ctx.render(|rctx, target| {
            let view = setup.scene_view(rctx.aspect());
            renderer.render(rctx, target, frame, &view);
        });

        self.presented = true;
        if control == AppControl::Exit {
            self.surface_lost = true;
        }
    }
}
