use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use glam::Vec3;
use tether_engine::scene::DrawList;
use thiserror::Error;

use crate::controller::ControllerReport;
use crate::frame::FrameRenderer;
use crate::mirror::{SceneMirror, ShapeId};
use crate::shape::{GeometryError, matrix_from_wire};
use crate::textures::{TextureError, TextureId, TextureRegistry};
use crate::transport::TransportError;

use super::message::{CycleAck, Inbound, Outbound};
use super::phase::{Phase, Transition};
use super::session::{CameraSetup, SessionInfo};

/// Fatal protocol failure. The connection cannot continue after any of these.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("malformed message")]
    Json(#[from] serde_json::Error),

    #[error("{id}: payload is not valid base64")]
    Base64 {
        id: TextureId,
        #[source]
        source: base64::DecodeError,
    },

    #[error(transparent)]
    Texture(#[from] TextureError),

    #[error("{id}: invalid geometry")]
    Geometry {
        id: ShapeId,
        #[source]
        source: GeometryError,
    },

    #[error("failed to reply to the server")]
    Transport(#[from] TransportError),
}

/// Whether the connection should keep being polled.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Flow {
    Continue,
    Terminated,
}

/// The dispatcher's view of the outside world.
pub trait Endpoint {
    /// Sends one JSON text message to the server.
    fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Input state to report, consuming the pending scroll and cursor delta.
    fn capture_controller(&mut self) -> ControllerReport;

    /// Shows a finished frame.
    fn present(&mut self, frame: &DrawList);
}

/// Applies server messages to the local scene and answers them.
///
/// Messages are handled one at a time. Replies go out before the handler
/// returns, and the frame for a cycle is presented only after its ack.
#[derive(Debug, Default)]
pub struct Dispatcher {
    phase: Phase,
    textures: TextureRegistry,
    mirror: SceneMirror,
    frame: FrameRenderer,
    session: SessionInfo,
    leave_requested: bool,
    reports_this_cycle: u32,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn textures(&self) -> &TextureRegistry {
        &self.textures
    }

    pub fn mirror(&self) -> &SceneMirror {
        &self.mirror
    }

    pub fn session(&self) -> &SessionInfo {
        &self.session
    }

    pub fn leave_requested(&self) -> bool {
        self.leave_requested
    }

    /// The next `end_update` is answered with `continue: false`, after which
    /// the session ends.
    pub fn request_leave(&mut self) {
        if !self.leave_requested {
            log::info!("leave requested; finishing the current cycle");
        }
        self.leave_requested = true;
    }

    /// Reacts to the window being closed. Returns `true` when the client
    /// should exit now.
    ///
    /// The first close while streaming only requests a leave, so the server
    /// sees `continue: false` at the end of the cycle. Any other close exits.
    pub fn close_requested(&mut self) -> bool {
        if self.phase == Phase::Streaming && !self.leave_requested {
            self.request_leave();
            return false;
        }
        true
    }

    /// Parses and handles one text message.
    pub fn handle_text<E: Endpoint>(
        &mut self,
        text: &str,
        endpoint: &mut E,
    ) -> Result<Flow, DispatchError> {
        if self.phase.is_terminal() {
            log::warn!("message after end of session ignored");
            return Ok(Flow::Terminated);
        }

        log::trace!("<- {text}");
        let msg: Inbound = serde_json::from_str(text)?;
        self.handle(msg, endpoint)
    }

    pub fn handle<E: Endpoint>(
        &mut self,
        msg: Inbound,
        endpoint: &mut E,
    ) -> Result<Flow, DispatchError> {
        let Some(tag) = msg.tag() else {
            log::debug!("unrecognized message ignored");
            return Ok(self.flow());
        };

        let next = match self.phase.transition(tag) {
            Transition::To(next) => next,
            Transition::Reject if self.phase.is_terminal() => {
                log::warn!("`{}` after end of session ignored", tag.as_str());
                return Ok(Flow::Terminated);
            }
            Transition::Reject => {
                log::warn!("`{}` is not allowed while {}; ignored", tag.as_str(), self.phase);
                return Ok(self.flow());
            }
        };

        let next = self.apply(msg, next, endpoint)?;
        self.enter(next);
        Ok(self.flow())
    }

    /// Presents the last completed frame again without touching the protocol.
    pub fn redraw<E: Endpoint>(&self, endpoint: &mut E) {
        endpoint.present(self.frame.last_frame());
    }

    /// Applies an accepted message and returns the phase to enter.
    fn apply<E: Endpoint>(
        &mut self,
        msg: Inbound,
        next: Phase,
        endpoint: &mut E,
    ) -> Result<Phase, DispatchError> {
        match msg {
            Inbound::SetPlayerId { player_id } => {
                log::debug!("player id: {player_id:?}");
                self.session.player_id = player_id;
            }

            Inbound::SetupCamera { eye, target, follow } => {
                let camera = CameraSetup {
                    eye: eye.map(Vec3::from_array),
                    target: target.map(Vec3::from_array),
                    follow,
                };
                log::debug!("camera setup: {camera:?}");
                self.session.camera = Some(camera);
            }

            Inbound::AddTexture { id, width, height, data } => {
                let pixels = STANDARD
                    .decode(data.as_bytes())
                    .map_err(|source| DispatchError::Base64 { id, source })?;
                self.textures.register(id, width, height, pixels)?;
            }

            Inbound::GetController => {
                if self.reports_this_cycle > 0 {
                    log::debug!("extra controller report within one cycle");
                }
                self.reports_this_cycle += 1;

                let report = endpoint.capture_controller();
                self.send(endpoint, &Outbound::Controller(report))?;
            }

            Inbound::SetPlayerTransform { player_id, trans } => {
                match trans {
                    Some(trans) if self.session.is_local(player_id) => {
                        self.session.player_transform = Some(matrix_from_wire(&trans));
                    }
                    _ => log::trace!("transform for player {player_id:?} not ours"),
                }
            }

            Inbound::AddShape { shape_id, descriptor } => {
                self.mirror
                    .add(shape_id, descriptor)
                    .map_err(|source| DispatchError::Geometry { id: shape_id, source })?;
            }

            Inbound::UpdateShape { shape_id, trans } => {
                if !self.mirror.update_transform(shape_id, matrix_from_wire(&trans)) {
                    log::trace!("update for unknown {shape_id}");
                }
            }

            Inbound::RemoveShape { shape_id } => {
                if !self.mirror.remove(shape_id) {
                    log::trace!("remove for unknown {shape_id}");
                }
            }

            Inbound::EndUpdate { elapsed_time } => {
                let proceed = !self.leave_requested;
                self.send(endpoint, &Outbound::Ack(CycleAck { proceed }))?;

                self.session.cycles += 1;
                if elapsed_time.is_some() {
                    self.session.last_elapsed_time = elapsed_time;
                }
                self.reports_this_cycle = 0;

                let frame = self.frame.render_frame(&self.mirror, &self.textures);
                endpoint.present(frame);

                if !proceed {
                    log::info!("left the session after {} cycles", self.session.cycles);
                    return Ok(Phase::Terminated);
                }
            }

            Inbound::End => {
                log::info!("server ended the session after {} cycles", self.session.cycles);
            }

            Inbound::Unrecognized => {}
        }

        Ok(next)
    }

    fn send<E: Endpoint>(&self, endpoint: &mut E, msg: &Outbound) -> Result<(), DispatchError> {
        endpoint.send(msg.to_json()?)?;
        Ok(())
    }

    fn enter(&mut self, next: Phase) {
        if next != self.phase {
            log::debug!("phase: {} -> {}", self.phase, next);
            self.phase = next;
        }
    }

    fn flow(&self) -> Flow {
        if self.phase.is_terminal() {
            Flow::Terminated
        } else {
            Flow::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;
    use serde_json::{Value, json};

    #[derive(Debug, PartialEq)]
    enum Event {
        Sent(Value),
        Presented(usize),
    }

    struct RecordingEndpoint {
        events: Vec<Event>,
        report: ControllerReport,
    }

    impl RecordingEndpoint {
        fn new() -> Self {
            Self {
                events: Vec::new(),
                report: ControllerReport::idle(),
            }
        }

        fn sent(&self) -> Vec<&Value> {
            self.events
                .iter()
                .filter_map(|e| match e {
                    Event::Sent(v) => Some(v),
                    Event::Presented(_) => None,
                })
                .collect()
        }
    }

    impl Endpoint for RecordingEndpoint {
        fn send(&mut self, text: String) -> Result<(), TransportError> {
            self.events.push(Event::Sent(serde_json::from_str(&text).unwrap()));
            Ok(())
        }

        fn capture_controller(&mut self) -> ControllerReport {
            self.report.clone()
        }

        fn present(&mut self, frame: &DrawList) {
            self.events.push(Event::Presented(frame.len()));
        }
    }

    const IDENTITY: [f32; 16] = [
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ];

    fn feed(d: &mut Dispatcher, ep: &mut RecordingEndpoint, msg: Value) -> Flow {
        d.handle_text(&msg.to_string(), ep).unwrap()
    }

    fn add_texture(id: i64) -> Value {
        // 1x1 red.
        json!({"cmd": "add_texture", "id": id, "width": 1, "height": 1, "data": "/wAA"})
    }

    fn add_triangle(shape_id: i64, texture: i64) -> Value {
        json!({
            "cmd": "add_shape",
            "shape_id": shape_id,
            "descriptor": {
                "trans": IDENTITY,
                "mesh": [0, 0, 0, 0, 0,  1, 0, 0, 1, 0,  0, 1, 0, 0, 1],
                "face_index": [0],
                "textures": [texture],
            }
        })
    }

    fn translation(x: f32) -> [f32; 16] {
        let mut m = IDENTITY;
        m[12] = x;
        m
    }

    // ── update cycle ─────────────────────────────────────────────────────

    #[test]
    fn ack_goes_out_before_the_frame_is_presented() {
        let mut d = Dispatcher::new();
        let mut ep = RecordingEndpoint::new();

        feed(&mut d, &mut ep, add_texture(1));
        feed(&mut d, &mut ep, add_triangle(10, 1));
        feed(&mut d, &mut ep, json!({"cmd": "update_shape", "shape_id": 10, "trans": translation(4.0)}));
        let flow = feed(&mut d, &mut ep, json!({"cmd": "end_update", "elapsed_time": 0.02}));

        assert_eq!(flow, Flow::Continue);
        assert_eq!(
            ep.events,
            vec![Event::Sent(json!({"continue": true})), Event::Presented(1)]
        );
        assert_eq!(d.phase(), Phase::Streaming);
        assert_eq!(d.session().cycles, 1);
        assert_eq!(d.session().last_elapsed_time, Some(0.02));
        assert_eq!(
            d.mirror().get(ShapeId(10)).unwrap().transform(),
            Mat4::from_translation(Vec3::new(4.0, 0.0, 0.0))
        );
    }

    #[test]
    fn remove_takes_effect_in_the_next_frame() {
        let mut d = Dispatcher::new();
        let mut ep = RecordingEndpoint::new();

        feed(&mut d, &mut ep, add_texture(1));
        feed(&mut d, &mut ep, add_triangle(1, 1));
        feed(&mut d, &mut ep, add_triangle(2, 1));
        feed(&mut d, &mut ep, json!({"cmd": "end_update"}));
        feed(&mut d, &mut ep, json!({"cmd": "remove_shape", "shape_id": 1}));
        feed(&mut d, &mut ep, json!({"cmd": "remove_shape", "shape_id": 1}));
        feed(&mut d, &mut ep, json!({"cmd": "end_update"}));

        let frames: Vec<usize> = ep
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Presented(n) => Some(*n),
                Event::Sent(_) => None,
            })
            .collect();
        assert_eq!(frames, vec![2, 1]);
    }

    #[test]
    fn unknown_shape_ids_are_no_ops() {
        let mut d = Dispatcher::new();
        let mut ep = RecordingEndpoint::new();

        let flow = feed(&mut d, &mut ep, json!({"cmd": "update_shape", "shape_id": 77, "trans": IDENTITY}));
        assert_eq!(flow, Flow::Continue);
        feed(&mut d, &mut ep, json!({"cmd": "remove_shape", "shape_id": 77}));
        assert!(d.mirror().is_empty());
        assert!(ep.events.is_empty());
    }

    #[test]
    fn get_controller_replies_immediately() {
        let mut d = Dispatcher::new();
        let mut ep = RecordingEndpoint::new();
        ep.report.keyboard = vec![265];

        feed(&mut d, &mut ep, json!({"cmd": "get_controller"}));
        assert_eq!(
            ep.sent(),
            vec![&json!({
                "keyboard": [265],
                "mouse": [],
                "cursor_cur_pos": [0.0, 0.0],
                "cursor_last_pos": [0.0, 0.0],
                "cursor_scroll_pos": [0.0, 0.0],
            })]
        );
        assert_eq!(d.phase(), Phase::Streaming);
    }

    #[test]
    fn second_report_in_a_cycle_is_still_answered() {
        let mut d = Dispatcher::new();
        let mut ep = RecordingEndpoint::new();

        feed(&mut d, &mut ep, json!({"cmd": "get_controller"}));
        feed(&mut d, &mut ep, json!({"cmd": "get_controller"}));
        assert_eq!(ep.sent().len(), 2);
    }

    // ── phases ───────────────────────────────────────────────────────────

    #[test]
    fn handshake_records_identity_and_camera() {
        let mut d = Dispatcher::new();
        let mut ep = RecordingEndpoint::new();

        feed(&mut d, &mut ep, json!({"cmd": "set_player_id", "player_id": 4}));
        feed(
            &mut d,
            &mut ep,
            json!({"cmd": "setup_camera", "eye": [1, 2, 3], "target": [0, 0, 0], "follow": true}),
        );

        assert_eq!(d.phase(), Phase::Handshake);
        assert_eq!(d.session().player_id, Some(4));
        let camera = d.session().camera.unwrap();
        assert_eq!(camera.eye, Some(Vec3::new(1.0, 2.0, 3.0)));
        assert!(camera.follow);
        assert!(ep.events.is_empty());
    }

    #[test]
    fn handshake_only_messages_are_ignored_while_streaming() {
        let mut d = Dispatcher::new();
        let mut ep = RecordingEndpoint::new();

        feed(&mut d, &mut ep, json!({"cmd": "set_player_id", "player_id": 4}));
        feed(&mut d, &mut ep, json!({"cmd": "end_update"}));

        let flow = feed(&mut d, &mut ep, json!({"cmd": "set_player_id", "player_id": 9}));
        assert_eq!(flow, Flow::Continue);
        assert_eq!(d.session().player_id, Some(4));
        assert_eq!(d.phase(), Phase::Streaming);
    }

    #[test]
    fn textures_are_accepted_while_streaming() {
        let mut d = Dispatcher::new();
        let mut ep = RecordingEndpoint::new();

        feed(&mut d, &mut ep, json!({"cmd": "end_update"}));
        feed(&mut d, &mut ep, add_texture(3));
        assert!(d.textures().resolve(TextureId(3)).is_some());
    }

    #[test]
    fn player_transform_is_kept_only_for_our_player() {
        let mut d = Dispatcher::new();
        let mut ep = RecordingEndpoint::new();

        feed(&mut d, &mut ep, json!({"cmd": "set_player_id", "player_id": 4}));
        feed(&mut d, &mut ep, json!({"cmd": "set_player_transform", "player_id": 5, "trans": translation(1.0)}));
        assert_eq!(d.session().player_transform, None);

        feed(&mut d, &mut ep, json!({"cmd": "set_player_transform", "player_id": 4, "trans": translation(2.0)}));
        assert_eq!(
            d.session().player_transform,
            Some(Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0)))
        );
    }

    #[test]
    fn unknown_tags_are_ignored_in_every_phase() {
        let mut d = Dispatcher::new();
        let mut ep = RecordingEndpoint::new();

        assert_eq!(feed(&mut d, &mut ep, json!({"cmd": "weather", "rain": true})), Flow::Continue);
        assert_eq!(d.phase(), Phase::Handshake);

        feed(&mut d, &mut ep, json!({"cmd": "end_update"}));
        assert_eq!(feed(&mut d, &mut ep, json!({"cmd": "weather"})), Flow::Continue);
        assert_eq!(d.phase(), Phase::Streaming);
    }

    // ── termination ──────────────────────────────────────────────────────

    #[test]
    fn end_terminates_without_a_reply() {
        let mut d = Dispatcher::new();
        let mut ep = RecordingEndpoint::new();

        feed(&mut d, &mut ep, json!({"cmd": "end_update"}));
        ep.events.clear();

        assert_eq!(feed(&mut d, &mut ep, json!({"cmd": "end"})), Flow::Terminated);
        assert_eq!(d.phase(), Phase::Terminated);
        assert!(ep.events.is_empty());
    }

    #[test]
    fn messages_after_end_are_ignored() {
        let mut d = Dispatcher::new();
        let mut ep = RecordingEndpoint::new();

        feed(&mut d, &mut ep, json!({"cmd": "end"}));
        assert_eq!(feed(&mut d, &mut ep, add_texture(1)), Flow::Terminated);
        assert_eq!(feed(&mut d, &mut ep, json!({"cmd": "get_controller"})), Flow::Terminated);
        // Not even parsed.
        assert_eq!(d.handle_text("garbage", &mut ep).unwrap(), Flow::Terminated);

        assert!(d.textures().is_empty());
        assert!(ep.events.is_empty());
    }

    #[test]
    fn leave_request_declines_the_next_cycle_and_terminates() {
        let mut d = Dispatcher::new();
        let mut ep = RecordingEndpoint::new();

        feed(&mut d, &mut ep, json!({"cmd": "end_update"}));
        d.request_leave();
        let flow = feed(&mut d, &mut ep, json!({"cmd": "end_update"}));

        assert_eq!(flow, Flow::Terminated);
        assert_eq!(
            ep.sent(),
            vec![&json!({"continue": true}), &json!({"continue": false})]
        );
        assert_eq!(d.phase(), Phase::Terminated);
    }

    #[test]
    fn first_close_while_streaming_requests_a_leave() {
        let mut d = Dispatcher::new();
        let mut ep = RecordingEndpoint::new();

        feed(&mut d, &mut ep, json!({"cmd": "end_update"}));
        assert!(!d.close_requested());
        assert!(d.leave_requested());
        assert_eq!(d.phase(), Phase::Streaming);
    }

    #[test]
    fn close_during_handshake_exits() {
        let mut d = Dispatcher::new();
        assert!(d.close_requested());
        assert!(!d.leave_requested());
    }

    #[test]
    fn second_close_exits() {
        let mut d = Dispatcher::new();
        let mut ep = RecordingEndpoint::new();

        feed(&mut d, &mut ep, json!({"cmd": "end_update"}));
        assert!(!d.close_requested());
        assert!(d.close_requested());
    }

    // ── malformed input ──────────────────────────────────────────────────

    #[test]
    fn malformed_json_is_fatal() {
        let mut d = Dispatcher::new();
        let mut ep = RecordingEndpoint::new();

        assert!(matches!(d.handle_text("{not json", &mut ep), Err(DispatchError::Json(_))));
        assert!(matches!(
            d.handle_text(r#"{"cmd":"update_shape","shape_id":"x","trans":[]}"#, &mut ep),
            Err(DispatchError::Json(_))
        ));
    }

    #[test]
    fn bad_base64_is_fatal() {
        let mut d = Dispatcher::new();
        let mut ep = RecordingEndpoint::new();

        let err = d
            .handle_text(
                &json!({"cmd": "add_texture", "id": 2, "width": 1, "height": 1, "data": "@@@"}).to_string(),
                &mut ep,
            )
            .unwrap_err();
        assert!(matches!(err, DispatchError::Base64 { id: TextureId(2), .. }));
    }

    #[test]
    fn wrong_texture_size_is_fatal() {
        let mut d = Dispatcher::new();
        let mut ep = RecordingEndpoint::new();

        // 3 bytes for a 2x1 texture.
        let err = d
            .handle_text(
                &json!({"cmd": "add_texture", "id": 2, "width": 2, "height": 1, "data": "/wAA"}).to_string(),
                &mut ep,
            )
            .unwrap_err();
        assert!(matches!(err, DispatchError::Texture(TextureError::PayloadSize { .. })));
    }

    #[test]
    fn oversized_texture_dimensions_are_fatal() {
        let mut d = Dispatcher::new();
        let mut ep = RecordingEndpoint::new();

        let err = d
            .handle_text(
                r#"{"cmd":"add_texture","id":1,"width":4294967295,"height":4294967295,"data":"AAAA"}"#,
                &mut ep,
            )
            .unwrap_err();
        assert!(matches!(err, DispatchError::Texture(_)));
        assert!(d.textures().is_empty());
        assert!(ep.events.is_empty());
    }

    #[test]
    fn padded_texture_rows_are_accepted() {
        let mut d = Dispatcher::new();
        let mut ep = RecordingEndpoint::new();

        // 1x2 with each 3-byte row padded to 4: [1,2,3,0, 4,5,6,0].
        let data = STANDARD.encode([1u8, 2, 3, 0, 4, 5, 6, 0]);
        feed(
            &mut d,
            &mut ep,
            json!({"cmd": "add_texture", "id": 5, "width": 1, "height": 2, "data": data}),
        );
        assert_eq!(d.textures().resolve(TextureId(5)).unwrap().rgb(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn invalid_geometry_is_fatal() {
        let mut d = Dispatcher::new();
        let mut ep = RecordingEndpoint::new();

        let msg = json!({
            "cmd": "add_shape",
            "shape_id": 3,
            "descriptor": {"trans": IDENTITY, "mesh": [0, 0, 0, 0], "face_index": [0]}
        });
        let err = d.handle_text(&msg.to_string(), &mut ep).unwrap_err();
        assert!(matches!(err, DispatchError::Geometry { id: ShapeId(3), .. }));
        assert!(!d.mirror().contains(ShapeId(3)));
    }

    #[test]
    fn redraw_presents_the_last_frame_without_replying() {
        let mut d = Dispatcher::new();
        let mut ep = RecordingEndpoint::new();

        feed(&mut d, &mut ep, add_texture(1));
        feed(&mut d, &mut ep, add_triangle(1, 1));
        feed(&mut d, &mut ep, json!({"cmd": "end_update"}));
        // Applied but not yet part of a completed frame.
        feed(&mut d, &mut ep, add_triangle(2, 1));
        ep.events.clear();

        d.redraw(&mut ep);
        assert_eq!(ep.events, vec![Event::Presented(1)]);
    }
}
