//! Frame-sync protocol: wire messages, connection phases and the dispatcher
//! that applies them to the local scene.

mod dispatcher;
mod message;
mod phase;
mod session;

pub use dispatcher::{DispatchError, Dispatcher, Endpoint, Flow};
pub use message::{CycleAck, Inbound, Outbound, Tag};
pub use phase::{Phase, Transition};
pub use session::{CameraSetup, SessionInfo};
