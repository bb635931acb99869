//! Tether client.
//!
//! Mirrors a server-owned 3D scene and renders it in lock-step with the
//! server's update cycles. The server sends scene edits as JSON over a
//! WebSocket; the client answers input requests, acknowledges each cycle and
//! draws the resulting frame.

pub mod app;
pub mod config;
pub mod controller;
pub mod frame;
pub mod mirror;
pub mod protocol;
pub mod shape;
pub mod textures;
pub mod transport;
