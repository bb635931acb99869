//! Client configuration.

use std::time::Duration;

use glam::Vec3;
use tether_engine::logging::LoggingConfig;
use tether_engine::render::{Color, SceneView};
use winit::dpi::LogicalSize;

/// Environment variable consulted when no server address is given on the command line.
pub const SERVER_ENV: &str = "TETHER_SERVER";

pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:9001";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    pub title: String,
    pub window_size: LogicalSize<f64>,
    /// Longest wait for a server message per event-loop iteration.
    pub poll_interval: Duration,
    pub view: ViewSetup,
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            title: "tether".to_string(),
            window_size: LogicalSize::new(1024.0, 576.0),
            poll_interval: Duration::from_millis(2),
            view: ViewSetup::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults, with the server taken from the first argument or `TETHER_SERVER`.
    pub fn from_env() -> Self {
        let arg = std::env::args().nth(1);
        let env = std::env::var(SERVER_ENV).ok();
        Self::with_server(arg.or(env))
    }

    fn with_server(server: Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(server) = server.filter(|s| !s.trim().is_empty()) {
            config.server_url = normalize_server_url(&server);
        }
        config
    }
}

/// Adds `ws://` to a bare `host:port`.
pub fn normalize_server_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.contains("://") {
        raw.to_string()
    } else {
        format!("ws://{raw}")
    }
}

/// Fixed camera and light used for every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSetup {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
    /// Direction the light travels; normalized when the view is built.
    pub light_direction: Vec3,
    pub ambient: f32,
    pub clear_color: [f64; 3],
}

impl Default for ViewSetup {
    fn default() -> Self {
        Self {
            eye: Vec3::new(30.0, 7.5, -170.0),
            target: Vec3::new(30.0, 5.0, -150.0),
            up: Vec3::Y,
            fov_y_degrees: 60.0,
            z_near: 0.1,
            z_far: 600.0,
            light_direction: Vec3::new(-1.0, -3.0, 0.0),
            ambient: 0.6,
            clear_color: [0.2, 0.3, 0.3],
        }
    }
}

impl ViewSetup {
    pub fn scene_view(&self, aspect: f32) -> SceneView {
        let [r, g, b] = self.clear_color;
        SceneView::look_at(
            self.eye,
            self.target,
            self.up,
            self.fov_y_degrees.to_radians(),
            aspect,
            self.z_near,
            self.z_far,
        )
        .with_light(self.light_direction, self.ambient)
        .with_clear_color(Color { r, g, b, a: 1.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_port_gets_ws_scheme() {
        assert_eq!(normalize_server_url("10.0.0.2:9001"), "ws://10.0.0.2:9001");
        assert_eq!(normalize_server_url(" localhost:80 "), "ws://localhost:80");
    }

    #[test]
    fn explicit_scheme_is_kept() {
        assert_eq!(normalize_server_url("ws://host:1/path"), "ws://host:1/path");
        assert_eq!(normalize_server_url("wss://host:1"), "wss://host:1");
    }

    #[test]
    fn server_falls_back_to_default() {
        assert_eq!(ClientConfig::with_server(None).server_url, DEFAULT_SERVER_URL);
        assert_eq!(ClientConfig::with_server(Some("  ".into())).server_url, DEFAULT_SERVER_URL);
        assert_eq!(
            ClientConfig::with_server(Some("game:7000".into())).server_url,
            "ws://game:7000"
        );
    }

    #[test]
    fn scene_view_uses_fixed_light_and_clear_color() {
        let view = ViewSetup::default().scene_view(16.0 / 9.0);
        assert_eq!(view.ambient, 0.6);
        assert_eq!(view.light_direction, Vec3::new(-1.0, -3.0, 0.0).normalize());
        assert_eq!((view.clear_color.r, view.clear_color.g, view.clear_color.b), (0.2, 0.3, 0.3));
    }
}
