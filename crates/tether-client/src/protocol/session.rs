use glam::{Mat4, Vec3};

/// Camera parameters announced during the handshake.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraSetup {
    pub eye: Option<Vec3>,
    pub target: Option<Vec3>,
    pub follow: bool,
}

/// What the server has told us about ourselves. Never affects rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionInfo {
    pub player_id: Option<i64>,
    pub camera: Option<CameraSetup>,
    /// Latest transform of the local player.
    pub player_transform: Option<Mat4>,
    pub last_elapsed_time: Option<f64>,
    /// Completed `end_update` cycles.
    pub cycles: u64,
}

impl SessionInfo {
    /// True when `player_id` names the local player.
    ///
    /// A transform without an id, or before we know our own, is not ours.
    pub fn is_local(&self, player_id: Option<i64>) -> bool {
        matches!((self.player_id, player_id), (Some(a), Some(b)) if a == b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_player_needs_both_ids() {
        let mut info = SessionInfo::default();
        assert!(!info.is_local(Some(1)));

        info.player_id = Some(1);
        assert!(info.is_local(Some(1)));
        assert!(!info.is_local(Some(2)));
        assert!(!info.is_local(None));
    }
}
