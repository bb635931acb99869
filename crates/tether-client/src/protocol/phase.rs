use std::fmt;

use super::message::Tag;

/// Connection phase.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Phase {
    /// Before the first streaming message: identity and camera setup.
    #[default]
    Handshake,
    /// Update cycles.
    Streaming,
    /// After `end` or a declined cycle. Nothing further is applied.
    Terminated,
}

/// Outcome of looking a tag up in the phase table.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Transition {
    /// Apply the message, then be in this phase.
    To(Phase),
    /// Tag not allowed in the current phase; drop the message.
    Reject,
}

impl Phase {
    pub fn transition(self, tag: Tag) -> Transition {
        use Phase::*;
        use Tag::*;

        match (self, tag) {
            (Terminated, _) => Transition::Reject,

            (_, End) => Transition::To(Terminated),

            (Handshake, SetPlayerId | SetupCamera | AddTexture) => Transition::To(Handshake),
            (Streaming, SetPlayerId | SetupCamera) => Transition::Reject,

            (
                Handshake | Streaming,
                AddTexture | GetController | SetPlayerTransform | AddShape | UpdateShape
                | RemoveShape | EndUpdate,
            ) => Transition::To(Streaming),
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Phase::Terminated
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Handshake => "handshake",
            Phase::Streaming => "streaming",
            Phase::Terminated => "terminated",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAMING_TAGS: [Tag; 6] = [
        Tag::GetController,
        Tag::SetPlayerTransform,
        Tag::AddShape,
        Tag::UpdateShape,
        Tag::RemoveShape,
        Tag::EndUpdate,
    ];

    #[test]
    fn handshake_tags_stay_in_handshake() {
        for tag in [Tag::SetPlayerId, Tag::SetupCamera, Tag::AddTexture] {
            assert_eq!(Phase::Handshake.transition(tag), Transition::To(Phase::Handshake));
        }
    }

    #[test]
    fn first_streaming_tag_starts_streaming() {
        for tag in STREAMING_TAGS {
            assert_eq!(Phase::Handshake.transition(tag), Transition::To(Phase::Streaming));
            assert_eq!(Phase::Streaming.transition(tag), Transition::To(Phase::Streaming));
        }
    }

    #[test]
    fn handshake_only_tags_are_rejected_while_streaming() {
        assert_eq!(Phase::Streaming.transition(Tag::SetPlayerId), Transition::Reject);
        assert_eq!(Phase::Streaming.transition(Tag::SetupCamera), Transition::Reject);
    }

    #[test]
    fn textures_may_arrive_while_streaming() {
        assert_eq!(Phase::Streaming.transition(Tag::AddTexture), Transition::To(Phase::Streaming));
    }

    #[test]
    fn end_terminates_from_any_live_phase() {
        assert_eq!(Phase::Handshake.transition(Tag::End), Transition::To(Phase::Terminated));
        assert_eq!(Phase::Streaming.transition(Tag::End), Transition::To(Phase::Terminated));
    }

    #[test]
    fn terminated_rejects_everything() {
        for tag in STREAMING_TAGS.into_iter().chain([Tag::End, Tag::SetPlayerId, Tag::AddTexture]) {
            assert_eq!(Phase::Terminated.transition(tag), Transition::Reject);
        }
        assert!(Phase::Terminated.is_terminal());
    }
}
