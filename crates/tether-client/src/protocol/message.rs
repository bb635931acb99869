use serde::{Deserialize, Serialize};

use crate::controller::ControllerReport;
use crate::mirror::ShapeId;
use crate::shape::{ShapeDescriptor, WireMatrix};
use crate::textures::TextureId;

/// Message from the server, discriminated by `cmd`.
///
/// Informational fields are optional; fields the client acts on are required
/// and a message missing them fails to parse.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Inbound {
    SetPlayerId {
        #[serde(default)]
        player_id: Option<i64>,
    },
    SetupCamera {
        #[serde(default)]
        eye: Option<[f32; 3]>,
        #[serde(default)]
        target: Option<[f32; 3]>,
        #[serde(default)]
        follow: bool,
    },
    AddTexture {
        id: TextureId,
        width: u32,
        height: u32,
        /// Base64 RGB rows.
        data: String,
    },
    GetController,
    SetPlayerTransform {
        #[serde(default)]
        player_id: Option<i64>,
        #[serde(default)]
        trans: Option<WireMatrix>,
    },
    AddShape {
        shape_id: ShapeId,
        descriptor: ShapeDescriptor,
    },
    UpdateShape {
        shape_id: ShapeId,
        trans: WireMatrix,
    },
    RemoveShape {
        shape_id: ShapeId,
    },
    EndUpdate {
        #[serde(default)]
        elapsed_time: Option<f64>,
    },
    End,
    /// Any tag this client does not know.
    #[serde(other)]
    Unrecognized,
}

/// Payload-free message kind, used by the phase table.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Tag {
    SetPlayerId,
    SetupCamera,
    AddTexture,
    GetController,
    SetPlayerTransform,
    AddShape,
    UpdateShape,
    RemoveShape,
    EndUpdate,
    End,
}

impl Tag {
    pub fn as_str(self) -> &'static str {
        match self {
            Tag::SetPlayerId => "set_player_id",
            Tag::SetupCamera => "setup_camera",
            Tag::AddTexture => "add_texture",
            Tag::GetController => "get_controller",
            Tag::SetPlayerTransform => "set_player_transform",
            Tag::AddShape => "add_shape",
            Tag::UpdateShape => "update_shape",
            Tag::RemoveShape => "remove_shape",
            Tag::EndUpdate => "end_update",
            Tag::End => "end",
        }
    }
}

impl Inbound {
    /// `None` for unrecognized messages.
    pub fn tag(&self) -> Option<Tag> {
        let tag = match self {
            Inbound::SetPlayerId { .. } => Tag::SetPlayerId,
            Inbound::SetupCamera { .. } => Tag::SetupCamera,
            Inbound::AddTexture { .. } => Tag::AddTexture,
            Inbound::GetController => Tag::GetController,
            Inbound::SetPlayerTransform { .. } => Tag::SetPlayerTransform,
            Inbound::AddShape { .. } => Tag::AddShape,
            Inbound::UpdateShape { .. } => Tag::UpdateShape,
            Inbound::RemoveShape { .. } => Tag::RemoveShape,
            Inbound::EndUpdate { .. } => Tag::EndUpdate,
            Inbound::End => Tag::End,
            Inbound::Unrecognized => return None,
        };
        Some(tag)
    }
}

/// Reply to `end_update`. `continue: false` tells the server this client is leaving.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub struct CycleAck {
    #[serde(rename = "continue")]
    pub proceed: bool,
}

/// Message to the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outbound {
    Controller(ControllerReport),
    Ack(CycleAck),
}

impl Outbound {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_known_tag() {
        let cases = [
            (r#"{"cmd":"set_player_id","player_id":3}"#, Tag::SetPlayerId),
            (r#"{"cmd":"setup_camera","eye":[0,1,2],"target":[0,0,0],"follow":true}"#, Tag::SetupCamera),
            (r#"{"cmd":"add_texture","id":1,"width":1,"height":1,"data":"AAAA"}"#, Tag::AddTexture),
            (r#"{"cmd":"get_controller"}"#, Tag::GetController),
            (r#"{"cmd":"set_player_transform","player_id":3,"trans":[1,0,0,0,0,1,0,0,0,0,1,0,0,0,0,1]}"#, Tag::SetPlayerTransform),
            (r#"{"cmd":"add_shape","shape_id":1,"descriptor":{"trans":[1,0,0,0,0,1,0,0,0,0,1,0,0,0,0,1],"child":[]}}"#, Tag::AddShape),
            (r#"{"cmd":"update_shape","shape_id":1,"trans":[1,0,0,0,0,1,0,0,0,0,1,0,0,0,0,1]}"#, Tag::UpdateShape),
            (r#"{"cmd":"remove_shape","shape_id":1}"#, Tag::RemoveShape),
            (r#"{"cmd":"end_update","elapsed_time":0.016}"#, Tag::EndUpdate),
            (r#"{"cmd":"end"}"#, Tag::End),
        ];
        for (json, tag) in cases {
            let msg: Inbound = serde_json::from_str(json).unwrap();
            assert_eq!(msg.tag(), Some(tag), "{json}");
        }
    }

    #[test]
    fn unknown_tag_parses_as_unrecognized() {
        let msg: Inbound = serde_json::from_str(r#"{"cmd":"spawn_particles","n":4}"#).unwrap();
        assert_eq!(msg, Inbound::Unrecognized);
        assert_eq!(msg.tag(), None);
    }

    #[test]
    fn informational_fields_are_optional() {
        let msg: Inbound = serde_json::from_str(r#"{"cmd":"set_player_id"}"#).unwrap();
        assert_eq!(msg, Inbound::SetPlayerId { player_id: None });

        let msg: Inbound = serde_json::from_str(r#"{"cmd":"end_update"}"#).unwrap();
        assert_eq!(msg, Inbound::EndUpdate { elapsed_time: None });
    }

    #[test]
    fn extra_fields_on_bare_tags_are_ignored() {
        let msg: Inbound = serde_json::from_str(r#"{"cmd":"get_controller","seq":9}"#).unwrap();
        assert_eq!(msg, Inbound::GetController);
    }

    #[test]
    fn missing_required_field_fails() {
        assert!(serde_json::from_str::<Inbound>(r#"{"cmd":"remove_shape"}"#).is_err());
        assert!(serde_json::from_str::<Inbound>(r#"{"cmd":"update_shape","shape_id":1}"#).is_err());
        assert!(serde_json::from_str::<Inbound>(r#"{"shape_id":1}"#).is_err());
    }

    #[test]
    fn ack_serializes_with_reserved_word() {
        let json = Outbound::Ack(CycleAck { proceed: true }).to_json().unwrap();
        assert_eq!(json, r#"{"continue":true}"#);
    }

    #[test]
    fn tag_names_match_the_wire() {
        assert_eq!(Tag::EndUpdate.as_str(), "end_update");
        assert_eq!(Tag::SetPlayerTransform.as_str(), "set_player_transform");
    }
}
