use glam::Mat4;
use serde::Deserialize;

use crate::textures::TextureId;

/// 16 floats, column-major.
pub type WireMatrix = [f32; 16];

/// Converts a wire matrix to `Mat4`.
#[inline]
pub fn matrix_from_wire(m: &WireMatrix) -> Mat4 {
    Mat4::from_cols_array(m)
}

/// Server-provided shape description, before validation of its geometry.
///
/// On the wire a descriptor is a group when it carries `child`; otherwise it
/// must carry `mesh` and `face_index`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawDescriptor")]
pub enum ShapeDescriptor {
    Group(GroupDescriptor),
    Leaf(LeafDescriptor),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupDescriptor {
    pub transform: Mat4,
    pub children: Vec<ShapeDescriptor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeafDescriptor {
    pub transform: Mat4,
    /// 5 floats per vertex: position xyz, texcoord uv.
    pub mesh: Vec<f32>,
    /// Vertex offsets where each face starts.
    pub face_index: Vec<u32>,
    /// Per-face texture ids; may be shorter than `face_index`.
    pub textures: Vec<TextureId>,
    pub default_texture: Option<TextureId>,
}

impl ShapeDescriptor {
    pub fn transform(&self) -> Mat4 {
        match self {
            ShapeDescriptor::Group(g) => g.transform,
            ShapeDescriptor::Leaf(l) => l.transform,
        }
    }
}

#[derive(Deserialize)]
struct RawDescriptor {
    trans: WireMatrix,
    #[serde(default)]
    child: Option<Vec<ShapeDescriptor>>,
    #[serde(default)]
    mesh: Option<Vec<f32>>,
    #[serde(default)]
    face_index: Option<Vec<u32>>,
    #[serde(default)]
    textures: Option<Vec<TextureId>>,
    #[serde(default)]
    default_texture: Option<TextureId>,
}

impl TryFrom<RawDescriptor> for ShapeDescriptor {
    type Error = String;

    fn try_from(raw: RawDescriptor) -> Result<Self, Self::Error> {
        let transform = matrix_from_wire(&raw.trans);

        if let Some(children) = raw.child {
            return Ok(ShapeDescriptor::Group(GroupDescriptor { transform, children }));
        }

        let mesh = raw
            .mesh
            .ok_or_else(|| "leaf descriptor is missing `mesh`".to_string())?;
        let face_index = raw
            .face_index
            .ok_or_else(|| "leaf descriptor is missing `face_index`".to_string())?;

        Ok(ShapeDescriptor::Leaf(LeafDescriptor {
            transform,
            mesh,
            face_index,
            textures: raw.textures.unwrap_or_default(),
            default_texture: raw.default_texture,
        }))
    }
}
