use std::sync::Arc;

use glam::Mat4;
use tether_engine::scene::{DrawItem, DrawList, MeshData};

use crate::textures::{TextureId, TextureRegistry};

use super::descriptor::{LeafDescriptor, ShapeDescriptor};
use super::geometry::{self, FaceTable, GeometryError};

/// A node of a mirrored shape tree.
///
/// Only the transform changes after construction.
#[derive(Debug)]
pub enum ShapeNode {
    Group(GroupShape),
    Leaf(LeafShape),
}

#[derive(Debug)]
pub struct GroupShape {
    transform: Mat4,
    /// Draw order.
    children: Vec<ShapeNode>,
}

#[derive(Debug)]
pub struct LeafShape {
    transform: Mat4,
    mesh: Arc<MeshData>,
    faces: FaceTable,
    textures: Vec<TextureId>,
    default_texture: Option<TextureId>,
}

impl ShapeNode {
    /// Builds a node tree, deriving normals and validating every leaf.
    pub fn build(desc: ShapeDescriptor) -> Result<Self, GeometryError> {
        match desc {
            ShapeDescriptor::Group(g) => {
                let children = g
                    .children
                    .into_iter()
                    .map(ShapeNode::build)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ShapeNode::Group(GroupShape {
                    transform: g.transform,
                    children,
                }))
            }
            ShapeDescriptor::Leaf(leaf) => LeafShape::build(leaf).map(ShapeNode::Leaf),
        }
    }

    pub fn transform(&self) -> Mat4 {
        match self {
            ShapeNode::Group(g) => g.transform,
            ShapeNode::Leaf(l) => l.transform,
        }
    }

    pub fn set_transform(&mut self, transform: Mat4) {
        match self {
            ShapeNode::Group(g) => g.transform = transform,
            ShapeNode::Leaf(l) => l.transform = transform,
        }
    }

    /// Emits draw items for this subtree.
    ///
    /// `world` is this node's world matrix; children receive `world * child.transform`.
    pub fn draw(&self, world: Mat4, textures: &TextureRegistry, out: &mut DrawList) {
        match self {
            ShapeNode::Group(g) => {
                for child in &g.children {
                    child.draw(world * child.transform(), textures, out);
                }
            }
            ShapeNode::Leaf(l) => l.draw(world, textures, out),
        }
    }
}

impl GroupShape {
    pub fn children(&self) -> &[ShapeNode] {
        &self.children
    }
}

impl LeafShape {
    fn build(desc: LeafDescriptor) -> Result<Self, GeometryError> {
        let vertex_count = geometry::vertex_count(&desc.mesh)?;
        let faces = FaceTable::new(desc.face_index, vertex_count)?;
        let mesh = Arc::new(geometry::build_mesh(&desc.mesh, vertex_count));

        Ok(Self {
            transform: desc.transform,
            mesh,
            faces,
            textures: desc.textures,
            default_texture: desc.default_texture,
        })
    }

    /// Texture id bound to face `face`: its own entry, else the default.
    ///
    /// `None` means the face is not drawn.
    pub fn face_texture(&self, face: usize) -> Option<TextureId> {
        self.textures
            .get(face)
            .copied()
            .or(self.default_texture)
    }

    fn draw(&self, world: Mat4, textures: &TextureRegistry, out: &mut DrawList) {
        for (face, span) in self.faces.spans().enumerate() {
            if span.count == 0 {
                continue;
            }
            let Some(texture) = self.face_texture(face).and_then(|id| textures.resolve(id)) else {
                continue;
            };
            out.push(DrawItem {
                model: world,
                mesh: Arc::clone(&self.mesh),
                texture: Arc::clone(texture),
                first: span.first,
                count: span.count,
            });
        }
    }
}
