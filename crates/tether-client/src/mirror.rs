//! Scene mirror: the client's copy of the server's root shapes.

use std::fmt;

use glam::Mat4;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::shape::{GeometryError, ShapeDescriptor, ShapeNode};

/// Server-assigned shape identifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeId(pub i64);

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shape #{}", self.0)
    }
}

/// Root shapes keyed by server id, iterated in insertion order.
///
/// Replacing an existing id keeps its position.
#[derive(Debug, Default)]
pub struct SceneMirror {
    roots: IndexMap<ShapeId, ShapeNode>,
}

impl SceneMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the tree for `desc` and stores it under `id`, replacing any previous root.
    ///
    /// On error the mirror is unchanged.
    pub fn add(&mut self, id: ShapeId, desc: ShapeDescriptor) -> Result<(), GeometryError> {
        let node = ShapeNode::build(desc)?;
        if self.roots.insert(id, node).is_some() {
            log::debug!("{id} replaced");
        }
        Ok(())
    }

    /// Replaces the root transform. Returns false (and does nothing) for an unknown id.
    pub fn update_transform(&mut self, id: ShapeId, transform: Mat4) -> bool {
        match self.roots.get_mut(&id) {
            Some(node) => {
                node.set_transform(transform);
                true
            }
            None => false,
        }
    }

    /// Removes the root. Returns false (and does nothing) for an unknown id.
    pub fn remove(&mut self, id: ShapeId) -> bool {
        self.roots.shift_remove(&id).is_some()
    }

    pub fn get(&self, id: ShapeId) -> Option<&ShapeNode> {
        self.roots.get(&id)
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.roots.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Roots in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ShapeId, &ShapeNode)> {
        self.roots.iter().map(|(id, node)| (*id, node))
    }
}
