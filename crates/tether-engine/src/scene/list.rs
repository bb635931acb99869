use std::sync::Arc;

use glam::Mat4;

use super::{MeshData, TextureImage};

/// One textured triangle range of a mesh.
#[derive(Debug, Clone)]
pub struct DrawItem {
    /// Model (world) matrix.
    pub model: Mat4,
    pub mesh: Arc<MeshData>,
    pub texture: Arc<TextureImage>,
    /// First vertex of the range.
    pub first: u32,
    /// Number of vertices; always a positive multiple of 3.
    pub count: u32,
}

/// Recorded draw stream for a frame.
///
/// Items are drawn in insertion order; depth testing resolves occlusion.
/// `clear()` keeps the allocation, so a list reused across frames does not
/// allocate once warmed.
#[derive(Debug, Default)]
pub struct DrawList {
    items: Vec<DrawItem>,
}

impl DrawList {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears recorded items. Keeps allocated capacity for reuse.
    #[inline]
    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[inline]
    pub fn push(&mut self, item: DrawItem) {
        debug_assert!(item.count > 0 && item.count % 3 == 0);
        self.items.push(item);
    }

    /// Returns items in insertion order.
    #[inline]
    pub fn items(&self) -> &[DrawItem] {
        &self.items
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
