//! Frame renderer: turns the mirror into a draw stream.

use tether_engine::scene::DrawList;

use crate::mirror::SceneMirror;
use crate::textures::TextureRegistry;

/// Builds one frame's draw stream from the mirror.
///
/// The list is reused across frames. Clearing of color and depth happens in
/// the backend pass that consumes it.
#[derive(Debug, Default)]
pub struct FrameRenderer {
    list: DrawList,
}

impl FrameRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Traverses every root in insertion order, starting each at its own transform.
    pub fn render_frame(&mut self, mirror: &SceneMirror, textures: &TextureRegistry) -> &DrawList {
        self.list.clear();
        for (_, root) in mirror.iter() {
            root.draw(root.transform(), textures, &mut self.list);
        }
        &self.list
    }

    /// The most recently built frame.
    pub fn last_frame(&self) -> &DrawList {
        &self.list
    }
}
