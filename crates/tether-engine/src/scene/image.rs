use super::ResourceKey;

/// Immutable RGB8 image, tightly packed, row-major.
#[derive(Debug)]
pub struct TextureImage {
    key: ResourceKey,
    width: u32,
    height: u32,
    rgb: Vec<u8>,
}

impl TextureImage {
    /// Wraps tightly packed RGB rows.
    ///
    /// Callers guarantee `rgb.len() == width * height * 3`.
    pub fn new(width: u32, height: u32, rgb: Vec<u8>) -> Self {
        debug_assert_eq!(rgb.len(), width as usize * height as usize * 3);
        Self {
            key: ResourceKey::next(),
            width,
            height,
            rgb,
        }
    }

    #[inline]
    pub fn key(&self) -> ResourceKey {
        self.key
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn rgb(&self) -> &[u8] {
        &self.rgb
    }

    /// Expands to RGBA8 with opaque alpha (GPUs have no 3-channel 8-bit format).
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.rgb.len() / 3 * 4);
        for px in self.rgb.chunks_exact(3) {
            out.extend_from_slice(px);
            out.push(u8::MAX);
        }
        out
    }
}
