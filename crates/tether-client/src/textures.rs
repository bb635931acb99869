//! Texture registry: server texture ids to decoded images.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tether_engine::scene::TextureImage;
use thiserror::Error;

/// Server-assigned texture identifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextureId(pub i64);

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "texture #{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TextureError {
    #[error("{id} has zero size ({width}x{height})")]
    ZeroSize { id: TextureId, width: u32, height: u32 },

    #[error("{id}: {len} bytes does not match {width}x{height} RGB (tight or 4-byte aligned rows)")]
    PayloadSize {
        id: TextureId,
        width: u32,
        height: u32,
        len: usize,
    },

    #[error("{id}: {width}x{height} is too large")]
    TooLarge { id: TextureId, width: u32, height: u32 },
}

/// Decoded textures keyed by server id.
///
/// Entries live for the whole session. Registering an existing id replaces
/// the image; draw items that still hold the old `Arc` keep it alive until
/// they are dropped.
#[derive(Debug, Default)]
pub struct TextureRegistry {
    textures: HashMap<TextureId, Arc<TextureImage>>,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes raw RGB rows and stores them under `id`.
    ///
    /// Rows may be tight (`width * 3` bytes) or padded to a 4-byte boundary.
    pub fn register(
        &mut self,
        id: TextureId,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    ) -> Result<(), TextureError> {
        let rgb = unpack_rows(id, width, height, pixels)?;
        let image = Arc::new(TextureImage::new(width, height, rgb));

        if self.textures.insert(id, image).is_some() {
            log::debug!("{id} replaced ({width}x{height})");
        } else {
            log::debug!("{id} registered ({width}x{height})");
        }
        Ok(())
    }

    /// Pure lookup.
    pub fn resolve(&self, id: TextureId) -> Option<&Arc<TextureImage>> {
        self.textures.get(&id)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

/// Returns tightly packed rows, stripping 4-byte row alignment when present.
fn unpack_rows(
    id: TextureId,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
) -> Result<Vec<u8>, TextureError> {
    if width == 0 || height == 0 {
        return Err(TextureError::ZeroSize { id, width, height });
    }

    let rows = height as usize;
    let sizes = (width as usize).checked_mul(3).and_then(|tight| {
        let padded = tight.checked_add(3)? & !3;
        Some((tight, padded, tight.checked_mul(rows)?, padded.checked_mul(rows)?))
    });
    let Some((tight, padded, tight_len, padded_len)) = sizes else {
        return Err(TextureError::TooLarge { id, width, height });
    };

    if pixels.len() == tight_len {
        return Ok(pixels);
    }

    if pixels.len() == padded_len {
        let mut out = Vec::with_capacity(tight_len);
        for row in pixels.chunks_exact(padded) {
            out.extend_from_slice(&row[..tight]);
        }
        return Ok(out);
    }

    Err(TextureError::PayloadSize {
        id,
        width,
        height,
        len: pixels.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tight_rows_are_stored_as_is() {
        let mut reg = TextureRegistry::new();
        reg.register(TextureId(1), 2, 2, (0u8..12).collect()).unwrap();

        let img = reg.resolve(TextureId(1)).unwrap();
        assert_eq!((img.width(), img.height()), (2, 2));
        assert_eq!(img.rgb(), (0u8..12).collect::<Vec<_>>().as_slice());
    }

    #[test]
    fn padded_rows_are_stripped() {
        // 1 pixel wide: 3 data bytes + 1 pad byte per row.
        let mut reg = TextureRegistry::new();
        reg.register(TextureId(7), 1, 2, vec![1, 2, 3, 0, 4, 5, 6, 0]).unwrap();
        assert_eq!(reg.resolve(TextureId(7)).unwrap().rgb(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn wrong_payload_size_is_rejected() {
        let mut reg = TextureRegistry::new();
        let err = reg.register(TextureId(3), 2, 2, vec![0; 5]).unwrap_err();
        assert!(matches!(err, TextureError::PayloadSize { len: 5, .. }));
        assert!(reg.resolve(TextureId(3)).is_none());
    }

    #[test]
    fn huge_dimensions_are_rejected_without_overflow() {
        let mut reg = TextureRegistry::new();
        let err = reg.register(TextureId(4), u32::MAX, u32::MAX, vec![0; 3]).unwrap_err();
        assert!(matches!(
            err,
            TextureError::TooLarge { .. } | TextureError::PayloadSize { len: 3, .. }
        ));
        assert!(reg.is_empty());
    }

    #[test]
    fn zero_size_is_rejected() {
        let mut reg = TextureRegistry::new();
        let err = reg.register(TextureId(3), 0, 4, vec![]).unwrap_err();
        assert!(matches!(err, TextureError::ZeroSize { .. }));
    }

    #[test]
    fn reregistering_replaces() {
        let mut reg = TextureRegistry::new();
        reg.register(TextureId(1), 1, 1, vec![1, 1, 1]).unwrap();
        let first_key = reg.resolve(TextureId(1)).unwrap().key();

        reg.register(TextureId(1), 1, 1, vec![9, 9, 9]).unwrap();
        let img = reg.resolve(TextureId(1)).unwrap();
        assert_eq!(img.rgb(), &[9, 9, 9]);
        assert_ne!(img.key(), first_key);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn unknown_id_resolves_to_none() {
        assert!(TextureRegistry::new().resolve(TextureId(42)).is_none());
    }
}
