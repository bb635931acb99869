use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a CPU-side resource.
///
/// Renderers use it to find the GPU copy of a mesh or texture. A replaced
/// resource gets a new key, so stale GPU copies are never reused.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ResourceKey(u64);

impl ResourceKey {
    /// Allocates a fresh key.
    #[inline]
    pub fn next() -> Self {
        Self(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}
