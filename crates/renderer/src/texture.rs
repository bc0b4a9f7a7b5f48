use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::ViewportSize;

/// Process-unique identity of a texture produced by a backend.
///
/// A node that is not re-evaluated hands out the same id frame after frame,
/// which is what the cache tests observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

impl TextureId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tex#{}", self.0)
    }
}

/// A texture handle flowing upward through the render tree.
pub trait RenderTexture: Clone {
    fn id(&self) -> TextureId;
    fn size(&self) -> ViewportSize;
}
