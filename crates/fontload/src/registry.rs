use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

use tracing::debug;

use crate::LoadedFont;

/// Fonts keyed by family. A family is registered once; later registrations
/// under the same name are ignored.
#[derive(Default)]
pub struct FontRegistry {
    fonts: RwLock<HashMap<String, LoadedFont>>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the font unless its family is already present. Returns true when
    /// the font was inserted.
    pub fn register(&self, font: &LoadedFont) -> bool {
        let mut fonts = self.fonts.write().unwrap_or_else(PoisonError::into_inner);
        if fonts.contains_key(font.family()) {
            return false;
        }
        debug!(family = font.family(), bytes = font.data().len(), "registered font");
        fonts.insert(font.family().to_string(), font.clone());
        true
    }

    pub fn get(&self, family: &str) -> Option<LoadedFont> {
        self.fonts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(family)
            .cloned()
    }

    pub fn contains(&self, family: &str) -> bool {
        self.fonts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(family)
    }

    pub fn len(&self) -> usize {
        self.fonts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-wide registry shared by every text layer.
pub fn registry() -> &'static FontRegistry {
    static REGISTRY: OnceLock<FontRegistry> = OnceLock::new();
    REGISTRY.get_or_init(FontRegistry::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_registration_wins() {
        let registry = FontRegistry::new();
        assert!(registry.register(&LoadedFont::new("Display", vec![1, 2])));
        assert!(!registry.register(&LoadedFont::new("Display", vec![9, 9, 9])));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("Display").unwrap().data(), &[1, 2]);
    }

    #[test]
    fn unknown_family_is_absent() {
        let registry = FontRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get("Nope").is_none());
        assert!(!registry.contains("Nope"));
    }

    #[test]
    fn global_registry_is_shared() {
        let family = "registry-test-shared-family";
        registry().register(&LoadedFont::new(family, vec![7]));
        assert!(registry().contains(family));
    }
}
