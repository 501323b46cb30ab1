//! Native configuration objects.
//!
//! Taffy has no per-node configuration, so the engine layer keeps one: a slot
//! array of [`ConfigSettings`] addressed by [`ConfigId`], with a free pool for
//! O(1) reuse of released slots.

use crate::error::{assert_with_config, config_fault};

/// Identifier of a native configuration object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfigId(usize);

impl ConfigId {
    /// Raw slot index.
    pub fn index(self) -> usize {
        self.0
    }
}

bitflags::bitflags! {
    /// Experimental engine behaviours that a config can opt into.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ExperimentalFeatures: u8 {
        const WEB_FLEX_BASIS = 1 << 0;
    }
}

bitflags::bitflags! {
    /// Compatibility switches for layouts that depended on older engine bugs.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Errata: u32 {
        const STRETCH_FLEX_BASIS = 1 << 0;
        const ABSOLUTE_POSITION_WITHOUT_INSETS_EXCLUDES_PADDING = 1 << 1;
        const ABSOLUTE_PERCENT_AGAINST_INNER_SIZE = 1 << 2;
        const ALL = 0x7fff_ffff;
        const CLASSIC = 0x7fff_fffe;
    }
}

/// Settings carried by one native configuration object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfigSettings {
    /// Physical pixels per layout point. 0 disables pixel-grid rounding.
    pub point_scale_factor: f32,
    /// New nodes start from CSS defaults (row direction, shrink 1) instead of
    /// the classic column/no-shrink defaults.
    pub use_web_defaults: bool,
    pub experimental_features: ExperimentalFeatures,
    pub errata: Errata,
    /// Log the tree after every layout pass rooted at a node using this config.
    pub print_tree: bool,
}

impl Default for ConfigSettings {
    fn default() -> Self {
        Self {
            point_scale_factor: 1.0,
            use_web_defaults: false,
            experimental_features: ExperimentalFeatures::empty(),
            errata: Errata::empty(),
            print_tree: false,
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// Slot array of live configuration objects.
#[derive(Debug, Default)]
pub struct ConfigStore {
    slots: Vec<Option<ConfigSettings>>,
    free: Vec<usize>,
    live: usize,
    /// Process defaults cloned by `Config::from_default`.
    defaults: ConfigSettings,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a native config holding `settings`.
    pub fn allocate(&mut self, settings: ConfigSettings) -> ConfigId {
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(settings);
                index
            }
            None => {
                self.slots.push(Some(settings));
                self.slots.len() - 1
            }
        };
        self.live += 1;
        ConfigId(index)
    }

    /// Free a native config. Freeing twice is a fatal assertion.
    pub fn free(&mut self, id: ConfigId) {
        let occupied = self.slots.get(id.0).is_some_and(Option::is_some);
        assert_with_config(id, occupied, "config freed twice or never allocated");
        self.slots[id.0] = None;
        self.free.push(id.0);
        self.live -= 1;
    }

    pub fn get(&self, id: ConfigId) -> &ConfigSettings {
        match self.slots.get(id.0) {
            Some(Some(settings)) => settings,
            _ => config_fault(id, "access to a freed config"),
        }
    }

    pub fn get_mut(&mut self, id: ConfigId) -> &mut ConfigSettings {
        match self.slots.get_mut(id.0) {
            Some(Some(settings)) => settings,
            _ => config_fault(id, "access to a freed config"),
        }
    }

    /// Deep-copy the settings of `src` into `dst`.
    pub fn copy(&mut self, dst: ConfigId, src: ConfigId) {
        let settings = *self.get(src);
        *self.get_mut(dst) = settings;
    }

    /// Number of live native configs.
    pub fn live_count(&self) -> usize {
        self.live
    }

    pub fn defaults(&self) -> ConfigSettings {
        self.defaults
    }

    pub fn set_defaults(&mut self, settings: ConfigSettings) {
        self.defaults = settings;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_reuse() {
        let mut store = ConfigStore::new();

        let a = store.allocate(ConfigSettings::default());
        let b = store.allocate(ConfigSettings::default());
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(store.live_count(), 2);

        store.free(a);
        assert_eq!(store.live_count(), 1);

        // Freed slot is reused
        let c = store.allocate(ConfigSettings::default());
        assert_eq!(c.index(), 0);
    }

    #[test]
    fn test_copy_settings() {
        let mut store = ConfigStore::new();
        let dst = store.allocate(ConfigSettings::default());
        let src = store.allocate(ConfigSettings {
            point_scale_factor: 2.0,
            use_web_defaults: true,
            ..ConfigSettings::default()
        });

        store.copy(dst, src);
        assert_eq!(store.get(dst).point_scale_factor, 2.0);
        assert!(store.get(dst).use_web_defaults);
    }

    #[test]
    #[should_panic(expected = "config freed twice")]
    fn test_double_free_is_fatal() {
        let mut store = ConfigStore::new();
        let id = store.allocate(ConfigSettings::default());
        store.free(id);
        store.free(id);
    }

    #[test]
    fn test_errata_presets() {
        assert!(Errata::ALL.contains(Errata::STRETCH_FLEX_BASIS));
        assert!(!Errata::CLASSIC.contains(Errata::STRETCH_FLEX_BASIS));
        assert!(Errata::CLASSIC.contains(Errata::ABSOLUTE_PERCENT_AGAINST_INNER_SIZE));
    }
}
