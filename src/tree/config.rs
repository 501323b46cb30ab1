//! Config handle - Shared wrapper around one native configuration object.
//!
//! Cloning a [`Config`] takes another strong reference. Nodes hold their config
//! strongly, so one config is usually shared by a whole tree. The native object
//! is freed by the finalizer when the last reference goes away.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::engine::{
    with_engine, try_with_engine, ConfigId, ConfigSettings, Errata, ExperimentalFeatures,
};
use crate::error::assert_with_config;

use super::lifecycle::{self, Edge, HandleClass, Trace};

/// Handle to a native configuration object plus a caller-owned payload.
pub struct Config<C> {
    inner: Rc<ConfigInner<C>>,
}

struct ConfigInner<C> {
    native: ConfigId,
    payload: RefCell<C>,
}

impl<C> Config<C> {
    /// Allocate a config with built-in settings.
    pub fn new(payload: C) -> Self {
        Self::allocate(payload, ConfigSettings::default())
    }

    /// Allocate a config cloned from the thread's default settings.
    pub fn from_default(payload: C) -> Self {
        let settings = with_engine(|engine| engine.configs().defaults());
        Self::allocate(payload, settings)
    }

    fn allocate(payload: C, settings: ConfigSettings) -> Self {
        lifecycle::initialize();
        let native = with_engine(|engine| engine.configs_mut().allocate(settings));
        lifecycle::record_created(HandleClass::Config);
        log::trace!("allocated config {native:?}");
        Self {
            inner: Rc::new(ConfigInner {
                native,
                payload: RefCell::new(payload),
            }),
        }
    }

    /// Native object identity.
    pub fn native_id(&self) -> ConfigId {
        self.inner.native
    }

    /// Number of native configs currently alive on this thread.
    pub fn instance_count() -> usize {
        with_engine(|engine| engine.configs().live_count())
    }

    // =========================================================================
    // Payload
    // =========================================================================

    pub fn context(&self) -> C
    where
        C: Clone,
    {
        self.inner.payload.borrow().clone()
    }

    pub fn with_context<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        f(&self.inner.payload.borrow())
    }

    /// Replace the payload. The previous value is released.
    pub fn set_context(&self, payload: C) {
        self.inner.payload.replace(payload);
    }

    /// Copy `src`'s native settings into this config and share its payload.
    ///
    /// Identity is unchanged, so nodes already using this config see the new
    /// settings.
    pub fn copy(&self, src: &Config<C>)
    where
        C: Clone,
    {
        with_engine(|engine| engine.configs_mut().copy(self.inner.native, src.inner.native));
        let payload = src.inner.payload.borrow().clone();
        self.set_context(payload);
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Snapshot of every native setting.
    pub fn settings(&self) -> ConfigSettings {
        with_engine(|engine| *engine.configs().get(self.inner.native))
    }

    fn update(&self, f: impl FnOnce(&mut ConfigSettings)) {
        with_engine(|engine| f(engine.configs_mut().get_mut(self.inner.native)));
    }

    pub fn point_scale_factor(&self) -> f32 {
        self.settings().point_scale_factor
    }

    /// Pixels per point for layout rounding. 0 turns rounding off.
    pub fn set_point_scale_factor(&self, pixels_in_point: f32) {
        assert_with_config(
            self.inner.native,
            pixels_in_point >= 0.0,
            "scale factor should not be less than zero",
        );
        self.update(|settings| settings.point_scale_factor = pixels_in_point);
    }

    pub fn use_web_defaults(&self) -> bool {
        self.settings().use_web_defaults
    }

    /// Affects nodes created or reset after the change.
    pub fn set_use_web_defaults(&self, enabled: bool) {
        self.update(|settings| settings.use_web_defaults = enabled);
    }

    pub fn is_experimental_feature_enabled(&self, feature: ExperimentalFeatures) -> bool {
        self.settings().experimental_features.contains(feature)
    }

    pub fn set_experimental_feature_enabled(&self, feature: ExperimentalFeatures, enabled: bool) {
        self.update(|settings| settings.experimental_features.set(feature, enabled));
    }

    pub fn errata(&self) -> Errata {
        self.settings().errata
    }

    pub fn set_errata(&self, errata: Errata) {
        self.update(|settings| settings.errata = errata);
    }

    pub fn print_tree(&self) -> bool {
        self.settings().print_tree
    }

    pub fn set_print_tree(&self, enabled: bool) {
        self.update(|settings| settings.print_tree = enabled);
    }
}

/// Settings cloned by [`Config::from_default`] on this thread.
pub fn default_settings() -> ConfigSettings {
    with_engine(|engine| engine.configs().defaults())
}

pub fn set_default_settings(settings: ConfigSettings) {
    with_engine(|engine| engine.configs_mut().set_defaults(settings));
}

// =============================================================================
// Identity
// =============================================================================

impl<C> Clone for Config<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<C> PartialEq for Config<C> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<C> Eq for Config<C> {}

impl<C> fmt::Debug for Config<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config").field("native", &self.inner.native).finish()
    }
}

// =============================================================================
// Finalizer and tracer
// =============================================================================

impl<C> Drop for ConfigInner<C> {
    fn drop(&mut self) {
        let native = self.native;
        try_with_engine(|engine| engine.configs_mut().free(native));
        lifecycle::record_finalized(HandleClass::Config);
        log::trace!("finalized config {native:?}");
    }
}

impl<N, C> Trace<N, C> for Config<C> {
    fn trace(&self, visit: &mut dyn FnMut(Edge<'_, N, C>)) {
        visit(Edge::ConfigPayload(&*self.inner.payload.borrow()));
    }
}
