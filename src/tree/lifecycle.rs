//! Lifecycle registry - Handle classes, finalization accounting, reachability.
//!
//! Every handle belongs to one of two classes, [`HandleClass::Node`] or
//! [`HandleClass::Config`]. Each class pairs a finalizer with a tracer:
//!
//! - The **finalizer** is the `Drop` of the handle's shared block. It runs exactly
//!   once, when the last strong handle goes away, and frees the native object.
//!   Every run is recorded here; a finalization with no live instance left is a
//!   fatal assertion (double release).
//! - The **tracer** is the [`Trace`] impl. It enumerates what a handle keeps
//!   alive: a node reports its payload, its config and each child, never its
//!   parent. A config reports its payload.
//!
//! The registry is registered once per thread, on first use or through
//! [`initialize`]. Trees never cross threads, so that is once per tree's lifetime.

use std::cell::RefCell;
use std::collections::HashSet;

use crate::engine::ConfigId;
use crate::error::fatal_assert;

use super::config::Config;
use super::node::Node;

// =============================================================================
// Classes
// =============================================================================

/// Kind of handle tracked by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleClass {
    Node,
    Config,
}

impl HandleClass {
    pub fn name(self) -> &'static str {
        match self {
            HandleClass::Node => "Node",
            HandleClass::Config => "Config",
        }
    }
}

/// Counters for one handle class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassStats {
    /// Handles created and not yet finalized.
    pub live: usize,
    pub created: u64,
    pub finalized: u64,
}

/// Snapshot of both classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LifecycleStats {
    pub nodes: ClassStats,
    pub configs: ClassStats,
}

type FinalizeHook = Box<dyn FnMut()>;

#[derive(Default)]
struct ClassRecord {
    stats: ClassStats,
    hooks: Vec<FinalizeHook>,
}

#[derive(Default)]
struct Registry {
    node: ClassRecord,
    config: ClassRecord,
}

impl Registry {
    fn class_mut(&mut self, class: HandleClass) -> &mut ClassRecord {
        match class {
            HandleClass::Node => &mut self.node,
            HandleClass::Config => &mut self.config,
        }
    }
}

thread_local! {
    static REGISTRY: RefCell<Option<Registry>> = const { RefCell::new(None) };
}

fn with_registry<R>(f: impl FnOnce(&mut Registry) -> R) -> R {
    REGISTRY.with(|registry| {
        let mut registry = registry.borrow_mut();
        f(registry.get_or_insert_with(Registry::default))
    })
}

// =============================================================================
// Registration
// =============================================================================

/// Register the node and config classes for this thread.
///
/// Idempotent. Returns `true` only for the call that performed the registration.
pub fn initialize() -> bool {
    REGISTRY.with(|registry| {
        let mut registry = registry.borrow_mut();
        if registry.is_some() {
            return false;
        }
        *registry = Some(Registry::default());
        log::debug!("registered {} and {} handle classes", HandleClass::Node.name(), HandleClass::Config.name());
        true
    })
}

/// Register a hook run after each finalization of `class`.
pub fn on_finalize(class: HandleClass, hook: impl FnMut() + 'static) {
    with_registry(|registry| registry.class_mut(class).hooks.push(Box::new(hook)));
}

/// Drop every finalize hook.
pub fn clear_finalize_hooks() {
    with_registry(|registry| {
        registry.node.hooks.clear();
        registry.config.hooks.clear();
    });
}

/// Current counters.
pub fn stats() -> LifecycleStats {
    with_registry(|registry| LifecycleStats {
        nodes: registry.node.stats,
        configs: registry.config.stats,
    })
}

pub(crate) fn record_created(class: HandleClass) {
    with_registry(|registry| {
        let stats = &mut registry.class_mut(class).stats;
        stats.live += 1;
        stats.created += 1;
    });
}

/// Account for one finalizer run, then run the class hooks.
pub(crate) fn record_finalized(class: HandleClass) {
    let hooks = REGISTRY.try_with(|registry| {
        let mut registry = registry.borrow_mut();
        let record = registry.get_or_insert_with(Registry::default).class_mut(class);
        fatal_assert(record.stats.live > 0, "finalizer ran for a handle that is not live");
        record.stats.live -= 1;
        record.stats.finalized += 1;
        std::mem::take(&mut record.hooks)
    });
    // Thread teardown: nothing left to account to.
    let Ok(mut hooks) = hooks else { return };
    if hooks.is_empty() {
        return;
    }

    // Hooks run unborrowed so they may create or drop handles themselves.
    for hook in hooks.iter_mut() {
        hook();
    }

    let _ = REGISTRY.try_with(|registry| {
        let mut registry = registry.borrow_mut();
        let record = registry.get_or_insert_with(Registry::default).class_mut(class);
        let added = std::mem::replace(&mut record.hooks, hooks);
        record.hooks.extend(added);
    });
}

// =============================================================================
// Tracing
// =============================================================================

/// One retaining edge reported by a tracer.
pub enum Edge<'a, N, C> {
    /// A node's payload.
    Payload(&'a N),
    /// A node's config.
    Config(&'a Config<C>),
    /// One entry of a node's child list.
    Child(&'a Node<N, C>),
    /// A config's payload.
    ConfigPayload(&'a C),
}

/// Reports the values a handle keeps alive.
///
/// The visitor runs while the handle's fields are borrowed; it must not mutate
/// the handle it is visiting.
pub trait Trace<N, C> {
    fn trace(&self, visit: &mut dyn FnMut(Edge<'_, N, C>));
}

/// Result of a mark walk.
pub struct Reachable<N, C> {
    pub nodes: Vec<Node<N, C>>,
    pub configs: Vec<Config<C>>,
    /// Node payloads reached.
    pub payloads: usize,
    /// Config payloads reached.
    pub config_payloads: usize,
}

impl<N, C> Reachable<N, C> {
    pub fn contains_node(&self, node: &Node<N, C>) -> bool {
        self.nodes.iter().any(|reached| reached == node)
    }

    pub fn contains_config(&self, config: &Config<C>) -> bool {
        self.configs.iter().any(|reached| reached == config)
    }
}

/// Mark everything reachable from `root` by following [`Trace`] edges.
pub fn reachable_from<N, C>(root: &Node<N, C>) -> Reachable<N, C> {
    let mut reached = Reachable {
        nodes: Vec::new(),
        configs: Vec::new(),
        payloads: 0,
        config_payloads: 0,
    };
    let mut seen_nodes = HashSet::new();
    let mut seen_configs: HashSet<ConfigId> = HashSet::new();
    let mut stack = vec![root.clone()];
    seen_nodes.insert(root.native_id());

    while let Some(node) = stack.pop() {
        let mut children = Vec::new();
        let mut configs = Vec::new();
        node.trace(&mut |edge| match edge {
            Edge::Payload(_) => reached.payloads += 1,
            Edge::Config(config) => configs.push(config.clone()),
            Edge::Child(child) => children.push(child.clone()),
            Edge::ConfigPayload(_) => {}
        });

        for config in configs {
            if !seen_configs.insert(config.native_id()) {
                continue;
            }
            Trace::<N, C>::trace(&config, &mut |edge| {
                if let Edge::ConfigPayload(_) = edge {
                    reached.config_payloads += 1;
                }
            });
            reached.configs.push(config);
        }

        for child in children {
            if seen_nodes.insert(child.native_id()) {
                stack.push(child);
            }
        }
        reached.nodes.push(node);
    }

    reached
}
