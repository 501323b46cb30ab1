//! Node handle - Reference-counted wrapper around one native layout node.
//!
//! Ownership runs strictly downward:
//!
//! ```text
//! Node ──strong──> payload
//!      ──strong──> Config
//!      ──strong──> ChildSlots ──strong──> child Node ──weak──┐
//!       ^                                                    │
//!       └──────────────────────── parent ────────────────────┘
//! ```
//!
//! The parent edge is a `Weak`: it never keeps the parent alive and tracers never
//! report it, so dropping the last handle to a root reclaims the whole tree.
//!
//! Every structural operation follows the same order: check guards, issue the
//! native call, mirror it into the child slots and back-references, then release
//! displaced handles once no borrow is held. A failed guard or native call
//! leaves both sides untouched.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use taffy::{AvailableSpace, NodeId, Size};

use crate::engine::{try_with_engine, with_engine, NodeType};
use crate::error::{assert_with_node, LayoutError, Result};

use super::child_slots::ChildSlots;
use super::config::Config;
use super::lifecycle::{self, Edge, HandleClass, Trace};

/// Handle to a native layout node.
///
/// `N` is the node payload, `C` the payload of its config. Cloning takes a new
/// strong reference; equality is handle identity.
pub struct Node<N, C> {
    inner: Rc<NodeInner<N, C>>,
}

struct NodeInner<N, C> {
    native: NodeId,
    payload: RefCell<N>,
    parent: RefCell<Weak<NodeInner<N, C>>>,
    children: RefCell<ChildSlots<Node<N, C>>>,
    config: RefCell<Config<C>>,
}

impl<N, C> Node<N, C> {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Create a node with its own fresh config carrying `config_payload`.
    pub fn new(payload: N, config_payload: C) -> Result<Self> {
        let config = Config::new(config_payload);
        Self::with_config(payload, &config)
    }

    /// Create a node sharing `config`.
    pub fn with_config(payload: N, config: &Config<C>) -> Result<Self> {
        lifecycle::initialize();
        let native = with_engine(|engine| engine.new_node(config.native_id()))?;
        lifecycle::record_created(HandleClass::Node);
        log::trace!("allocated node {native:?}");

        Ok(Self {
            inner: Rc::new(NodeInner {
                native,
                payload: RefCell::new(payload),
                parent: RefCell::new(Weak::new()),
                children: RefCell::new(ChildSlots::new()),
                config: RefCell::new(config.clone()),
            }),
        })
    }

    /// Native node identity.
    pub fn native_id(&self) -> NodeId {
        self.inner.native
    }

    // =========================================================================
    // Parent links
    // =========================================================================

    fn has_parent(&self) -> bool {
        self.inner.parent.borrow().strong_count() > 0
    }

    fn is_parented_by(&self, parent: &Node<N, C>) -> bool {
        std::ptr::eq(self.inner.parent.borrow().as_ptr(), Rc::as_ptr(&parent.inner))
    }

    fn attach_to(&self, parent: &Node<N, C>) {
        *self.inner.parent.borrow_mut() = Rc::downgrade(&parent.inner);
    }

    /// Clear the back-reference, but only if it still points at `parent`.
    fn detach_from(&self, parent: &Node<N, C>) {
        if self.is_parented_by(parent) {
            *self.inner.parent.borrow_mut() = Weak::new();
        }
    }

    /// Whether `candidate` is this node or one of its ancestors.
    ///
    /// Walks the native parent chain, which also covers children placed by a
    /// raw swap.
    fn is_self_or_ancestor(&self, candidate: &Node<N, C>) -> bool {
        if self == candidate {
            return true;
        }
        // Ancestors always have children
        if candidate.inner.children.borrow().is_empty() {
            return false;
        }
        let target = candidate.inner.native;
        with_engine(|engine| {
            let mut current = engine.parent(self.inner.native);
            while let Some(node) = current {
                if node == target {
                    return true;
                }
                current = engine.parent(node);
            }
            false
        })
    }

    fn ensure_no_measure_func(&self, op: &'static str) -> Result<()> {
        if self.has_measure_func() {
            log::debug!(
                "{op} rejected on {:?}: measure function attached",
                self.inner.native
            );
            return Err(LayoutError::MeasureFuncAttached { op });
        }
        Ok(())
    }

    fn ensure_adoptable(&self, child: &Node<N, C>, op: &'static str) -> Result<()> {
        // A raw swap can leave a child natively attached with no handle parent.
        let child_native = child.inner.native;
        let natively_attached = with_engine(|engine| engine.parent(child_native).is_some());
        if child.has_parent() || natively_attached {
            log::debug!(
                "{op} rejected on {:?}: {child_native:?} already has a parent",
                self.inner.native
            );
            return Err(LayoutError::ChildHasParent { op });
        }
        if self.is_self_or_ancestor(child) {
            log::debug!(
                "{op} rejected on {:?}: {child_native:?} would become its own ancestor",
                self.inner.native
            );
            return Err(LayoutError::WouldCreateCycle { op });
        }
        Ok(())
    }

    /// The side array and the native child list must agree after every mutation.
    fn check_mirror(&self) {
        let native_count = with_engine(|engine| engine.child_count(self.inner.native));
        let slot_count = self.inner.children.borrow().len();
        assert_with_node(
            self.inner.native,
            native_count == slot_count,
            "child slots out of sync with the native child list",
        );
    }

    // =========================================================================
    // Structural operations
    // =========================================================================

    /// Insert `child` at `index`, shifting later children right.
    ///
    /// An index past the end appends. Fails without changing anything when this
    /// node has a measure function, when `child` already has a parent, or when
    /// `child` is this node or one of its ancestors.
    pub fn insert_child(&self, child: &Node<N, C>, index: usize) -> Result<()> {
        const OP: &str = "insert_child";
        self.ensure_no_measure_func(OP)?;
        self.ensure_adoptable(child, OP)?;

        let (native, child_native) = (self.inner.native, child.inner.native);
        with_engine(|engine| engine.insert_child(native, child_native, index))?;
        self.inner.children.borrow_mut().insert(index, child.clone());
        child.attach_to(self);

        self.check_mirror();
        log::trace!("inserted {child_native:?} into {native:?} at {index}");
        Ok(())
    }

    /// Remove `child` from this node. A child that is not present is a no-op.
    pub fn remove_child(&self, child: &Node<N, C>) -> Result<()> {
        let position = self.inner.children.borrow().position(|entry| entry == child);
        let Some(index) = position else {
            return Ok(());
        };

        let (native, child_native) = (self.inner.native, child.inner.native);
        with_engine(|engine| engine.remove_child(native, child_native))?;
        let released = self.inner.children.borrow_mut().remove(index);
        child.detach_from(self);

        self.check_mirror();
        log::trace!("removed {child_native:?} from {native:?}");
        drop(released);
        Ok(())
    }

    /// Put `child` in the slot at `index`, releasing the previous occupant.
    ///
    /// An out-of-range index is a no-op. The occupant loses its parent, but
    /// `child` does not gain one: this mirrors the engine's raw swap, and callers
    /// that mean to reparent must attach explicitly.
    pub fn swap_child(&self, child: &Node<N, C>, index: usize) -> Result<()> {
        if index >= self.inner.children.borrow().len() {
            return Ok(());
        }

        let (native, child_native) = (self.inner.native, child.inner.native);
        with_engine(|engine| engine.swap_child(native, child_native, index))?;
        let released = self.inner.children.borrow_mut().swap(index, child.clone());
        if let Ok(occupant) = &released {
            occupant.detach_from(self);
        }

        self.check_mirror();
        log::trace!("swapped {child_native:?} into {native:?} at {index}");
        drop(released);
        Ok(())
    }

    /// Replace the whole child list with `children`.
    ///
    /// Atomic: every new child is validated before anything changes. Fails when
    /// this node has a measure function, when any child already has a parent
    /// (including this node), when a child appears twice, or when a child is
    /// this node or one of its ancestors.
    pub fn set_children(&self, children: &[Node<N, C>]) -> Result<()> {
        const OP: &str = "set_children";
        self.ensure_no_measure_func(OP)?;

        let mut seen = HashSet::with_capacity(children.len());
        for child in children {
            self.ensure_adoptable(child, OP)?;
            if !seen.insert(child.inner.native) {
                log::debug!(
                    "{OP} rejected on {:?}: {:?} listed twice",
                    self.inner.native, child.inner.native
                );
                return Err(LayoutError::DuplicateChild);
            }
        }

        let native = self.inner.native;
        let natives: Vec<NodeId> = children.iter().map(|child| child.inner.native).collect();
        with_engine(|engine| engine.set_children(native, &natives))?;
        let previous = self.inner.children.borrow_mut().replace_all(children.to_vec());
        for old in &previous {
            old.detach_from(self);
        }
        for child in children {
            child.attach_to(self);
        }

        self.check_mirror();
        log::trace!("set {} children on {native:?}, released {}", children.len(), previous.len());
        drop(previous);
        Ok(())
    }

    /// Detach and release every child.
    pub fn remove_all_children(&self) -> Result<()> {
        let native = self.inner.native;
        with_engine(|engine| engine.remove_all_children(native))?;
        let released = self.inner.children.borrow_mut().take_all();
        for child in &released {
            child.detach_from(self);
        }

        self.check_mirror();
        log::trace!("removed all {} children from {native:?}", released.len());
        drop(released);
        Ok(())
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Child at `index`, or `None` past the end.
    pub fn child(&self, index: usize) -> Option<Node<N, C>> {
        self.inner.children.borrow().get(index).cloned()
    }

    /// Snapshot of the child list, in order.
    pub fn children(&self) -> Vec<Node<N, C>> {
        self.inner.children.borrow().iter().cloned().collect()
    }

    /// The node whose child list holds this node, if any.
    pub fn parent(&self) -> Option<Node<N, C>> {
        self.inner.parent.borrow().upgrade().map(|inner| Node { inner })
    }

    /// Number of children, as reported by the engine.
    pub fn child_count(&self) -> usize {
        let count = with_engine(|engine| engine.child_count(self.inner.native));
        assert_with_node(
            self.inner.native,
            count == self.inner.children.borrow().len(),
            "child slots out of sync with the native child list",
        );
        count
    }

    // =========================================================================
    // Payload and config
    // =========================================================================

    pub fn context(&self) -> N
    where
        N: Clone,
    {
        self.inner.payload.borrow().clone()
    }

    pub fn with_context<R>(&self, f: impl FnOnce(&N) -> R) -> R {
        f(&self.inner.payload.borrow())
    }

    /// Replace the payload. The previous value is released.
    pub fn set_context(&self, payload: N) {
        self.inner.payload.replace(payload);
    }

    pub fn config(&self) -> Config<C> {
        self.inner.config.borrow().clone()
    }

    /// Attach `config`, releasing this node's reference to the previous one.
    pub fn set_config(&self, config: &Config<C>) -> Result<()> {
        let native = self.inner.native;
        with_engine(|engine| engine.set_node_config(native, config.native_id()))?;
        self.inner.config.replace(config.clone());
        Ok(())
    }

    /// Reset style and native flags to the config's defaults.
    ///
    /// Payload, parent, children and config are left as they are.
    pub fn reset(&self) -> Result<()> {
        let native = self.inner.native;
        let cleared = with_engine(|engine| engine.reset_node(native))?;
        drop(cleared);
        Ok(())
    }

    // =========================================================================
    // Native node state
    // =========================================================================

    /// Attach a measure function, turning this node into a measured leaf.
    ///
    /// Measured nodes cannot have children; attaching one to a node that
    /// already has children is a fatal assertion. The function runs during
    /// layout while the engine is busy and must not call back into the tree.
    pub fn set_measure_func(
        &self,
        measure: impl FnMut(Size<Option<f32>>, Size<AvailableSpace>) -> Size<f32> + 'static,
    ) -> Result<()> {
        let native = self.inner.native;
        assert_with_node(
            native,
            self.inner.children.borrow().is_empty(),
            "cannot set a measure function: nodes with measure functions cannot have children",
        );
        let displaced = with_engine(|engine| engine.set_measure_func(native, Some(Box::new(measure))))?;
        drop(displaced);
        Ok(())
    }

    pub fn unset_measure_func(&self) -> Result<()> {
        let native = self.inner.native;
        let displaced = with_engine(|engine| engine.set_measure_func(native, None))?;
        drop(displaced);
        Ok(())
    }

    pub fn has_measure_func(&self) -> bool {
        with_engine(|engine| engine.has_measure_func(self.inner.native))
    }

    pub fn mark_dirty(&self) -> Result<()> {
        with_engine(|engine| engine.mark_dirty(self.inner.native))?;
        Ok(())
    }

    /// Mark this node and every descendant dirty.
    pub fn mark_dirty_and_propagate_to_descendants(&self) -> Result<()> {
        let mut stack = vec![self.clone()];
        while let Some(node) = stack.pop() {
            node.mark_dirty()?;
            stack.extend(node.children());
        }
        Ok(())
    }

    pub fn is_dirty(&self) -> Result<bool> {
        Ok(with_engine(|engine| engine.is_dirty(self.inner.native))?)
    }

    pub fn has_new_layout(&self) -> bool {
        with_engine(|engine| engine.has_new_layout(self.inner.native))
    }

    pub fn set_has_new_layout(&self, value: bool) {
        with_engine(|engine| engine.set_has_new_layout(self.inner.native, value));
    }

    pub fn node_type(&self) -> NodeType {
        with_engine(|engine| engine.node_type(self.inner.native))
    }

    pub fn set_node_type(&self, node_type: NodeType) {
        with_engine(|engine| engine.set_node_type(self.inner.native, node_type));
    }

    pub fn is_reference_baseline(&self) -> bool {
        with_engine(|engine| engine.is_reference_baseline(self.inner.native))
    }

    pub fn set_is_reference_baseline(&self, value: bool) -> Result<()> {
        with_engine(|engine| engine.set_is_reference_baseline(self.inner.native, value))?;
        Ok(())
    }

    /// Copy `src`'s style onto this node.
    pub fn copy_style(&self, src: &Node<N, C>) -> Result<()> {
        let (dst, src) = (self.inner.native, src.inner.native);
        with_engine(|engine| {
            let style = engine.style(src)?.clone();
            engine.set_style(dst, style)
        })?;
        Ok(())
    }
}

// =============================================================================
// Identity
// =============================================================================

impl<N, C> Clone for Node<N, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<N, C> PartialEq for Node<N, C> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<N, C> Eq for Node<N, C> {}

impl<N, C> fmt::Debug for Node<N, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("native", &self.inner.native)
            .field("children", &self.inner.children.borrow().len())
            .field("has_parent", &self.has_parent())
            .finish()
    }
}

// =============================================================================
// Finalizer and tracer
// =============================================================================

impl<N, C> Drop for NodeInner<N, C> {
    fn drop(&mut self) {
        let native = self.native;
        // Freed before the config field drops, so no native node ever points at
        // a freed config.
        match try_with_engine(|engine| engine.free_node(native)) {
            // Dropped outside the engine borrow; it may own the last handle to
            // another node or config.
            Some(Ok(measure)) => drop(measure),
            Some(Err(err)) => log::error!("failed to free native node {native:?}: {err}"),
            None => {}
        }
        lifecycle::record_finalized(HandleClass::Node);
        log::trace!("finalized node {native:?}");

        // Children owned only by this node are unlinked here, one level at a time,
        // so finalizing a deep tree does not recurse once per level.
        let mut pending = self.children.get_mut().take_all();
        while let Some(child) = pending.pop() {
            if let Ok(mut inner) = Rc::try_unwrap(child.inner) {
                pending.extend(inner.children.get_mut().take_all());
            }
        }
    }
}

impl<N, C> Trace<N, C> for Node<N, C> {
    fn trace(&self, visit: &mut dyn FnMut(Edge<'_, N, C>)) {
        visit(Edge::Payload(&*self.inner.payload.borrow()));
        visit(Edge::Config(&*self.inner.config.borrow()));
        for child in self.inner.children.borrow().iter() {
            visit(Edge::Child(child));
        }
    }
}
