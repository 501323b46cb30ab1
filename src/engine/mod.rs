//! Native layout engine.
//!
//! The engine owns every native object the bridge hands out:
//! - a Taffy tree whose nodes carry a [`NativeNode`] context,
//! - a [`ConfigStore`] of configuration objects.
//!
//! It lives in a thread-local, like the other registries in this crate. Handles
//! are `!Send`, so a tree never leaves the thread that built it.
//!
//! Every structural call here maps one-to-one onto a bridge operation. The
//! engine knows nothing about handles, payloads or back-references.

mod config_store;
mod native;

pub use config_store::*;
pub use native::*;

use std::cell::RefCell;

use taffy::{
    AvailableSpace, Layout, NodeId, Size, Style, TaffyResult, TaffyTree, TraversePartialTree,
};

use crate::error::node_fault;

// =============================================================================
// Engine State
// =============================================================================

thread_local! {
    static ENGINE: RefCell<Engine> = RefCell::new(Engine::new());
}

/// Run `f` with exclusive access to the thread's engine.
///
/// Re-entering (calling back into the engine from inside `f`, for example from
/// a measure function) is a borrow panic.
pub fn with_engine<R>(f: impl FnOnce(&mut Engine) -> R) -> R {
    ENGINE.with(|engine| f(&mut engine.borrow_mut()))
}

/// Like [`with_engine`], but returns `None` once the thread-local has been torn
/// down. Finalizers use this so that handles dropped during thread exit do not
/// panic.
pub(crate) fn try_with_engine<R>(f: impl FnOnce(&mut Engine) -> R) -> Option<R> {
    ENGINE
        .try_with(|engine| match engine.try_borrow_mut() {
            Ok(mut engine) => Some(f(&mut engine)),
            Err(_) => {
                log::error!("engine busy during finalization; native object leaked");
                None
            }
        })
        .ok()
        .flatten()
}

pub struct Engine {
    tree: TaffyTree<NativeNode>,
    configs: ConfigStore,
}

impl Engine {
    fn new() -> Self {
        let mut tree = TaffyTree::new();
        // Pixel-grid rounding follows each node's config instead.
        tree.disable_rounding();
        Self {
            tree,
            configs: ConfigStore::new(),
        }
    }

    // =========================================================================
    // Nodes
    // =========================================================================

    /// Allocate a native node bound to `config`, styled with that config's defaults.
    pub fn new_node(&mut self, config: ConfigId) -> TaffyResult<NodeId> {
        let style = default_style(self.configs.get(config));
        self.tree.new_leaf_with_context(style, NativeNode::new(config))
    }

    /// Free a native node. Its native children lose their parent link.
    ///
    /// The node's measure function is handed back rather than dropped here: it
    /// may own handles whose finalizers need the engine.
    pub fn free_node(&mut self, node: NodeId) -> TaffyResult<Option<MeasureFunc>> {
        let measure = self
            .tree
            .get_node_context_mut(node)
            .and_then(|native| native.measure.take());
        self.tree.remove(node)?;
        Ok(measure)
    }

    pub fn node_count(&self) -> usize {
        self.tree.total_node_count()
    }

    fn native(&self, node: NodeId) -> &NativeNode {
        match self.tree.get_node_context(node) {
            Some(native) => native,
            None => node_fault(node, "node has no native context"),
        }
    }

    fn native_mut(&mut self, node: NodeId) -> &mut NativeNode {
        match self.tree.get_node_context_mut(node) {
            Some(native) => native,
            None => node_fault(node, "node has no native context"),
        }
    }

    /// Restore default style and native flags, keeping the attached config.
    ///
    /// Returns the measure function that was cleared.
    pub fn reset_node(&mut self, node: NodeId) -> TaffyResult<Option<MeasureFunc>> {
        let config = self.native(node).config;
        let style = default_style(self.configs.get(config));
        let measure = self.native_mut(node).reset();
        self.tree.set_style(node, style)?;
        Ok(measure)
    }

    // =========================================================================
    // Children
    // =========================================================================

    pub fn child_count(&self, parent: NodeId) -> usize {
        self.tree.child_count(parent)
    }

    pub fn children(&self, parent: NodeId) -> TaffyResult<Vec<NodeId>> {
        self.tree.children(parent)
    }

    /// Native parent, which can differ from the handle's after a raw swap.
    pub fn parent(&self, child: NodeId) -> Option<NodeId> {
        self.tree.parent(child)
    }

    /// Insert at `index`; an index past the end appends.
    pub fn insert_child(&mut self, parent: NodeId, child: NodeId, index: usize) -> TaffyResult<()> {
        let index = index.min(self.tree.child_count(parent));
        self.tree.insert_child_at_index(parent, index, child)
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> TaffyResult<()> {
        self.tree.remove_child(parent, child).map(|_| ())
    }

    /// Put `child` in place of the occupant at `index`.
    pub fn swap_child(&mut self, parent: NodeId, child: NodeId, index: usize) -> TaffyResult<()> {
        self.tree.replace_child_at_index(parent, index, child).map(|_| ())
    }

    pub fn set_children(&mut self, parent: NodeId, children: &[NodeId]) -> TaffyResult<()> {
        self.tree.set_children(parent, children)
    }

    pub fn remove_all_children(&mut self, parent: NodeId) -> TaffyResult<()> {
        self.tree.set_children(parent, &[])
    }

    // =========================================================================
    // Native node state
    // =========================================================================

    pub fn node_config(&self, node: NodeId) -> ConfigId {
        self.native(node).config
    }

    pub fn set_node_config(&mut self, node: NodeId, config: ConfigId) -> TaffyResult<()> {
        self.native_mut(node).config = config;
        self.tree.mark_dirty(node)
    }

    pub fn has_measure_func(&self, node: NodeId) -> bool {
        self.native(node).measure.is_some()
    }

    /// Install `measure`, returning the function it displaces.
    pub fn set_measure_func(
        &mut self,
        node: NodeId,
        measure: Option<MeasureFunc>,
    ) -> TaffyResult<Option<MeasureFunc>> {
        let previous = std::mem::replace(&mut self.native_mut(node).measure, measure);
        self.tree.mark_dirty(node)?;
        Ok(previous)
    }

    pub fn node_type(&self, node: NodeId) -> NodeType {
        self.native(node).node_type
    }

    pub fn set_node_type(&mut self, node: NodeId, node_type: NodeType) {
        self.native_mut(node).node_type = node_type;
    }

    pub fn is_reference_baseline(&self, node: NodeId) -> bool {
        self.native(node).is_reference_baseline
    }

    pub fn set_is_reference_baseline(&mut self, node: NodeId, value: bool) -> TaffyResult<()> {
        self.native_mut(node).is_reference_baseline = value;
        self.tree.mark_dirty(node)
    }

    pub fn has_new_layout(&self, node: NodeId) -> bool {
        self.native(node).has_new_layout
    }

    pub fn set_has_new_layout(&mut self, node: NodeId, value: bool) {
        self.native_mut(node).has_new_layout = value;
    }

    pub fn mark_dirty(&mut self, node: NodeId) -> TaffyResult<()> {
        self.tree.mark_dirty(node)
    }

    pub fn is_dirty(&self, node: NodeId) -> TaffyResult<bool> {
        self.tree.dirty(node)
    }

    // =========================================================================
    // Style and layout
    // =========================================================================

    pub fn style(&self, node: NodeId) -> TaffyResult<&Style> {
        self.tree.style(node)
    }

    pub fn set_style(&mut self, node: NodeId, style: Style) -> TaffyResult<()> {
        self.tree.set_style(node, style)
    }

    pub fn layout(&self, node: NodeId) -> TaffyResult<&Layout> {
        self.tree.layout(node)
    }

    /// Lay out the tree under `root`, calling measure functions for leaves, then
    /// flag every node of the subtree as having a new layout.
    pub fn calculate_layout(&mut self, root: NodeId, available: Size<AvailableSpace>) -> TaffyResult<()> {
        self.tree.compute_layout_with_measure(
            root,
            available,
            |known, available, _node, native, _style| {
                match native.and_then(|native| native.measure.as_mut()) {
                    Some(measure) => measure(known, available),
                    None => Size::ZERO,
                }
            },
        )?;

        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            self.native_mut(node).has_new_layout = true;
            stack.extend(self.tree.children(node)?);
        }
        Ok(())
    }

    // =========================================================================
    // Configs
    // =========================================================================

    pub fn configs(&self) -> &ConfigStore {
        &self.configs
    }

    pub fn configs_mut(&mut self) -> &mut ConfigStore {
        &mut self.configs
    }
}
