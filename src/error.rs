//! Error types and fatal assertions.
//!
//! Two failure classes exist:
//!
//! - **Guard violations** are caller mistakes. They come back as [`LayoutError`]
//!   and leave the tree exactly as it was.
//! - **Fatal assertions** are contract violations inside the engine layer. They
//!   log at error level and panic, since continuing would run on a corrupted tree.

use thiserror::Error;

use crate::engine::ConfigId;

/// Result alias used by every fallible bridge operation.
pub type Result<T> = std::result::Result<T, LayoutError>;

/// Errors from node and config operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LayoutError {
    /// The target node has a measure function and therefore cannot own children.
    #[error("{op}: parent has a measure function")]
    MeasureFuncAttached { op: &'static str },

    /// A child is already attached somewhere else.
    #[error("{op}: child already has a parent")]
    ChildHasParent { op: &'static str },

    /// Inserting the child would make a node its own ancestor.
    #[error("{op}: child is the node itself or one of its ancestors")]
    WouldCreateCycle { op: &'static str },

    /// The same handle appears more than once in a child list.
    #[error("set_children: child listed more than once")]
    DuplicateChild,

    /// The native engine rejected a call.
    #[error("engine error: {0}")]
    Engine(#[from] taffy::TaffyError),
}

// =============================================================================
// Fatal assertions
// =============================================================================

/// Abort on a broken engine contract.
#[track_caller]
pub fn fatal_assert(condition: bool, message: &str) {
    if !condition {
        log::error!("fatal assertion: {message}");
        panic!("{message}");
    }
}

/// Abort on a broken engine contract involving a specific native node.
#[track_caller]
pub fn assert_with_node(node: taffy::NodeId, condition: bool, message: &str) {
    if !condition {
        node_fault(node, message);
    }
}

/// Abort on a broken engine contract involving a specific native config.
#[track_caller]
pub fn assert_with_config(config: ConfigId, condition: bool, message: &str) {
    if !condition {
        config_fault(config, message);
    }
}

#[track_caller]
pub(crate) fn node_fault(node: taffy::NodeId, message: &str) -> ! {
    log::error!("fatal assertion on node {node:?}: {message}");
    panic!("{message} (node {node:?})");
}

#[track_caller]
pub(crate) fn config_fault(config: ConfigId, message: &str) -> ! {
    log::error!("fatal assertion on config {config:?}: {message}");
    panic!("{message} (config {config:?})");
}
