//! # spark-flex
//!
//! Handle-based flexbox layout trees for Rust, on top of
//! [Taffy](https://github.com/DioxusLabs/taffy).
//!
//! ## Architecture
//!
//! Native layout objects (Taffy nodes and configuration objects) live in a
//! thread-local engine. Callers never touch them directly; they hold handles:
//!
//! ```text
//! Node ──> payload, Config, children (strong)
//!      ──> parent (weak, never traced)
//! ```
//!
//! Dropping the last handle to a node runs its finalizer, which frees the
//! native node and releases everything the node owned. Because parent links are
//! weak, releasing a root reclaims the whole tree with plain reference counting.
//!
//! Every structural operation keeps the native child list and the handle's own
//! [`ChildSlots`] in lockstep. Guard violations come back as [`LayoutError`]
//! with nothing changed.
//!
//! ## Modules
//!
//! - [`tree`] - Node and Config handles, child slots, lifecycle registry
//! - [`engine`] - Thread-local Taffy tree and config store
//! - [`layout`] - Layout computation, results, style forwarders
//! - [`error`] - Error type and fatal assertions

pub mod engine;
pub mod error;
pub mod layout;
pub mod tree;

// Re-export commonly used items
pub use error::{LayoutError, Result};

pub use tree::{default_settings, set_default_settings, ChildSlots, Config, Node};

pub use tree::lifecycle::{
    initialize, on_finalize, reachable_from, stats, Edge, HandleClass, LifecycleStats, Trace,
};

pub use engine::{ConfigId, ConfigSettings, Errata, ExperimentalFeatures, MeasureFunc, NodeType};

pub use layout::{round_value_to_pixel_grid, Dimension, Edges, NodeLayout, PrintOptions, Side};

// Common Taffy types used in signatures
pub use taffy::{AvailableSpace, Display, FlexDirection, NodeId, Position, Size};
