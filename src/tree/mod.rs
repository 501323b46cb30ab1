//! Tree - Handles over native nodes and configs, and their lifecycle.
//!
//! - [`Node`]: payload, weak parent link, owned children, shared config
//! - [`Config`]: native configuration plus payload
//! - [`ChildSlots`]: side array that mirrors a node's native child list
//! - [`lifecycle`]: finalization accounting and tracing

mod child_slots;
mod config;
pub mod lifecycle;
mod node;

pub use child_slots::*;
pub use config::*;
pub use node::*;
