//! Layout - Computation, results and style forwarders for node handles.
//!
//! Everything here extends [`Node`](crate::tree::Node) with calls that pass
//! straight through to the engine. None of it changes ownership: payloads,
//! parents, children and configs are untouched.
//!
//! # Example
//!
//! ```
//! use spark_flex::{Node, Side};
//!
//! let root: Node<(), ()> = Node::new((), ()).unwrap();
//! root.set_width(100.0).unwrap();
//! root.set_padding(Side::All, 10.0).unwrap();
//!
//! let child: Node<(), ()> = Node::new((), ()).unwrap();
//! child.set_height(20.0).unwrap();
//! root.insert_child(&child, 0).unwrap();
//!
//! root.calculate_layout(None, None).unwrap();
//! assert_eq!(child.layout().unwrap().width, 80.0);
//! ```

mod compute;
mod style;

pub use compute::*;
pub use style::*;
