//! Markup document tree.
//!
//! An arena-allocated tree that quick-xml parses into and that serializes
//! back to markup with untouched content preserved as written.

mod arena;
mod parse;
mod serialize;

pub use arena::{Attribute, Attributes, ChildrenIter, Document, Node, NodeData, NodeId};
