//! Content graph: node model, store boundary and reference walking
//!
//! The repository tree lives on the nodes themselves (parent/children ids);
//! cross-cutting references are petgraph edges. Everything downstream reads the
//! store through `ContentGraphAccessor`, so the in-memory `ContentGraph` can be
//! swapped for a remote store.

pub mod accessor;
pub mod content_graph;
#[cfg(test)]
pub mod fixtures;
pub mod model;
pub mod snapshot;
pub mod walker;

pub use accessor::ContentGraphAccessor;
pub use content_graph::ContentGraph;
pub use walker::{ReferenceSet, ReferenceWalker};
