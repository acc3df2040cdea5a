//! Lineage graph views.
//!
//! [`build`] turns a snapshot of [`Records`] and a [`FilterSpec`] into a
//! [`GraphView`] of tables and dashboards. [`Reachability`] answers
//! transitive lineage questions over the same records, and the view can be
//! handed to either layout engine of `lineage_layout`.

mod builder;
mod edge;
mod filter;
mod graph;
mod layout;
mod model;
mod node;
mod reachability;
mod store;

pub use builder::build;
pub use edge::{GraphLink, LinkEnd, LinkKind};
pub use filter::{FilterError, FilterSpec, Focus};
pub use graph::GraphView;
pub use layout::NodeSizing;
pub use model::*;
pub use node::{GraphNode, NodeId, NodeKind, NodeType};
pub use reachability::{DeletionImpact, HighlightSet, Reachability};
pub use store::{InMemoryStore, RecordStore, StoreError};
