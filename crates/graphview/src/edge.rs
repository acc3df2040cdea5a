use std::sync::Arc;

use serde::Serialize;

use crate::node::{GraphNode, NodeId};

/// One end of a link: an id, or the node once a renderer resolved it.
#[derive(Debug, Clone)]
pub enum LinkEnd {
    Id(NodeId),
    Node(Arc<GraphNode>),
}

impl LinkEnd {
    pub fn id(&self) -> &NodeId {
        match self {
            LinkEnd::Id(id) => id,
            LinkEnd::Node(node) => &node.id,
        }
    }

    pub fn node(&self) -> Option<&Arc<GraphNode>> {
        match self {
            LinkEnd::Node(node) => Some(node),
            LinkEnd::Id(_) => None,
        }
    }
}

impl PartialEq for LinkEnd {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Serialize for LinkEnd {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.id().serialize(serializer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// Table to table.
    Lineage,
    /// Table to dashboard.
    Feeds,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphLink {
    pub source: LinkEnd,
    pub target: LinkEnd,
    pub kind: LinkKind,
}

impl GraphLink {
    pub fn new(source: NodeId, target: NodeId, kind: LinkKind) -> Self {
        Self {
            source: LinkEnd::Id(source),
            target: LinkEnd::Id(target),
            kind,
        }
    }

    pub fn source_id(&self) -> &NodeId {
        self.source.id()
    }

    pub fn target_id(&self) -> &NodeId {
        self.target.id()
    }

    pub fn touches(&self, id: &str) -> bool {
        self.source_id().as_str() == id || self.target_id().as_str() == id
    }

    pub fn is_self_loop(&self) -> bool {
        self.source_id() == self.target_id()
    }
}
