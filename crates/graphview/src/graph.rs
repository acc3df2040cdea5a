use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::edge::{GraphLink, LinkEnd};
use crate::node::{GraphNode, NodeId, NodeType};

/// Output of one graph build: the visible nodes and links.
///
/// Every link endpoint is a node of the same view. The view is immutable
/// and cheap to share across threads.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphView {
    nodes: Vec<Arc<GraphNode>>,
    links: Vec<GraphLink>,
    #[serde(skip)]
    index: HashMap<NodeId, usize>,
}

impl GraphView {
    pub(crate) fn from_parts(nodes: Vec<Arc<GraphNode>>, links: Vec<GraphLink>) -> Self {
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
        Self { nodes, links, index }
    }

    pub fn nodes(&self) -> &[Arc<GraphNode>] {
        &self.nodes
    }

    pub fn links(&self) -> &[GraphLink] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&Arc<GraphNode>> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Arc<GraphNode>> {
        self.nodes
            .iter()
            .filter(|n| n.node_type() == NodeType::Table)
    }

    pub fn dashboards(&self) -> impl Iterator<Item = &Arc<GraphNode>> {
        self.nodes
            .iter()
            .filter(|n| n.node_type() == NodeType::Dashboard)
    }

    /// Nodes sharing a link with `id`, in link order.
    pub fn neighbors(&self, id: &str) -> Vec<&NodeId> {
        let mut found: Vec<&NodeId> = Vec::new();
        for link in &self.links {
            let other = if link.source_id().as_str() == id {
                link.target_id()
            } else if link.target_id().as_str() == id {
                link.source_id()
            } else {
                continue;
            };
            if other.as_str() != id && !found.contains(&other) {
                found.push(other);
            }
        }
        found
    }

    /// `(source, target)` id pairs, the shape the layout engines take.
    pub fn link_pairs(&self) -> Vec<(String, String)> {
        self.links
            .iter()
            .map(|l| (l.source_id().to_string(), l.target_id().to_string()))
            .collect()
    }

    /// `(source, target)` node indices for index-based layouts.
    pub fn link_indices(&self) -> Vec<(usize, usize)> {
        self.links
            .iter()
            .filter_map(|l| {
                let source = self.node_index(l.source_id().as_str())?;
                let target = self.node_index(l.target_id().as_str())?;
                Some((source, target))
            })
            .collect()
    }

    /// Replace id endpoints with the nodes they name.
    ///
    /// Links whose endpoints are already resolved are left alone.
    pub fn resolve_links(&mut self) {
        let Self { nodes, links, index } = self;
        for link in links.iter_mut() {
            for end in [&mut link.source, &mut link.target] {
                let resolved = match end {
                    LinkEnd::Id(id) => index.get(id.as_str()).copied(),
                    LinkEnd::Node(_) => None,
                };
                if let Some(i) = resolved {
                    *end = LinkEnd::Node(Arc::clone(&nodes[i]));
                }
            }
        }
    }

    /// Highest connection count among table nodes, for relative sizing.
    pub fn max_table_connections(&self) -> usize {
        self.tables()
            .map(|n| n.connection_count)
            .max()
            .unwrap_or(0)
    }
}
