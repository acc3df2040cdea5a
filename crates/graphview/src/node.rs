use std::borrow::Borrow;
use std::fmt;

use lineage_layout::Size;
use serde::{Deserialize, Serialize};

use crate::model::{Dashboard, Table};

const DASHBOARD_PREFIX: &str = "dashboard:";

/// Node identifier in a built view.
///
/// Tables use their record id as is; dashboards are prefixed with
/// `dashboard:` so the two namespaces never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn table(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn dashboard(id: impl AsRef<str>) -> Self {
        Self(format!("{DASHBOARD_PREFIX}{}", id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn node_type(&self) -> NodeType {
        if self.0.starts_with(DASHBOARD_PREFIX) {
            NodeType::Dashboard
        } else {
            NodeType::Table
        }
    }

    /// The underlying record id, without the dashboard prefix.
    pub fn record_id(&self) -> &str {
        self.0.strip_prefix(DASHBOARD_PREFIX).unwrap_or(&self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses a rendered id; the `dashboard:` prefix marks a dashboard.
impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Table,
    Dashboard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    Table(Table),
    Dashboard(Dashboard),
}

/// A node of a built view. Immutable once built; layout positions are kept
/// by the layout engines, keyed by [`NodeId`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Links in the view touching this node.
    pub connection_count: usize,
}

impl GraphNode {
    pub fn table(table: Table, connection_count: usize) -> Self {
        Self {
            id: NodeId::table(table.id.clone()),
            kind: NodeKind::Table(table),
            connection_count,
        }
    }

    pub fn dashboard(dashboard: Dashboard, connection_count: usize) -> Self {
        Self {
            id: NodeId::dashboard(&dashboard.id),
            kind: NodeKind::Dashboard(dashboard),
            connection_count,
        }
    }

    pub fn name(&self) -> &str {
        match &self.kind {
            NodeKind::Table(t) => &t.name,
            NodeKind::Dashboard(d) => &d.name,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Table(_) => NodeType::Table,
            NodeKind::Dashboard(_) => NodeType::Dashboard,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match &self.kind {
            NodeKind::Table(t) => Some(t),
            NodeKind::Dashboard(_) => None,
        }
    }

    pub fn as_dashboard(&self) -> Option<&Dashboard> {
        match &self.kind {
            NodeKind::Dashboard(d) => Some(d),
            NodeKind::Table(_) => None,
        }
    }

    /// Estimated card size for hosts that have not measured the node yet.
    pub fn estimate_size(&self) -> Size {
        let header_height = 28.0;
        let line_height = 18.0;
        let char_width = 7.2;
        let padding = 24.0;

        let name_width = self.name().chars().count() as f64 * char_width + padding;
        match &self.kind {
            NodeKind::Table(t) => {
                // badge with the table type next to the dataset line
                let detail = t.dataset.chars().count() + t.table_type.as_str().len() + 3;
                let detail_width = detail as f64 * 6.0 + 40.0;
                let width = name_width.max(detail_width).max(120.0);
                Size::new(width, header_height + line_height)
            }
            NodeKind::Dashboard(d) => {
                let width = name_width.max(140.0);
                let height = match &d.owner {
                    Some(_) => header_height + line_height,
                    None => header_height + 12.0,
                };
                Size::new(width, height)
            }
        }
    }
}
