//! Feeding a [`GraphView`] to the layout engines.

use std::collections::HashMap;

use lineage_layout::{ForceBody, ForceController, HierarchicalConfig, LayoutNode, LayoutResult, Rank, Size};
use serde::{Deserialize, Serialize};

use crate::graph::GraphView;
use crate::node::{GraphNode, NodeKind};

/// Node radii for the force layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSizing {
    pub dashboard_radius: f64,
    pub table_radius_min: f64,
    pub table_radius_max: f64,
    /// Added on top for scheduled-query tables.
    pub scheduled_bonus: f64,
}

impl Default for NodeSizing {
    fn default() -> Self {
        Self {
            dashboard_radius: 22.0,
            table_radius_min: 8.0,
            table_radius_max: 26.0,
            scheduled_bonus: 4.0,
        }
    }
}

impl NodeSizing {
    /// Tables scale with their connection count relative to the busiest
    /// table in the view; dashboards are fixed.
    pub fn radius(&self, node: &GraphNode, max_table_connections: usize) -> f64 {
        match &node.kind {
            NodeKind::Dashboard(_) => self.dashboard_radius,
            NodeKind::Table(table) => {
                let share = if max_table_connections == 0 {
                    0.0
                } else {
                    node.connection_count as f64 / max_table_connections as f64
                };
                let radius = self.table_radius_min + (self.table_radius_max - self.table_radius_min) * share;
                if table.is_scheduled_query {
                    radius + self.scheduled_bonus
                } else {
                    radius
                }
            }
        }
    }
}

struct Measured<'a> {
    node: &'a GraphNode,
    size: Size,
}

impl LayoutNode for Measured<'_> {
    fn id(&self) -> String {
        self.node.id.to_string()
    }

    fn size(&self) -> Option<Size> {
        Some(self.size)
    }

    fn rank(&self) -> Rank {
        match &self.node.kind {
            NodeKind::Table(t) => Rank::Layer(t.layer.rank()),
            NodeKind::Dashboard(_) => Rank::Terminal,
        }
    }
}

impl GraphView {
    pub fn force_bodies(&self, sizing: &NodeSizing) -> Vec<ForceBody> {
        let max = self.max_table_connections();
        self.nodes()
            .iter()
            .map(|n| ForceBody::new(n.id.as_str(), sizing.radius(n, max)))
            .collect()
    }

    /// Hand this view to a running force layout.
    ///
    /// Nodes the controller already placed keep their positions.
    pub fn apply_to(&self, controller: &mut ForceController, sizing: &NodeSizing) {
        controller.set_graph(self.force_bodies(sizing), self.link_pairs());
    }

    /// Left to right layout by layer, dashboards in the last column.
    ///
    /// `measured` holds host-measured sizes by node id; other nodes use
    /// [`GraphNode::estimate_size`].
    pub fn hierarchical_layout(&self, measured: &HashMap<String, Size>, config: &HierarchicalConfig) -> LayoutResult {
        let nodes: Vec<Measured<'_>> = self
            .nodes()
            .iter()
            .map(|n| Measured {
                node: n,
                size: measured
                    .get(n.id.as_str())
                    .copied()
                    .unwrap_or_else(|| n.estimate_size()),
            })
            .collect();
        config.layout(&nodes, &self.link_indices())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::filter::FilterSpec;
    use crate::model::*;

    fn records() -> Records {
        Records {
            tables: vec![
                Table::new("hub", "Hub", "ds", Layer::Raw),
                Table::new("a", "A", "ds", Layer::Inter),
                Table::new("b", "B", "ds", Layer::Inter).scheduled(),
                Table::new("lonely", "Lonely", "ds", Layer::Target),
            ],
            lineage_edges: vec![TableLineageEdge::new("hub", "a"), TableLineageEdge::new("hub", "b")],
            dashboards: vec![Dashboard::new("d", "D")],
            dashboard_edges: vec![DashboardTableEdge::new("d", "a"), DashboardTableEdge::new("d", "b")],
            ..Default::default()
        }
    }

    #[test]
    fn test_radius_scales_with_connections() {
        let view = build(&records(), &FilterSpec::default());
        let sizing = NodeSizing::default();
        let bodies: HashMap<String, f64> = view
            .force_bodies(&sizing)
            .into_iter()
            .map(|b| (b.id, b.radius))
            .collect();

        assert_eq!(bodies["hub"], sizing.table_radius_max);
        assert_eq!(bodies["lonely"], sizing.table_radius_min);
        assert_eq!(bodies["dashboard:d"], sizing.dashboard_radius);
        // a and b both have two links, b is scheduled
        assert_eq!(bodies["b"], bodies["a"] + sizing.scheduled_bonus);
    }

    #[test]
    fn test_hierarchical_layout_uses_measured_sizes() {
        let view = build(&records(), &FilterSpec::default());
        let mut measured = HashMap::new();
        measured.insert("hub".to_string(), Size::new(300.0, 80.0));
        let result = view.hierarchical_layout(&measured, &HierarchicalConfig::default());

        let hub = result.nodes.iter().find(|n| n.id == "hub").unwrap();
        assert_eq!(hub.size, Size::new(300.0, 80.0));
        assert_eq!(result.column_of("dashboard:d"), Some(3));
        assert_eq!(result.column_of("hub"), Some(0));
    }
}
