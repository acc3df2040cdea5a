//! Transitive lineage queries over the full record set.
//!
//! All traversals are breadth first with one visited set per call, so cycles
//! terminate and each table is reported once. Ids that are not known tables
//! yield empty results.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use petgraph::Direction;
use petgraph::graphmap::DiGraphMap;
use serde::Serialize;

use crate::model::Records;
use crate::node::{NodeId, NodeType};

/// Lineage index borrowed from a [`Records`] snapshot.
pub struct Reachability<'a> {
    lineage: DiGraphMap<&'a str, ()>,
    tables: HashSet<&'a str>,
    dashboards: HashSet<&'a str>,
    dashboard_tables: HashMap<&'a str, Vec<&'a str>>,
    table_dashboards: HashMap<&'a str, Vec<&'a str>>,
    lineage_edges: Vec<(&'a str, &'a str)>,
}

impl<'a> Reachability<'a> {
    pub fn new(records: &'a Records) -> Self {
        let mut lineage = DiGraphMap::new();
        let mut tables = HashSet::new();
        for table in records.tables.iter().filter(|t| !t.id.is_empty()) {
            lineage.add_node(table.id.as_str());
            tables.insert(table.id.as_str());
        }

        let mut lineage_edges = Vec::new();
        for edge in &records.lineage_edges {
            let (source, target) = (edge.source_table_id.as_str(), edge.target_table_id.as_str());
            // graphmap keeps a single edge per ordered pair
            if lineage.contains_node(source)
                && lineage.contains_node(target)
                && lineage.add_edge(source, target, ()).is_none()
            {
                lineage_edges.push((source, target));
            }
        }

        let dashboards: HashSet<&str> = records
            .dashboards
            .iter()
            .map(|d| d.id.as_str())
            .filter(|id| !id.is_empty())
            .collect();
        let mut dashboard_tables: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut table_dashboards: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut seen = HashSet::new();
        for edge in &records.dashboard_edges {
            let (dashboard, table) = (edge.dashboard_id.as_str(), edge.table_id.as_str());
            if !dashboards.contains(dashboard) || !lineage.contains_node(table) {
                continue;
            }
            if seen.insert((dashboard, table)) {
                dashboard_tables.entry(dashboard).or_default().push(table);
                table_dashboards.entry(table).or_default().push(dashboard);
            }
        }

        Self {
            lineage,
            tables,
            dashboards,
            dashboard_tables,
            table_dashboards,
            lineage_edges,
        }
    }

    pub fn is_table(&self, id: &str) -> bool {
        self.lineage.contains_node(id)
    }

    pub fn is_dashboard(&self, id: &str) -> bool {
        self.dashboards.contains(id)
    }

    /// Distinct lineage edges between known tables, in record order.
    pub fn lineage_edges(&self) -> &[(&'a str, &'a str)] {
        &self.lineage_edges
    }

    /// Every table that transitively feeds `table_id`, excluding itself.
    pub fn upstream(&self, table_id: &str) -> BTreeSet<String> {
        self.closure(table_id, Direction::Incoming)
            .into_keys()
            .map(str::to_string)
            .collect()
    }

    /// Every table transitively fed by `table_id`, excluding itself.
    pub fn downstream(&self, table_id: &str) -> BTreeSet<String> {
        self.closure(table_id, Direction::Outgoing)
            .into_keys()
            .map(str::to_string)
            .collect()
    }

    /// Upstream tables with their minimum hop count.
    pub fn upstream_with_distance(&self, table_id: &str) -> BTreeMap<String, usize> {
        self.closure(table_id, Direction::Incoming)
            .into_iter()
            .map(|(id, d)| (id.to_string(), d))
            .collect()
    }

    /// Downstream tables with their minimum hop count.
    pub fn downstream_with_distance(&self, table_id: &str) -> BTreeMap<String, usize> {
        self.closure(table_id, Direction::Outgoing)
            .into_iter()
            .map(|(id, d)| (id.to_string(), d))
            .collect()
    }

    /// Tables directly linked to a dashboard.
    pub fn dashboard_tables(&self, dashboard_id: &str) -> BTreeSet<String> {
        self.direct_tables(dashboard_id)
            .iter()
            .map(|t| t.to_string())
            .collect()
    }

    /// Dashboards a table feeds directly.
    pub fn dashboards_for_table(&self, table_id: &str) -> BTreeSet<String> {
        self.table_dashboards
            .get(table_id)
            .into_iter()
            .flatten()
            .map(|d| d.to_string())
            .collect()
    }

    /// The dashboard's direct tables plus their upstream and downstream.
    pub fn tables_reachable_from_dashboard(&self, dashboard_id: &str) -> BTreeSet<String> {
        let mut reachable = BTreeSet::new();
        for &table in self.direct_tables(dashboard_id) {
            reachable.insert(table.to_string());
            reachable.extend(self.upstream(table));
            reachable.extend(self.downstream(table));
        }
        reachable
    }

    /// Nodes to emphasize when `node` is selected.
    ///
    /// For a table: itself, its full lineage and the dashboards any of those
    /// feed. For a dashboard: itself and every table reachable from it.
    pub fn highlight(&self, node: &NodeId) -> HighlightSet {
        let mut nodes = BTreeSet::new();
        let record_id = node.record_id();
        match node.node_type() {
            NodeType::Table => {
                if !self.is_table(record_id) {
                    return HighlightSet::default();
                }
                let mut tables = self.upstream(record_id);
                tables.extend(self.downstream(record_id));
                tables.insert(record_id.to_string());
                for table in &tables {
                    nodes.extend(
                        self.dashboards_for_table(table)
                            .into_iter()
                            .map(NodeId::dashboard),
                    );
                }
                nodes.extend(tables.into_iter().map(NodeId::table));
            }
            NodeType::Dashboard => {
                if !self.dashboards.contains(record_id) {
                    return HighlightSet::default();
                }
                nodes.insert(node.clone());
                nodes.extend(
                    self.tables_reachable_from_dashboard(record_id)
                        .into_iter()
                        .map(NodeId::table),
                );
            }
        }
        HighlightSet { nodes }
    }

    /// What deleting a table would cascade to.
    pub fn deletion_impact(&self, table_id: &str) -> DeletionImpact {
        if !self.is_table(table_id) {
            return DeletionImpact::default();
        }
        let lineage_edges = self
            .lineage_edges
            .iter()
            .filter(|(s, t)| *s == table_id || *t == table_id)
            .count();
        let dashboards = self.dashboards_for_table(table_id);
        DeletionImpact {
            lineage_edges,
            dashboard_edges: dashboards.len(),
            dashboards,
            downstream: self.downstream(table_id),
        }
    }

    fn direct_tables(&self, dashboard_id: &str) -> &[&'a str] {
        self.dashboard_tables
            .get(dashboard_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn closure(&self, origin: &str, direction: Direction) -> BTreeMap<&'a str, usize> {
        let mut found = BTreeMap::new();
        let Some(origin) = self.tables.get(origin).copied() else {
            return found;
        };

        let mut visited = HashSet::from([origin]);
        let mut queue = VecDeque::from([(origin, 0usize)]);
        while let Some((current, depth)) = queue.pop_front() {
            for next in self.lineage.neighbors_directed(current, direction) {
                if visited.insert(next) {
                    found.insert(next, depth + 1);
                    queue.push_back((next, depth + 1));
                }
            }
        }
        found
    }
}

/// Node ids to emphasize for a selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HighlightSet {
    pub nodes: BTreeSet<NodeId>,
}

impl HighlightSet {
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionImpact {
    pub lineage_edges: usize,
    pub dashboard_edges: usize,
    pub dashboards: BTreeSet<String>,
    pub downstream: BTreeSet<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn chain() -> Records {
        Records {
            tables: vec![
                Table::new("A", "A", "ds", Layer::Raw),
                Table::new("B", "B", "ds", Layer::Inter),
                Table::new("C", "C", "ds", Layer::Target),
                Table::new("X", "X", "ds", Layer::Raw),
            ],
            lineage_edges: vec![
                TableLineageEdge::new("A", "B"),
                TableLineageEdge::new("B", "C"),
                TableLineageEdge::new("A", "B"),
            ],
            dashboards: vec![Dashboard::new("D", "Dash"), Dashboard::new("E", "Empty")],
            dashboard_edges: vec![DashboardTableEdge::new("D", "B")],
            ..Default::default()
        }
    }

    #[test]
    fn test_linear_chain_closures() {
        let records = chain();
        let reach = Reachability::new(&records);

        assert_eq!(reach.upstream("C"), set(&["A", "B"]));
        assert_eq!(reach.downstream("A"), set(&["B", "C"]));
        assert_eq!(reach.tables_reachable_from_dashboard("D"), set(&["A", "B", "C"]));
        assert!(reach.tables_reachable_from_dashboard("E").is_empty());
        assert!(reach.upstream("X").is_empty());
        assert_eq!(
            reach.upstream_with_distance("C"),
            BTreeMap::from([("B".to_string(), 1), ("A".to_string(), 2)])
        );
    }

    #[test]
    fn test_cycle_terminates_without_self() {
        let records = Records {
            tables: vec![
                Table::new("A", "A", "ds", Layer::Raw),
                Table::new("B", "B", "ds", Layer::Raw),
                Table::new("C", "C", "ds", Layer::Raw),
            ],
            lineage_edges: vec![
                TableLineageEdge::new("A", "B"),
                TableLineageEdge::new("B", "C"),
                TableLineageEdge::new("C", "A"),
            ],
            ..Default::default()
        };
        let reach = Reachability::new(&records);
        assert_eq!(reach.downstream("A"), set(&["B", "C"]));
        assert_eq!(reach.upstream("A"), set(&["B", "C"]));
        assert_eq!(
            reach.downstream_with_distance("A"),
            BTreeMap::from([("B".to_string(), 1), ("C".to_string(), 2)])
        );
    }

    #[test]
    fn test_self_loop_is_not_reported() {
        let records = Records {
            tables: vec![Table::new("A", "A", "ds", Layer::Raw)],
            lineage_edges: vec![TableLineageEdge::new("A", "A")],
            ..Default::default()
        };
        let reach = Reachability::new(&records);
        assert!(reach.upstream("A").is_empty());
        assert!(reach.downstream("A").is_empty());
    }

    #[test]
    fn test_closure_is_consistent_with_edges() {
        let records = chain();
        let reach = Reachability::new(&records);
        for table in ["A", "B", "C", "X"] {
            let up = reach.upstream(table);
            // every upstream table has a lineage edge into the origin or into another upstream table
            for u in &up {
                assert!(reach.lineage_edges().iter().any(|(s, t)| {
                    *s == u.as_str() && (*t == table || up.contains(*t))
                }));
            }
            for d in reach.downstream(table) {
                assert!(reach.upstream(&d).contains(table));
            }
        }
    }

    #[test]
    fn test_distances_are_minimum_hops() {
        let records = Records {
            tables: ["A", "B", "C", "D"]
                .iter()
                .map(|id| Table::new(*id, *id, "ds", Layer::Raw))
                .collect(),
            lineage_edges: vec![
                TableLineageEdge::new("A", "B"),
                TableLineageEdge::new("B", "C"),
                TableLineageEdge::new("C", "D"),
                TableLineageEdge::new("A", "D"),
            ],
            ..Default::default()
        };
        let reach = Reachability::new(&records);
        let down = reach.downstream_with_distance("A");
        assert_eq!(down.get("B"), Some(&1));
        assert_eq!(down.get("C"), Some(&2));
        assert_eq!(down.get("D"), Some(&1));
        assert_eq!(reach.upstream_with_distance("D").get("A"), Some(&1));
    }

    #[test]
    fn test_unknown_and_dangling_ids() {
        let mut records = chain();
        records.lineage_edges.push(TableLineageEdge::new("C", "ghost"));
        records.dashboard_edges.push(DashboardTableEdge::new("D", "ghost"));
        let reach = Reachability::new(&records);

        assert!(reach.downstream("ghost").is_empty());
        assert_eq!(reach.downstream("B"), set(&["C"]));
        assert_eq!(reach.dashboard_tables("D"), set(&["B"]));
        assert!(reach.tables_reachable_from_dashboard("nope").is_empty());
    }

    #[test]
    fn test_highlight_for_table_includes_fed_dashboards() {
        let records = chain();
        let reach = Reachability::new(&records);

        let lit = reach.highlight(&NodeId::table("C"));
        for id in ["A", "B", "C", "dashboard:D"] {
            assert!(lit.contains(id), "{id} not highlighted");
        }
        assert!(!lit.contains("X"));

        let lit = reach.highlight(&NodeId::dashboard("D"));
        assert_eq!(lit.nodes.len(), 4);
        assert!(reach.highlight(&NodeId::table("ghost")).is_empty());
        assert_eq!(reach.highlight(&NodeId::dashboard("E")).nodes.len(), 1);
    }

    #[test]
    fn test_deletion_impact_counts_cascades() {
        let records = chain();
        let reach = Reachability::new(&records);
        let impact = reach.deletion_impact("B");
        assert_eq!(impact.lineage_edges, 2);
        assert_eq!(impact.dashboard_edges, 1);
        assert_eq!(impact.dashboards, set(&["D"]));
        assert_eq!(impact.downstream, set(&["C"]));
        assert_eq!(reach.deletion_impact("ghost"), DeletionImpact::default());
    }
}
