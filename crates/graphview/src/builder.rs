//! Turns records plus a filter into a [`GraphView`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::edge::{GraphLink, LinkKind};
use crate::filter::{FilterSpec, Focus};
use crate::graph::GraphView;
use crate::model::Records;
use crate::node::{GraphNode, NodeId};
use crate::reachability::Reachability;

/// Build the visible graph for `filter`.
///
/// Pure: the same records and filter always give the same view, with nodes
/// in record order (tables first, then dashboards) and links in record order.
pub fn build(records: &Records, filter: &FilterSpec) -> GraphView {
    if let Err(err) = filter.validate() {
        warn!(%err, "applying focus precedence");
    }
    warn_unavailable_columns(records, filter);

    let reach = Reachability::new(records);
    let (tables, dashboards) = select(records, filter, &reach);

    let mut links = Vec::new();
    for &(source, target) in reach.lineage_edges() {
        if tables.contains(source) && tables.contains(target) {
            links.push(GraphLink::new(NodeId::table(source), NodeId::table(target), LinkKind::Lineage));
        }
    }
    let mut fed = HashSet::new();
    for edge in &records.dashboard_edges {
        let (table, dashboard) = (edge.table_id.as_str(), edge.dashboard_id.as_str());
        if tables.contains(table) && dashboards.contains(dashboard) && fed.insert((table, dashboard)) {
            links.push(GraphLink::new(NodeId::table(table), NodeId::dashboard(dashboard), LinkKind::Feeds));
        }
    }

    let mut connections: HashMap<&str, usize> = HashMap::new();
    for link in &links {
        *connections.entry(link.source_id().as_str()).or_default() += 1;
        if !link.is_self_loop() {
            *connections.entry(link.target_id().as_str()).or_default() += 1;
        }
    }

    let mut nodes = Vec::with_capacity(tables.len() + dashboards.len());
    let mut emitted = HashSet::new();
    for table in &records.tables {
        if table.id.is_empty() {
            debug!(name = %table.name, "skipping table without id");
            continue;
        }
        if tables.contains(table.id.as_str()) && emitted.insert(NodeId::table(table.id.as_str())) {
            let count = connections.get(table.id.as_str()).copied().unwrap_or(0);
            nodes.push(Arc::new(GraphNode::table(table.clone(), count)));
        }
    }
    for dashboard in &records.dashboards {
        if dashboard.id.is_empty() {
            debug!(name = %dashboard.name, "skipping dashboard without id");
            continue;
        }
        let id = NodeId::dashboard(&dashboard.id);
        if dashboards.contains(dashboard.id.as_str()) && !emitted.contains(&id) {
            let count = connections.get(id.as_str()).copied().unwrap_or(0);
            emitted.insert(id);
            nodes.push(Arc::new(GraphNode::dashboard(dashboard.clone(), count)));
        }
    }

    debug!(nodes = nodes.len(), links = links.len(), "graph view built");
    GraphView::from_parts(nodes, links)
}

/// Table ids and dashboard ids (unprefixed) that make it into the view.
fn select<'a>(
    records: &'a Records,
    filter: &FilterSpec,
    reach: &Reachability<'a>,
) -> (HashSet<&'a str>, HashSet<&'a str>) {
    let known_tables = || records.tables.iter().filter(|t| !t.id.is_empty());
    let known_dashboards = || records.dashboards.iter().filter(|d| !d.id.is_empty());

    match filter.focus() {
        Some(Focus::Table(id)) => {
            if !reach.is_table(id) {
                return Default::default();
            }
            let mut lineage = reach.upstream(id);
            lineage.extend(reach.downstream(id));
            let tables = known_tables()
                .map(|t| t.id.as_str())
                .filter(|t| *t == id || lineage.contains(*t))
                .collect();
            (tables, HashSet::new())
        }
        Some(Focus::Dashboard(id)) => {
            if !reach.is_dashboard(id) {
                return Default::default();
            }
            let reachable = reach.tables_reachable_from_dashboard(id);
            let tables = known_tables()
                .map(|t| t.id.as_str())
                .filter(|t| reachable.contains(*t))
                .collect();
            let dashboards = known_dashboards()
                .map(|d| d.id.as_str())
                .filter(|d| *d == id)
                .collect();
            (tables, dashboards)
        }
        Some(Focus::SelectedDashboard(id)) => {
            if !reach.is_dashboard(id) {
                return Default::default();
            }
            let direct = reach.dashboard_tables(id);
            let tables = known_tables()
                .filter(|t| direct.contains(&t.id) && filter.matches_table(t, &records.columns))
                .map(|t| t.id.as_str())
                .collect();
            let dashboards = known_dashboards()
                .filter(|d| d.id == id && filter.matches_dashboard(d))
                .map(|d| d.id.as_str())
                .collect();
            (tables, dashboards)
        }
        None => {
            let tables = known_tables()
                .filter(|t| filter.matches_table(t, &records.columns))
                .map(|t| t.id.as_str())
                .collect();
            let dashboards = known_dashboards()
                .filter(|d| filter.matches_dashboard(d))
                .map(|d| d.id.as_str())
                .collect();
            (tables, dashboards)
        }
    }
}

fn warn_unavailable_columns(records: &Records, filter: &FilterSpec) {
    if filter.scheduled_only && !records.columns.scheduled_query {
        warn!("scheduled query column unavailable, ignoring scheduled-only filter");
    }
    if !filter.table_types.is_empty() && !records.columns.table_type {
        warn!("table type column unavailable, ignoring table type filter");
    }
}
