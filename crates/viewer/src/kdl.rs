//! KDL lineage model parsing.
//!
//! ```kdl
//! table "raw_orders" name="Raw Orders" dataset="sales" layer="raw" type="table"
//! lineage "raw_orders" "orders"
//! dashboard "sales" name="Sales Overview" owner="bi"
//! feeds "orders" "sales"
//! ```
//!
//! Malformed records are skipped with a warning; only a syntax error fails
//! the whole document.

use ::kdl::{KdlDocument, KdlNode, KdlValue};
use graphview::{Dashboard, DashboardTableEdge, Layer, Records, Table, TableLineageEdge, TableType};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum ModelFileError {
    #[error("invalid KDL document")]
    Syntax(#[from] ::kdl::KdlError),
}

pub fn parse_lineage_model(content: &str) -> Result<Records, ModelFileError> {
    let doc = KdlDocument::parse(content)?;
    let mut records = Records::default();

    for node in doc.nodes() {
        let kind = node.name().value();
        let parsed = match kind {
            "table" => parse_table(node).map(|t| records.tables.push(t)),
            "lineage" => parse_pair(node).map(|(source, target)| {
                records
                    .lineage_edges
                    .push(TableLineageEdge::new(source, target))
            }),
            "dashboard" => parse_dashboard(node).map(|d| records.dashboards.push(d)),
            "feeds" => parse_pair(node).map(|(table, dashboard)| {
                records
                    .dashboard_edges
                    .push(DashboardTableEdge::new(dashboard, table))
            }),
            _ => Err(format!("unknown node `{kind}`")),
        };
        if let Err(reason) = parsed {
            warn!(node = kind, %reason, "skipping model entry");
        }
    }

    debug!(
        tables = records.tables.len(),
        lineage_edges = records.lineage_edges.len(),
        dashboards = records.dashboards.len(),
        dashboard_edges = records.dashboard_edges.len(),
        "model parsed"
    );
    Ok(records)
}

fn parse_table(node: &KdlNode) -> Result<Table, String> {
    let id = argument(node, 0).ok_or("table without id")?;
    let name = string_prop(node, "name").ok_or_else(|| format!("table `{id}` without name"))?;
    let layer: Layer = string_prop(node, "layer")
        .ok_or_else(|| format!("table `{id}` without layer"))?
        .parse()
        .map_err(|e| format!("table `{id}`: {e}"))?;
    let table_type: TableType = match string_prop(node, "type") {
        Some(t) => t.parse().map_err(|e| format!("table `{id}`: {e}"))?,
        None => TableType::default(),
    };

    let mut table = Table::new(id, name, string_prop(node, "dataset").unwrap_or_default(), layer)
        .with_type(table_type);
    table.is_scheduled_query = prop(node, "scheduled")
        .and_then(KdlValue::as_bool)
        .unwrap_or(false);
    table.link = string_prop(node, "link").map(str::to_string);
    table.description = string_prop(node, "description").map(str::to_string);
    Ok(table)
}

fn parse_dashboard(node: &KdlNode) -> Result<Dashboard, String> {
    let id = argument(node, 0).ok_or("dashboard without id")?;
    let name = string_prop(node, "name").ok_or_else(|| format!("dashboard `{id}` without name"))?;
    let mut dashboard = Dashboard::new(id, name);
    dashboard.owner = string_prop(node, "owner").map(str::to_string);
    dashboard.business_area = string_prop(node, "business_area").map(str::to_string);
    dashboard.link = string_prop(node, "link").map(str::to_string);
    Ok(dashboard)
}

fn parse_pair(node: &KdlNode) -> Result<(&str, &str), String> {
    match (argument(node, 0), argument(node, 1)) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err("expected two string arguments".to_string()),
    }
}

fn prop<'a>(node: &'a KdlNode, key: &str) -> Option<&'a KdlValue> {
    node.entries()
        .iter()
        .find(|e| e.name().is_some_and(|n| n.value() == key))
        .map(|e| e.value())
}

fn string_prop<'a>(node: &'a KdlNode, key: &str) -> Option<&'a str> {
    prop(node, key)
        .and_then(KdlValue::as_string)
        .filter(|s| !s.is_empty())
}

/// Positional string argument, skipping properties.
fn argument(node: &KdlNode, index: usize) -> Option<&str> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .nth(index)
        .and_then(|e| e.value().as_string())
        .filter(|s| !s.is_empty())
}
