//! Lineage records as delivered by the record store.

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("unknown layer `{0}` (expected raw, inter, target or reporting)")]
    UnknownLayer(String),

    #[error("unknown table type `{0}` (expected table, view, query or sheet)")]
    UnknownTableType(String),
}

/// Ordered processing stage of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Raw,
    Inter,
    Target,
    Reporting,
}

impl Layer {
    pub const ALL: [Layer; 4] = [Layer::Raw, Layer::Inter, Layer::Target, Layer::Reporting];

    /// Column index in the hierarchical layout, left to right.
    pub fn rank(self) -> usize {
        match self {
            Layer::Raw => 0,
            Layer::Inter => 1,
            Layer::Target => 2,
            Layer::Reporting => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Layer::Raw => "raw",
            Layer::Inter => "inter",
            Layer::Target => "target",
            Layer::Reporting => "reporting",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layer {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Layer::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ModelError::UnknownLayer(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableType {
    #[default]
    Table,
    View,
    Query,
    Sheet,
}

impl TableType {
    pub const ALL: [TableType; 4] = [TableType::Table, TableType::View, TableType::Query, TableType::Sheet];

    pub fn as_str(self) -> &'static str {
        match self {
            TableType::Table => "table",
            TableType::View => "view",
            TableType::Query => "query",
            TableType::Sheet => "sheet",
        }
    }
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TableType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ModelError::UnknownTableType(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: String,
    pub name: String,
    pub dataset: String,
    pub layer: Layer,
    #[serde(default)]
    pub table_type: TableType,
    #[serde(default)]
    pub is_scheduled_query: bool,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Table {
    pub fn new(id: impl Into<String>, name: impl Into<String>, dataset: impl Into<String>, layer: Layer) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            dataset: dataset.into(),
            layer,
            table_type: TableType::Table,
            is_scheduled_query: false,
            link: None,
            description: None,
        }
    }

    pub fn with_type(mut self, table_type: TableType) -> Self {
        self.table_type = table_type;
        self
    }

    pub fn scheduled(mut self) -> Self {
        self.is_scheduled_query = true;
        self
    }
}

/// Directed lineage: `source_table_id` feeds `target_table_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLineageEdge {
    pub source_table_id: String,
    pub target_table_id: String,
    #[serde(default)]
    pub source_table_name: String,
    #[serde(default)]
    pub target_table_name: String,
}

impl TableLineageEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source_table_id: source.into(),
            target_table_id: target.into(),
            source_table_name: String::new(),
            target_table_name: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub business_area: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

impl Dashboard {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner: None,
            business_area: None,
            link: None,
        }
    }
}

/// A table feeding a dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardTableEdge {
    pub dashboard_id: String,
    pub table_id: String,
    #[serde(default)]
    pub dashboard_name: String,
    #[serde(default)]
    pub table_name: String,
}

impl DashboardTableEdge {
    pub fn new(dashboard: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            dashboard_id: dashboard.into(),
            table_id: table.into(),
            dashboard_name: String::new(),
            table_name: String::new(),
        }
    }
}

/// Optional columns the backing schema actually has.
///
/// Obtained once from the store and carried with the records, so filters on
/// a missing column can be skipped instead of silently matching nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnsAvailable {
    pub scheduled_query: bool,
    pub table_type: bool,
}

impl Default for ColumnsAvailable {
    fn default() -> Self {
        Self {
            scheduled_query: true,
            table_type: true,
        }
    }
}

/// Snapshot of the four record collections for one project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Records {
    pub tables: Vec<Table>,
    pub lineage_edges: Vec<TableLineageEdge>,
    pub dashboards: Vec<Dashboard>,
    pub dashboard_edges: Vec<DashboardTableEdge>,
    #[serde(default)]
    pub columns: ColumnsAvailable,
}

impl Records {
    pub fn table(&self, id: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.id == id)
    }

    pub fn dashboard(&self, id: &str) -> Option<&Dashboard> {
        self.dashboards.iter().find(|d| d.id == id)
    }

    /// Distinct dataset labels, sorted, for filter pickers.
    pub fn datasets(&self) -> Vec<&str> {
        self.tables
            .iter()
            .map(|t| t.dataset.as_str())
            .filter(|d| !d.is_empty())
            .unique()
            .sorted()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.dashboards.is_empty()
    }
}
