use serde::{Deserialize, Serialize};

use crate::model::{ColumnsAvailable, Dashboard, Layer, Table, TableType};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("conflicting focus: {} are set at once", .0.join(", "))]
    ConflictingFocus(Vec<&'static str>),
}

/// The single focus that decides node selection, after precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus<'a> {
    Table(&'a str),
    Dashboard(&'a str),
    SelectedDashboard(&'a str),
}

/// Declarative filter state for one graph build.
///
/// Empty allow-lists place no restriction. At most one of the three focus
/// ids is meant to be set; when several are, the focused table wins, then
/// the focused dashboard, then the selected dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub datasets: Vec<String>,
    pub layers: Vec<Layer>,
    pub table_types: Vec<TableType>,
    pub scheduled_only: bool,
    pub search: String,
    pub selected_dashboard_id: Option<String>,
    pub focused_table_id: Option<String>,
    pub focused_dashboard_id: Option<String>,
}

impl FilterSpec {
    pub fn focus_table(mut self, id: impl Into<String>) -> Self {
        self.clear_focus();
        self.focused_table_id = Some(id.into());
        self
    }

    pub fn focus_dashboard(mut self, id: impl Into<String>) -> Self {
        self.clear_focus();
        self.focused_dashboard_id = Some(id.into());
        self
    }

    pub fn select_dashboard(mut self, id: impl Into<String>) -> Self {
        self.clear_focus();
        self.selected_dashboard_id = Some(id.into());
        self
    }

    pub fn clear_focus(&mut self) {
        self.selected_dashboard_id = None;
        self.focused_table_id = None;
        self.focused_dashboard_id = None;
    }

    pub fn focus(&self) -> Option<Focus<'_>> {
        if let Some(id) = &self.focused_table_id {
            return Some(Focus::Table(id));
        }
        if let Some(id) = &self.focused_dashboard_id {
            return Some(Focus::Dashboard(id));
        }
        self.selected_dashboard_id
            .as_deref()
            .map(Focus::SelectedDashboard)
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        let set: Vec<&'static str> = [
            ("focused_table_id", self.focused_table_id.is_some()),
            ("focused_dashboard_id", self.focused_dashboard_id.is_some()),
            ("selected_dashboard_id", self.selected_dashboard_id.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, on)| on.then_some(name))
        .collect();

        if set.len() > 1 {
            return Err(FilterError::ConflictingFocus(set));
        }
        Ok(())
    }

    /// Attribute and search predicate for a table.
    ///
    /// Filters on columns the store lacks are skipped.
    pub fn matches_table(&self, table: &Table, columns: &ColumnsAvailable) -> bool {
        if !self.datasets.is_empty() && !self.datasets.contains(&table.dataset) {
            return false;
        }
        if !self.layers.is_empty() && !self.layers.contains(&table.layer) {
            return false;
        }
        if columns.table_type
            && !self.table_types.is_empty()
            && !self.table_types.contains(&table.table_type)
        {
            return false;
        }
        if columns.scheduled_query && self.scheduled_only && !table.is_scheduled_query {
            return false;
        }
        self.matches_search(&[&table.name, &table.id, &table.dataset])
    }

    pub fn matches_dashboard(&self, dashboard: &Dashboard) -> bool {
        self.matches_search(&[&dashboard.name, &dashboard.id])
    }

    fn matches_search(&self, fields: &[&str]) -> bool {
        let needle = self.search.trim();
        if needle.is_empty() {
            return true;
        }
        let needle = needle.to_lowercase();
        fields.iter().any(|f| f.to_lowercase().contains(&needle))
    }
}
