//! Read access to the record store.

use std::collections::HashMap;

use tracing::debug;

use crate::model::*;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unknown project `{0}`")]
    UnknownProject(String),

    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

/// The four collections the engine reads, keyed by project.
///
/// The engine never writes through this trait; mutations happen elsewhere and
/// callers rebuild the view afterwards.
pub trait RecordStore {
    fn tables(&self, project: &str) -> Result<Vec<Table>, StoreError>;
    fn lineage_edges(&self, project: &str) -> Result<Vec<TableLineageEdge>, StoreError>;
    fn dashboards(&self, project: &str) -> Result<Vec<Dashboard>, StoreError>;
    fn dashboard_table_edges(&self, project: &str) -> Result<Vec<DashboardTableEdge>, StoreError>;

    /// Which optional columns exist. Checked once per load.
    fn columns_available(&self) -> ColumnsAvailable {
        ColumnsAvailable::default()
    }
}

impl Records {
    pub fn load<S: RecordStore + ?Sized>(store: &S, project: &str) -> Result<Self, StoreError> {
        let records = Records {
            tables: store.tables(project)?,
            lineage_edges: store.lineage_edges(project)?,
            dashboards: store.dashboards(project)?,
            dashboard_edges: store.dashboard_table_edges(project)?,
            columns: store.columns_available(),
        };
        debug!(
            project,
            tables = records.tables.len(),
            lineage_edges = records.lineage_edges.len(),
            dashboards = records.dashboards.len(),
            dashboard_edges = records.dashboard_edges.len(),
            "records loaded"
        );
        Ok(records)
    }
}

/// Store backed by plain collections, one [`Records`] per project.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    projects: HashMap<String, Records>,
    columns: ColumnsAvailable,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns(mut self, columns: ColumnsAvailable) -> Self {
        self.columns = columns;
        self
    }

    pub fn insert_project(&mut self, project: impl Into<String>, records: Records) {
        self.projects.insert(project.into(), records);
    }

    fn project(&self, project: &str) -> Result<&Records, StoreError> {
        self.projects
            .get(project)
            .ok_or_else(|| StoreError::UnknownProject(project.to_string()))
    }
}

impl RecordStore for InMemoryStore {
    fn tables(&self, project: &str) -> Result<Vec<Table>, StoreError> {
        Ok(self.project(project)?.tables.clone())
    }

    fn lineage_edges(&self, project: &str) -> Result<Vec<TableLineageEdge>, StoreError> {
        Ok(self.project(project)?.lineage_edges.clone())
    }

    fn dashboards(&self, project: &str) -> Result<Vec<Dashboard>, StoreError> {
        Ok(self.project(project)?.dashboards.clone())
    }

    fn dashboard_table_edges(&self, project: &str) -> Result<Vec<DashboardTableEdge>, StoreError> {
        Ok(self.project(project)?.dashboard_edges.clone())
    }

    fn columns_available(&self) -> ColumnsAvailable {
        self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_snapshots_project() {
        let mut store = InMemoryStore::new().with_columns(ColumnsAvailable {
            scheduled_query: false,
            table_type: true,
        });
        store.insert_project(
            "p1",
            Records {
                tables: vec![Table::new("a", "A", "sales", Layer::Raw)],
                dashboards: vec![Dashboard::new("d", "D")],
                dashboard_edges: vec![DashboardTableEdge::new("d", "a")],
                ..Default::default()
            },
        );

        let records = Records::load(&store, "p1").unwrap();
        assert_eq!(records.tables.len(), 1);
        assert_eq!(records.dashboard_edges.len(), 1);
        assert!(!records.columns.scheduled_query);
    }

    #[test]
    fn test_unknown_project_is_an_error() {
        let store = InMemoryStore::new();
        let err = Records::load(&store, "missing").unwrap_err();
        assert!(matches!(err, StoreError::UnknownProject(p) if p == "missing"));
    }
}
