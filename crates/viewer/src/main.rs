//! lineage-viewer: lay out a KDL lineage model and print it as JSON.
//!
//! Usage:
//!   lineage-viewer <model.kdl> [--layout force|hierarchical] [--config <file.json>]
//!                  [--dataset D]... [--layer L]... [--type T]... [--search S]
//!                  [--scheduled-only] [--focus-table T | --focus-dashboard D | --dashboard D]
//!                  [--highlight NODE] [--ticks N] [--tick-ms MS]
//!
//! Examples:
//!   lineage-viewer crates/viewer/tests/model/warehouse.kdl
//!   lineage-viewer crates/viewer/tests/model/warehouse.kdl --layout force --focus-dashboard finance

mod kdl;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use graphview::{
    FilterSpec, GraphLink, GraphNode, GraphView, HighlightSet, InMemoryStore, Layer, NodeId, NodeSizing,
    Reachability, Records, TableType, build,
};
use lineage_layout::{ForceConfig, ForceController, FreezeState, HierarchicalConfig, LayoutStrategy};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "lineage-viewer")]
#[command(about = "Lay out a table/dashboard lineage model and print positioned nodes as JSON")]
#[command(version)]
struct Cli {
    /// Path to the .kdl lineage model
    model: PathBuf,

    #[arg(short, long, value_enum, default_value = "hierarchical")]
    layout: LayoutMode,

    /// JSON file with `force`, `hierarchical` and `sizing` sections
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only show tables from this dataset (repeatable)
    #[arg(long = "dataset")]
    datasets: Vec<String>,

    /// Only show tables in this layer (repeatable)
    #[arg(long = "layer")]
    layers: Vec<Layer>,

    /// Only show tables of this type (repeatable)
    #[arg(long = "type")]
    table_types: Vec<TableType>,

    /// Case-insensitive match on name, id or dataset
    #[arg(short, long)]
    search: Option<String>,

    #[arg(long)]
    scheduled_only: bool,

    /// Show a table with its full upstream and downstream lineage
    #[arg(long, conflicts_with_all = ["focus_dashboard", "dashboard"])]
    focus_table: Option<String>,

    /// Show a dashboard with every table it transitively depends on or feeds
    #[arg(long, conflicts_with = "dashboard")]
    focus_dashboard: Option<String>,

    /// Narrow the filtered tables to those feeding this dashboard
    #[arg(long)]
    dashboard: Option<String>,

    /// Node id to compute the highlight set for
    #[arg(long)]
    highlight: Option<String>,

    /// Force layout frames to simulate
    #[arg(long, default_value_t = 300)]
    ticks: u32,

    /// Simulated duration of one force frame
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
enum LayoutMode {
    Force,
    Hierarchical,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ViewerConfig {
    force: ForceConfig,
    hierarchical: HierarchicalConfig,
    sizing: NodeSizing,
}

impl ViewerConfig {
    fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }
}

impl Cli {
    fn filter(&self) -> FilterSpec {
        FilterSpec {
            datasets: self.datasets.clone(),
            layers: self.layers.clone(),
            table_types: self.table_types.clone(),
            scheduled_only: self.scheduled_only,
            search: self.search.clone().unwrap_or_default(),
            selected_dashboard_id: self.dashboard.clone(),
            focused_table_id: self.focus_table.clone(),
            focused_dashboard_id: self.focus_dashboard.clone(),
        }
    }

    fn project(&self) -> String {
        self.model
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string())
    }
}

#[derive(Debug, Serialize)]
struct PlacedOutput<'a> {
    #[serde(flatten)]
    node: &'a GraphNode,
    x: f64,
    y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    radius: Option<f64>,
}

#[derive(Debug, Serialize)]
struct Output<'a> {
    layout: LayoutMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    strategy: Option<LayoutStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<FreezeState>,
    nodes: Vec<PlacedOutput<'a>>,
    links: &'a [GraphLink],
    #[serde(skip_serializing_if = "Option::is_none")]
    highlight: Option<HighlightSet>,
}

fn hierarchical<'a>(view: &'a GraphView, config: &ViewerConfig) -> Output<'a> {
    let result = view.hierarchical_layout(&HashMap::new(), &config.hierarchical);
    let placed: HashMap<&str, _> = result.nodes.iter().map(|p| (p.id.as_str(), p)).collect();
    let nodes = view
        .nodes()
        .iter()
        .filter_map(|n| {
            let p = placed.get(n.id.as_str())?;
            Some(PlacedOutput {
                node: n,
                x: p.position.x,
                y: p.position.y,
                width: Some(p.size.width),
                height: Some(p.size.height),
                radius: None,
            })
        })
        .collect();
    info!(strategy = ?result.strategy, "hierarchical layout done");
    Output {
        layout: LayoutMode::Hierarchical,
        strategy: Some(result.strategy),
        state: None,
        nodes,
        links: view.links(),
        highlight: None,
    }
}

fn force<'a>(view: &'a GraphView, config: &ViewerConfig, ticks: u32, tick: Duration) -> Output<'a> {
    let mut controller = ForceController::new(config.force.clone());
    view.apply_to(&mut controller, &config.sizing);
    for _ in 0..ticks {
        controller.tick(tick);
    }

    let max = view.max_table_connections();
    let nodes = view
        .nodes()
        .iter()
        .filter_map(|n| {
            let p = controller.position(n.id.as_str())?;
            Some(PlacedOutput {
                node: n,
                x: p.x,
                y: p.y,
                width: None,
                height: None,
                radius: Some(config.sizing.radius(n, max)),
            })
        })
        .collect();
    info!(state = ?controller.state(), ticks, "force layout done");
    Output {
        layout: LayoutMode::Force,
        strategy: None,
        state: Some(controller.state()),
        nodes,
        links: view.links(),
        highlight: None,
    }
}

fn load_records(cli: &Cli) -> anyhow::Result<Records> {
    let content =
        fs::read_to_string(&cli.model).with_context(|| format!("reading model {}", cli.model.display()))?;
    let parsed = crate::kdl::parse_lineage_model(&content)
        .with_context(|| format!("parsing model {}", cli.model.display()))?;

    let project = cli.project();
    let mut store = InMemoryStore::new();
    store.insert_project(project.as_str(), parsed);
    Records::load(&store, &project).context("loading records")
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };

    let records = load_records(&cli)?;
    let view = build(&records, &cli.filter());
    info!(nodes = view.len(), links = view.links().len(), "graph view built");

    let mut output = match cli.layout {
        LayoutMode::Hierarchical => hierarchical(&view, &config),
        LayoutMode::Force => force(&view, &config, cli.ticks, Duration::from_millis(cli.tick_ms)),
    };
    if let Some(id) = &cli.highlight {
        let reach = Reachability::new(&records);
        output.highlight = Some(reach.highlight(&NodeId::from(id.as_str())));
    }

    let json = serde_json::to_string_pretty(&output).context("serializing layout")?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = include_str!("../tests/model/warehouse.kdl");

    fn records() -> Records {
        crate::kdl::parse_lineage_model(SAMPLE).unwrap()
    }

    #[test]
    fn test_cli_builds_filter() {
        let cli = Cli::try_parse_from([
            "lineage-viewer",
            "model.kdl",
            "--layer",
            "raw",
            "--layer",
            "Inter",
            "--type",
            "view",
            "--dataset",
            "staging",
            "--scheduled-only",
            "--dashboard",
            "finance",
        ])
        .unwrap();
        let filter = cli.filter();
        assert_eq!(filter.layers, vec![Layer::Raw, Layer::Inter]);
        assert_eq!(filter.table_types, vec![TableType::View]);
        assert!(filter.scheduled_only);
        assert_eq!(filter.selected_dashboard_id.as_deref(), Some("finance"));
        assert_eq!(cli.layout, LayoutMode::Hierarchical);
        assert_eq!(cli.project(), "model");
    }

    #[test]
    fn test_cli_rejects_two_focuses() {
        let parsed = Cli::try_parse_from([
            "lineage-viewer",
            "model.kdl",
            "--focus-table",
            "a",
            "--focus-dashboard",
            "b",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_config_sections_are_optional() {
        let config: ViewerConfig = serde_json::from_str(r#"{ "sizing": { "dashboard_radius": 30.0 } }"#).unwrap();
        assert_eq!(config.sizing.dashboard_radius, 30.0);
        assert_eq!(config.force.settle_duration_ms, 4000);
        assert_eq!(config.hierarchical.margin, 50.0);
    }

    #[test]
    fn test_hierarchical_output_places_every_node() {
        let records = records();
        let view = build(&records, &FilterSpec::default());
        let output = hierarchical(&view, &ViewerConfig::default());
        assert_eq!(output.nodes.len(), view.len());
        assert_eq!(output.strategy, Some(LayoutStrategy::Ranked));

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["layout"], "hierarchical");
        assert!(json["nodes"][0]["width"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_force_output_freezes() {
        let records = records();
        let view = build(&records, &FilterSpec::default().focus_dashboard("finance"));
        let config = ViewerConfig {
            force: ForceConfig {
                seed: Some(3),
                ..Default::default()
            },
            ..Default::default()
        };
        let output = force(&view, &config, 300, Duration::from_millis(16));
        assert_eq!(output.state, Some(FreezeState::Frozen));
        assert_eq!(output.nodes.len(), view.len());
        assert!(output.nodes.iter().all(|n| n.radius.is_some()));
    }
}
