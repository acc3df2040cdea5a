use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Usable for layout: finite and strictly positive on both axes.
    pub fn is_measurable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("node `{0}` has no usable width/height")]
    MissingDimensions(String),

    #[error("edge references node index {0} outside the node list")]
    InvalidNodeIndex(usize),

    #[error("layered layout failed: {0}")]
    LayoutFailed(String),
}

/// Column a node belongs to in the hierarchical layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    /// Ordered processing stage, lower renders further left.
    Layer(usize),
    /// Always the rightmost column, regardless of any layer rank present.
    Terminal,
}

/// Trait for nodes fed to the hierarchical layout
pub trait LayoutNode {
    fn id(&self) -> String;
    /// Measured dimensions, `None` when the node has not been measured yet.
    fn size(&self) -> Option<Size>;
    fn rank(&self) -> Rank;
}

/// A node with its final top-left position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedNode {
    pub id: String,
    pub position: Position,
    pub size: Size,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutStrategy {
    /// Produced by the layered (dagre) algorithm.
    Ranked,
    /// Produced by the grouped grid after the layered algorithm failed.
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutResult {
    pub nodes: Vec<PlacedNode>,
    pub strategy: LayoutStrategy,
    pub canvas_width: f64,
    pub canvas_height: f64,
}

impl LayoutResult {
    pub fn position_of(&self, id: &str) -> Option<Position> {
        self.nodes.iter().find(|n| n.id == id).map(|n| n.position)
    }

    pub fn column_of(&self, id: &str) -> Option<usize> {
        self.nodes.iter().find(|n| n.id == id).map(|n| n.column)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchicalConfig {
    /// Gap between columns, as a fraction of the average node width.
    pub rank_sep_factor: f64,
    /// Gap between nodes in a column, as a fraction of the average node height.
    pub node_sep_factor: f64,
    pub min_rank_sep: f64,
    pub min_node_sep: f64,
    /// Top-left corner of the laid out content.
    pub margin: f64,
    /// Size substituted for unmeasured nodes by the fallback grid.
    pub fallback_size: Size,
    pub fallback_gap: f64,
}

impl Default for HierarchicalConfig {
    fn default() -> Self {
        Self {
            rank_sep_factor: 0.75,
            node_sep_factor: 0.6,
            min_rank_sep: 60.0,
            min_node_sep: 20.0,
            margin: 50.0,
            fallback_size: Size::new(160.0, 48.0),
            fallback_gap: 40.0,
        }
    }
}
