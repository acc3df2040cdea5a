use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};

use dagre_rs::{DagreLayout, LayoutOptions, RankDir};
use itertools::Itertools;
use petgraph::Graph as PetGraph;
use tracing::{debug, warn};

use crate::grid::GroupedGrid;
use crate::types::*;

/// Lays out `nodes` left to right by rank.
///
/// `edges` are `(source, target)` indices into `nodes`. The layered algorithm
/// decides the vertical order inside each column; the column itself always
/// comes from [`LayoutNode::rank`]. Any failure falls back to [`GroupedGrid`],
/// so every input node receives a position.
pub fn layout<N: LayoutNode>(
    nodes: &[N],
    edges: &[(usize, usize)],
    config: &HierarchicalConfig,
) -> LayoutResult {
    config.layout(nodes, edges)
}

/// Maps ranks onto consecutive column indices, preserving rank order.
pub fn assign_columns(ranks: &[Rank]) -> Vec<usize> {
    let occupied: BTreeSet<Rank> = ranks.iter().copied().collect();
    ranks
        .iter()
        .map(|rank| occupied.range(..*rank).count())
        .collect()
}

struct Prepared {
    id: String,
    size: Option<Size>,
    column: usize,
}

impl HierarchicalConfig {
    pub fn layout<N: LayoutNode>(&self, nodes: &[N], edges: &[(usize, usize)]) -> LayoutResult {
        let columns = assign_columns(&nodes.iter().map(|n| n.rank()).collect_vec());
        let prepared: Vec<Prepared> = nodes
            .iter()
            .zip(columns)
            .map(|(n, column)| Prepared {
                id: n.id(),
                size: n.size(),
                column,
            })
            .collect();

        let (placed, strategy) = match self.ranked(&prepared, edges) {
            Ok(placed) => (placed, LayoutStrategy::Ranked),
            Err(err) => {
                warn!(%err, nodes = prepared.len(), "hierarchical layout fell back to grouped grid");
                (self.grouped(&prepared), LayoutStrategy::Fallback)
            }
        };

        let canvas_width = placed
            .iter()
            .map(|n| n.position.x + n.size.width)
            .fold(0.0, f64::max)
            + self.margin.max(0.0);
        let canvas_height = placed
            .iter()
            .map(|n| n.position.y + n.size.height)
            .fold(0.0, f64::max)
            + self.margin.max(0.0);

        debug!(nodes = placed.len(), ?strategy, canvas_width, canvas_height, "hierarchical layout done");

        LayoutResult {
            nodes: placed,
            strategy,
            canvas_width,
            canvas_height,
        }
    }

    fn grouped(&self, prepared: &[Prepared]) -> Vec<PlacedNode> {
        let ids = prepared.iter().map(|p| p.id.clone()).collect_vec();
        let sizes = prepared.iter().map(|p| p.size).collect_vec();
        let columns = prepared.iter().map(|p| p.column).collect_vec();
        GroupedGrid::new(&sizes, self).place(&ids, &sizes, &columns)
    }

    fn ranked(&self, prepared: &[Prepared], edges: &[(usize, usize)]) -> Result<Vec<PlacedNode>, LayoutError> {
        let n = prepared.len();
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut sizes = Vec::with_capacity(n);
        for p in prepared {
            match p.size {
                Some(size) if size.is_measurable() => sizes.push(size),
                _ => return Err(LayoutError::MissingDimensions(p.id.clone())),
            }
        }
        if let Some(&(s, t)) = edges.iter().find(|&&(s, t)| s >= n || t >= n) {
            return Err(LayoutError::InvalidNodeIndex(s.max(t)));
        }

        let avg_width = sizes.iter().map(|s| s.width).sum::<f64>() / n as f64;
        let avg_height = sizes.iter().map(|s| s.height).sum::<f64>() / n as f64;
        let rank_sep = (avg_width * self.rank_sep_factor).max(self.min_rank_sep);
        let node_sep = (avg_height * self.node_sep_factor).max(self.min_node_sep);

        // Build petgraph from the prepared nodes
        let mut pg: PetGraph<usize, ()> = PetGraph::new();
        let node_indices = (0..n).map(|i| pg.add_node(i)).collect_vec();
        for &(s, t) in edges {
            if s != t {
                pg.add_edge(node_indices[s], node_indices[t], ());
            }
        }

        // Dagre runs top to bottom and the result is transposed, so its
        // horizontal separation is our vertical one.
        let options = LayoutOptions {
            rank_dir: RankDir::TopToBottom,
            node_sep: (avg_height + node_sep) as f32,
            rank_sep: (avg_width + rank_sep) as f32,
            ..Default::default()
        };
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            DagreLayout::with_options(options).compute(&pg)
        }))
        .map_err(|_| LayoutError::LayoutFailed("layered algorithm panicked".to_string()))?;

        if result.node_positions.is_empty() {
            return Err(LayoutError::LayoutFailed("no positions returned".to_string()));
        }

        let mut cross = Vec::with_capacity(n);
        for (i, p) in prepared.iter().enumerate() {
            match result.node_positions.get(&node_indices[i]) {
                Some(&(x, _)) if x.is_finite() => cross.push(x as f64),
                _ => {
                    return Err(LayoutError::LayoutFailed(format!("no position for `{}`", p.id)));
                }
            }
        }

        let column_count = prepared.iter().map(|p| p.column).max().map_or(0, |c| c + 1);
        let mut column_width = vec![0.0f64; column_count];
        for (p, size) in prepared.iter().zip(&sizes) {
            column_width[p.column] = column_width[p.column].max(size.width);
        }
        let mut column_left = Vec::with_capacity(column_count);
        let mut left = self.margin;
        for width in &column_width {
            column_left.push(left);
            left += width + rank_sep;
        }

        let mut centers = vec![Position::default(); n];
        for column in 0..column_count {
            let members = (0..n)
                .filter(|&i| prepared[i].column == column)
                .sorted_by(|&a, &b| cross[a].total_cmp(&cross[b]).then(a.cmp(&b)))
                .collect_vec();

            let center_x = column_left[column] + column_width[column] / 2.0;
            let mut previous_bottom: Option<f64> = None;
            for i in members {
                let half = sizes[i].height / 2.0;
                let mut center_y = cross[i];
                if let Some(bottom) = previous_bottom {
                    center_y = center_y.max(bottom + node_sep + half);
                }
                previous_bottom = Some(center_y + half);
                centers[i] = Position::new(center_x, center_y);
            }
        }

        // Centers to top-left corners
        let mut placed = prepared
            .iter()
            .zip(&sizes)
            .zip(&centers)
            .map(|((p, size), center)| PlacedNode {
                id: p.id.clone(),
                position: Position::new(center.x - size.width / 2.0, center.y - size.height / 2.0),
                size: *size,
                column: p.column,
            })
            .collect_vec();

        let min_y = placed.iter().map(|p| p.position.y).fold(f64::INFINITY, f64::min);
        let offset_y = self.margin - min_y;
        for p in &mut placed {
            p.position.y += offset_y;
        }

        Ok(placed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestNode {
        id: &'static str,
        size: Option<Size>,
        rank: Rank,
    }

    impl LayoutNode for TestNode {
        fn id(&self) -> String {
            self.id.to_string()
        }
        fn size(&self) -> Option<Size> {
            self.size
        }
        fn rank(&self) -> Rank {
            self.rank
        }
    }

    fn node(id: &'static str, rank: Rank) -> TestNode {
        TestNode {
            id,
            size: Some(Size::new(140.0, 40.0)),
            rank,
        }
    }

    #[test]
    fn test_assign_columns_compacts_gaps() {
        let columns = assign_columns(&[Rank::Layer(3), Rank::Terminal, Rank::Layer(0), Rank::Layer(3)]);
        assert_eq!(columns, vec![1, 2, 0, 1]);
    }

    #[test]
    fn test_terminal_rank_is_rightmost() {
        let columns = assign_columns(&[Rank::Terminal, Rank::Layer(7), Rank::Layer(0)]);
        assert_eq!(columns, vec![2, 1, 0]);
    }

    #[test]
    fn test_missing_size_falls_back() {
        let nodes = vec![
            node("raw", Rank::Layer(0)),
            TestNode {
                id: "unmeasured",
                size: None,
                rank: Rank::Layer(1),
            },
        ];
        let result = layout(&nodes, &[(0, 1)], &HierarchicalConfig::default());

        assert_eq!(result.strategy, LayoutStrategy::Fallback);
        assert_eq!(result.nodes.len(), 2);
        assert_eq!(result.column_of("unmeasured"), Some(1));
    }

    #[test]
    fn test_bad_edge_index_falls_back() {
        let nodes = vec![node("a", Rank::Layer(0))];
        let result = layout(&nodes, &[(0, 5)], &HierarchicalConfig::default());
        assert_eq!(result.strategy, LayoutStrategy::Fallback);
        assert_eq!(result.nodes.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        let nodes: Vec<TestNode> = Vec::new();
        let result = layout(&nodes, &[], &HierarchicalConfig::default());
        assert!(result.nodes.is_empty());
    }

    #[test]
    fn test_columns_do_not_overlap_vertically() {
        let nodes = vec![
            node("a", Rank::Layer(0)),
            node("b", Rank::Layer(0)),
            node("c", Rank::Layer(0)),
            node("d", Rank::Layer(1)),
        ];
        let result = layout(&nodes, &[(0, 3), (1, 3), (2, 3)], &HierarchicalConfig::default());

        let mut column0 = result.nodes.iter().filter(|n| n.column == 0).collect_vec();
        column0.sort_by(|a, b| a.position.y.total_cmp(&b.position.y));
        for pair in column0.windows(2) {
            assert!(pair[0].position.y + pair[0].size.height <= pair[1].position.y);
        }
    }
}
