use crate::types::*;

/// Column-per-rank placement used when the layered algorithm cannot run.
///
/// Every cell has the same pitch, derived from the largest measured node, so
/// the result depends only on node order and column assignment.
pub struct GroupedGrid {
    pub origin_x: f64,
    pub origin_y: f64,
    pub column_pitch: f64,
    pub row_pitch: f64,
    pub default_size: Size,
}

impl GroupedGrid {
    pub fn new(sizes: &[Option<Size>], config: &HierarchicalConfig) -> Self {
        let default_size = if config.fallback_size.is_measurable() {
            config.fallback_size
        } else {
            Size::new(160.0, 48.0)
        };
        let measured = || sizes.iter().flatten().filter(|s| s.is_measurable());
        let max_width = measured()
            .map(|s| s.width)
            .fold(default_size.width, f64::max);
        let max_height = measured()
            .map(|s| s.height)
            .fold(default_size.height, f64::max);
        let gap = if config.fallback_gap.is_finite() {
            config.fallback_gap.max(0.0)
        } else {
            0.0
        };
        let margin = if config.margin.is_finite() {
            config.margin
        } else {
            0.0
        };

        GroupedGrid {
            origin_x: margin,
            origin_y: margin,
            column_pitch: max_width + gap,
            row_pitch: max_height + gap,
            default_size,
        }
    }

    pub fn cell_to_pos(&self, column: usize, row: usize) -> Position {
        Position {
            x: self.origin_x + column as f64 * self.column_pitch,
            y: self.origin_y + row as f64 * self.row_pitch,
        }
    }

    /// Stacks nodes top to bottom inside their column, keeping input order.
    pub fn place(&self, ids: &[String], sizes: &[Option<Size>], columns: &[usize]) -> Vec<PlacedNode> {
        let column_count = columns.iter().copied().max().map_or(0, |c| c + 1);
        let mut next_row = vec![0usize; column_count];

        ids.iter()
            .zip(sizes)
            .zip(columns)
            .map(|((id, size), &column)| {
                let row = next_row[column];
                next_row[column] += 1;
                PlacedNode {
                    id: id.clone(),
                    position: self.cell_to_pos(column, row),
                    size: size
                        .filter(|s| s.is_measurable())
                        .unwrap_or(self.default_size),
                    column,
                }
            })
            .collect()
    }
}
