use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::*;

use crate::{consts::BORDER_MERGE_EPS, table::cell::Cell};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// Fraction of the smallest cell width (height) under which two vertical
    /// (horizontal) borders are considered the same border.
    pub border_merge_eps: f64,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            border_merge_eps: BORDER_MERGE_EPS,
        }
    }
}

/// Turns a ragged list of detected cell rows into a rectangular matrix.
///
/// ```text
/// (0, 0)
///  ------------------------------------------> x
///  |  ______________________________       _______________________________
///  |  |              |      B      |       |  A   :   A   |      B      |
///  |  |      A       |_____________|       |______:_______|_____________|
///  |  |              |      C      |  ->   |  A   :   A   |      C      |
///  |  |______________|_____________|       |______:_______|_____________|
///  |  |  D   |   E   |      F      |       |  D   |   E   |      F      |
///  |  |______|_______|_____________|       |______|_______|_____________|
///  V  y
/// ```
///
/// Every cell of the output sits on the finest grid built from all distinct
/// borders. A logical cell is kept once, at its top-left slot, with
/// `colspan`/`rowspan` set; the other slots it covers hold copies marked
/// `invisible`.
#[derive(Debug, Clone, Default)]
pub struct CellSplitter {
    config: SplitterConfig,
}

impl CellSplitter {
    pub fn new(config: SplitterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Splits merged cells so that the table becomes rectangular.
    ///
    /// Overlapping claims on the same grid slot are resolved row-major,
    /// first claim wins: a cell whose rectangle is entirely free gets an
    /// anchor with spans; a cell overlapping earlier cells keeps only the free
    /// slots, each as a visible 1x1 cell. Slots nobody claims are filled with
    /// empty cells.
    pub fn split(&self, cells: &[Vec<Cell>]) -> Vec<Vec<Cell>> {
        if cells.iter().all(|row| row.is_empty()) {
            return vec![vec![]];
        }

        let merged = self.merge_close_borders(cells);
        let (horizontal, vertical) = get_borders(&merged);
        let horizontal = sort_unique(horizontal);
        let vertical = sort_unique(vertical);

        if horizontal.len() < 2 || vertical.len() < 2 {
            return vec![vec![]];
        }

        let row_num = horizontal.len() - 1;
        let column_num = vertical.len() - 1;
        debug!(
            "Splitting {} cells into {}x{} grid",
            merged.iter().map(Vec::len).sum::<usize>(),
            row_num,
            column_num
        );

        let mut matrix: Vec<Vec<Option<Cell>>> = vec![vec![None; column_num]; row_num];

        for cell in merged.iter().flatten() {
            split_one_cell(cell, &horizontal, &vertical, &mut matrix);
        }

        matrix
            .into_iter()
            .enumerate()
            .map(|(row_id, row)| {
                row.into_iter()
                    .enumerate()
                    .map(|(column_id, slot)| {
                        slot.unwrap_or_else(|| {
                            Cell::empty(
                                vertical[column_id],
                                vertical[column_id + 1],
                                horizontal[row_id],
                                horizontal[row_id + 1],
                            )
                        })
                    })
                    .collect()
            })
            .collect()
    }

    /// Snaps borders that are closer than the configured tolerance onto one coordinate.
    ///
    /// Borders are clustered in ascending order; each cluster takes the value
    /// of its smallest member, and a border joins the current cluster while it
    /// stays within the tolerance of that first member. Cells that collapse to
    /// zero width or height are dropped.
    pub fn merge_close_borders(&self, cells: &[Vec<Cell>]) -> Vec<Vec<Cell>> {
        let (horizontal, vertical) = get_borders(cells);

        let all_cells = cells.iter().flatten();
        let min_width = all_cells.clone().map(Cell::width).min().unwrap_or(0);
        let min_height = all_cells.map(Cell::height).min().unwrap_or(0);

        let eps_vertical = self.config.border_merge_eps * min_width as f64;
        let eps_horizontal = self.config.border_merge_eps * min_height as f64;

        let horizontal_dict = border_dict(horizontal, eps_horizontal);
        let vertical_dict = border_dict(vertical, eps_vertical);
        let snap = |dict: &HashMap<i64, i64>, border: i64| *dict.get(&border).unwrap_or(&border);

        cells
            .iter()
            .map(|row| {
                row.iter()
                    .filter_map(|cell| {
                        let x_top_left = snap(&vertical_dict, cell.x_top_left);
                        let x_bottom_right = snap(&vertical_dict, cell.x_bottom_right);
                        let y_top_left = snap(&horizontal_dict, cell.y_top_left);
                        let y_bottom_right = snap(&horizontal_dict, cell.y_bottom_right);

                        if x_top_left < x_bottom_right && y_top_left < y_bottom_right {
                            Some(cell.resized(x_top_left, x_bottom_right, y_top_left, y_bottom_right))
                        } else {
                            debug!("Drop cell {} collapsed by border merging", cell.uid);
                            None
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

fn split_one_cell(
    cell: &Cell,
    horizontal: &[i64],
    vertical: &[i64],
    matrix: &mut [Vec<Option<Cell>>],
) {
    let left_id = vertical.partition_point(|&b| b < cell.x_top_left);
    let right_id = vertical.partition_point(|&b| b < cell.x_bottom_right);
    let top_id = horizontal.partition_point(|&b| b < cell.y_top_left);
    let bottom_id = horizontal.partition_point(|&b| b < cell.y_bottom_right);

    let slot = |row_id: usize, column_id: usize| {
        cell.resized(
            vertical[column_id],
            vertical[column_id + 1],
            horizontal[row_id],
            horizontal[row_id + 1],
        )
    };

    let is_free = (top_id..bottom_id)
        .all(|row_id| (left_id..right_id).all(|column_id| matrix[row_id][column_id].is_none()));

    if is_free {
        for row_id in top_id..bottom_id {
            for column_id in left_id..right_id {
                let mut new_cell = slot(row_id, column_id);
                new_cell.invisible = true;
                matrix[row_id][column_id] = Some(new_cell);
            }
        }

        if let Some(anchor) = matrix[top_id][left_id].as_mut() {
            anchor.colspan = right_id - left_id;
            anchor.rowspan = bottom_id - top_id;
            anchor.invisible = false;
        }
        return;
    }

    let mut claimed = 0usize;
    for row_id in top_id..bottom_id {
        for column_id in left_id..right_id {
            if matrix[row_id][column_id].is_none() {
                matrix[row_id][column_id] = Some(slot(row_id, column_id));
                claimed += 1;
            }
        }
    }
    debug!(
        "Cell {} overlaps earlier cells, kept {} free slots",
        cell.uid, claimed
    );
}

fn get_borders(cells: &[Vec<Cell>]) -> (Vec<i64>, Vec<i64>) {
    let mut horizontal = Vec::new();
    let mut vertical = Vec::new();
    for cell in cells.iter().flatten() {
        horizontal.push(cell.y_top_left);
        horizontal.push(cell.y_bottom_right);
        vertical.push(cell.x_top_left);
        vertical.push(cell.x_bottom_right);
    }
    (horizontal, vertical)
}

fn sort_unique(mut borders: Vec<i64>) -> Vec<i64> {
    borders.sort_unstable();
    borders.dedup();
    borders
}

fn border_dict(mut borders: Vec<i64>, threshold: f64) -> HashMap<i64, i64> {
    borders.sort_unstable();

    let mut result = HashMap::with_capacity(borders.len());
    let mut current: Option<i64> = None;
    for border in borders {
        let head = match current {
            Some(head) if ((border - head) as f64) <= threshold => head,
            _ => border,
        };
        current = Some(head);
        result.insert(border, head);
    }
    result
}
