//! Near-square grid planning for sprite sheets.
//!
//! The planner favours a grid whose width and height are as close as
//! possible over one that minimizes wasted cells. Unused cells stay
//! transparent.

use serde::{Deserialize, Serialize};

/// Grid shape and pixel geometry of one sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPlan {
    /// Number of cell columns.
    pub columns: u32,
    /// Number of cell rows.
    pub rows: u32,
    /// Square cell size in pixels.
    pub cell_size: u32,
    /// Gap in pixels between neighbouring cells.
    pub padding: u32,
}

impl GridPlan {
    /// Plans a grid for `count` sprites.
    ///
    /// Returns `None` for an empty group: nothing is packed and no sheet is
    /// produced.
    pub fn plan(count: usize, cell_size: u32, padding: u32) -> Option<Self> {
        let (columns, rows) = grid_shape(count)?;
        Some(Self {
            columns,
            rows,
            cell_size,
            padding,
        })
    }

    /// Number of cells in the grid.
    pub fn capacity(&self) -> u64 {
        u64::from(self.columns) * u64::from(self.rows)
    }

    /// Distance in pixels between the origins of neighbouring cells.
    pub fn stride(&self) -> u32 {
        self.cell_size + self.padding
    }

    /// Sheet width in pixels.
    pub fn sheet_width(&self) -> u32 {
        span(self.columns, self.cell_size, self.padding)
    }

    /// Sheet height in pixels.
    pub fn sheet_height(&self) -> u32 {
        span(self.rows, self.cell_size, self.padding)
    }

    /// Column and row of the cell holding the sprite at `index`.
    ///
    /// Cells are filled row-major.
    pub fn cell_position(&self, index: usize) -> (u32, u32) {
        let columns = self.columns as usize;
        ((index % columns) as u32, (index / columns) as u32)
    }

    /// Top-left pixel of the cell holding the sprite at `index`.
    pub fn cell_origin(&self, index: usize) -> (u32, u32) {
        let (column, row) = self.cell_position(index);
        (column * self.stride(), row * self.stride())
    }
}

fn span(cells: u32, cell_size: u32, padding: u32) -> u32 {
    cells * cell_size + cells.saturating_sub(1) * padding
}

/// Computes `(columns, rows)` for `count` sprites.
///
/// `columns = ceil(sqrt(count))`, `rows = ceil(count / columns)`. Returns
/// `None` when `count` is zero.
pub fn grid_shape(count: usize) -> Option<(u32, u32)> {
    if count == 0 {
        return None;
    }

    let n = count as u64;
    let columns = ceil_sqrt(n).max(1);
    let mut rows = n.div_ceil(columns);

    // Never under-capacity, even if the estimate above rounds badly.
    while columns * rows < n {
        rows += 1;
    }

    Some((columns as u32, rows as u32))
}

/// Exact integer `ceil(sqrt(n))`.
fn ceil_sqrt(n: u64) -> u64 {
    let mut root = (n as f64).sqrt() as u64;
    while root * root < n {
        root += 1;
    }
    while root > 0 && (root - 1) * (root - 1) >= n {
        root -= 1;
    }
    root
}
