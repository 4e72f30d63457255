use serde::{Deserialize, Serialize};

/// Rectangular board of mole holes. Rows and columns are 1-based, indices 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub rows: u32,
    pub cols: u32,
}

/// A cell as it appears on the wire: `r<row>c<col> (#<index>)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
    pub index: usize,
}

impl Grid {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    pub fn cell_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// `None` when `(row, col)` lies outside `[1,rows]x[1,cols]`.
    pub fn to_index(&self, row: u32, col: u32) -> Option<usize> {
        if row == 0 || row > self.rows {
            return None;
        }
        to_index(row, col, self.cols)
    }

    /// `None` when `index` lies outside `[0, rows*cols)`.
    pub fn to_row_col(&self, index: usize) -> Option<(u32, u32)> {
        if index >= self.cell_count() {
            return None;
        }
        to_row_col(index, self.cols)
    }

    pub fn cell(&self, index: usize) -> Option<CellRef> {
        self.to_row_col(index)
            .map(|(row, col)| CellRef { row, col, index })
    }
}

/// Row-major index of a 1-based `(row, col)`. Only the column bound can be
/// checked without the row count; use `Grid::to_index` for the full check.
pub fn to_index(row: u32, col: u32, cols: u32) -> Option<usize> {
    if row == 0 || col == 0 || col > cols {
        return None;
    }
    Some((row as usize - 1) * cols as usize + (col as usize - 1))
}

pub fn to_row_col(index: usize, cols: u32) -> Option<(u32, u32)> {
    if cols == 0 {
        return None;
    }
    let cols = cols as usize;
    let row = u32::try_from(index / cols + 1).ok()?;
    let col = (index % cols + 1) as u32;
    Some((row, col))
}
