//! Table types.

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// How a table was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// Grid of ruling lines
    Ruled,
    /// Aligned text without rules
    Borderless,
}

/// A table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Zero-based row of the top-left slot
    pub row: usize,
    /// Zero-based column of the top-left slot
    pub col: usize,
    /// Number of rows spanned
    pub row_span: usize,
    /// Number of columns spanned
    pub col_span: usize,
    /// Cell box in page pixels
    pub bbox: Rect,
    /// Indices of the spans assigned to the cell
    pub spans: Vec<usize>,
    /// Cell text
    pub text: String,
}

impl Cell {
    /// Create an empty single-slot cell.
    pub fn new(row: usize, col: usize, bbox: Rect) -> Self {
        Self {
            row,
            col,
            row_span: 1,
            col_span: 1,
            bbox,
            spans: Vec::new(),
            text: String::new(),
        }
    }

    /// Set row and column spans.
    pub fn with_span(mut self, row_span: usize, col_span: usize) -> Self {
        self.row_span = row_span.max(1);
        self.col_span = col_span.max(1);
        self
    }

    /// Check if the cell holds no text.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Check if this cell spans multiple rows or columns.
    pub fn is_merged(&self) -> bool {
        self.row_span > 1 || self.col_span > 1
    }

    /// Whether the cell covers the slot at `(row, col)`.
    pub fn covers(&self, row: usize, col: usize) -> bool {
        row >= self.row && row < self.row + self.row_span && col >= self.col && col < self.col + self.col_span
    }
}

/// A detected table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table box in page pixels
    pub bbox: Rect,
    /// Ruled or borderless
    pub kind: TableKind,
    /// Number of grid rows
    pub rows: usize,
    /// Number of grid columns
    pub cols: usize,
    /// Cells in row-major order of their top-left slot
    pub cells: Vec<Cell>,
    /// Index of the linked caption
    pub caption: Option<usize>,
}

impl Table {
    /// Create a table from its cells.
    pub fn new(kind: TableKind, rows: usize, cols: usize, mut cells: Vec<Cell>) -> Self {
        cells.sort_by_key(|c| (c.row, c.col));
        let bbox = Rect::enclosing(cells.iter().map(|c| &c.bbox)).unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0));
        Self {
            bbox,
            kind,
            rows,
            cols,
            cells,
            caption: None,
        }
    }

    /// Check if the table has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell covering the slot at `(row, col)`.
    pub fn cell_at(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.iter().find(|c| c.covers(row, col))
    }

    /// Cells whose top-left slot is in `row`.
    pub fn row_cells(&self, row: usize) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(move |c| c.row == row)
    }

    /// Check if any cell is merged.
    pub fn has_merged_cells(&self) -> bool {
        self.cells.iter().any(|c| c.is_merged())
    }

    /// Fraction of cells holding text.
    pub fn density(&self) -> f32 {
        if self.cells.is_empty() {
            return 0.0;
        }
        let filled = self.cells.iter().filter(|c| !c.is_empty()).count();
        filled as f32 / self.cells.len() as f32
    }

    /// Text grid with merged cells repeated over the slots they cover.
    pub fn to_grid(&self) -> Vec<Vec<String>> {
        (0..self.rows)
            .map(|r| {
                (0..self.cols)
                    .map(|c| self.cell_at(r, c).map(|cell| cell.text.clone()).unwrap_or_default())
                    .collect()
            })
            .collect()
    }

    /// Recompute the table box from its cells.
    pub fn refresh_bbox(&mut self) {
        if let Some(bbox) = Rect::enclosing(self.cells.iter().map(|c| &c.bbox)) {
            self.bbox = bbox;
        }
    }
}
