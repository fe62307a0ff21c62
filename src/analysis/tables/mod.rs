//! Table detection.
//!
//! Two detectors run per page. Ruled tables come from grids of rules
//! among the vector paths; borderless tables come from text alignment in
//! each column, over the spans no ruled table claimed. Both produce a cell
//! skeleton that is then filled with spans.

mod borderless;
mod cells;
mod ruled;

pub use borderless::BorderlessTableDetector;
pub use ruled::RuledTableDetector;

use crate::error::Diagnostic;
use crate::geometry::{cmp_f32, Rect};
use crate::model::{Cell, Table, TableKind, TextSpan, VectorPath};

use super::columns::{ColumnLayout, SpanPlacement};
use super::options::TableConfig;

/// Grid of empty cells produced by a detector.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSkeleton {
    /// Detector that produced the grid
    pub kind: TableKind,
    /// Number of grid rows
    pub rows: usize,
    /// Number of grid columns
    pub cols: usize,
    /// Cells tiling the grid
    pub cells: Vec<Cell>,
}

impl TableSkeleton {
    /// Bounding box of all cells.
    pub fn bbox(&self) -> Rect {
        Rect::enclosing(self.cells.iter().map(|c| &c.bbox)).unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0))
    }
}

/// Detects ruled and borderless tables on a page.
pub struct TableDetector<'a> {
    config: &'a TableConfig,
    scale: f32,
}

impl<'a> TableDetector<'a> {
    /// Create a detector for a page rendered at `scale` pixels per point.
    pub fn new(config: &'a TableConfig, scale: f32) -> Self {
        Self { config, scale }
    }

    /// Detect the tables of one page; ruled tables come first.
    pub fn detect(
        &self,
        spans: &[TextSpan],
        paths: &[VectorPath],
        layout: &ColumnLayout,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<Table> {
        let all: Vec<usize> = (0..spans.len()).collect();
        let mut tables: Vec<Table> = RuledTableDetector::new(self.config)
            .detect(paths, diagnostics)
            .into_iter()
            .map(|skeleton| cells::materialize(skeleton, spans, &all, self.scale))
            .collect();

        if !self.config.detect_borderless {
            return tables;
        }

        let mut claimed = claimed_spans(&tables, spans.len());
        let mut groups: Vec<Vec<usize>> = vec![Vec::new(); layout.columns.len() + 1];
        for (i, placement) in layout.placements.iter().enumerate() {
            if claimed[i] {
                continue;
            }
            match *placement {
                SpanPlacement::Column(c) if c < layout.columns.len() => groups[c].push(i),
                _ => groups[layout.columns.len()].push(i),
            }
        }

        let detector = BorderlessTableDetector::new(self.config, self.scale);
        let mut borderless: Vec<Table> = Vec::new();
        for group in &groups {
            for (skeleton, members) in detector.detect(spans, group) {
                let members: Vec<usize> = members.into_iter().filter(|&i| !claimed[i]).collect();
                let table = cells::materialize(skeleton, spans, &members, self.scale);

                if table.density() < self.config.min_density {
                    log::debug!(
                        "TableDetector: dropping sparse borderless table ({:.2} < {:.2})",
                        table.density(),
                        self.config.min_density
                    );
                    continue;
                }
                let overlaps_ruled = tables
                    .iter()
                    .any(|r| r.bbox.iou(&table.bbox) > self.config.ruled_overlap_iou);
                if overlaps_ruled {
                    log::debug!("TableDetector: borderless table overlaps a ruled table");
                    continue;
                }

                for cell in &table.cells {
                    for &s in &cell.spans {
                        claimed[s] = true;
                    }
                }
                borderless.push(table);
            }
        }

        borderless.sort_by(|a, b| cmp_f32(a.bbox.y0, b.bbox.y0).then(cmp_f32(a.bbox.x0, b.bbox.x0)));
        log::debug!(
            "TableDetector: {} ruled, {} borderless tables",
            tables.len(),
            borderless.len()
        );
        tables.extend(borderless);
        tables
    }
}

/// Mark every span that belongs to a table cell.
pub fn claimed_spans(tables: &[Table], span_count: usize) -> Vec<bool> {
    let mut claimed = vec![false; span_count];
    for table in tables {
        for cell in &table.cells {
            for &s in &cell.spans {
                if let Some(slot) = claimed.get_mut(s) {
                    *slot = true;
                }
            }
        }
    }
    claimed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Column;

    fn span(text: &str, x: f32, y: f32) -> TextSpan {
        TextSpan::new(text, Rect::new(x, y, x + 30.0, y + 10.0), 10.0, "Helvetica")
    }

    fn one_column(n: usize) -> ColumnLayout {
        ColumnLayout {
            columns: vec![Column::new(0, 0.0, 612.0)],
            placements: vec![SpanPlacement::Column(0); n],
        }
    }

    #[test]
    fn test_ruled_table_claims_spans() {
        let mut paths = Vec::new();
        for y in [100.0, 120.0, 140.0] {
            paths.push(VectorPath::line(50.0, y, 250.0, y));
        }
        for x in [50.0, 150.0, 250.0] {
            paths.push(VectorPath::line(x, 100.0, x, 140.0));
        }
        let spans = vec![
            span("a", 60.0, 105.0),
            span("b", 160.0, 105.0),
            span("c", 60.0, 125.0),
            span("d", 160.0, 125.0),
        ];
        let config = TableConfig::default();
        let mut diags = Vec::new();
        let tables = TableDetector::new(&config, 1.0).detect(&spans, &paths, &one_column(4), &mut diags);

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].kind, TableKind::Ruled);
        assert_eq!(tables[0].to_grid(), vec![vec!["a", "b"], vec!["c", "d"]]);
        assert!(claimed_spans(&tables, 4).iter().all(|&c| c));
    }

    #[test]
    fn test_min_density_filters_tables() {
        let mut spans = Vec::new();
        for r in 0..5 {
            let y = 100.0 + r as f32 * 16.0;
            spans.push(span("k", 72.0, y));
            spans.push(span("v", 172.0, y));
        }
        let config = TableConfig {
            min_density: 1.1,
            ..Default::default()
        };
        let mut diags = Vec::new();
        let tables = TableDetector::new(&config, 1.0).detect(&spans, &[], &one_column(spans.len()), &mut diags);
        assert!(tables.is_empty());
    }

    #[test]
    fn test_borderless_table_detected() {
        let mut spans = Vec::new();
        for r in 0..4 {
            let y = 100.0 + r as f32 * 16.0;
            spans.push(span("key", 72.0, y));
            spans.push(span("val", 172.0, y));
            spans.push(span("more", 272.0, y));
        }
        let config = TableConfig::default();
        let mut diags = Vec::new();
        let tables = TableDetector::new(&config, 1.0).detect(&spans, &[], &one_column(spans.len()), &mut diags);

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].kind, TableKind::Borderless);
        assert_eq!((tables[0].rows, tables[0].cols), (4, 3));
        assert_eq!(tables[0].density(), 1.0);
    }
}
