//! Assignment of text spans to table cells.

use std::collections::BTreeMap;

use crate::geometry::{cmp_f32, Rect};
use crate::model::{Cell, Table, TextSpan};

use super::super::text_blocks::join_span_text;
use super::TableSkeleton;

/// Share of a span's width that must fall in a neighbouring cell to widen its cell.
const WIDE_SPAN_OVERLAP: f32 = 0.25;

/// Fill a table skeleton with the candidate spans whose center lies inside it.
///
/// Every such span ends up in exactly one cell. Spans crossing cell borders
/// within a row widen their cell into a column span; spans outside every
/// cell join the nearest one, which grows to include them.
pub(crate) fn materialize(skeleton: TableSkeleton, spans: &[TextSpan], candidates: &[usize], scale: f32) -> Table {
    let bbox = skeleton.bbox();
    let members: Vec<usize> = candidates
        .iter()
        .copied()
        .filter(|&i| bbox.contains_point(&spans[i].bbox.center()))
        .collect();

    let TableSkeleton { kind, rows, cols, mut cells } = skeleton;
    cells.sort_by_key(|c| (c.row, c.col));
    merge_wide_spans(&mut cells, spans, &members);

    for &i in &members {
        let span = &spans[i];
        let center = span.bbox.center();
        let target = cells
            .iter()
            .position(|c| c.bbox.contains_point(&center))
            .or_else(|| nearest_cell(&cells, &span.bbox));
        if let Some(t) = target {
            let cell = &mut cells[t];
            if !cell.bbox.contains_point(&center) {
                cell.bbox = cell.bbox.union(&span.bbox);
            }
            cell.spans.push(i);
        }
    }

    for cell in &mut cells {
        cell.spans.sort_unstable();
        cell.text = cell_text(spans, &cell.spans, scale);
    }

    Table::new(kind, rows, cols, cells)
}

/// Index of the cell closest to `bbox`.
fn nearest_cell(cells: &[Cell], bbox: &Rect) -> Option<usize> {
    let center = bbox.center();
    cells
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let dx = (c.bbox.x0 - center.x).max(center.x - c.bbox.x1).max(0.0);
            let dy = (c.bbox.y0 - center.y).max(center.y - c.bbox.y1).max(0.0);
            (i, dx * dx + dy * dy)
        })
        .min_by(|a, b| cmp_f32(a.1, b.1).then(a.0.cmp(&b.0)))
        .map(|(i, _)| i)
}

/// Merge cells of a row that a single span reaches across.
fn merge_wide_spans(cells: &mut Vec<Cell>, spans: &[TextSpan], members: &[usize]) {
    let mut ranges: BTreeMap<usize, Vec<(usize, usize)>> = BTreeMap::new();

    for &i in members {
        let bbox = &spans[i].bbox;
        let center = bbox.center();
        let home = match cells.iter().find(|c| c.bbox.contains_point(&center)) {
            Some(c) if c.row_span == 1 => c,
            _ => continue,
        };
        let reach = bbox.width() * WIDE_SPAN_OVERLAP;
        let mut lo = home.col;
        let mut hi = home.col + home.col_span - 1;
        for other in cells.iter().filter(|c| c.row == home.row && c.row_span == 1) {
            if bbox.horizontal_overlap(&other.bbox) > reach && bbox.y_interval().overlap(&other.bbox.y_interval()) > 0.0 {
                lo = lo.min(other.col);
                hi = hi.max(other.col + other.col_span - 1);
            }
        }
        if hi > lo {
            ranges.entry(home.row).or_default().push((lo, hi));
        }
    }

    for (row, mut row_ranges) in ranges {
        row_ranges.sort_unstable();
        let mut merged: Vec<(usize, usize)> = Vec::new();
        for (lo, hi) in row_ranges {
            match merged.last_mut() {
                Some(last) if lo <= last.1 => last.1 = last.1.max(hi),
                _ => merged.push((lo, hi)),
            }
        }

        for (lo, hi) in merged {
            let in_range = |c: &Cell| c.row == row && c.col >= lo && c.col + c.col_span - 1 <= hi;
            // Cells spanning rows cannot be widened without breaking the grid.
            let blocked = cells.iter().any(|c| {
                c.row_span > 1
                    && row >= c.row
                    && row < c.row + c.row_span
                    && c.col + c.col_span > lo
                    && c.col <= hi
            });
            if blocked {
                continue;
            }
            let parts: Vec<Cell> = cells.iter().filter(|c| in_range(c)).cloned().collect();
            let bbox = match Rect::enclosing(parts.iter().map(|c| &c.bbox)) {
                Some(b) => b,
                None => continue,
            };
            log::debug!("TableDetector: merging row {} columns {}-{}", row, lo, hi);
            cells.retain(|c| !in_range(c));
            cells.push(Cell::new(row, lo, bbox).with_span(1, hi - lo + 1));
        }
    }
    cells.sort_by_key(|c| (c.row, c.col));
}

/// Cell text: spans grouped into lines top to bottom, joined with spaces.
fn cell_text(spans: &[TextSpan], indices: &[usize], scale: f32) -> String {
    let mut order = indices.to_vec();
    order.sort_by(|&a, &b| {
        cmp_f32(spans[a].baseline(), spans[b].baseline())
            .then(cmp_f32(spans[a].bbox.x0, spans[b].bbox.x0))
            .then(a.cmp(&b))
    });

    let mut lines: Vec<Vec<&TextSpan>> = Vec::new();
    let mut current_baseline = f32::NEG_INFINITY;
    for i in order {
        let span = &spans[i];
        let tolerance = span.font_size * scale * 0.5;
        match lines.last_mut() {
            Some(line) if (span.baseline() - current_baseline).abs() <= tolerance => line.push(span),
            _ => {
                current_baseline = span.baseline();
                lines.push(vec![span]);
            }
        }
    }

    lines
        .into_iter()
        .map(|mut line| {
            line.sort_by(|a, b| cmp_f32(a.bbox.x0, b.bbox.x0));
            join_span_text(&line).trim().to_string()
        })
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TableKind;

    fn skeleton() -> TableSkeleton {
        let mut cells = Vec::new();
        for r in 0..2 {
            for c in 0..2 {
                let x = 100.0 + c as f32 * 100.0;
                let y = 100.0 + r as f32 * 20.0;
                cells.push(Cell::new(r, c, Rect::new(x, y, x + 100.0, y + 20.0)));
            }
        }
        TableSkeleton {
            kind: TableKind::Ruled,
            rows: 2,
            cols: 2,
            cells,
        }
    }

    fn span(text: &str, x0: f32, x1: f32, y: f32) -> TextSpan {
        TextSpan::new(text, Rect::new(x0, y, x1, y + 10.0), 10.0, "Helvetica")
    }

    #[test]
    fn test_spans_assigned_by_center() {
        let spans = vec![
            span("a", 110.0, 130.0, 105.0),
            span("b", 210.0, 230.0, 105.0),
            span("c", 110.0, 130.0, 125.0),
            span("outside", 500.0, 560.0, 105.0),
        ];
        let table = materialize(skeleton(), &spans, &[0, 1, 2, 3], 1.0);

        assert_eq!(table.cell_at(0, 0).map(|c| c.text.as_str()), Some("a"));
        assert_eq!(table.cell_at(0, 1).map(|c| c.text.as_str()), Some("b"));
        assert_eq!(table.cell_at(1, 0).map(|c| c.text.as_str()), Some("c"));
        assert!(table.cell_at(1, 1).map(|c| c.is_empty()).unwrap_or(false));
        assert!(table.cells.iter().all(|c| !c.spans.contains(&3)));
    }

    #[test]
    fn test_wide_span_merges_columns() {
        let spans = vec![span("A heading across both", 120.0, 280.0, 105.0)];
        let table = materialize(skeleton(), &spans, &[0], 1.0);

        let header = table.cell_at(0, 1).unwrap();
        assert_eq!((header.col, header.col_span), (0, 2));
        assert_eq!(header.spans, vec![0]);
        assert_eq!(table.cells.len(), 3);
        assert!(table.cells.iter().all(|c| table.bbox.contains(&c.bbox)));
    }

    #[test]
    fn test_multi_line_cell_text() {
        let spans = vec![
            span("second", 110.0, 150.0, 110.0),
            span("first", 110.0, 150.0, 100.5),
        ];
        let table = materialize(skeleton(), &spans, &[0, 1], 1.0);
        assert_eq!(table.cell_at(0, 0).map(|c| c.text.as_str()), Some("first second"));
    }
}
