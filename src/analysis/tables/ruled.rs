//! Ruled table detection from horizontal and vertical rules.
//!
//! Straight paths and hairline fills are classified as horizontal or
//! vertical segments, snapped into grid lines, and grouped into connected
//! grids through their intersections. Each grid with at least one fully
//! bordered slot becomes a table; slots separated by a missing interior
//! border merge into one spanning cell.

use crate::error::{Diagnostic, Error, Stage};
use crate::geometry::{cmp_f32, Rect};
use crate::model::{Cell, PaintKind, TableKind, VectorPath};

use super::super::options::TableConfig;
use super::super::union_find::UnionFind;
use super::TableSkeleton;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orientation {
    Horizontal,
    Vertical,
}

/// A rule along one axis: `pos` is the fixed coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GridLine {
    pub pos: f32,
    pub start: f32,
    pub end: f32,
}

impl GridLine {
    fn len(&self) -> f32 {
        self.end - self.start
    }
}

/// Detects tables drawn with rules.
pub struct RuledTableDetector<'a> {
    config: &'a TableConfig,
}

impl<'a> RuledTableDetector<'a> {
    /// Create a detector with the given configuration.
    pub fn new(config: &'a TableConfig) -> Self {
        Self { config }
    }

    /// Detect ruled table grids among the page's paths.
    pub fn detect(&self, paths: &[VectorPath], diagnostics: &mut Vec<Diagnostic>) -> Vec<TableSkeleton> {
        let mut horizontal = Vec::new();
        let mut vertical = Vec::new();
        for path in paths {
            match self.classify(path) {
                Some((Orientation::Horizontal, seg)) => horizontal.push(seg),
                Some((Orientation::Vertical, seg)) => vertical.push(seg),
                None => {}
            }
        }
        log::debug!(
            "RuledTableDetector: {} horizontal and {} vertical segments",
            horizontal.len(),
            vertical.len()
        );
        if horizontal.len() < 2 || vertical.len() < 2 {
            return Vec::new();
        }

        let hs = self.cap_lines(self.merge_segments(horizontal), "horizontal", diagnostics);
        let vs = self.cap_lines(self.merge_segments(vertical), "vertical", diagnostics);

        let mut tables: Vec<TableSkeleton> = self
            .connected_grids(&hs, &vs)
            .into_iter()
            .filter_map(|(h, v)| self.build_grid(&h, &v))
            .collect();
        tables.sort_by(|a, b| cmp_f32(a.bbox().y0, b.bbox().y0).then(cmp_f32(a.bbox().x0, b.bbox().x0)));

        log::debug!("RuledTableDetector: {} ruled tables", tables.len());
        tables
    }

    /// Classify a path as a horizontal or vertical rule segment.
    fn classify(&self, path: &VectorPath) -> Option<(Orientation, GridLine)> {
        let b = &path.bbox;
        let center = b.center();
        let candidate = if let Some(line) = path.line {
            let angle = line.angle_deg.rem_euclid(180.0);
            let tol = self.config.angle_tolerance_deg;
            if angle <= tol || angle >= 180.0 - tol {
                Some((Orientation::Horizontal, center.y, b.x0, b.x1))
            } else if (angle - 90.0).abs() <= tol {
                Some((Orientation::Vertical, center.x, b.y0, b.y1))
            } else {
                None
            }
        } else if matches!(path.paint, PaintKind::Fill | PaintKind::FillStroke) {
            let thickness = self.config.rule_thickness_px;
            if b.height() <= thickness && b.width() > b.height() {
                Some((Orientation::Horizontal, center.y, b.x0, b.x1))
            } else if b.width() <= thickness && b.height() > b.width() {
                Some((Orientation::Vertical, center.x, b.y0, b.y1))
            } else {
                None
            }
        } else {
            None
        };

        candidate
            .filter(|&(_, _, start, end)| end - start >= self.config.min_rule_length_px)
            .map(|(o, pos, start, end)| (o, GridLine { pos, start, end }))
    }

    /// Snap collinear segments together and join overlapping runs.
    fn merge_segments(&self, mut segments: Vec<GridLine>) -> Vec<GridLine> {
        segments.sort_by(|a, b| cmp_f32(a.pos, b.pos).then(cmp_f32(a.start, b.start)));

        let mut clusters: Vec<Vec<GridLine>> = Vec::new();
        for seg in segments {
            match clusters.last_mut() {
                Some(cluster) if seg.pos - cluster[0].pos <= self.config.snap_tolerance_px => cluster.push(seg),
                _ => clusters.push(vec![seg]),
            }
        }

        let mut lines = Vec::new();
        for mut cluster in clusters {
            let pos = cluster.iter().map(|s| s.pos).sum::<f32>() / cluster.len() as f32;
            cluster.sort_by(|a, b| cmp_f32(a.start, b.start));

            let mut current: Option<GridLine> = None;
            for seg in cluster {
                current = match current {
                    Some(mut line) if seg.start <= line.end + self.config.join_tolerance_px => {
                        line.end = line.end.max(seg.end);
                        Some(line)
                    }
                    Some(line) => {
                        lines.push(line);
                        Some(GridLine { pos, ..seg })
                    }
                    None => Some(GridLine { pos, ..seg }),
                };
            }
            if let Some(line) = current {
                lines.push(line);
            }
        }
        lines
    }

    /// Keep at most `max_grid_lines` lines, preferring the longest.
    fn cap_lines(&self, mut lines: Vec<GridLine>, label: &str, diagnostics: &mut Vec<Diagnostic>) -> Vec<GridLine> {
        let max = self.config.max_grid_lines;
        if lines.len() > max {
            diagnostics.push(Diagnostic::from_error(
                Stage::Tables,
                &Error::ResourceExhausted(format!(
                    "{} {} grid lines, keeping the {} longest",
                    lines.len(),
                    label,
                    max
                )),
            ));
            lines.sort_by(|a, b| cmp_f32(b.len(), a.len()).then(cmp_f32(a.pos, b.pos)));
            lines.truncate(max);
            lines.sort_by(|a, b| cmp_f32(a.pos, b.pos).then(cmp_f32(a.start, b.start)));
        }
        lines
    }

    fn crosses(&self, h: &GridLine, v: &GridLine) -> bool {
        let tol = self.config.snap_tolerance_px;
        v.pos >= h.start - tol && v.pos <= h.end + tol && h.pos >= v.start - tol && h.pos <= v.end + tol
    }

    /// Group lines into grids connected through intersections.
    fn connected_grids(&self, hs: &[GridLine], vs: &[GridLine]) -> Vec<(Vec<GridLine>, Vec<GridLine>)> {
        let nh = hs.len();
        let mut uf = UnionFind::new(nh + vs.len());
        for (i, h) in hs.iter().enumerate() {
            for (j, v) in vs.iter().enumerate() {
                if self.crosses(h, v) {
                    uf.union(i, nh + j);
                }
            }
        }

        uf.groups()
            .into_iter()
            .map(|group| {
                let h: Vec<GridLine> = group.iter().filter(|&&i| i < nh).map(|&i| hs[i]).collect();
                let v: Vec<GridLine> = group.iter().filter(|&&i| i >= nh).map(|&i| vs[i - nh]).collect();
                (h, v)
            })
            .filter(|(h, v)| h.len() >= 2 && v.len() >= 2)
            .collect()
    }

    /// Distinct line positions, ascending.
    fn edges(&self, lines: &[GridLine]) -> Vec<f32> {
        let mut positions: Vec<f32> = lines.iter().map(|l| l.pos).collect();
        positions.sort_by(|a, b| cmp_f32(*a, *b));
        let mut edges: Vec<f32> = Vec::new();
        for p in positions {
            match edges.last() {
                Some(&last) if p - last <= self.config.snap_tolerance_px => {}
                _ => edges.push(p),
            }
        }
        edges
    }

    /// Whether lines at `pos` cover the stretch `[a, b]`.
    fn covered(&self, lines: &[GridLine], pos: f32, a: f32, b: f32) -> bool {
        let tol = self.config.snap_tolerance_px;
        let mut runs: Vec<(f32, f32)> = lines
            .iter()
            .filter(|l| (l.pos - pos).abs() <= tol)
            .map(|l| (l.start, l.end))
            .collect();
        runs.sort_by(|x, y| cmp_f32(x.0, y.0));

        let mut cursor = a + tol;
        for (start, end) in runs {
            if start > cursor + self.config.join_tolerance_px {
                break;
            }
            cursor = cursor.max(end);
        }
        cursor >= b - tol
    }

    /// Turn one connected grid into a table skeleton.
    fn build_grid(&self, hs: &[GridLine], vs: &[GridLine]) -> Option<TableSkeleton> {
        let row_edges = self.edges(hs);
        let col_edges = self.edges(vs);
        if row_edges.len() < 2 || col_edges.len() < 2 {
            return None;
        }
        let rows = row_edges.len() - 1;
        let cols = col_edges.len() - 1;

        let top = |r: usize, c: usize| self.covered(hs, row_edges[r], col_edges[c], col_edges[c + 1]);
        let left = |r: usize, c: usize| self.covered(vs, col_edges[c], row_edges[r], row_edges[r + 1]);

        let enclosed = (0..rows)
            .flat_map(|r| (0..cols).map(move |c| (r, c)))
            .filter(|&(r, c)| top(r, c) && top(r + 1, c) && left(r, c) && left(r, c + 1))
            .count();
        if enclosed == 0 {
            log::debug!("RuledTableDetector: {}x{} grid has no enclosed cell", rows, cols);
            return None;
        }

        let mut uf = UnionFind::new(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                if c + 1 < cols && !left(r, c + 1) {
                    uf.union(r * cols + c, r * cols + c + 1);
                }
                if r + 1 < rows && !top(r + 1, c) {
                    uf.union(r * cols + c, (r + 1) * cols + c);
                }
            }
        }

        let slot_rect = |r0: usize, c0: usize, r1: usize, c1: usize| {
            Rect::new(col_edges[c0], row_edges[r0], col_edges[c1 + 1], row_edges[r1 + 1])
        };

        let mut cells = Vec::new();
        for group in uf.groups() {
            let r0 = group.iter().map(|s| s / cols).min().unwrap_or(0);
            let r1 = group.iter().map(|s| s / cols).max().unwrap_or(0);
            let c0 = group.iter().map(|s| s % cols).min().unwrap_or(0);
            let c1 = group.iter().map(|s| s % cols).max().unwrap_or(0);

            if group.len() == (r1 - r0 + 1) * (c1 - c0 + 1) {
                cells.push(Cell::new(r0, c0, slot_rect(r0, c0, r1, c1)).with_span(r1 - r0 + 1, c1 - c0 + 1));
            } else {
                // Non-rectangular merges fall back to single slots.
                for s in group {
                    let (r, c) = (s / cols, s % cols);
                    cells.push(Cell::new(r, c, slot_rect(r, c, r, c)));
                }
            }
        }

        Some(TableSkeleton {
            kind: TableKind::Ruled,
            rows,
            cols,
            cells,
        })
    }
}
