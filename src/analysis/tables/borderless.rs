//! Borderless table detection using text alignment (Stream mode algorithm).
//!
//! Inspired by Camelot's Stream mode: spans are grouped into rows, left
//! edges that recur across rows become column anchors, and contiguous runs
//! of well-aligned, evenly spaced rows become table regions.

use std::collections::{BTreeMap, BTreeSet};

use crate::geometry::{cmp_f32, median, Rect};
use crate::model::{Cell, TableKind, TextSpan};

use super::super::options::TableConfig;
use super::TableSkeleton;

/// A row of spans sharing a baseline band.
#[derive(Debug, Clone)]
struct RowData {
    baseline: f32,
    top: f32,
    bottom: f32,
    /// Span indices sorted by x
    spans: Vec<usize>,
}

/// Detects tables from text alignment alone.
pub struct BorderlessTableDetector<'a> {
    config: &'a TableConfig,
    scale: f32,
}

impl<'a> BorderlessTableDetector<'a> {
    /// Create a detector for a page rendered at `scale` pixels per point.
    pub fn new(config: &'a TableConfig, scale: f32) -> Self {
        Self { config, scale }
    }

    /// Detect table regions among the given spans.
    ///
    /// Returns each table skeleton together with the spans of its rows.
    pub fn detect(&self, spans: &[TextSpan], indices: &[usize]) -> Vec<(TableSkeleton, Vec<usize>)> {
        let min_spans = self.config.min_rows * self.config.min_columns;
        if indices.len() < min_spans {
            log::debug!(
                "BorderlessTableDetector: not enough spans ({} < {})",
                indices.len(),
                min_spans
            );
            return Vec::new();
        }

        let rows = self.group_into_rows(spans, indices);
        if rows.len() < self.config.min_rows {
            return Vec::new();
        }

        let anchors = self.detect_columns(spans, &rows);
        log::debug!(
            "BorderlessTableDetector: {} rows, column anchors {:?}",
            rows.len(),
            anchors
        );
        if anchors.len() < self.config.min_columns {
            return Vec::new();
        }

        let mut tables = Vec::new();
        for (start, end) in self.find_table_regions(spans, &rows, &anchors) {
            let region = &rows[start..=end];

            // Re-detect columns for this specific table region
            let columns = self.detect_columns(spans, region);
            if columns.len() < self.config.min_columns {
                continue;
            }
            if columns.len() > self.config.max_columns {
                log::debug!(
                    "BorderlessTableDetector: skipping region, too many columns ({} > {})",
                    columns.len(),
                    self.config.max_columns
                );
                continue;
            }
            if self.is_list_pattern(spans, region, &columns) {
                log::debug!("BorderlessTableDetector: skipping region, detected as list pattern");
                continue;
            }
            if let Some(skeleton) = self.build_skeleton(spans, region, &columns) {
                let members = region.iter().flat_map(|r| r.spans.iter().copied()).collect();
                tables.push((skeleton, members));
            }
        }
        tables
    }

    /// Group spans into rows by baseline.
    fn group_into_rows(&self, spans: &[TextSpan], indices: &[usize]) -> Vec<RowData> {
        let mut order = indices.to_vec();
        order.sort_by(|&a, &b| {
            cmp_f32(spans[a].baseline(), spans[b].baseline())
                .then(cmp_f32(spans[a].bbox.x0, spans[b].bbox.x0))
                .then(a.cmp(&b))
        });

        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut current_y: Option<f32> = None;
        for i in order {
            let y = spans[i].baseline();
            let tolerance = spans[i].font_size * self.scale * self.config.y_tolerance_factor;
            match (current_y, groups.last_mut()) {
                (Some(cy), Some(group)) if (y - cy).abs() <= tolerance => group.push(i),
                _ => {
                    current_y = Some(y);
                    groups.push(vec![i]);
                }
            }
        }

        groups
            .into_iter()
            .map(|mut members| {
                members.sort_by(|&a, &b| cmp_f32(spans[a].bbox.x0, spans[b].bbox.x0).then(a.cmp(&b)));
                let baseline = members.iter().map(|&i| spans[i].baseline()).sum::<f32>() / members.len() as f32;
                let top = members.iter().map(|&i| spans[i].bbox.y0).fold(f32::INFINITY, f32::min);
                let bottom = members.iter().map(|&i| spans[i].bbox.y1).fold(f32::NEG_INFINITY, f32::max);
                RowData {
                    baseline,
                    top,
                    bottom,
                    spans: members,
                }
            })
            .collect()
    }

    /// Detect column anchors from left edges recurring across multi-span rows.
    fn detect_columns(&self, spans: &[TextSpan], rows: &[RowData]) -> Vec<f32> {
        let multi_span_rows: Vec<&RowData> = rows.iter().filter(|r| r.spans.len() >= 2).collect();
        if multi_span_rows.len() < self.config.min_rows {
            return Vec::new();
        }

        let bucket_size = self.config.alignment_bucket_px;
        let mut edge_counts: BTreeMap<i32, usize> = BTreeMap::new();
        for row in &multi_span_rows {
            // Count each bucket only once per row
            let buckets: BTreeSet<i32> = row
                .spans
                .iter()
                .map(|&i| (spans[i].bbox.x0 / bucket_size).round() as i32)
                .collect();
            for bucket in buckets {
                *edge_counts.entry(bucket).or_insert(0) += 1;
            }
        }

        let min_occurrences =
            ((multi_span_rows.len() as f32 * self.config.min_alignment_ratio) as usize).max(2);

        let mut merged_edges: Vec<f32> = Vec::new();
        for (bucket, count) in edge_counts {
            if count < min_occurrences {
                continue;
            }
            let edge = bucket as f32 * bucket_size;
            match merged_edges.last() {
                Some(&last) if edge - last < self.config.min_column_gap_px => {}
                _ => merged_edges.push(edge),
            }
        }
        merged_edges
    }

    /// Fraction of a row's spans starting at a column anchor.
    fn calculate_alignment_score(&self, spans: &[TextSpan], row: &RowData, columns: &[f32]) -> f32 {
        if row.spans.is_empty() || columns.is_empty() {
            return 0.0;
        }
        let tolerance = self.config.alignment_bucket_px;
        let aligned = row
            .spans
            .iter()
            .filter(|&&i| columns.iter().any(|col| (spans[i].bbox.x0 - col).abs() <= tolerance))
            .count();
        aligned as f32 / row.spans.len() as f32
    }

    /// Find contiguous, evenly spaced row ranges that form tables.
    fn find_table_regions(&self, spans: &[TextSpan], rows: &[RowData], columns: &[f32]) -> Vec<(usize, usize)> {
        let mut runs: Vec<(usize, usize)> = Vec::new();
        let mut current_start: Option<usize> = None;
        for (i, row) in rows.iter().enumerate() {
            let aligned = self.calculate_alignment_score(spans, row, columns) >= self.config.min_alignment_ratio;
            match (aligned, current_start) {
                (true, None) => current_start = Some(i),
                (false, Some(start)) => {
                    runs.push((start, i - 1));
                    current_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = current_start {
            runs.push((start, rows.len() - 1));
        }

        let mut regions = Vec::new();
        for (mut start, mut end) in runs {
            // Single-span rows at the edges are titles or captions, not table rows
            while start < end && rows[start].spans.len() < 2 {
                start += 1;
            }
            while end > start && rows[end].spans.len() < 2 {
                end -= 1;
            }
            if rows[start].spans.len() < 2 {
                continue;
            }

            let mut gaps: Vec<f32> = rows[start..=end]
                .windows(2)
                .map(|w| w[1].baseline - w[0].baseline)
                .collect();
            let limit = median(&mut gaps).map(|m| m * self.config.row_gap_factor);

            let mut sub_start = start;
            for i in start..end {
                let gap = rows[i + 1].baseline - rows[i].baseline;
                if limit.map_or(false, |l| gap > l) {
                    if i + 1 - sub_start >= self.config.min_rows {
                        regions.push((sub_start, i));
                    }
                    sub_start = i + 1;
                }
            }
            if end + 1 - sub_start >= self.config.min_rows {
                regions.push((sub_start, end));
            }
        }
        regions
    }

    /// Check if rows actually represent a numbered or bulleted list.
    ///
    /// When a list marker and its text are separate spans at different x
    /// positions, the list looks like a two-column table.
    fn is_list_pattern(&self, spans: &[TextSpan], rows: &[RowData], columns: &[f32]) -> bool {
        if columns.len() < 2 || rows.is_empty() {
            return false;
        }

        let mut bullet_count = 0;
        let mut number_count = 0;
        for row in rows {
            if let Some(&first) = row.spans.first() {
                let text = spans[first].text.trim();
                if is_bullet_marker(text) {
                    bullet_count += 1;
                } else if is_number_marker(text) {
                    number_count += 1;
                }
            }
        }

        let bullet_ratio = bullet_count as f32 / rows.len() as f32;
        let total_ratio = (bullet_count + number_count) as f32 / rows.len() as f32;
        log::debug!(
            "BorderlessTableDetector: list markers: bullets={}, numbers={}, rows={}",
            bullet_count,
            number_count,
            rows.len()
        );

        // Bullet markers are almost never real table data
        if bullet_ratio >= 0.5 {
            return true;
        }
        // Numbered first columns are common in real tables with more columns
        columns.len() == 2 && total_ratio >= 0.5
    }

    /// Lay out a cell grid tiling the region.
    fn build_skeleton(&self, spans: &[TextSpan], rows: &[RowData], columns: &[f32]) -> Option<TableSkeleton> {
        let members = rows.iter().flat_map(|r| r.spans.iter().map(|&i| &spans[i].bbox));
        let region = Rect::enclosing(members)?;
        let half = self.config.alignment_bucket_px / 2.0;

        let mut x_edges = Vec::with_capacity(columns.len() + 1);
        x_edges.push(region.x0.min(columns[0] - half));
        x_edges.extend(columns[1..].iter().map(|&c| c - half));
        x_edges.push(region.x1);
        if x_edges.windows(2).any(|w| w[1] <= w[0]) {
            return None;
        }

        let mut y_edges = Vec::with_capacity(rows.len() + 1);
        y_edges.push(rows[0].top);
        for w in rows.windows(2) {
            y_edges.push((w[0].bottom + w[1].top) / 2.0);
        }
        y_edges.push(rows[rows.len() - 1].bottom);
        if y_edges.windows(2).any(|w| w[1] <= w[0]) {
            return None;
        }

        let cols = columns.len();
        let mut cells = Vec::with_capacity(rows.len() * cols);
        for r in 0..rows.len() {
            for c in 0..cols {
                cells.push(Cell::new(
                    r,
                    c,
                    Rect::new(x_edges[c], y_edges[r], x_edges[c + 1], y_edges[r + 1]),
                ));
            }
        }

        Some(TableSkeleton {
            kind: TableKind::Borderless,
            rows: rows.len(),
            cols,
            cells,
        })
    }
}

/// Check if text is a bullet marker.
fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–" | "—" | "•" | "·" | "*" | "○" | "▪" | "◦" | "▸" | "▹" | "►" | "■" | "●" | "※" | "□" | "◆" | "◇" | "▶" | "▷" | "➤"
    )
}

/// Check if text is a number-style list marker (1., 2), a., etc.).
fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.trim().chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return false;
    }

    if let Some(pos) = cleaned.find(|c: char| !c.is_ascii_digit()) {
        let (prefix, suffix) = cleaned.split_at(pos);
        if !prefix.is_empty() && (suffix == "." || suffix == ")") {
            return true;
        }
    }

    if cleaned.parse::<u32>().is_ok() {
        return true;
    }

    // Letter marker: "a.", "B)"
    let chars: Vec<char> = cleaned.chars().collect();
    chars.len() == 2 && chars[0].is_alphabetic() && (chars[1] == '.' || chars[1] == ')')
}
