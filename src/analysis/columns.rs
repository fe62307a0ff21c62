//! Column detection from the horizontal text-coverage profile.
//!
//! Span x-intervals are projected onto a histogram, smoothed, and scanned for
//! valleys: runs of low coverage with text on both sides. Each valley wide
//! enough to be a gutter splits the page into column bands.

use crate::error::{Diagnostic, Error, Stage};
use crate::geometry::{cmp_f32, median, Interval};
use crate::model::{Column, PageGeometry, TextSpan};

use super::options::ColumnConfig;

/// Where a span ended up after column detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanPlacement {
    /// Inside one column band
    Column(usize),
    /// Crosses a gutter
    Spanning,
}

/// Columns of a page plus the placement of every span.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLayout {
    /// Column bands, left to right
    pub columns: Vec<Column>,
    /// Placement of each span, parallel to the span arena
    pub placements: Vec<SpanPlacement>,
}

impl ColumnLayout {
    /// Index of the column whose band contains `x`, or the nearest one.
    pub fn column_at(&self, x: f32) -> usize {
        let mut best = 0;
        let mut best_dist = f32::INFINITY;
        for col in &self.columns {
            let dist = if x < col.x0 {
                col.x0 - x
            } else if x > col.x1 {
                x - col.x1
            } else {
                0.0
            };
            if dist < best_dist {
                best = col.index;
                best_dist = dist;
            }
        }
        best
    }
}

/// A low-coverage run between two covered regions.
#[derive(Debug, Clone, Copy)]
struct Valley {
    start: f32,
    end: f32,
}

impl Valley {
    fn width(&self) -> f32 {
        self.end - self.start
    }

    fn split(&self) -> f32 {
        (self.start + self.end) / 2.0
    }
}

/// Detects column bands.
pub struct ColumnDetector<'a> {
    config: &'a ColumnConfig,
}

impl<'a> ColumnDetector<'a> {
    /// Create a detector with the given configuration.
    pub fn new(config: &'a ColumnConfig) -> Self {
        Self { config }
    }

    /// Detect columns for the spans of one page.
    pub fn detect(
        &self,
        geometry: &PageGeometry,
        spans: &[TextSpan],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> ColumnLayout {
        if spans.is_empty() {
            log::debug!("ColumnDetector: no spans, using the full page width");
            diagnostics.push(Diagnostic::from_error(
                Stage::Columns,
                &Error::DetectionAmbiguous(
                    "page has no text spans; assuming a single full-width column".to_string(),
                ),
            ));
            return ColumnLayout {
                columns: vec![Column::new(0, 0.0, geometry.width_px)],
                placements: Vec::new(),
            };
        }

        let mut bin = (self.config.bin_width_pt * geometry.scale()).max(f32::EPSILON);
        let max_bins = self.config.max_bins.max(1);
        if geometry.width_px / bin > max_bins as f32 {
            let widened = geometry.width_px / max_bins as f32;
            diagnostics.push(Diagnostic::from_error(
                Stage::Columns,
                &Error::ResourceExhausted(format!(
                    "page width {}px needs more than {} bins; widening bins from {}px to {}px",
                    geometry.width_px, max_bins, bin, widened
                )),
            ));
            bin = widened;
        }
        let coverage = self.coverage_histogram(geometry, spans, bin);
        let smoothed = self.smooth(&coverage);

        let mut valleys = self.find_valleys(&coverage, &smoothed, bin, geometry.width_px);
        log::debug!("ColumnDetector: {} valleys over {} bins", valleys.len(), coverage.len());

        if valleys.len() + 1 > self.config.max_columns {
            let keep = self.config.max_columns.saturating_sub(1);
            diagnostics.push(Diagnostic::from_error(
                Stage::Columns,
                &Error::ResourceExhausted(format!(
                    "{} column gutters found, keeping the {} widest",
                    valleys.len(),
                    keep
                )),
            ));
            valleys.sort_by(|a, b| cmp_f32(b.width(), a.width()).then(cmp_f32(a.start, b.start)));
            valleys.truncate(keep);
            valleys.sort_by(|a, b| cmp_f32(a.start, b.start));
        }

        let splits: Vec<f32> = valleys.iter().map(Valley::split).collect();
        self.build_columns(spans, &splits)
    }

    /// Count how many spans cover each bin.
    fn coverage_histogram(&self, geometry: &PageGeometry, spans: &[TextSpan], bin: f32) -> Vec<f32> {
        let num_bins = ((geometry.width_px / bin).ceil() as usize).clamp(1, self.config.max_bins.max(1));
        let mut coverage = vec![0.0f32; num_bins];

        for span in spans {
            let x0 = span.bbox.x0.clamp(0.0, geometry.width_px);
            let x1 = span.bbox.x1.clamp(0.0, geometry.width_px);
            if x1 <= x0 {
                continue;
            }
            let start = (x0 / bin).floor() as usize;
            let end = ((x1 / bin).ceil() as usize).saturating_sub(1).min(num_bins - 1);
            for slot in coverage.iter_mut().take(end + 1).skip(start) {
                *slot += 1.0;
            }
        }
        coverage
    }

    /// Centered moving average.
    fn smooth(&self, coverage: &[f32]) -> Vec<f32> {
        let half = self.config.smoothing_window.max(5) / 2;
        (0..coverage.len())
            .map(|i| {
                let lo = i.saturating_sub(half);
                let hi = (i + half).min(coverage.len() - 1);
                let window = &coverage[lo..=hi];
                window.iter().sum::<f32>() / window.len() as f32
            })
            .collect()
    }

    /// Runs of below-threshold bins with covered content on both sides.
    fn find_valleys(&self, coverage: &[f32], smoothed: &[f32], bin: f32, page_width: f32) -> Vec<Valley> {
        let first = coverage.iter().position(|&c| c > 0.0);
        let last = coverage.iter().rposition(|&c| c > 0.0);
        let (first, last) = match (first, last) {
            (Some(f), Some(l)) if l > f => (f, l),
            _ => return Vec::new(),
        };

        let mut non_zero: Vec<f32> = smoothed.iter().copied().filter(|&v| v > 0.0).collect();
        let threshold = match median(&mut non_zero) {
            Some(m) => m * self.config.valley_ratio,
            None => return Vec::new(),
        };
        let min_width = self.config.min_valley_width_ratio * page_width;

        // A valley needs dense content on both sides; low runs at the text
        // edges are ragged margins or indents.
        let mut valleys = Vec::new();
        let mut run_start: Option<usize> = None;
        let mut seen_peak = false;
        for (i, &value) in smoothed.iter().enumerate().take(last + 1).skip(first) {
            if value >= threshold {
                if let Some(start) = run_start.take() {
                    self.push_valley(&mut valleys, start, i, bin, min_width);
                }
                seen_peak = true;
            } else if seen_peak {
                run_start.get_or_insert(i);
            }
        }
        valleys
    }

    fn push_valley(&self, valleys: &mut Vec<Valley>, start: usize, end: usize, bin: f32, min_width: f32) {
        let valley = Valley {
            start: start as f32 * bin,
            end: end as f32 * bin,
        };
        if valley.width() >= min_width {
            valleys.push(valley);
        } else {
            log::debug!(
                "ColumnDetector: ignoring narrow valley {:.1}-{:.1}",
                valley.start,
                valley.end
            );
        }
    }

    /// Assign spans to bands and derive column extents from them.
    fn build_columns(&self, spans: &[TextSpan], splits: &[f32]) -> ColumnLayout {
        let mut extents: Vec<Option<Interval>> = vec![None; splits.len() + 1];
        let mut bands = Vec::with_capacity(spans.len());

        for span in spans {
            let crosses = splits.iter().any(|&s| span.bbox.x0 < s && span.bbox.x1 > s);
            if crosses {
                bands.push(None);
                continue;
            }
            let cx = span.bbox.center().x;
            let band = splits.iter().filter(|&&s| s <= cx).count();
            let iv = span.bbox.x_interval();
            extents[band] = Some(match extents[band] {
                Some(e) => e.union(&iv),
                None => iv,
            });
            bands.push(Some(band));
        }

        // Bands holding only spanning text do not become columns.
        let mut band_to_column = vec![None; extents.len()];
        let mut columns = Vec::new();
        for (band, extent) in extents.iter().enumerate() {
            if let Some(e) = extent {
                band_to_column[band] = Some(columns.len());
                columns.push(Column::new(columns.len(), e.start, e.end));
            }
        }

        if columns.is_empty() {
            let all = spans
                .iter()
                .map(|s| s.bbox.x_interval())
                .reduce(|a, b| a.union(&b))
                .unwrap_or(Interval::new(0.0, 0.0));
            columns.push(Column::new(0, all.start, all.end));
            return ColumnLayout {
                columns,
                placements: vec![SpanPlacement::Column(0); spans.len()],
            };
        }

        let placements = bands
            .into_iter()
            .map(|band| match band.and_then(|b| band_to_column[b]) {
                Some(c) => SpanPlacement::Column(c),
                None => SpanPlacement::Spanning,
            })
            .collect();

        log::debug!(
            "ColumnDetector: {} columns at {:?}",
            columns.len(),
            columns.iter().map(|c| (c.x0, c.x1)).collect::<Vec<_>>()
        );
        ColumnLayout { columns, placements }
    }
}
