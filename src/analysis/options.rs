//! Analysis options and per-stage configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::render::PageSelection;

/// Column detector configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    /// Histogram bin width in points
    pub bin_width_pt: f32,
    /// Moving-average window in bins (at least 5)
    pub smoothing_window: usize,
    /// Valley threshold as a fraction of the median non-zero coverage
    pub valley_ratio: f32,
    /// Minimum valley width as a fraction of the page width
    pub min_valley_width_ratio: f32,
    /// Maximum number of columns per page
    pub max_columns: usize,
    /// Upper bound on histogram bins; wider pages get wider bins
    pub max_bins: usize,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            bin_width_pt: 1.0,
            smoothing_window: 5,
            valley_ratio: 0.8,
            min_valley_width_ratio: 0.01,
            max_columns: 8,
            max_bins: 20_000,
        }
    }
}

/// Text block assembler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextBlockConfig {
    /// Baseline difference (fraction of font size) below which spans share a line
    pub line_merge_ratio: f32,
    /// Gap in line heights above which a paragraph always breaks
    pub paragraph_break_ratio: f32,
    /// Left-edge drift (fraction of font size) tolerated inside a paragraph
    pub alignment_tolerance_ratio: f32,
    /// Relative font size change that breaks a paragraph
    pub font_change_ratio: f32,
    /// Font size ratio against the body size that marks a heading
    pub heading_ratio: f32,
    /// Longest line (in characters) that can be a heading
    pub heading_max_chars: usize,
}

impl Default for TextBlockConfig {
    fn default() -> Self {
        Self {
            line_merge_ratio: 0.5,
            paragraph_break_ratio: 1.5,
            alignment_tolerance_ratio: 2.0,
            font_change_ratio: 0.2,
            heading_ratio: 1.15,
            heading_max_chars: 80,
        }
    }
}

/// Figure detector configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureConfig {
    /// DBSCAN neighbourhood radius in pixels
    pub epsilon_px: f32,
    /// Minimum neighbourhood size (self included) of a core path
    pub min_cluster_size: usize,
    /// Paths beyond this count are ignored
    pub max_paths: usize,
    /// Upper bound on neighbour lookups during clustering
    pub max_neighbor_visits: usize,
    /// Minimum candidate area in square pixels
    pub min_area_px: f32,
    /// Maximum long/short side ratio
    pub max_aspect: f32,
    /// Page coverage at which a near-square candidate counts as background
    pub background_coverage: f32,
    /// Aspect ratio up to which a huge candidate counts as background
    pub background_max_aspect: f32,
    /// IoU above which candidates merge
    pub merge_iou: f32,
    /// Upper bound on merge passes
    pub max_merge_passes: usize,
    /// IoU with a table above which a candidate is dropped
    pub table_overlap_iou: f32,
    /// Fraction of a candidate inside a table above which it is dropped
    pub table_containment: f32,
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self {
            epsilon_px: 12.0,
            min_cluster_size: 3,
            max_paths: 20_000,
            max_neighbor_visits: 20_000_000,
            min_area_px: 400.0,
            max_aspect: 25.0,
            background_coverage: 0.85,
            background_max_aspect: 1.6,
            merge_iou: 0.5,
            max_merge_passes: 16,
            table_overlap_iou: 0.1,
            table_containment: 0.8,
        }
    }
}

/// Table detector configuration (ruled and borderless).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Angle tolerance for horizontal/vertical rules in degrees
    pub angle_tolerance_deg: f32,
    /// Thickest filled rectangle treated as a rule, in pixels
    pub rule_thickness_px: f32,
    /// Shortest rule segment in pixels
    pub min_rule_length_px: f32,
    /// Distance within which collinear segments share a grid line
    pub snap_tolerance_px: f32,
    /// Gap along the line within which segments are joined
    pub join_tolerance_px: f32,
    /// Maximum grid lines per orientation
    pub max_grid_lines: usize,
    /// Enable text-alignment (borderless) detection
    pub detect_borderless: bool,
    /// Minimum number of rows
    pub min_rows: usize,
    /// Minimum number of columns
    pub min_columns: usize,
    /// Maximum number of columns (above this, likely word-level splitting)
    pub max_columns: usize,
    /// Baseline tolerance for grouping spans into rows (fraction of font size)
    pub y_tolerance_factor: f32,
    /// Left-edge bucket size in pixels
    pub alignment_bucket_px: f32,
    /// Fraction of rows that must share an edge for it to anchor a column
    pub min_alignment_ratio: f32,
    /// Minimum gap between column anchors in pixels
    pub min_column_gap_px: f32,
    /// Row gap above this multiple of the median gap ends a region
    pub row_gap_factor: f32,
    /// Minimum fraction of non-empty cells
    pub min_density: f32,
    /// IoU with a ruled table above which a borderless table is dropped
    pub ruled_overlap_iou: f32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            angle_tolerance_deg: 2.0,
            rule_thickness_px: 3.0,
            min_rule_length_px: 10.0,
            snap_tolerance_px: 3.0,
            join_tolerance_px: 3.0,
            max_grid_lines: 400,
            detect_borderless: true,
            min_rows: 2,
            min_columns: 2,
            max_columns: 12,
            y_tolerance_factor: 0.4,
            alignment_bucket_px: 5.0,
            min_alignment_ratio: 0.3,
            min_column_gap_px: 15.0,
            row_gap_factor: 2.0,
            min_density: 0.6,
            ruled_overlap_iou: 0.1,
        }
    }
}

/// Caption linker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    /// Vertical search distance in page line heights
    pub band_factor: f32,
    /// Line height in points used when the page has no text lines
    pub default_line_height_pt: f32,
    /// Longest unlabelled paragraph accepted as a caption
    pub max_caption_chars: usize,
    /// Most lines an unlabelled caption may have
    pub max_caption_lines: usize,
    /// Fraction of a paragraph inside its target above which it is ignored
    pub max_target_overlap: f32,
    /// Label words that introduce a figure caption
    pub figure_labels: Vec<String>,
    /// Label words that introduce a table caption
    pub table_labels: Vec<String>,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            band_factor: 1.2,
            default_line_height_pt: 12.0,
            max_caption_chars: 200,
            max_caption_lines: 3,
            max_target_overlap: 0.5,
            figure_labels: ["Figure", "Fig.", "Fig", "Chart", "Image", "Plate", "Exhibit"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            table_labels: ["Table", "Tab.", "Tbl."].iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Reading-order assembler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadingOrderConfig {
    /// Fraction of a column's width an element must overlap to belong to it
    pub spanning_overlap_ratio: f32,
}

impl Default for ReadingOrderConfig {
    fn default() -> Self {
        Self {
            spanning_overlap_ratio: 0.1,
        }
    }
}

/// Thresholds for every stage of the layout pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Column detection
    pub columns: ColumnConfig,
    /// Lines, paragraphs and headings
    pub text: TextBlockConfig,
    /// Figure detection
    pub figures: FigureConfig,
    /// Table detection
    pub tables: TableConfig,
    /// Caption linking
    pub captions: CaptionConfig,
    /// Reading order
    pub reading_order: ReadingOrderConfig,
}

impl LayoutConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from JSON; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LayoutConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set column configuration.
    pub fn with_columns(mut self, columns: ColumnConfig) -> Self {
        self.columns = columns;
        self
    }

    /// Set text block configuration.
    pub fn with_text(mut self, text: TextBlockConfig) -> Self {
        self.text = text;
        self
    }

    /// Set figure configuration.
    pub fn with_figures(mut self, figures: FigureConfig) -> Self {
        self.figures = figures;
        self
    }

    /// Set table configuration.
    pub fn with_tables(mut self, tables: TableConfig) -> Self {
        self.tables = tables;
        self
    }

    /// Set caption configuration.
    pub fn with_captions(mut self, captions: CaptionConfig) -> Self {
        self.captions = captions;
        self
    }

    /// Set reading-order configuration.
    pub fn with_reading_order(mut self, reading_order: ReadingOrderConfig) -> Self {
        self.reading_order = reading_order;
        self
    }

    /// Disable borderless table detection.
    pub fn without_borderless_tables(mut self) -> Self {
        self.tables.detect_borderless = false;
        self
    }

    /// Check that thresholds are usable.
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, v: f32) -> Result<()> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(Error::InvalidConfig(format!("{} must be positive, got {}", name, v)))
            }
        }
        fn ratio(name: &str, v: f32) -> Result<()> {
            if v.is_finite() && (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(Error::InvalidConfig(format!("{} must be within [0, 1], got {}", name, v)))
            }
        }

        let c = &self.columns;
        positive("columns.bin_width_pt", c.bin_width_pt)?;
        positive("columns.valley_ratio", c.valley_ratio)?;
        ratio("columns.min_valley_width_ratio", c.min_valley_width_ratio)?;
        if c.smoothing_window < 5 {
            return Err(Error::InvalidConfig(format!(
                "columns.smoothing_window must be at least 5, got {}",
                c.smoothing_window
            )));
        }
        if c.max_columns == 0 {
            return Err(Error::InvalidConfig("columns.max_columns must be at least 1".to_string()));
        }
        if c.max_bins < c.smoothing_window {
            return Err(Error::InvalidConfig(format!(
                "columns.max_bins must be at least the smoothing window, got {}",
                c.max_bins
            )));
        }

        let t = &self.text;
        positive("text.line_merge_ratio", t.line_merge_ratio)?;
        positive("text.paragraph_break_ratio", t.paragraph_break_ratio)?;
        positive("text.alignment_tolerance_ratio", t.alignment_tolerance_ratio)?;
        positive("text.font_change_ratio", t.font_change_ratio)?;
        if !(t.heading_ratio.is_finite() && t.heading_ratio > 1.0) {
            return Err(Error::InvalidConfig(format!(
                "text.heading_ratio must be greater than 1, got {}",
                t.heading_ratio
            )));
        }

        let f = &self.figures;
        positive("figures.epsilon_px", f.epsilon_px)?;
        positive("figures.max_aspect", f.max_aspect)?;
        ratio("figures.merge_iou", f.merge_iou)?;
        ratio("figures.background_coverage", f.background_coverage)?;
        ratio("figures.table_overlap_iou", f.table_overlap_iou)?;
        ratio("figures.table_containment", f.table_containment)?;
        if f.min_cluster_size == 0 || f.max_merge_passes == 0 {
            return Err(Error::InvalidConfig(
                "figures.min_cluster_size and figures.max_merge_passes must be at least 1".to_string(),
            ));
        }

        let tb = &self.tables;
        positive("tables.angle_tolerance_deg", tb.angle_tolerance_deg)?;
        positive("tables.alignment_bucket_px", tb.alignment_bucket_px)?;
        positive("tables.row_gap_factor", tb.row_gap_factor)?;
        ratio("tables.min_alignment_ratio", tb.min_alignment_ratio)?;
        ratio("tables.min_density", tb.min_density)?;
        ratio("tables.ruled_overlap_iou", tb.ruled_overlap_iou)?;
        if tb.min_rows < 2 || tb.min_columns < 2 || tb.max_columns < tb.min_columns {
            return Err(Error::InvalidConfig(format!(
                "tables need min_rows >= 2 and 2 <= min_columns <= max_columns, got {}/{}/{}",
                tb.min_rows, tb.min_columns, tb.max_columns
            )));
        }

        let cap = &self.captions;
        positive("captions.band_factor", cap.band_factor)?;
        positive("captions.default_line_height_pt", cap.default_line_height_pt)?;
        ratio("captions.max_target_overlap", cap.max_target_overlap)?;
        if cap.figure_labels.is_empty() || cap.table_labels.is_empty() {
            return Err(Error::InvalidConfig(
                "captions.figure_labels and captions.table_labels need at least one label".to_string(),
            ));
        }
        if cap.figure_labels.iter().chain(&cap.table_labels).any(|l| l.trim().is_empty()) {
            return Err(Error::InvalidConfig("caption labels must not be empty".to_string()));
        }

        ratio("reading_order.spanning_overlap_ratio", self.reading_order.spanning_overlap_ratio)?;
        Ok(())
    }
}

/// Options for analyzing a multi-page source.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Stage thresholds
    pub config: LayoutConfig,

    /// Whether to analyze pages in parallel
    pub parallel: bool,

    /// Page selection (which pages to analyze)
    pub pages: PageSelection,
}

impl AnalyzeOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stage configuration.
    pub fn with_config(mut self, config: LayoutConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            config: LayoutConfig::default(),
            parallel: true,
            pages: PageSelection::All,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_options_builder() {
        let options = AnalyzeOptions::new()
            .with_config(LayoutConfig::new().without_borderless_tables())
            .with_pages(PageSelection::Pages(vec![2]))
            .sequential();

        assert!(!options.parallel);
        assert!(!options.config.tables.detect_borderless);
        assert!(options.pages.includes(2));
        assert!(!options.pages.includes(1));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(LayoutConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = LayoutConfig::from_json(r#"{"figures": {"epsilon_px": 20.0}}"#).unwrap();
        assert_eq!(config.figures.epsilon_px, 20.0);
        assert_eq!(config.figures.min_cluster_size, 3);
        assert_eq!(config.columns, ColumnConfig::default());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = LayoutConfig::default();
        config.columns.smoothing_window = 3;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = LayoutConfig::default();
        config.text.heading_ratio = 0.9;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = LayoutConfig::default();
        config.captions.table_labels.push("  ".to_string());
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_label_list_rejected() {
        let mut config = LayoutConfig::default();
        config.captions.table_labels.clear();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = LayoutConfig::default();
        config.captions.figure_labels = Vec::new();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
