//! Page primitives supplied by the upstream PDF collaborator.
//!
//! These are the read-only inputs of the layout pipeline: text spans, vector
//! paths and embedded raster regions, all in page-pixel coordinates.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::Rect;

/// Page dimensions in both coordinate systems.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    /// Rendered width in pixels
    pub width_px: f32,
    /// Rendered height in pixels
    pub height_px: f32,
    /// Width in points (1/72 inch)
    pub width_pt: f32,
    /// Height in points
    pub height_pt: f32,
    /// Rendering resolution
    pub dpi: f32,
}

impl PageGeometry {
    /// Geometry of a page rendered at `dpi`.
    pub fn from_points(width_pt: f32, height_pt: f32, dpi: f32) -> Self {
        let scale = dpi / 72.0;
        Self {
            width_px: width_pt * scale,
            height_px: height_pt * scale,
            width_pt,
            height_pt,
            dpi,
        }
    }

    /// US Letter at 72 DPI (pixels equal points).
    pub fn letter() -> Self {
        Self::from_points(612.0, 792.0, 72.0)
    }

    /// Pixels per point.
    pub fn scale(&self) -> f32 {
        if self.dpi.is_finite() && self.dpi > 0.0 {
            self.dpi / 72.0
        } else {
            1.0
        }
    }

    /// The full page as a rectangle.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width_px, self.height_px)
    }

    /// Page area in square pixels.
    pub fn area(&self) -> f32 {
        self.width_px * self.height_px
    }

    /// Check that the geometry is usable.
    pub fn validate(&self, page: usize) -> Result<()> {
        let finite_positive = |v: f32| v.is_finite() && v > 0.0;
        if !finite_positive(self.width_px) || !finite_positive(self.height_px) {
            return Err(Error::InvalidPage(
                page,
                format!("pixel size {}x{}", self.width_px, self.height_px),
            ));
        }
        if !finite_positive(self.dpi) {
            return Err(Error::InvalidPage(page, format!("dpi {}", self.dpi)));
        }
        Ok(())
    }
}

/// A run of text with position and style information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    /// The text content
    pub text: String,
    /// Bounding box in page pixels
    pub bbox: Rect,
    /// Font size in points
    pub font_size: f32,
    /// Font name (e.g., "Helvetica-Bold")
    #[serde(default)]
    pub font_name: String,
    /// Whether the font appears to be bold
    #[serde(default)]
    pub bold: bool,
    /// Whether the font appears to be italic
    #[serde(default)]
    pub italic: bool,
    /// Baseline y in page pixels (bottom of the box when unknown)
    #[serde(default)]
    pub baseline: Option<f32>,
}

impl TextSpan {
    /// Create a new text span, inferring weight and style from the font name.
    pub fn new(text: impl Into<String>, bbox: Rect, font_size: f32, font_name: impl Into<String>) -> Self {
        let font_name = font_name.into();
        let lower = font_name.to_lowercase();
        let bold = lower.contains("bold") || lower.contains("black") || lower.contains("heavy");
        let italic = lower.contains("italic") || lower.contains("oblique");

        Self {
            text: text.into(),
            bbox,
            font_size,
            font_name,
            bold,
            italic,
            baseline: None,
        }
    }

    /// Set an explicit baseline.
    pub fn with_baseline(mut self, baseline: f32) -> Self {
        self.baseline = Some(baseline);
        self
    }

    /// Baseline y, falling back to the bottom edge of the box.
    pub fn baseline(&self) -> f32 {
        match self.baseline {
            Some(y) if y.is_finite() => y,
            _ => self.bbox.y1,
        }
    }

    /// Number of characters, ignoring surrounding whitespace.
    pub fn char_count(&self) -> usize {
        self.text.trim().chars().count()
    }
}

/// How a vector path is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaintKind {
    /// Stroked outline
    #[default]
    Stroke,
    /// Filled area
    Fill,
    /// Filled and stroked
    FillStroke,
}

/// Geometry of a path made of a single straight segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StraightLine {
    /// Angle against the x axis in degrees
    pub angle_deg: f32,
}

/// A stroke or fill path from the page content stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPath {
    /// Bounding box in page pixels
    pub bbox: Rect,
    /// Painting operator
    #[serde(default)]
    pub paint: PaintKind,
    /// Number of path segments
    #[serde(default = "default_segment_count")]
    pub segment_count: u32,
    /// Set when the path is a single straight segment
    #[serde(default)]
    pub line: Option<StraightLine>,
}

fn default_segment_count() -> u32 {
    1
}

impl VectorPath {
    /// Create a generic path.
    pub fn new(bbox: Rect, paint: PaintKind, segment_count: u32) -> Self {
        Self {
            bbox,
            paint,
            segment_count,
            line: None,
        }
    }

    /// Create a straight stroked line between two points.
    pub fn line(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        let angle_deg = (y1 - y0).atan2(x1 - x0).to_degrees();
        Self {
            bbox: Rect::new(x0, y0, x1, y1),
            paint: PaintKind::Stroke,
            segment_count: 1,
            line: Some(StraightLine { angle_deg }),
        }
    }

    /// Whether the path is a straight line.
    pub fn is_straight(&self) -> bool {
        self.line.is_some()
    }
}

/// An embedded image placed on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterRegion {
    /// Placement on the page in pixels
    pub bbox: Rect,
    /// Handle of the image in the collaborator's store
    #[serde(default)]
    pub image_ref: String,
}

impl RasterRegion {
    /// Create a raster region.
    pub fn new(bbox: Rect, image_ref: impl Into<String>) -> Self {
        Self {
            bbox,
            image_ref: image_ref.into(),
        }
    }
}

/// All primitives of one page, as delivered by the collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageInput {
    /// Zero-based page index
    pub index: usize,
    /// Page size and resolution
    pub geometry: PageGeometry,
    /// Text spans in content-stream order
    pub spans: Vec<TextSpan>,
    /// Vector paths in content-stream order
    pub paths: Vec<VectorPath>,
    /// Embedded images
    #[serde(default)]
    pub rasters: Vec<RasterRegion>,
}

impl PageInput {
    /// Create an empty page.
    pub fn new(index: usize, geometry: PageGeometry) -> Self {
        Self {
            index,
            geometry,
            spans: Vec::new(),
            paths: Vec::new(),
            rasters: Vec::new(),
        }
    }

    /// Add a text span.
    pub fn add_span(&mut self, span: TextSpan) {
        self.spans.push(span);
    }

    /// Add a vector path.
    pub fn add_path(&mut self, path: VectorPath) {
        self.paths.push(path);
    }

    /// Add a raster region.
    pub fn add_raster(&mut self, raster: RasterRegion) {
        self.rasters.push(raster);
    }

    /// Whether the page carries no primitives at all.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty() && self.paths.is_empty() && self.rasters.is_empty()
    }
}
