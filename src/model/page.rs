//! Page-level analysis output.

use serde::{Deserialize, Serialize};

use super::{
    Caption, ContentItem, Figure, PageGeometry, Paragraph, RasterRegion, Section, Table, TextSpan,
    VectorPath,
};
use crate::error::Diagnostic;
use crate::geometry::{Interval, Rect};

/// A vertical column band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Position from the left, starting at 0
    pub index: usize,
    /// Left edge in pixels
    pub x0: f32,
    /// Right edge in pixels
    pub x1: f32,
}

impl Column {
    /// Create a column band.
    pub fn new(index: usize, x0: f32, x1: f32) -> Self {
        Self { index, x0, x1 }
    }

    /// Width of the band.
    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    /// The band as an interval.
    pub fn interval(&self) -> Interval {
        Interval::new(self.x0, self.x1)
    }

    /// The band as a full-height rectangle.
    pub fn rect(&self, page_height: f32) -> Rect {
        Rect::new(self.x0, 0.0, self.x1, page_height)
    }
}

/// The analyzed layout of one page.
///
/// The primitive arenas are kept so that every cross reference (span, path
/// and raster indices) can be resolved from the page alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Zero-based page index
    pub index: usize,
    /// Page size and resolution
    pub geometry: PageGeometry,
    /// Ingested text spans
    pub spans: Vec<TextSpan>,
    /// Ingested vector paths
    pub paths: Vec<VectorPath>,
    /// Ingested raster regions
    pub rasters: Vec<RasterRegion>,
    /// Column bands, left to right
    pub columns: Vec<Column>,
    /// Paragraphs and headings
    pub paragraphs: Vec<Paragraph>,
    /// Figures
    pub figures: Vec<Figure>,
    /// Tables
    pub tables: Vec<Table>,
    /// Captions
    pub captions: Vec<Caption>,
    /// Reading-ordered sections
    pub sections: Vec<Section>,
    /// Non-fatal problems recorded during analysis
    pub diagnostics: Vec<Diagnostic>,
}

impl Page {
    /// Create an empty page result.
    pub fn new(index: usize, geometry: PageGeometry) -> Self {
        Self {
            index,
            geometry,
            spans: Vec::new(),
            paths: Vec::new(),
            rasters: Vec::new(),
            columns: Vec::new(),
            paragraphs: Vec::new(),
            figures: Vec::new(),
            tables: Vec::new(),
            captions: Vec::new(),
            sections: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Check if nothing was detected on the page.
    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty() && self.figures.is_empty() && self.tables.is_empty()
    }

    /// Caption linked to a figure.
    pub fn figure_caption(&self, figure: usize) -> Option<&Caption> {
        self.figures
            .get(figure)
            .and_then(|f| f.caption)
            .and_then(|c| self.captions.get(c))
    }

    /// Caption linked to a table.
    pub fn table_caption(&self, table: usize) -> Option<&Caption> {
        self.tables
            .get(table)
            .and_then(|t| t.caption)
            .and_then(|c| self.captions.get(c))
    }

    /// Content items of all sections in reading order, headings included.
    pub fn reading_order(&self) -> Vec<ContentItem> {
        let mut order = Vec::new();
        for section in &self.sections {
            if let Some(h) = section.heading {
                order.push(ContentItem::Paragraph(h));
            }
            order.extend(section.items.iter().copied());
        }
        order
    }

    /// Plain text of the page in reading order.
    pub fn plain_text(&self) -> String {
        self.reading_order()
            .into_iter()
            .filter_map(|item| match item {
                ContentItem::Paragraph(i) => self.paragraphs.get(i).map(|p| p.text()),
                ContentItem::Table(i) => self.tables.get(i).map(|t| {
                    t.to_grid()
                        .iter()
                        .map(|row| row.join("\t"))
                        .collect::<Vec<_>>()
                        .join("\n")
                }),
                ContentItem::Figure(_) => None,
            })
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Summary counts.
    pub fn stats(&self) -> PageStats {
        PageStats {
            columns: self.columns.len(),
            paragraphs: self.paragraphs.iter().filter(|p| !p.is_heading()).count(),
            headings: self.paragraphs.iter().filter(|p| p.is_heading()).count(),
            figures: self.figures.len(),
            tables: self.tables.len(),
            captions: self.captions.len(),
            sections: self.sections.len(),
            diagnostics: self.diagnostics.len(),
        }
    }
}

/// Summary counts of a page's layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageStats {
    /// Column bands
    pub columns: usize,
    /// Body paragraphs (captions included)
    pub paragraphs: usize,
    /// Headings
    pub headings: usize,
    /// Figures
    pub figures: usize,
    /// Tables
    pub tables: usize,
    /// Linked captions
    pub captions: usize,
    /// Sections
    pub sections: usize,
    /// Recorded diagnostics
    pub diagnostics: usize,
}

impl std::ops::AddAssign for PageStats {
    fn add_assign(&mut self, other: Self) {
        self.columns += other.columns;
        self.paragraphs += other.paragraphs;
        self.headings += other.headings;
        self.figures += other.figures;
        self.tables += other.tables;
        self.captions += other.captions;
        self.sections += other.sections;
        self.diagnostics += other.diagnostics;
    }
}
