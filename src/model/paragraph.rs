//! Text lines, paragraphs and headings.

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// Spans sharing a baseline band within one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    /// Indices into the page's span arena, left to right
    pub spans: Vec<usize>,
    /// Bounding box of the spans
    pub bbox: Rect,
    /// Baseline y in pixels
    pub baseline: f32,
    /// Dominant font size in points (weighted by character count)
    pub font_size: f32,
    /// Text of the line
    pub text: String,
}

impl TextLine {
    /// Height of the line box in pixels.
    pub fn height(&self) -> f32 {
        self.bbox.height()
    }

    /// Number of visible characters.
    pub fn char_count(&self) -> usize {
        self.text.chars().filter(|c| !c.is_whitespace()).count()
    }
}

/// Classification of a text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    /// Regular body text
    Paragraph,
    /// A heading (level 1 is the largest)
    Heading {
        /// Heading level (1-6)
        level: u8,
    },
}

/// A paragraph or heading made of consecutive lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Lines in reading order
    pub lines: Vec<TextLine>,
    /// Bounding box of all lines
    pub bbox: Rect,
    /// Column the block was assembled in
    pub column: usize,
    /// Set when the block was assembled from spans crossing a column gutter
    pub spanning: bool,
    /// Paragraph or heading
    pub kind: BlockKind,
    /// Dominant font size in points
    pub font_size: f32,
}

impl Paragraph {
    /// Build a block from lines, computing its box and font size.
    pub fn from_lines(lines: Vec<TextLine>, column: usize, spanning: bool, kind: BlockKind) -> Self {
        let bbox = Rect::enclosing(lines.iter().map(|l| &l.bbox)).unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0));

        let total_chars: usize = lines.iter().map(|l| l.char_count().max(1)).sum();
        let weighted: f32 = lines
            .iter()
            .map(|l| l.font_size * l.char_count().max(1) as f32)
            .sum();
        let font_size = if total_chars > 0 {
            weighted / total_chars as f32
        } else {
            0.0
        };

        Self {
            lines,
            bbox,
            column,
            spanning,
            kind,
            font_size,
        }
    }

    /// Combined text of all lines.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Check if this is a heading.
    pub fn is_heading(&self) -> bool {
        matches!(self.kind, BlockKind::Heading { .. })
    }

    /// Heading level, if any.
    pub fn heading_level(&self) -> Option<u8> {
        match self.kind {
            BlockKind::Heading { level } => Some(level),
            BlockKind::Paragraph => None,
        }
    }

    /// Median line height in pixels.
    pub fn line_height(&self) -> f32 {
        let mut heights: Vec<f32> = self.lines.iter().map(|l| l.height()).collect();
        crate::geometry::median(&mut heights).unwrap_or(0.0)
    }

    /// Number of visible characters.
    pub fn char_count(&self) -> usize {
        self.lines.iter().map(|l| l.char_count()).sum()
    }

    /// All span indices of the block.
    pub fn span_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.lines.iter().flat_map(|l| l.spans.iter().copied())
    }
}
