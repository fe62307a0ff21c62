//! Captions and the reading-ordered section tree.

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// Element a caption describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum CaptionTarget {
    /// Index into the page's figures
    Figure(usize),
    /// Index into the page's tables
    Table(usize),
}

/// A paragraph linked to a figure or table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    /// Box of the caption paragraph
    pub bbox: Rect,
    /// Caption text
    pub text: String,
    /// Index of the source paragraph
    pub paragraph: usize,
    /// Linked element
    pub target: CaptionTarget,
    /// Whether the text matched a "Figure N" / "Table N" label
    pub pattern_matched: bool,
}

/// An element placed in reading order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum ContentItem {
    /// Index into the page's paragraphs
    Paragraph(usize),
    /// Index into the page's figures
    Figure(usize),
    /// Index into the page's tables
    Table(usize),
}

impl ContentItem {
    /// Sort rank used to break positional ties.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            ContentItem::Paragraph(_) => 0,
            ContentItem::Figure(_) => 1,
            ContentItem::Table(_) => 2,
        }
    }

    /// Arena index of the element.
    pub fn index(&self) -> usize {
        match *self {
            ContentItem::Paragraph(i) | ContentItem::Figure(i) | ContentItem::Table(i) => i,
        }
    }
}

/// A heading and the content that follows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Paragraph index of the heading (none for leading content)
    pub heading: Option<usize>,
    /// Heading level, 0 for the leading section
    pub level: u8,
    /// Content in reading order
    pub items: Vec<ContentItem>,
}

impl Section {
    /// Create a section.
    pub fn new(heading: Option<usize>, level: u8) -> Self {
        Self {
            heading,
            level,
            items: Vec::new(),
        }
    }

    /// Check if the section has neither heading nor content.
    pub fn is_empty(&self) -> bool {
        self.heading.is_none() && self.items.is_empty()
    }
}
