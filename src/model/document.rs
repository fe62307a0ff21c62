//! Document-level types.

use serde::{Deserialize, Serialize};

use super::{Page, PageStats};

/// The analyzed layout of a multi-page source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Name of the primitive source (file name or caller label)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Total number of pages in the source
    pub page_count: usize,

    /// Successfully analyzed pages, ordered by index
    pub pages: Vec<Page>,

    /// Pages that failed without aborting the batch
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<PageFailure>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a page by its zero-based index.
    pub fn get_page(&self, index: usize) -> Option<&Page> {
        self.pages.iter().find(|p| p.index == index)
    }

    /// Add a page, keeping pages ordered by index.
    pub fn add_page(&mut self, page: Page) {
        let pos = self.pages.partition_point(|p| p.index < page.index);
        self.pages.insert(pos, page);
    }

    /// Record a failed page, keeping failures ordered by index.
    pub fn add_failure(&mut self, failure: PageFailure) {
        let pos = self.failures.partition_point(|f| f.index < failure.index);
        self.failures.insert(pos, failure);
    }

    /// Check if the document has any analyzed pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Summary counts over all pages.
    pub fn stats(&self) -> PageStats {
        let mut total = PageStats::default();
        for page in &self.pages {
            total += page.stats();
        }
        total
    }

    /// Get plain text content of the entire document.
    pub fn plain_text(&self) -> String {
        self.pages
            .iter()
            .map(|page| page.plain_text())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A page that could not be analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFailure {
    /// Zero-based page index
    pub index: usize,
    /// Error description
    pub message: String,
}

impl PageFailure {
    /// Create a failure record.
    pub fn new(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            message: message.into(),
        }
    }
}
