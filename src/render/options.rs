//! Rendering options and page selection.

use std::ops::RangeInclusive;

/// Knobs shared by the Markdown and SVG renderers.
///
/// Built with the `with_*` methods; the defaults suit a human reader
/// (escaped text, figure placeholders, page markers, labelled overlays).
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Markdown or HTML for tables with merged cells
    pub table_fallback: TableFallback,
    /// Deepest heading level emitted, 1 to 6
    pub max_heading_level: u8,
    /// Backslash-escape Markdown syntax in paragraph text
    pub escape_markdown: bool,
    /// Emit an image placeholder where a figure sits
    pub figure_placeholders: bool,
    /// Emit `<!-- page N -->` before each page
    pub page_markers: bool,
    /// Label boxes in the SVG overlay
    pub overlay_labels: bool,
    /// Pages to render from a document
    pub pages: PageSelection,
}

impl RenderOptions {
    /// Defaults, see [`RenderOptions`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table_fallback(mut self, fallback: TableFallback) -> Self {
        self.table_fallback = fallback;
        self
    }

    /// Deeper headings are clamped to `level`, itself kept within 1..=6.
    pub fn with_max_heading(mut self, level: u8) -> Self {
        self.max_heading_level = level.clamp(1, 6);
        self
    }

    pub fn with_escaping(mut self, escape: bool) -> Self {
        self.escape_markdown = escape;
        self
    }

    pub fn with_figure_placeholders(mut self, enabled: bool) -> Self {
        self.figure_placeholders = enabled;
        self
    }

    pub fn with_page_markers(mut self, enabled: bool) -> Self {
        self.page_markers = enabled;
        self
    }

    pub fn with_overlay_labels(mut self, enabled: bool) -> Self {
        self.overlay_labels = enabled;
        self
    }

    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    /// Shorthand for `with_pages(PageSelection::Range(range))`.
    pub fn with_page_range(mut self, range: RangeInclusive<u32>) -> Self {
        self.pages = PageSelection::Range(range);
        self
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            table_fallback: TableFallback::Markdown,
            max_heading_level: 6,
            escape_markdown: true,
            figure_placeholders: true,
            page_markers: true,
            overlay_labels: true,
            pages: PageSelection::All,
        }
    }
}

/// How to render tables that can't be expressed in simple Markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableFallback {
    /// Use Markdown table syntax, repeating merged cell text
    #[default]
    Markdown,
    /// Use HTML table tags with rowspan/colspan
    Html,
}

/// Page selection (1-indexed page numbers).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    /// All pages
    #[default]
    All,
    /// A range of pages (inclusive, 1-indexed)
    Range(RangeInclusive<u32>),
    /// Specific pages (1-indexed)
    Pages(Vec<u32>),
}

impl PageSelection {
    /// Check if a page number should be included.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.contains(&page),
        }
    }

    /// Check if a zero-based page index should be included.
    pub fn includes_index(&self, index: usize) -> bool {
        u32::try_from(index + 1)
            .map(|page| self.includes(page))
            .unwrap_or(false)
    }

    /// Parse a page selection string (e.g., "1-10", "1,3,5,7-10").
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();

        if s.is_empty() || s == "all" {
            return Ok(PageSelection::All);
        }

        // Simple range (e.g., "1-10")
        if let Some((start, end)) = s.split_once('-') {
            if !start.contains(',') && !end.contains(',') {
                let start: u32 = start.trim().parse().map_err(|_| "Invalid start page")?;
                let end: u32 = end.trim().parse().map_err(|_| "Invalid end page")?;
                if start == 0 || end < start {
                    return Err(format!("Invalid page range {}-{}", start, end));
                }
                return Ok(PageSelection::Range(start..=end));
            }
        }

        let mut pages = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if let Some((start, end)) = part.split_once('-') {
                let start: u32 = start.trim().parse().map_err(|_| "Invalid page number")?;
                let end: u32 = end.trim().parse().map_err(|_| "Invalid page number")?;
                pages.extend(start..=end);
            } else {
                pages.push(part.parse().map_err(|_| "Invalid page number")?);
            }
        }

        if pages.contains(&0) {
            return Err("Page numbers start at 1".to_string());
        }
        pages.sort_unstable();
        pages.dedup();
        Ok(PageSelection::Pages(pages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_options_builder() {
        let options = RenderOptions::new()
            .with_max_heading(9)
            .with_figure_placeholders(false)
            .with_table_fallback(TableFallback::Html);

        assert_eq!(options.max_heading_level, 6);
        assert!(!options.figure_placeholders);
        assert_eq!(options.table_fallback, TableFallback::Html);
    }

    #[test]
    fn test_page_selection_includes() {
        let range = PageSelection::Range(5..=10);
        assert!(!range.includes(4));
        assert!(range.includes(5));
        assert!(range.includes(10));
        assert!(!range.includes(11));

        let pages = PageSelection::Pages(vec![1, 3]);
        assert!(pages.includes_index(0));
        assert!(!pages.includes_index(1));
        assert!(pages.includes_index(2));
    }

    #[test]
    fn test_page_selection_parse() {
        assert_eq!(PageSelection::parse("all").unwrap(), PageSelection::All);
        assert_eq!(PageSelection::parse("1-10").unwrap(), PageSelection::Range(1..=10));
        assert_eq!(
            PageSelection::parse("7,1-3,3").unwrap(),
            PageSelection::Pages(vec![1, 2, 3, 7])
        );
        assert!(PageSelection::parse("0").is_err());
        assert!(PageSelection::parse("5-2").is_err());
        assert!(PageSelection::parse("x").is_err());
    }
}
