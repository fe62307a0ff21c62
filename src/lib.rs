//! # pagelayout
//!
//! Geometric layout analysis for rendered PDF pages.
//!
//! Given the text spans, vector paths and raster regions of a page (as
//! extracted by a PDF toolkit), this library recovers the page's logical
//! structure: column bands, paragraphs and headings, figures, ruled and
//! borderless tables, captions, and a reading-ordered section tree.
//!
//! ## Quick Start
//!
//! ```
//! use pagelayout::geometry::Rect;
//! use pagelayout::model::{PageGeometry, PageInput, TextSpan};
//! use pagelayout::LayoutAnalyzer;
//!
//! fn main() -> pagelayout::Result<()> {
//!     let mut input = PageInput::new(0, PageGeometry::letter());
//!     input.add_span(TextSpan::new("Introduction", Rect::new(72.0, 72.0, 200.0, 92.0), 18.0, "Helvetica-Bold"));
//!     input.add_span(TextSpan::new("Body text of the page.", Rect::new(72.0, 110.0, 300.0, 122.0), 10.0, "Helvetica"));
//!
//!     let page = LayoutAnalyzer::new().analyze_page(&input)?;
//!     assert_eq!(page.columns.len(), 1);
//!     assert_eq!(page.sections.len(), 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Columns**: projection-profile gutter detection
//! - **Text blocks**: lines, paragraphs and font-ranked headings
//! - **Figures**: DBSCAN over vector paths plus raster regions, merged by NMS
//! - **Tables**: ruled grids from rules, borderless grids from text alignment
//! - **Captions**: label patterns and proximity, linked one to one
//! - **Parallel processing**: pages analyzed independently with Rayon
//! - **Export**: JSON, Markdown, CSV and an SVG debug overlay

pub mod analysis;
pub mod error;
pub mod geometry;
pub mod model;
pub mod render;

pub use analysis::{
    analyze_page, AnalyzeOptions, CancelFlag, JsonSource, LayoutConfig, LayoutPipeline, PrimitiveSource,
};
pub use error::{Diagnostic, DiagnosticKind, Error, Result, Stage};
pub use model::{Document, Page, PageFailure, PageInput};
pub use render::{JsonFormat, PageSelection, RenderOptions};

use std::path::Path;
use std::thread;

use crossbeam_channel::{bounded, Receiver};
use rayon::prelude::*;

/// Outcome of one page in a batch: the page index and its result.
pub type PageResult = (usize, Result<Page>);

/// Analyze every page of a primitives JSON file with default settings.
///
/// # Example
///
/// ```no_run
/// let doc = pagelayout::analyze_file("primitives.json").unwrap();
/// println!("{} pages, {} tables", doc.pages.len(), doc.stats().tables);
/// ```
pub fn analyze_file<P: AsRef<Path>>(path: P) -> Result<Document> {
    let source = JsonSource::open(path.as_ref())?;
    let mut doc = LayoutAnalyzer::new().analyze_source(&source)?;
    doc.source = Some(path.as_ref().display().to_string());
    Ok(doc)
}

/// Builder for analyzing pages and multi-page sources.
///
/// # Example
///
/// ```
/// use pagelayout::{LayoutAnalyzer, LayoutConfig, PageSelection};
///
/// let analyzer = LayoutAnalyzer::new()
///     .with_config(LayoutConfig::default().without_borderless_tables())
///     .with_pages(PageSelection::Range(1..=3))
///     .sequential();
/// assert!(!analyzer.options().parallel);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LayoutAnalyzer {
    options: AnalyzeOptions,
    cancel: Option<CancelFlag>,
}

impl LayoutAnalyzer {
    /// Create an analyzer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all options.
    pub fn with_options(mut self, options: AnalyzeOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the stage configuration.
    pub fn with_config(mut self, config: LayoutConfig) -> Self {
        self.options = self.options.with_config(config);
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.options = self.options.sequential();
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.options = self.options.with_pages(pages);
        self
    }

    /// Attach a cancellation flag checked between stages.
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Current options.
    pub fn options(&self) -> &AnalyzeOptions {
        &self.options
    }

    /// Analyze a single page.
    pub fn analyze_page(&self, input: &PageInput) -> Result<Page> {
        LayoutPipeline::new(&self.options.config)?.run(input, self.cancel.as_ref())
    }

    /// Analyze independent pages, in parallel unless disabled.
    ///
    /// Results keep the input order. Page selection is not applied here.
    pub fn analyze_pages(&self, inputs: &[PageInput]) -> Result<Vec<Result<Page>>> {
        let pipeline = LayoutPipeline::new(&self.options.config)?;
        let cancel = self.cancel.as_ref();
        let results = if self.options.parallel {
            inputs.par_iter().map(|input| pipeline.run(input, cancel)).collect()
        } else {
            inputs.iter().map(|input| pipeline.run(input, cancel)).collect()
        };
        Ok(results)
    }

    /// Analyze the selected pages of a source into a document.
    ///
    /// A failing page is recorded in [`Document::failures`] and does not
    /// abort the others. Only an invalid configuration fails the call.
    pub fn analyze_source<S: PrimitiveSource + ?Sized>(&self, source: &S) -> Result<Document> {
        let pipeline = LayoutPipeline::new(&self.options.config)?;
        let indices = self.selected_pages(source.page_count());
        log::debug!(
            "LayoutAnalyzer: analyzing {} of {} pages",
            indices.len(),
            source.page_count()
        );

        let run = |index: usize| -> PageResult {
            let result = source
                .load_page(index)
                .and_then(|input| pipeline.run(&input, self.cancel.as_ref()));
            (index, result)
        };
        let results: Vec<PageResult> = if self.options.parallel {
            indices.par_iter().map(|&i| run(i)).collect()
        } else {
            indices.iter().map(|&i| run(i)).collect()
        };

        let mut doc = Document::new();
        doc.page_count = source.page_count();
        for (index, result) in results {
            match result {
                Ok(page) => doc.add_page(page),
                Err(e) => {
                    log::warn!("page {} failed: {}", index, e);
                    doc.add_failure(PageFailure::new(index, e.to_string()));
                }
            }
        }
        Ok(doc)
    }

    /// Analyze the selected pages on a background thread.
    ///
    /// Results arrive on the returned channel as pages finish, not in page
    /// order. The channel closes once every page was sent.
    pub fn analyze_stream<S>(&self, source: S) -> Result<Receiver<PageResult>>
    where
        S: PrimitiveSource + Send + 'static,
    {
        self.options.config.validate()?;
        let indices = self.selected_pages(source.page_count());
        let (tx, rx) = bounded::<PageResult>(indices.len().clamp(1, 64));
        let options = self.options.clone();
        let cancel = self.cancel.clone();

        thread::spawn(move || {
            let pipeline = match LayoutPipeline::new(&options.config) {
                Ok(p) => p,
                Err(_) => return,
            };
            let run = |index: usize| {
                let result = source
                    .load_page(index)
                    .and_then(|input| pipeline.run(&input, cancel.as_ref()));
                // The receiver may hang up early; remaining pages are skipped.
                let _ = tx.send((index, result));
            };
            if options.parallel {
                indices.into_par_iter().for_each(run);
            } else {
                indices.into_iter().for_each(run);
            }
        });

        Ok(rx)
    }

    fn selected_pages(&self, page_count: usize) -> Vec<usize> {
        (0..page_count)
            .filter(|&i| self.options.pages.includes_index(i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::model::{PageGeometry, TextSpan};

    fn page(index: usize) -> PageInput {
        let mut input = PageInput::new(index, PageGeometry::letter());
        input.add_span(TextSpan::new(
            format!("Page {} body text", index),
            Rect::new(72.0, 72.0, 300.0, 84.0),
            10.0,
            "Helvetica",
        ));
        input
    }

    #[test]
    fn test_analyze_source_records_failures() {
        let mut bad = page(1);
        bad.geometry.dpi = 0.0;
        let source = vec![page(0), bad, page(2)];

        let doc = LayoutAnalyzer::new().analyze_source(&source).unwrap();

        assert_eq!(doc.page_count, 3);
        assert_eq!(doc.pages.iter().map(|p| p.index).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(doc.failures.len(), 1);
        assert_eq!(doc.failures[0].index, 1);
    }

    #[test]
    fn test_page_selection_applies() {
        let source = vec![page(0), page(1), page(2)];
        let doc = LayoutAnalyzer::new()
            .with_pages(PageSelection::Pages(vec![2]))
            .analyze_source(&source)
            .unwrap();
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].index, 1);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let inputs: Vec<PageInput> = (0..6).map(page).collect();
        let parallel = LayoutAnalyzer::new().analyze_pages(&inputs).unwrap();
        let sequential = LayoutAnalyzer::new().sequential().analyze_pages(&inputs).unwrap();

        let parallel: Vec<Page> = parallel.into_iter().map(|r| r.unwrap()).collect();
        let sequential: Vec<Page> = sequential.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_stream_delivers_every_page() {
        let source: Vec<PageInput> = (0..5).map(page).collect();
        let rx = LayoutAnalyzer::new().analyze_stream(source).unwrap();

        let results: Vec<PageResult> = rx.iter().collect();
        assert!(results.iter().all(|(_, r)| r.is_ok()));
        let mut indices: Vec<usize> = results.iter().map(|(i, _)| *i).collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_cancel_flag() {
        let flag = CancelFlag::new();
        flag.cancel();
        let result = LayoutAnalyzer::new().with_cancel_flag(flag).analyze_page(&page(0));
        assert!(matches!(result, Err(Error::Cancelled(0))));
    }
}
