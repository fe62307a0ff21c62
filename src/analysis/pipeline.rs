//! The per-page layout pipeline.
//!
//! Stages run strictly in order: ingest, columns, text blocks, tables,
//! figures, captions, reading order. A page's result is either a complete
//! [`Page`] (possibly with diagnostics) or an error for that page alone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Diagnostic, Error, Result, Stage};
use crate::geometry::Rect;
use crate::model::{Page, PageInput, Paragraph, TextSpan};

use super::captions::CaptionLinker;
use super::columns::ColumnDetector;
use super::figures::FigureDetector;
use super::options::LayoutConfig;
use super::reading_order::ReadingOrderAssembler;
use super::tables::{claimed_spans, TableDetector};
use super::text_blocks::TextBlockAssembler;

/// Shared flag for abandoning work between stages.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create a flag that is not set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs every stage over one page at a time.
pub struct LayoutPipeline<'a> {
    config: &'a LayoutConfig,
}

impl<'a> LayoutPipeline<'a> {
    /// Create a pipeline after checking the configuration.
    pub fn new(config: &'a LayoutConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Analyze one page.
    pub fn run(&self, input: &PageInput, cancel: Option<&CancelFlag>) -> Result<Page> {
        let index = input.index;
        input.geometry.validate(index)?;

        let check = |stage: Stage| -> Result<()> {
            match cancel {
                Some(flag) if flag.is_cancelled() => {
                    log::debug!("LayoutPipeline: page {} cancelled before {:?}", index, stage);
                    Err(Error::Cancelled(index))
                }
                _ => Ok(()),
            }
        };

        let mut page = Page::new(index, input.geometry);
        ingest(input, &mut page);
        let scale = page.geometry.scale();

        check(Stage::Columns)?;
        let layout =
            ColumnDetector::new(&self.config.columns).detect(&page.geometry, &page.spans, &mut page.diagnostics);
        page.columns = layout.columns.clone();

        check(Stage::TextBlocks)?;
        let assembler = TextBlockAssembler::new(&self.config.text, scale);
        let paragraphs = assembler.assemble(&page.spans, &layout);

        check(Stage::Tables)?;
        page.tables = TableDetector::new(&self.config.tables, scale).detect(
            &page.spans,
            &page.paths,
            &layout,
            &mut page.diagnostics,
        );
        let claimed = claimed_spans(&page.tables, page.spans.len());
        page.paragraphs = remove_table_text(&assembler, &page.spans, paragraphs, &claimed);

        check(Stage::Figures)?;
        page.figures = FigureDetector::new(&self.config.figures).detect(
            &page.geometry,
            &page.paths,
            &page.rasters,
            &page.tables,
            &mut page.diagnostics,
        );

        check(Stage::Captions)?;
        page.captions = CaptionLinker::new(&self.config.captions, scale)?.link(
            &page.paragraphs,
            &mut page.figures,
            &mut page.tables,
        );

        check(Stage::ReadingOrder)?;
        page.sections = ReadingOrderAssembler::new(&self.config.reading_order).assemble(
            &page.columns,
            &page.paragraphs,
            &page.figures,
            &page.tables,
            &page.captions,
        );

        for diagnostic in &page.diagnostics {
            log::warn!(
                "page {}: {:?} in {:?}: {}",
                index,
                diagnostic.kind,
                diagnostic.stage,
                diagnostic.message
            );
        }
        log::debug!("LayoutPipeline: page {} done: {:?}", index, page.stats());
        Ok(page)
    }
}

/// Analyze one page with the given configuration.
pub fn analyze_page(input: &PageInput, config: &LayoutConfig, cancel: Option<&CancelFlag>) -> Result<Page> {
    LayoutPipeline::new(config)?.run(input, cancel)
}

/// Copy usable primitives into the page, recording what was dropped.
///
/// Boxes are normalised on the way in. Straight rules keep their zero
/// thickness; every other primitive needs a positive area.
fn ingest(input: &PageInput, page: &mut Page) {
    let mut spans = Vec::with_capacity(input.spans.len());
    for (i, span) in input.spans.iter().enumerate() {
        match clean_span(span) {
            Ok(span) if span.text.trim().is_empty() => {
                log::debug!("LayoutPipeline: skipping blank span {}", i);
            }
            Ok(span) => spans.push(span),
            Err(reason) => page.diagnostics.push(dropped("text span", i, reason)),
        }
    }

    let mut paths = Vec::with_capacity(input.paths.len());
    for (i, path) in input.paths.iter().enumerate() {
        let mut path = path.clone();
        match clean_box(&path.bbox, true) {
            Ok(bbox) => {
                path.bbox = bbox;
                paths.push(path);
            }
            Err(reason) => page.diagnostics.push(dropped("vector path", i, reason)),
        }
    }

    let mut rasters = Vec::with_capacity(input.rasters.len());
    for (i, raster) in input.rasters.iter().enumerate() {
        let mut raster = raster.clone();
        match clean_box(&raster.bbox, false) {
            Ok(bbox) => {
                raster.bbox = bbox;
                rasters.push(raster);
            }
            Err(reason) => page.diagnostics.push(dropped("raster region", i, reason)),
        }
    }

    log::debug!(
        "LayoutPipeline: page {} ingested {} spans, {} paths, {} rasters",
        input.index,
        spans.len(),
        paths.len(),
        rasters.len()
    );
    page.spans = spans;
    page.paths = paths;
    page.rasters = rasters;
}

fn dropped(what: &str, index: usize, reason: String) -> Diagnostic {
    let err = Error::InputMalformed(format!("{} {} dropped: {}", what, index, reason));
    Diagnostic::from_error(Stage::Ingest, &err)
}

/// Normalised copy of a span with usable geometry and font size.
fn clean_span(span: &TextSpan) -> std::result::Result<TextSpan, String> {
    let mut span = span.clone();
    span.bbox = clean_box(&span.bbox, false)?;
    if !(span.font_size.is_finite() && span.font_size > 0.0) {
        return Err(format!("invalid font size {}", span.font_size));
    }
    Ok(span)
}

/// Normalised box; `rule` admits zero thickness along one axis.
fn clean_box(bbox: &Rect, rule: bool) -> std::result::Result<Rect, String> {
    if !is_finite(bbox) {
        return Err("non-finite box".to_string());
    }
    let bbox = normalize(bbox);
    let usable = if rule {
        bbox.width() > 0.0 || bbox.height() > 0.0
    } else {
        !bbox.is_degenerate()
    };
    if usable {
        Ok(bbox)
    } else {
        Err(format!("degenerate box ({}, {}, {}, {})", bbox.x0, bbox.y0, bbox.x1, bbox.y1))
    }
}

fn is_finite(rect: &Rect) -> bool {
    rect.x0.is_finite() && rect.y0.is_finite() && rect.x1.is_finite() && rect.y1.is_finite()
}

fn normalize(rect: &Rect) -> Rect {
    Rect::new(rect.x0, rect.y0, rect.x1, rect.y1)
}

/// Drop table text from the paragraphs.
///
/// A paragraph made only of table spans is removed; any other paragraph
/// touching a table is rebuilt from its remaining spans, so no free span
/// is lost.
fn remove_table_text(
    assembler: &TextBlockAssembler<'_>,
    spans: &[TextSpan],
    paragraphs: Vec<Paragraph>,
    claimed: &[bool],
) -> Vec<Paragraph> {
    let before = paragraphs.len();
    let kept: Vec<Paragraph> = paragraphs
        .into_iter()
        .filter_map(|p| {
            let all: Vec<usize> = p.span_indices().collect();
            let free: Vec<usize> = all.iter().copied().filter(|&i| !claimed[i]).collect();
            if free.len() == all.len() {
                return Some(p);
            }
            if free.is_empty() {
                return None;
            }
            let lines = assembler.group_into_lines(spans, &free);
            Some(Paragraph::from_lines(lines, p.column, p.spanning, p.kind))
        })
        .collect();

    if kept.len() != before {
        log::debug!("LayoutPipeline: {} paragraphs absorbed by tables", before - kept.len());
    }
    kept
}
