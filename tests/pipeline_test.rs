//! End-to-end tests of the layout pipeline on synthetic pages.

use pagelayout::geometry::Rect;
use pagelayout::model::{
    CaptionTarget, ContentItem, FigureSource, PageGeometry, PaintKind, RasterRegion, TableKind, TextSpan,
    VectorPath,
};
use pagelayout::{LayoutAnalyzer, LayoutConfig, Page, PageInput};

fn body_span(text: &str, x0: f32, x1: f32, y: f32) -> TextSpan {
    TextSpan::new(text, Rect::new(x0, y, x1, y + 10.0), 10.0, "Helvetica")
}

/// Full-width body lines below `y`, keeping the page in a single column.
fn add_body(input: &mut PageInput, y: f32, lines: usize) {
    for i in 0..lines {
        let text = format!("Body line {} of the running text on this page.", i);
        input.add_span(body_span(&text, 72.0, 540.0, y + i as f32 * 14.0));
    }
}

fn analyze(input: &PageInput) -> Page {
    LayoutAnalyzer::new().analyze_page(input).unwrap()
}

fn two_column_page() -> PageInput {
    let mut input = PageInput::new(0, PageGeometry::letter());
    input.add_span(TextSpan::new(
        "Results Overview",
        Rect::new(100.0, 10.0, 450.0, 28.0),
        18.0,
        "Helvetica-Bold",
    ));
    for i in 0..30 {
        let y = 50.0 + i as f32 * 14.0;
        input.add_span(body_span(&format!("left column line {}", i), 0.0, 250.0, y));
        input.add_span(body_span(&format!("right column line {}", i), 300.0, 550.0, y));
    }
    input
}

#[test]
fn test_two_column_reading_order() {
    let page = analyze(&two_column_page());

    assert_eq!(page.columns.len(), 2);
    assert_eq!(page.sections.len(), 1);

    let section = &page.sections[0];
    let heading = section.heading.unwrap();
    assert_eq!(page.paragraphs[heading].text(), "Results Overview");
    assert_eq!(page.paragraphs[heading].heading_level(), Some(1));

    let columns: Vec<usize> = section
        .items
        .iter()
        .filter_map(|item| match item {
            ContentItem::Paragraph(i) => Some(page.paragraphs[*i].column),
            _ => None,
        })
        .collect();
    assert!(!columns.is_empty());
    assert!(columns.windows(2).all(|w| w[0] <= w[1]), "left column must be read first");
    assert!(columns.contains(&0) && columns.contains(&1));
}

#[test]
fn test_every_paragraph_appears_once_in_reading_order() {
    let page = analyze(&two_column_page());

    let mut seen = vec![0usize; page.paragraphs.len()];
    for section in &page.sections {
        if let Some(h) = section.heading {
            seen[h] += 1;
        }
        for item in &section.items {
            if let ContentItem::Paragraph(i) = item {
                seen[*i] += 1;
            }
        }
    }
    assert!(seen.iter().all(|&n| n == 1));
}

#[test]
fn test_analysis_is_deterministic() {
    let input = two_column_page();
    let first = analyze(&input);
    let second = analyze(&input);
    assert_eq!(first, second);

    let parallel = LayoutAnalyzer::new().analyze_pages(&[input.clone(), input.clone()]).unwrap();
    for result in parallel {
        assert_eq!(result.unwrap(), first);
    }
}

#[test]
fn test_vector_cluster_and_raster_form_one_mixed_figure() {
    let mut input = PageInput::new(0, PageGeometry::letter());
    for i in 0..5 {
        for j in 0..5 {
            let (x, y) = (100.0 + i as f32 * 8.0, 100.0 + j as f32 * 8.0);
            input.add_path(VectorPath::new(Rect::new(x, y, x + 8.0, y + 8.0), PaintKind::Stroke, 4));
        }
    }
    input.add_raster(RasterRegion::new(Rect::new(100.0, 105.0, 140.0, 135.0), "Im1"));
    add_body(&mut input, 400.0, 8);

    let page = analyze(&input);

    assert_eq!(page.figures.len(), 1);
    assert_eq!(page.figures[0].source, FigureSource::Mixed);
    assert_eq!(page.figures[0].paths.len(), 25);
    assert_eq!(page.figures[0].rasters, vec![0]);
}

#[test]
fn test_ruled_table_claims_its_text() {
    let mut input = PageInput::new(0, PageGeometry::letter());
    for y in [100.0, 120.0, 140.0, 160.0] {
        input.add_path(VectorPath::line(50.0, y, 250.0, y));
    }
    for x in [50.0, 150.0, 250.0] {
        input.add_path(VectorPath::line(x, 100.0, x, 160.0));
    }
    for (row, y) in [105.0, 125.0, 145.0].into_iter().enumerate() {
        input.add_span(body_span(&format!("k{}", row), 60.0, 90.0, y));
        input.add_span(body_span(&format!("v{}", row), 160.0, 190.0, y));
    }
    add_body(&mut input, 300.0, 10);

    let page = analyze(&input);

    assert_eq!(page.tables.len(), 1);
    let table = &page.tables[0];
    assert_eq!(table.kind, TableKind::Ruled);
    assert_eq!((table.rows, table.cols), (3, 2));
    assert_eq!(
        table.to_grid(),
        vec![vec!["k0", "v0"], vec!["k1", "v1"], vec!["k2", "v2"]]
    );
    assert!(page.figures.is_empty(), "table rules must not become a figure");
    assert!(page.paragraphs.iter().all(|p| p.text().starts_with("Body line")));

    let in_order = page.reading_order();
    assert_eq!(in_order.iter().filter(|i| matches!(i, ContentItem::Table(0))).count(), 1);
}

fn captioned_figure_page(caption_y: f32) -> PageInput {
    let mut input = PageInput::new(0, PageGeometry::letter());
    input.add_raster(RasterRegion::new(Rect::new(100.0, 100.0, 300.0, 300.0), "Im1"));
    input.add_span(body_span("Figure 1: Sales by region", 100.0, 260.0, caption_y));
    add_body(&mut input, 500.0, 10);
    input
}

#[test]
fn test_caption_below_figure_is_linked() {
    let page = analyze(&captioned_figure_page(306.0));

    assert_eq!(page.figures.len(), 1);
    assert_eq!(page.captions.len(), 1);
    let caption = &page.captions[0];
    assert_eq!(caption.target, CaptionTarget::Figure(0));
    assert!(caption.pattern_matched);
    assert_eq!(caption.text, "Figure 1: Sales by region");
    assert_eq!(page.figures[0].caption, Some(0));
    assert_eq!(page.figure_caption(0).map(|c| c.paragraph), Some(caption.paragraph));
}

#[test]
fn test_far_caption_is_not_linked() {
    let page = analyze(&captioned_figure_page(350.0));

    assert_eq!(page.figures.len(), 1);
    assert!(page.captions.is_empty());
    assert_eq!(page.figures[0].caption, None);
}

#[test]
fn test_caption_targets_are_unique() {
    let mut input = captioned_figure_page(306.0);
    input.add_raster(RasterRegion::new(Rect::new(320.0, 100.0, 520.0, 300.0), "Im2"));
    input.add_span(body_span("Figure 2: Costs by region", 320.0, 480.0, 306.0));

    let page = analyze(&input);

    assert_eq!(page.figures.len(), 2);
    let mut targets: Vec<CaptionTarget> = page.captions.iter().map(|c| c.target).collect();
    let count = targets.len();
    targets.sort_by_key(|t| match t {
        CaptionTarget::Figure(i) => *i,
        CaptionTarget::Table(i) => 100 + *i,
    });
    targets.dedup();
    assert_eq!(targets.len(), count);

    let mut paragraphs: Vec<usize> = page.captions.iter().map(|c| c.paragraph).collect();
    paragraphs.sort_unstable();
    paragraphs.dedup();
    assert_eq!(paragraphs.len(), count);
}

#[test]
fn test_disabling_borderless_tables() {
    let mut input = PageInput::new(0, PageGeometry::letter());
    for r in 0..4 {
        let y = 100.0 + r as f32 * 16.0;
        input.add_span(body_span("key", 72.0, 102.0, y));
        input.add_span(body_span("val", 172.0, 202.0, y));
        input.add_span(body_span("more", 272.0, 302.0, y));
    }
    add_body(&mut input, 300.0, 10);

    let page = LayoutAnalyzer::new()
        .with_config(LayoutConfig::default().without_borderless_tables())
        .analyze_page(&input)
        .unwrap();
    assert!(page.tables.is_empty());
}
