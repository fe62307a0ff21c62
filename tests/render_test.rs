//! Tests for loading primitives from disk and rendering the results.

use std::fs;

use pagelayout::render::{self, TableFallback, TABLE_COLOR};
use pagelayout::{analyze_file, Error, JsonFormat, JsonSource, LayoutAnalyzer, PrimitiveSource, RenderOptions};
use tempfile::tempdir;

const GEOMETRY: &str = r#""geometry": {"width_px": 612, "height_px": 792, "width_pt": 612, "height_pt": 792, "dpi": 72}"#;

fn span(text: &str, x0: f32, y0: f32, x1: f32, size: f32) -> String {
    format!(
        r#"{{"text": "{}", "bbox": {{"x0": {}, "y0": {}, "x1": {}, "y1": {}}}, "font_size": {}, "font_name": "Helvetica"}}"#,
        text,
        x0,
        y0,
        x1,
        y0 + size,
        size
    )
}

fn rule(x0: f32, y0: f32, x1: f32, y1: f32) -> String {
    let angle = if y0 == y1 { 0.0 } else { 90.0 };
    format!(
        r#"{{"bbox": {{"x0": {}, "y0": {}, "x1": {}, "y1": {}}}, "line": {{"angle_deg": {}}}}}"#,
        x0, y0, x1, y1, angle
    )
}

/// Page one has a heading, body text and a ruled 2x2 table; page two lacks paths.
fn primitives_json() -> String {
    let mut spans = vec![span("Quarterly Report", 72.0, 40.0, 300.0, 18.0)];
    for i in 0..6 {
        spans.push(span(
            &format!("Body line {} with enough words to fill the measure.", i),
            72.0,
            300.0 + i as f32 * 14.0,
            540.0,
            10.0,
        ));
    }
    spans.push(span("Region", 60.0, 105.0, 100.0, 10.0));
    spans.push(span("Total, USD", 160.0, 105.0, 220.0, 10.0));
    spans.push(span("North", 60.0, 125.0, 100.0, 10.0));
    spans.push(span("42", 160.0, 125.0, 180.0, 10.0));

    let mut paths = Vec::new();
    for y in [100.0, 120.0, 140.0] {
        paths.push(rule(50.0, y, 250.0, y));
    }
    for x in [50.0, 150.0, 250.0] {
        paths.push(rule(x, 100.0, x, 140.0));
    }

    format!(
        r#"{{"pages": [
            {{ {g}, "spans": [{spans}], "paths": [{paths}] }},
            {{ {g}, "spans": [] }}
        ]}}"#,
        g = GEOMETRY,
        spans = spans.join(","),
        paths = paths.join(",")
    )
}

#[test]
fn test_analyze_file_records_missing_primitives() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("primitives.json");
    fs::write(&path, primitives_json()).unwrap();

    let doc = analyze_file(&path).unwrap();

    assert_eq!(doc.page_count, 2);
    assert_eq!(doc.pages.len(), 1);
    assert_eq!(doc.failures.len(), 1);
    assert_eq!(doc.failures[0].index, 1);
    assert_eq!(doc.source.as_deref(), Some(path.display().to_string().as_str()));
    assert_eq!(doc.stats().tables, 1);
}

#[test]
fn test_json_source_errors() {
    let source = JsonSource::from_str(&primitives_json()).unwrap();
    assert!(matches!(source.load_page(1), Err(Error::MissingPrimitives(1, _))));
    assert!(matches!(source.load_page(5), Err(Error::PageOutOfRange(5, 2))));
    assert!(JsonSource::from_str("{\"pages\": 3}").is_err());
}

#[test]
fn test_json_output_is_valid() {
    let source = JsonSource::from_str(&primitives_json()).unwrap();
    let doc = LayoutAnalyzer::new().analyze_source(&source).unwrap();

    let json = render::to_json(&doc, JsonFormat::Compact).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["pages"].as_array().map(|p| p.len()), Some(1));
    assert_eq!(value["pages"][0]["tables"][0]["rows"], 2);
}

#[test]
fn test_markdown_output() {
    let source = JsonSource::from_str(&primitives_json()).unwrap();
    let doc = LayoutAnalyzer::new().analyze_source(&source).unwrap();

    let md = render::to_markdown(&doc, &RenderOptions::default()).unwrap();
    assert!(md.contains("# Quarterly Report"));
    assert!(md.contains("| Region | Total, USD |"));
    assert!(md.contains("Body line 0"));

    // Without merged cells the HTML fallback is not needed
    let html = render::to_markdown(&doc, &RenderOptions::default().with_table_fallback(TableFallback::Html)).unwrap();
    assert!(!html.contains("<table>"));
    assert!(html.contains("| North | 42 |"));
}

#[test]
fn test_csv_and_overlay_files() {
    let source = JsonSource::from_str(&primitives_json()).unwrap();
    let doc = LayoutAnalyzer::new().analyze_source(&source).unwrap();
    let page = &doc.pages[0];
    let dir = tempdir().unwrap();

    for (name, csv) in render::page_tables_to_csv(page).unwrap() {
        fs::write(dir.path().join(name), csv).unwrap();
    }
    let csv = fs::read_to_string(dir.path().join("page1_table1.csv")).unwrap();
    assert_eq!(csv, "Region,\"Total, USD\"\nNorth,42\n");

    let svg_path = dir.path().join("page1.svg");
    fs::write(&svg_path, render::page_to_svg(page, &RenderOptions::default())).unwrap();
    let svg = fs::read_to_string(svg_path).unwrap();
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains(TABLE_COLOR));
}
