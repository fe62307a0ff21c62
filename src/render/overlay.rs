//! SVG debug overlay of a page's layout.
//!
//! Boxes are drawn in page-pixel space with a fixed colour per element:
//! columns blue, text green, figures red, tables yellow. Labels number
//! elements from 1 in page order, and a legend in the top-left corner names
//! the colours.

use std::fmt::Write;

use crate::geometry::Rect;
use crate::model::Page;

use super::markdown::escape_html;
use super::RenderOptions;

/// Colour of column bands.
pub const COLUMN_COLOR: &str = "#1f6feb";
/// Colour of paragraphs and headings.
pub const TEXT_COLOR: &str = "#2da44e";
/// Colour of figures.
pub const FIGURE_COLOR: &str = "#cf222e";
/// Colour of tables.
pub const TABLE_COLOR: &str = "#d4a72c";

/// Legend entries in drawing order.
const LEGEND: [(&str, &str); 4] = [
    (COLUMN_COLOR, "Blue = Columns"),
    (TEXT_COLOR, "Green = Text Blocks"),
    (FIGURE_COLOR, "Red = Figures"),
    (TABLE_COLOR, "Yellow = Tables"),
];

/// Render the layout of a page as a standalone SVG document.
pub fn page_to_svg(page: &Page, options: &RenderOptions) -> String {
    let g = &page.geometry;
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.2} {h:.2}">"#,
        w = g.width_px,
        h = g.height_px
    );
    let _ = writeln!(svg, r#"<rect x="0" y="0" width="{:.2}" height="{:.2}" fill="white"/>"#, g.width_px, g.height_px);

    let _ = writeln!(svg, r#"<g id="columns" fill="{}" fill-opacity="0.06" stroke="{}">"#, COLUMN_COLOR, COLUMN_COLOR);
    for column in &page.columns {
        let label = format!("Col{}", column.index + 1);
        draw_box(&mut svg, &column.rect(g.height_px), &label, options.overlay_labels);
    }
    svg.push_str("</g>\n");

    let _ = writeln!(svg, r#"<g id="text" fill="none" stroke="{}">"#, TEXT_COLOR);
    for (i, paragraph) in page.paragraphs.iter().enumerate() {
        let label = match paragraph.heading_level() {
            Some(level) => format!("T{} h{}", i + 1, level),
            None => format!("T{}", i + 1),
        };
        draw_box(&mut svg, &paragraph.bbox, &label, options.overlay_labels);
    }
    svg.push_str("</g>\n");

    let _ = writeln!(svg, r#"<g id="figures" fill="none" stroke="{}" stroke-width="2">"#, FIGURE_COLOR);
    for (i, figure) in page.figures.iter().enumerate() {
        draw_box(&mut svg, &figure.bbox, &format!("FIGURE {}", i + 1), options.overlay_labels);
    }
    svg.push_str("</g>\n");

    let _ = writeln!(svg, r#"<g id="tables" fill="none" stroke="{}" stroke-width="2">"#, TABLE_COLOR);
    for (i, table) in page.tables.iter().enumerate() {
        let label = format!("TABLE {} ({}x{})", i + 1, table.rows, table.cols);
        draw_box(&mut svg, &table.bbox, &label, options.overlay_labels);
        for cell in &table.cells {
            let _ = writeln!(
                svg,
                r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" stroke-opacity="0.5" stroke-width="0.5"/>"#,
                cell.bbox.x0,
                cell.bbox.y0,
                cell.bbox.width(),
                cell.bbox.height()
            );
        }
    }
    svg.push_str("</g>\n");

    if options.overlay_labels {
        draw_legend(&mut svg);
    }
    svg.push_str("</svg>\n");
    svg
}

fn draw_legend(svg: &mut String) {
    let height = 18.0 + LEGEND.len() as f32 * 12.0;
    svg.push_str("<g id=\"legend\" font-size=\"9\">\n");
    let _ = writeln!(
        svg,
        r#"<rect x="4" y="4" width="112" height="{:.0}" fill="white" fill-opacity="0.85" stroke="black" stroke-width="0.5"/>"#,
        height
    );
    svg.push_str("<text x=\"8\" y=\"14\" font-weight=\"bold\">LEGEND</text>\n");
    for (i, (color, name)) in LEGEND.iter().enumerate() {
        let y = 18.0 + i as f32 * 12.0;
        let _ = writeln!(
            svg,
            r#"<rect x="8" y="{:.0}" width="8" height="8" fill="{}"/><text x="20" y="{:.0}" fill="{}">{}</text>"#,
            y,
            color,
            y + 8.0,
            color,
            name
        );
    }
    svg.push_str("</g>\n");
}

fn draw_box(svg: &mut String, rect: &Rect, label: &str, with_label: bool) {
    let _ = writeln!(
        svg,
        r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}"/>"#,
        rect.x0,
        rect.y0,
        rect.width(),
        rect.height()
    );
    if with_label {
        let _ = writeln!(
            svg,
            r#"<text x="{:.2}" y="{:.2}" font-size="8" stroke="none" fill-opacity="1">{}</text>"#,
            rect.x0 + 2.0,
            rect.y0 + 9.0,
            escape_html(label)
        );
    }
}
