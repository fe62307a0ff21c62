//! Markdown rendering of the section tree.

use crate::error::Result;
use crate::model::{ContentItem, Document, Figure, FigureSource, Page, Table};

use super::{RenderOptions, TableFallback};

/// Convert a document to Markdown.
pub fn to_markdown(doc: &Document, options: &RenderOptions) -> Result<String> {
    MarkdownRenderer::new(options.clone()).render(doc)
}

/// Convert a single page to Markdown.
pub fn page_to_markdown(page: &Page, options: &RenderOptions) -> Result<String> {
    let renderer = MarkdownRenderer::new(options.clone());
    let mut output = String::new();
    renderer.render_page(&mut output, page);
    Ok(output.trim().to_string())
}

/// Markdown renderer.
pub struct MarkdownRenderer {
    options: RenderOptions,
}

impl MarkdownRenderer {
    /// Create a new Markdown renderer.
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Render the selected pages of a document.
    pub fn render(&self, doc: &Document) -> Result<String> {
        let mut output = String::new();
        for page in &doc.pages {
            if !self.options.pages.includes_index(page.index) {
                continue;
            }
            if self.options.page_markers {
                output.push_str(&format!("<!-- page {} -->\n\n", page.index + 1));
            }
            self.render_page(&mut output, page);
        }
        Ok(output.trim().to_string())
    }

    fn render_page(&self, output: &mut String, page: &Page) {
        for section in &page.sections {
            if let Some(h) = section.heading.and_then(|h| page.paragraphs.get(h)) {
                let level = section.level.clamp(1, self.options.max_heading_level);
                output.push_str(&"#".repeat(level as usize));
                output.push(' ');
                output.push_str(&self.escape(&h.text()));
                output.push_str("\n\n");
            }
            for item in &section.items {
                self.render_item(output, page, *item);
            }
        }
    }

    fn render_item(&self, output: &mut String, page: &Page, item: ContentItem) {
        match item {
            ContentItem::Paragraph(i) => {
                if let Some(p) = page.paragraphs.get(i) {
                    let text = p.text();
                    if !text.is_empty() {
                        output.push_str(&self.escape(&text));
                        output.push_str("\n\n");
                    }
                }
            }
            ContentItem::Figure(i) => {
                if let Some(figure) = page.figures.get(i) {
                    self.render_figure(output, page, i, figure);
                }
            }
            ContentItem::Table(i) => {
                if let Some(table) = page.tables.get(i) {
                    if let Some(caption) = page.table_caption(i) {
                        output.push_str(&format!("*{}*\n\n", self.escape(&caption.text)));
                    }
                    self.render_table(output, table);
                }
            }
        }
    }

    fn render_figure(&self, output: &mut String, page: &Page, index: usize, figure: &Figure) {
        if !self.options.figure_placeholders {
            return;
        }
        let kind = match figure.source {
            FigureSource::Vector => "vector figure",
            FigureSource::Raster => "image",
            FigureSource::Mixed => "figure",
        };
        let alt = page
            .figure_caption(index)
            .map(|c| self.escape(&c.text))
            .unwrap_or_else(|| format!("{} {}", kind, index + 1));
        let b = &figure.bbox;
        output.push_str(&format!(
            "![{}](#page{}-figure{} \"{:.0},{:.0} {:.0}x{:.0}\")\n\n",
            alt,
            page.index + 1,
            index + 1,
            b.x0,
            b.y0,
            b.width(),
            b.height()
        ));
    }

    fn render_table(&self, output: &mut String, table: &Table) {
        if table.is_empty() {
            return;
        }
        if table.has_merged_cells() && self.options.table_fallback == TableFallback::Html {
            self.render_table_html(output, table);
        } else {
            self.render_table_markdown(output, table);
        }
    }

    fn render_table_markdown(&self, output: &mut String, table: &Table) {
        for (i, row) in table.to_grid().iter().enumerate() {
            output.push('|');
            for text in row {
                output.push_str(&format!(" {} |", self.escape(text.trim())));
            }
            output.push('\n');

            // First row doubles as the header
            if i == 0 {
                output.push('|');
                output.push_str(&" --- |".repeat(row.len()));
                output.push('\n');
            }
        }
        output.push('\n');
    }

    fn render_table_html(&self, output: &mut String, table: &Table) {
        output.push_str("<table>\n");
        for row in 0..table.rows {
            output.push_str("<tr>");
            for cell in table.row_cells(row) {
                let mut attrs = String::new();
                if cell.row_span > 1 {
                    attrs.push_str(&format!(" rowspan=\"{}\"", cell.row_span));
                }
                if cell.col_span > 1 {
                    attrs.push_str(&format!(" colspan=\"{}\"", cell.col_span));
                }
                output.push_str(&format!("<td{}>{}</td>", attrs, escape_html(&cell.text)));
            }
            output.push_str("</tr>\n");
        }
        output.push_str("</table>\n\n");
    }

    fn escape(&self, text: &str) -> String {
        if self.options.escape_markdown {
            escape_markdown(text)
        } else {
            text.to_string()
        }
    }
}

/// Escape characters that could be misinterpreted as Markdown syntax.
fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '`' | '*' | '_' | '[' | ']' | '|' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }
    result
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    result
}
