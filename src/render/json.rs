//! JSON rendering of analyzed documents and pages.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Document, Page};

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Convert a document to JSON.
pub fn to_json(doc: &Document, format: JsonFormat) -> Result<String> {
    serialize(doc, format)
}

/// Convert a single page to JSON.
pub fn page_to_json(page: &Page, format: JsonFormat) -> Result<String> {
    serialize(page, format)
}

fn serialize<T: Serialize>(value: &T, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value),
        JsonFormat::Compact => serde_json::to_string(value),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PageGeometry;

    #[test]
    fn test_to_json_pretty() {
        let mut doc = Document::new();
        doc.source = Some("report.json".to_string());
        doc.add_page(Page::new(0, PageGeometry::letter()));

        let json = to_json(&doc, JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"source\""));
        assert!(json.contains("report.json"));
        assert!(json.contains('\n'));
    }

    #[test]
    fn test_to_json_compact() {
        let json = page_to_json(&Page::new(0, PageGeometry::letter()), JsonFormat::Compact).unwrap();
        assert!(!json.contains('\n'));

        let back: Page = serde_json::from_str(&json).unwrap();
        assert_eq!(back.index, 0);
    }
}
