//! Providers of page primitives.
//!
//! The layout pipeline does not read PDF files itself. A [`PrimitiveSource`]
//! hands it the spans, paths and rasters of each page; [`JsonSource`] reads
//! them from a primitives document such as the one an extraction tool dumps.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::{PageGeometry, PageInput, RasterRegion, TextSpan, VectorPath};

/// Abstract access to the primitives of a paged document.
///
/// Implementations must be shareable across threads: pages are loaded from
/// worker threads when analysis runs in parallel.
pub trait PrimitiveSource: Sync {
    /// Number of pages.
    fn page_count(&self) -> usize;

    /// Load the primitives of one page (zero-based).
    fn load_page(&self, index: usize) -> Result<PageInput>;
}

impl PrimitiveSource for Vec<PageInput> {
    fn page_count(&self) -> usize {
        self.len()
    }

    fn load_page(&self, index: usize) -> Result<PageInput> {
        self.get(index)
            .cloned()
            .ok_or(Error::PageOutOfRange(index, self.len()))
    }
}

/// One page of a primitives document.
#[derive(Debug, Clone, Deserialize)]
struct RawPage {
    geometry: PageGeometry,
    spans: Option<Vec<TextSpan>>,
    paths: Option<Vec<VectorPath>>,
    #[serde(default)]
    rasters: Vec<RasterRegion>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    pages: Vec<RawPage>,
}

/// Primitives loaded from JSON of the form `{"pages": [...]}`.
///
/// Each page carries `geometry`, `spans`, `paths` and optionally `rasters`.
/// A page without `spans` or `paths` fails to load with
/// [`Error::MissingPrimitives`]; an empty list is fine.
///
/// # Example
///
/// ```
/// use pagelayout::analysis::{JsonSource, PrimitiveSource};
///
/// let json = r#"{"pages": [{
///     "geometry": {"width_px": 612, "height_px": 792, "width_pt": 612, "height_pt": 792, "dpi": 72},
///     "spans": [],
///     "paths": []
/// }]}"#;
/// let source = JsonSource::from_str(json).unwrap();
/// assert_eq!(source.page_count(), 1);
/// assert!(source.load_page(0).unwrap().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct JsonSource {
    pages: Vec<RawPage>,
}

impl JsonSource {
    /// Parse a primitives document from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> Result<Self> {
        let doc: RawDocument = serde_json::from_str(json)?;
        Ok(Self { pages: doc.pages })
    }

    /// Parse a primitives document from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let doc: RawDocument = serde_json::from_reader(reader)?;
        Ok(Self { pages: doc.pages })
    }

    /// Parse a primitives document from a file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let source = Self::from_reader(BufReader::new(file))?;
        log::debug!(
            "JsonSource: loaded {} pages from {}",
            source.pages.len(),
            path.as_ref().display()
        );
        Ok(source)
    }
}

impl PrimitiveSource for JsonSource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn load_page(&self, index: usize) -> Result<PageInput> {
        let raw = self
            .pages
            .get(index)
            .ok_or(Error::PageOutOfRange(index, self.pages.len()))?;

        let spans = raw
            .spans
            .clone()
            .ok_or_else(|| Error::MissingPrimitives(index, "text spans".to_string()))?;
        let paths = raw
            .paths
            .clone()
            .ok_or_else(|| Error::MissingPrimitives(index, "vector paths".to_string()))?;

        Ok(PageInput {
            index,
            geometry: raw.geometry,
            spans,
            paths,
            rasters: raw.rasters.clone(),
        })
    }
}
