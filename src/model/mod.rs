//! Layout model types.
//!
//! The model has two halves: the primitives ingested from the upstream PDF
//! collaborator (spans, paths, rasters) and the structures the analysis
//! derives from them. Derived structures refer to primitives and to each
//! other by index into page-owned arenas, never by copy.

mod document;
mod figure;
mod page;
mod paragraph;
mod primitives;
mod section;
mod table;

pub use document::{Document, PageFailure};
pub use figure::{Figure, FigureSource};
pub use page::{Column, Page, PageStats};
pub use paragraph::{BlockKind, Paragraph, TextLine};
pub use primitives::{
    PageGeometry, PageInput, PaintKind, RasterRegion, StraightLine, TextSpan, VectorPath,
};
pub use section::{Caption, CaptionTarget, ContentItem, Section};
pub use table::{Cell, Table, TableKind};
