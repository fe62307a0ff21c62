//! Layout analysis stages.
//!
//! Each stage is a small detector struct configured by its own section of
//! [`LayoutConfig`]. [`LayoutPipeline`] chains them for one page.

mod captions;
mod columns;
mod figures;
mod options;
mod pipeline;
mod reading_order;
mod source;
mod tables;
mod text_blocks;
mod union_find;

pub use captions::{CaptionLinker, LabelKind};
pub use columns::{ColumnDetector, ColumnLayout, SpanPlacement};
pub use figures::FigureDetector;
pub use options::{
    AnalyzeOptions, CaptionConfig, ColumnConfig, FigureConfig, LayoutConfig, ReadingOrderConfig, TableConfig,
    TextBlockConfig,
};
pub use pipeline::{analyze_page, CancelFlag, LayoutPipeline};
pub use reading_order::ReadingOrderAssembler;
pub use source::{JsonSource, PrimitiveSource};
pub use tables::{claimed_spans, BorderlessTableDetector, RuledTableDetector, TableDetector, TableSkeleton};
pub use text_blocks::{FontStatistics, TextBlockAssembler};
