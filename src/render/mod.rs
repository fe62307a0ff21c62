//! Rendering of analyzed layouts to output formats.

mod csv;
mod json;
mod markdown;
mod options;
mod overlay;

pub use self::csv::{page_tables_to_csv, table_to_csv, write_table_csv};
pub use json::{page_to_json, to_json, JsonFormat};
pub use markdown::{page_to_markdown, to_markdown, MarkdownRenderer};
pub use options::{PageSelection, RenderOptions, TableFallback};
pub use overlay::{page_to_svg, COLUMN_COLOR, FIGURE_COLOR, TABLE_COLOR, TEXT_COLOR};
