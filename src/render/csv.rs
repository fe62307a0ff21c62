//! CSV export of detected tables.

use std::io::Write;

use crate::error::{Error, Result};
use crate::model::{Page, Table};

/// Write a table as CSV, one record per grid row.
///
/// Merged cells repeat their text over every slot they cover so that all
/// records have the same number of fields.
pub fn write_table_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut csv_writer = ::csv::WriterBuilder::new().flexible(false).from_writer(writer);
    for row in table.to_grid() {
        csv_writer.write_record(&row)?;
    }
    csv_writer
        .flush()
        .map_err(|e| Error::Render(format!("CSV flush error: {}", e)))
}

/// Convert a table to a CSV string.
pub fn table_to_csv(table: &Table) -> Result<String> {
    let mut buffer = Vec::new();
    write_table_csv(table, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| Error::Render(format!("CSV is not UTF-8: {}", e)))
}

/// CSV for every table on a page, paired with a file name.
///
/// Names follow `page{N}_table{M}.csv` with 1-based numbers.
pub fn page_tables_to_csv(page: &Page) -> Result<Vec<(String, String)>> {
    page.tables
        .iter()
        .enumerate()
        .map(|(i, table)| {
            let name = format!("page{}_table{}.csv", page.index + 1, i + 1);
            Ok((name, table_to_csv(table)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::model::{Cell, PageGeometry, TableKind};

    fn table() -> Table {
        let mut table = Table::new(
            TableKind::Borderless,
            2,
            2,
            vec![
                Cell::new(0, 0, Rect::new(0.0, 0.0, 50.0, 10.0)),
                Cell::new(0, 1, Rect::new(50.0, 0.0, 100.0, 10.0)),
                Cell::new(1, 0, Rect::new(0.0, 10.0, 50.0, 20.0)),
                Cell::new(1, 1, Rect::new(50.0, 10.0, 100.0, 20.0)),
            ],
        );
        let texts = ["Name", "Total, USD", "Widget", "\"42\""];
        for (cell, text) in table.cells.iter_mut().zip(texts) {
            cell.text = text.to_string();
        }
        table
    }

    #[test]
    fn test_table_to_csv_quotes_fields() {
        let csv = table_to_csv(&table()).unwrap();
        assert_eq!(csv, "Name,\"Total, USD\"\nWidget,\"\"\"42\"\"\"\n");
    }

    #[test]
    fn test_page_tables_named_by_position() {
        let mut page = crate::model::Page::new(2, PageGeometry::letter());
        page.tables = vec![table(), table()];
        let files = page_tables_to_csv(&page).unwrap();
        assert_eq!(files[0].0, "page3_table1.csv");
        assert_eq!(files[1].0, "page3_table2.csv");
    }
}
