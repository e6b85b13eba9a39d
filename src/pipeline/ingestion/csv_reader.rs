use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::{debug, info};

use super::table::{RawCell, RawTable};
use crate::error::Result;

/// Read a legacy CSV export into the table shape the converter consumes.
///
/// The first record is treated as the header row. Rows are allowed to be
/// ragged; empty cells become [`RawCell::Blank`]. Cell content is kept
/// verbatim so the normalizer sees exactly what the sheet said.
pub fn read_csv_table(path: &Path) -> Result<RawTable> {
    debug!("reading CSV table from {}", path.display());
    let file = File::open(path)?;
    let table = read_csv_from_reader(file)?;
    info!(
        "read CSV table: {} headers, {} rows",
        table.headers.len(),
        table.rows.len()
    );
    Ok(table)
}

pub fn read_csv_from_reader<R: Read>(reader: R) -> Result<RawTable> {
    let mut csv_reader = ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let row = record
            .iter()
            .map(|cell| {
                if cell.trim().is_empty() {
                    RawCell::Blank
                } else {
                    RawCell::Text(cell.to_string())
                }
            })
            .collect();
        rows.push(row);
    }

    Ok(RawTable::new(headers, rows))
}
