//! Row parser for the CSV export
//!
//! The export carries a title/header line followed by data rows in a fixed
//! column order. Columns are mapped by position, never by header name, and
//! values are kept verbatim.

use serde::{Deserialize, Serialize};
use std::io::Read;

/// Column order of the export.
pub const COLUMNS: [&str; 12] = [
    "em0", "em1", "em2", "phone", "madid", "name", "zip", "country", "gender", "action", "time",
    "price",
];

/// One data row, keyed by the fixed column names
///
/// A column the row is too short to contain is `None`; an empty cell is
/// `Some("")`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawRecord {
    pub em0: Option<String>,
    pub em1: Option<String>,
    pub em2: Option<String>,
    pub phone: Option<String>,
    pub madid: Option<String>,
    pub name: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub gender: Option<String>,
    pub action: Option<String>,
    pub time: Option<String>,
    pub price: Option<String>,
}

impl RawRecord {
    /// Map a CSV record onto the fixed columns; extra cells are ignored
    pub fn from_record(record: &csv::StringRecord) -> Self {
        let cell = |column: &str| {
            COLUMNS
                .iter()
                .position(|name| *name == column)
                .and_then(|idx| record.get(idx))
                .map(str::to_string)
        };

        Self {
            em0: cell("em0"),
            em1: cell("em1"),
            em2: cell("em2"),
            phone: cell("phone"),
            madid: cell("madid"),
            name: cell("name"),
            zip: cell("zip"),
            country: cell("country"),
            gender: cell("gender"),
            action: cell("action"),
            time: cell("time"),
            price: cell("price"),
        }
    }

    /// The three email columns in order
    pub fn email_columns(&self) -> [Option<&str>; 3] {
        [self.em0.as_deref(), self.em1.as_deref(), self.em2.as_deref()]
    }
}

/// Lazy iterator over the data rows of an export
///
/// The first line is always skipped. Rows may be shorter or longer than
/// [`COLUMNS`]. A row the CSV reader cannot decode is yielded as an error and
/// iteration continues with the next row.
pub struct RowParser<R: Read> {
    records: csv::StringRecordsIntoIter<R>,
}

impl<R: Read> RowParser<R> {
    /// Parse comma-delimited input
    pub fn new(reader: R) -> Self {
        Self::with_delimiter(reader, b',')
    }

    /// Parse input with a custom delimiter
    pub fn with_delimiter(reader: R, delimiter: u8) -> Self {
        let records = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(reader)
            .into_records();

        Self { records }
    }
}

impl<'a> RowParser<&'a [u8]> {
    /// Parse an in-memory payload
    pub fn from_payload(payload: &'a str) -> Self {
        Self::new(payload.as_bytes())
    }
}

impl<R: Read> Iterator for RowParser<R> {
    type Item = Result<RawRecord, csv::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.records
            .next()
            .map(|result| result.map(|record| RawRecord::from_record(&record)))
    }
}
