//! CSV Data Loader Module
//! Parses raw CSV bytes into a [`ShipmentTable`] backed by a Polars `DataFrame`.
//!
//! Records are read with the `csv` crate, which reports the line of every
//! record. Polars' own reader pads short rows with nulls, so ragged input
//! would go unnoticed there. The header and cells are then handed to Polars
//! as string columns.
//!
//! Blank lines are skipped and never count as records. A one-column file that
//! needs an empty record must write it as `""`.

use crate::data::ShipmentTable;
use csv::{Position, ReaderBuilder, StringRecord};
use polars::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read CSV file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Input is not valid UTF-8 (first bad byte at offset {offset})")]
    Encoding { offset: usize },
    #[error("Unbalanced quote in the record starting on line {line}")]
    UnbalancedQuote { line: usize },
    #[error("Line {line} has {found} fields, header has {expected}")]
    InconsistentColumns {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("Input has no header row")]
    MissingHeader,
    #[error("Header column `{0}` appears more than once")]
    DuplicateColumn(String),
    #[error("Failed to read CSV record: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to build table: {0}")]
    Table(#[from] PolarsError),
}

/// Delimiter and quote characters of the accepted CSV dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvDialect {
    pub delimiter: char,
    pub quote: char,
}

impl Default for CsvDialect {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote: '"',
        }
    }
}

/// One parsed record, the line it started on and its first byte.
struct RawRecord {
    line: usize,
    start: usize,
    fields: StringRecord,
}

/// Handles CSV loading into shipment tables.
#[derive(Debug, Clone, Default)]
pub struct DataLoader {
    dialect: CsvDialect,
}

impl DataLoader {
    pub fn new(dialect: CsvDialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> CsvDialect {
        self.dialect
    }

    /// Load a CSV file from disk.
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<ShipmentTable, ParseError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        info!(path = %path.display(), bytes = bytes.len(), "loading CSV file");
        self.load_bytes(&bytes)
    }

    /// Parse CSV bytes. The first record is the header.
    pub fn load_bytes(&self, bytes: &[u8]) -> Result<ShipmentTable, ParseError> {
        std::str::from_utf8(bytes).map_err(|e| ParseError::Encoding {
            offset: e.valid_up_to(),
        })?;
        let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

        let records = self.read_records(body)?;
        let quote = self.quote_byte();
        for (i, record) in records.iter().enumerate() {
            let end = records.get(i + 1).map_or(body.len(), |next| next.start);
            let span = body.get(record.start..end).unwrap_or_default();
            let quotes = span.iter().filter(|&&b| b == quote).count();
            if quotes % 2 == 1 {
                return Err(ParseError::UnbalancedQuote { line: record.line });
            }
        }

        let mut records = records.into_iter();
        let header: Vec<String> = records
            .next()
            .ok_or(ParseError::MissingHeader)?
            .fields
            .iter()
            .map(|name| name.trim().to_string())
            .collect();
        Self::check_header(&header)?;

        let width = header.len();
        let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); width];

        for record in records {
            if record.fields.len() != width {
                return Err(ParseError::InconsistentColumns {
                    line: record.line,
                    expected: width,
                    found: record.fields.len(),
                });
            }
            for (column, field) in columns.iter_mut().zip(record.fields.iter()) {
                column.push((!field.is_empty()).then(|| field.to_string()));
            }
        }

        let series: Vec<Column> = header
            .iter()
            .zip(columns)
            .map(|(name, values)| Column::new(name.as_str().into(), values))
            .collect();

        let df = DataFrame::new(series)?;
        debug!(rows = df.height(), columns = width, "parsed CSV");
        Ok(ShipmentTable::new(df))
    }

    fn check_header(names: &[String]) -> Result<(), ParseError> {
        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name.as_str()) {
                return Err(ParseError::DuplicateColumn(name.clone()));
            }
        }
        Ok(())
    }

    fn quote_byte(&self) -> u8 {
        self.dialect.quote as u8
    }

    /// Reads every record, header included, without enforcing a width.
    fn read_records(&self, body: &[u8]) -> Result<Vec<RawRecord>, ParseError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.dialect.delimiter as u8)
            .quote(self.quote_byte())
            .has_headers(false)
            .flexible(true)
            .from_reader(body);

        let mut records = Vec::new();
        for result in reader.records() {
            let fields = result?;
            let position = fields.position().cloned().unwrap_or_else(Position::new);
            records.push(RawRecord {
                line: position.line() as usize,
                start: position.byte() as usize,
                fields,
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(input: &str) -> Result<ShipmentTable, ParseError> {
        DataLoader::default().load_bytes(input.as_bytes())
    }

    #[test]
    fn parses_header_and_rows() {
        let table = load("id,lane\n1,A\n2,B\n").unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_names(), vec!["id", "lane"]);
        assert_eq!(table.cell("lane", 1), Some("B".to_string()));
    }

    #[test]
    fn handles_quotes_crlf_and_embedded_delimiters() {
        let table = load("id,note\r\n1,\"a, b\"\r\n2,\"say \"\"hi\"\"\nthere\"\r\n").unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell("note", 0), Some("a, b".to_string()));
        assert_eq!(
            table.cell("note", 1),
            Some("say \"hi\"\nthere".to_string())
        );
    }

    #[test]
    fn empty_cells_are_missing() {
        let table = load("a,b\n,x\n").unwrap();
        assert_eq!(table.cell("a", 0), None);
        assert_eq!(table.cell("b", 0), Some("x".to_string()));
    }

    #[test]
    fn header_only_gives_empty_table() {
        let table = load("a,b\n").unwrap();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_names().len(), 2);
    }

    #[test]
    fn strips_bom_and_skips_blank_lines() {
        let table = load("\u{feff}a,b\n1,2\n\n3,4").unwrap();
        assert_eq!(table.column_names(), vec!["a", "b"]);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = load("a,b,c\n1,2,3\n4,5\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::InconsistentColumns {
                line: 3,
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn rejects_unclosed_quote() {
        let err = load("a,b\n1,\"open\n2,3\n").unwrap_err();
        assert!(matches!(err, ParseError::UnbalancedQuote { line: 2 }));
    }

    #[test]
    fn rejects_stray_quote_in_unquoted_field() {
        let err = load("a,b\n5\",x\n1,2\n").unwrap_err();
        assert!(matches!(err, ParseError::UnbalancedQuote { line: 2 }));
    }

    #[test]
    fn text_after_closing_quote_joins_the_field() {
        let table = load("a,b\n\"x\"y,2\n").unwrap();
        assert_eq!(table.cell("a", 0), Some("xy".to_string()));
    }

    #[test]
    fn single_column_blank_lines_are_skipped() {
        let table = load("a\n1\n\n3\n").unwrap();
        assert_eq!(table.row_count(), 2);

        let table = load("a\n1\n\"\"\n3\n").unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.cell("a", 1), None);
        assert_eq!(table.cell("a", 2), Some("3".to_string()));
    }

    #[test]
    fn ragged_row_reports_its_line() {
        let err = load("a,b\n1,2\n3,4\n5\n6,7\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::InconsistentColumns {
                line: 4,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn rejects_invalid_utf8() {
        let err = DataLoader::default()
            .load_bytes(b"a,b\n1,\xff\n")
            .unwrap_err();
        assert!(matches!(err, ParseError::Encoding { offset: 6 }));
    }

    #[test]
    fn rejects_empty_input_and_duplicate_headers() {
        assert!(matches!(load("").unwrap_err(), ParseError::MissingHeader));
        assert!(matches!(
            load("a,a\n1,2\n").unwrap_err(),
            ParseError::DuplicateColumn(name) if name == "a"
        ));
    }

    #[test]
    fn honours_custom_dialect() {
        let loader = DataLoader::new(CsvDialect {
            delimiter: ';',
            quote: '\'',
        });
        let table = loader.load_bytes(b"a;b\n'x;y';2\n").unwrap();
        assert_eq!(table.cell("a", 0), Some("x;y".to_string()));
    }
}
