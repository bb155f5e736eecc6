//! Shipment table: raw string cells in source row order.

use polars::prelude::*;

/// Untyped shipment rows as parsed from CSV.
///
/// Every column is a string series; empty cells are nulls. Column meaning is
/// assigned later by the validator.
#[derive(Debug, Clone)]
pub struct ShipmentTable {
    df: DataFrame,
}

impl ShipmentTable {
    pub fn new(df: DataFrame) -> Self {
        Self { df }
    }

    /// Get a reference to the backing DataFrame.
    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn row_count(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Column names in header order.
    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.df.column(name).is_ok()
    }

    /// String cells of a column, `None` if the column is absent.
    pub fn cells(&self, name: &str) -> Option<&StringChunked> {
        self.df.column(name).ok().and_then(|col| col.str().ok())
    }

    /// Single cell value; `None` for an absent column, out-of-range row or empty cell.
    pub fn cell(&self, column: &str, row: usize) -> Option<String> {
        self.cells(column)
            .and_then(|ca| ca.get(row))
            .map(str::to_string)
    }
}

impl PartialEq for ShipmentTable {
    fn eq(&self, other: &Self) -> bool {
        self.df.equals_missing(&other.df)
    }
}
