//! Data module - CSV loading, schema validation and typed shipment records

mod loader;
mod record;
pub mod schema;
mod table;
mod validator;

pub use loader::{CsvDialect, DataLoader, ParseError};
pub use record::ShipmentRecord;
pub use schema::{ColumnSpec, ColumnType, Constraint, ExpectedSchema, Field, SchemaConfig};
pub use table::ShipmentTable;
pub use validator::{Rejected, SchemaValidator, ValidatedTable, ValidationError, ValidationErrors};
