//! Supply KPI - shipment CSV validation, delivery KPIs and flow dashboards
//!
//! The core path is `DataLoader` (CSV bytes to a string table),
//! `SchemaValidator` (table to `ValidatedTable` or every error found) and
//! `KpiCalculator` (validated table to KPIs). `Pipeline` wires the three
//! together with an optional `ShipmentStore`.

pub mod charts;
pub mod config;
pub mod data;
pub mod gui;
pub mod pipeline;
pub mod stats;
pub mod store;

pub use config::{load_config, AppConfig, ConfigError};
pub use data::{
    CsvDialect, DataLoader, ExpectedSchema, ParseError, Rejected, SchemaValidator,
    ShipmentRecord, ShipmentTable, ValidatedTable, ValidationError, ValidationErrors,
};
pub use pipeline::{Pipeline, PipelineError};
pub use stats::{Granularity, KpiCalculator, KpiReport, KpiResult, Turnover};
pub use store::{open_store, ShipmentFilter, ShipmentStore, StoreError};
