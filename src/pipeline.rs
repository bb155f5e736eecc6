//! One-call composition of loader, validator, calculator and (optionally) store.

use crate::config::{AppConfig, ConfigError};
use crate::data::{
    DataLoader, ExpectedSchema, ParseError, Rejected, SchemaValidator, ShipmentTable,
    ValidatedTable, ValidationErrors,
};
use crate::stats::{Granularity, KpiCalculator, KpiReport};
use crate::store::{ShipmentStore, StoreError};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, info_span};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("{0}")]
    Invalid(ValidationErrors),
    #[error("Failed to persist results: {0}")]
    Store(#[from] StoreError),
}

impl From<Rejected> for PipelineError {
    fn from(rejected: Rejected) -> Self {
        PipelineError::Invalid(rejected.errors)
    }
}

/// Loader + validator + calculator wired from one config.
#[derive(Clone)]
pub struct Pipeline {
    loader: DataLoader,
    validator: SchemaValidator,
    granularity: Granularity,
    store: Option<Arc<dyn ShipmentStore>>,
}

impl Pipeline {
    pub fn new(loader: DataLoader, validator: SchemaValidator, granularity: Granularity) -> Self {
        Self {
            loader,
            validator,
            granularity,
            store: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            DataLoader::new(config.csv.dialect()?),
            SchemaValidator::new(ExpectedSchema::from_config(&config.schema)),
            config.report.granularity,
        ))
    }

    /// Persist every validated table and its KPIs to `store`.
    pub fn with_store(mut self, store: Arc<dyn ShipmentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn store(&self) -> Option<&Arc<dyn ShipmentStore>> {
        self.store.as_ref()
    }

    pub fn load_bytes(&self, bytes: &[u8]) -> Result<ShipmentTable, ParseError> {
        self.loader.load_bytes(bytes)
    }

    pub fn validate(&self, table: ShipmentTable) -> Result<ValidatedTable, Rejected> {
        self.validator.validate(table)
    }

    pub fn run_path(&self, path: impl AsRef<Path>) -> Result<KpiReport, PipelineError> {
        let path = path.as_ref();
        let _span = info_span!("pipeline", source = %path.display()).entered();
        let table = self.loader.load_path(path)?;
        self.finish(table)
    }

    pub fn run_bytes(&self, bytes: &[u8]) -> Result<KpiReport, PipelineError> {
        let _span = info_span!("pipeline", source = "bytes", len = bytes.len()).entered();
        let table = self.loader.load_bytes(bytes)?;
        self.finish(table)
    }

    fn finish(&self, table: ShipmentTable) -> Result<KpiReport, PipelineError> {
        let validated = self.validator.validate(table)?;
        let report = KpiCalculator::report(&validated, self.granularity);

        if let Some(store) = &self.store {
            let saved = store.save(&validated)?;
            store.record_kpis(&report.kpis)?;
            info!(saved, "stored shipments and KPI snapshot");
        }

        info!(
            shipments = report.kpis.shipments,
            on_time_rate = report.kpis.on_time_rate,
            turnover = %report.kpis.inventory_turnover,
            "pipeline finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, ShipmentFilter};

    const CSV: &str = "\
shipment_id,origin,destination,promised_date,actual_date,quantity_shipped,quantity_received,lane
S1,Oslo,Bergen,2024-01-01,2024-01-01,10,6,A
S2,Oslo,Bergen,2024-01-01,2024-01-05,5,5,A
";

    #[test]
    fn runs_end_to_end() {
        let pipeline = Pipeline::from_config(&AppConfig::default()).unwrap();
        let report = pipeline.run_bytes(CSV.as_bytes()).unwrap();
        assert_eq!(report.kpis.on_time_rate, 0.5);
        assert_eq!(report.kpis.lane_volumes.get("A"), Some(&15));
        assert_eq!(report.flows.len(), 1);
    }

    #[test]
    fn parse_and_validation_failures_are_distinct() {
        let pipeline = Pipeline::from_config(&AppConfig::default()).unwrap();
        assert!(matches!(
            pipeline.run_bytes(b"a,b\n1\n"),
            Err(PipelineError::Parse(_))
        ));
        assert!(matches!(
            pipeline.run_bytes(b"a,b\n1,2\n"),
            Err(PipelineError::Invalid(errors)) if errors.len() == 8
        ));
    }

    #[test]
    fn attached_store_receives_rows_and_kpis() {
        let store = Arc::new(MemoryStore::default());
        let pipeline = Pipeline::from_config(&AppConfig::default())
            .unwrap()
            .with_store(store.clone());
        pipeline.run_bytes(CSV.as_bytes()).unwrap();

        assert_eq!(store.load(&ShipmentFilter::all()).unwrap().len(), 2);
        assert_eq!(store.kpi_history(10).unwrap().len(), 1);
    }

    #[test]
    fn rejected_input_is_not_stored() {
        let store = Arc::new(MemoryStore::default());
        let pipeline = Pipeline::from_config(&AppConfig::default())
            .unwrap()
            .with_store(store.clone());
        let bad = CSV.replace("10,6", "10,60");
        assert!(pipeline.run_bytes(bad.as_bytes()).is_err());
        assert!(store.kpi_history(10).unwrap().is_empty());
    }
}
