//! Shipment and KPI persistence behind a narrow interface.
//!
//! The pipeline only sees [`ShipmentStore`]; backends are picked from config.

mod memory;
mod sqlite;

use crate::config::{StoreBackend, StoreConfig};
use crate::data::{ShipmentRecord, ValidatedTable};
use crate::stats::{KpiResult, Turnover};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::info;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),
}

/// Selection applied by [`ShipmentStore::load`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShipmentFilter {
    pub lane: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    /// Inclusive lower bound on the promised date.
    pub promised_from: Option<NaiveDate>,
    /// Inclusive upper bound on the promised date.
    pub promised_to: Option<NaiveDate>,
}

impl ShipmentFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn lane(mut self, lane: impl Into<String>) -> Self {
        self.lane = Some(lane.into());
        self
    }

    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn promised_between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.promised_from = Some(from);
        self.promised_to = Some(to);
        self
    }

    pub fn matches(&self, record: &ShipmentRecord) -> bool {
        self.lane.as_ref().map_or(true, |l| *l == record.lane)
            && self.origin.as_ref().map_or(true, |o| *o == record.origin)
            && self
                .destination
                .as_ref()
                .map_or(true, |d| *d == record.destination)
            && self.promised_from.map_or(true, |f| record.promised_date >= f)
            && self.promised_to.map_or(true, |t| record.promised_date <= t)
    }
}

/// One stored KPI computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSnapshot {
    pub recorded_at: DateTime<Utc>,
    pub shipments: usize,
    pub on_time_rate: f64,
    pub inventory_turnover: Turnover,
}

impl KpiSnapshot {
    pub fn from_kpis(kpis: &KpiResult, recorded_at: DateTime<Utc>) -> Self {
        Self {
            recorded_at,
            shipments: kpis.shipments,
            on_time_rate: kpis.on_time_rate,
            inventory_turnover: kpis.inventory_turnover,
        }
    }
}

pub trait ShipmentStore: Send + Sync {
    /// Upsert every record by shipment id; returns the number of distinct ids.
    /// A repeated id within one table keeps its last record.
    fn save(&self, table: &ValidatedTable) -> Result<usize, StoreError>;

    /// Records matching `filter`, ordered by promised date then shipment id.
    fn load(&self, filter: &ShipmentFilter) -> Result<Vec<ShipmentRecord>, StoreError>;

    /// Append a KPI snapshot stamped with the current time.
    fn record_kpis(&self, kpis: &KpiResult) -> Result<KpiSnapshot, StoreError>;

    /// Most recent snapshots first.
    fn kpi_history(&self, limit: usize) -> Result<Vec<KpiSnapshot>, StoreError>;
}

/// Open the backend named in config.
pub fn open_store(config: &StoreConfig) -> Result<Box<dyn ShipmentStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => {
            info!("using in-memory shipment store");
            Ok(Box::new(MemoryStore::default()))
        }
        StoreBackend::Sqlite => {
            let path = config.resolved_path();
            info!(path = %path.display(), "opening SQLite shipment store");
            Ok(Box::new(SqliteStore::open(path)?))
        }
    }
}

fn distinct_ids(records: &[ShipmentRecord]) -> usize {
    records
        .iter()
        .map(|r| r.shipment_id.as_str())
        .collect::<HashSet<_>>()
        .len()
}

fn sort_records(records: &mut [ShipmentRecord]) {
    records.sort_by(|a, b| {
        a.promised_date
            .cmp(&b.promised_date)
            .then_with(|| a.shipment_id.cmp(&b.shipment_id))
    });
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::data::{DataLoader, SchemaValidator, ValidatedTable};

    pub const SAMPLE: &str = "\
shipment_id,origin,destination,promised_date,actual_date,quantity_shipped,quantity_received,lane
S1,Oslo,Bergen,2024-01-03,2024-01-02,10,8,A
S2,Oslo,Trondheim,2024-01-01,2024-01-04,5,5,B
S3,Bergen,Oslo,2024-01-02,2024-01-02,7,7,A
";

    pub fn validated(csv: &str) -> ValidatedTable {
        let table = DataLoader::default().load_bytes(csv.as_bytes()).unwrap();
        SchemaValidator::default().validate(table).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_matches_on_every_set_field() {
        let table = test_support::validated(test_support::SAMPLE);
        let s1 = &table.records()[0];
        let jan = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();

        assert!(ShipmentFilter::all().matches(s1));
        assert!(ShipmentFilter::all().lane("A").origin("Oslo").matches(s1));
        assert!(!ShipmentFilter::all().lane("B").matches(s1));
        assert!(!ShipmentFilter::all().destination("Oslo").matches(s1));
        assert!(ShipmentFilter::all()
            .promised_between(jan(3), jan(3))
            .matches(s1));
        assert!(!ShipmentFilter::all()
            .promised_between(jan(1), jan(2))
            .matches(s1));
    }
}
