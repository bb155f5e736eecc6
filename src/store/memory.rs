//! In-memory store backend.

use super::{distinct_ids, sort_records, KpiSnapshot, ShipmentFilter, ShipmentStore, StoreError};
use crate::data::{ShipmentRecord, ValidatedTable};
use crate::stats::KpiResult;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Default)]
pub struct MemoryStore {
    shipments: RwLock<BTreeMap<String, ShipmentRecord>>,
    history: RwLock<Vec<KpiSnapshot>>,
}

impl ShipmentStore for MemoryStore {
    fn save(&self, table: &ValidatedTable) -> Result<usize, StoreError> {
        let mut shipments = self.shipments.write();
        for record in table.records() {
            shipments.insert(record.shipment_id.clone(), record.clone());
        }
        Ok(distinct_ids(table.records()))
    }

    fn load(&self, filter: &ShipmentFilter) -> Result<Vec<ShipmentRecord>, StoreError> {
        let mut records: Vec<ShipmentRecord> = self
            .shipments
            .read()
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        sort_records(&mut records);
        Ok(records)
    }

    fn record_kpis(&self, kpis: &KpiResult) -> Result<KpiSnapshot, StoreError> {
        let snapshot = KpiSnapshot::from_kpis(kpis, Utc::now());
        self.history.write().push(snapshot.clone());
        Ok(snapshot)
    }

    fn kpi_history(&self, limit: usize) -> Result<Vec<KpiSnapshot>, StoreError> {
        Ok(self.history.read().iter().rev().take(limit).cloned().collect())
    }
}
