//! KPI Calculator Module
//! Computes delivery KPIs and flow aggregates from validated shipment tables.

use crate::data::{ShipmentRecord, ValidatedTable};
use crate::stats::delivery::DeliveryStats;
use crate::stats::trend::{on_time_trend, Granularity, TrendPoint};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Inventory turnover, or `Undefined` when nothing is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Turnover {
    Ratio(f64),
    Undefined,
}

impl Turnover {
    pub fn ratio(self) -> Option<f64> {
        match self {
            Turnover::Ratio(r) => Some(r),
            Turnover::Undefined => None,
        }
    }
}

impl fmt::Display for Turnover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Turnover::Ratio(r) => write!(f, "{r:.2}"),
            Turnover::Undefined => f.write_str("n/a"),
        }
    }
}

/// The two headline KPIs plus lane volumes for the flow view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiResult {
    pub shipments: usize,
    /// Fraction of shipments delivered on or before the promised date, 0.0..=1.0.
    pub on_time_rate: f64,
    pub inventory_turnover: Turnover,
    /// Lane -> summed quantity shipped. Zero-volume lanes are left out.
    pub lane_volumes: BTreeMap<String, u64>,
}

/// Origin -> destination volume, one link of the Sankey diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowLink {
    pub origin: String,
    pub destination: String,
    pub volume: u64,
}

/// Everything the dashboard renders for one upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiReport {
    pub kpis: KpiResult,
    pub flows: Vec<FlowLink>,
    pub granularity: Granularity,
    pub trend: Vec<TrendPoint>,
    pub delivery: Option<DeliveryStats>,
}

/// Pure KPI computations over validated shipments.
pub struct KpiCalculator;

impl KpiCalculator {
    /// Compute the headline KPIs.
    pub fn compute(table: &ValidatedTable) -> KpiResult {
        let records = table.records();
        let kpis = KpiResult {
            shipments: records.len(),
            on_time_rate: Self::on_time_rate(records),
            inventory_turnover: Self::inventory_turnover(records),
            lane_volumes: Self::lane_volumes(records),
        };
        debug!(
            shipments = kpis.shipments,
            on_time_rate = kpis.on_time_rate,
            turnover = %kpis.inventory_turnover,
            lanes = kpis.lane_volumes.len(),
            "computed KPIs"
        );
        kpis
    }

    /// Compute KPIs together with flows, trend and delay statistics.
    pub fn report(table: &ValidatedTable, granularity: Granularity) -> KpiReport {
        let records = table.records();
        KpiReport {
            kpis: Self::compute(table),
            flows: Self::flows(records),
            granularity,
            trend: on_time_trend(records, granularity),
            delivery: DeliveryStats::from_records(records),
        }
    }

    /// On-time deliveries over all deliveries; 0.0 for no shipments.
    pub fn on_time_rate(records: &[ShipmentRecord]) -> f64 {
        if records.is_empty() {
            return 0.0;
        }
        let on_time = records.iter().filter(|r| r.is_on_time()).count();
        on_time as f64 / records.len() as f64
    }

    /// Total shipped divided by the mean outstanding quantity per shipment.
    ///
    /// Sums are taken in `u128`, so any number of `u64` quantities fits.
    pub fn inventory_turnover(records: &[ShipmentRecord]) -> Turnover {
        let outstanding: u128 = records.iter().map(|r| u128::from(r.outstanding())).sum();
        if outstanding == 0 {
            return Turnover::Undefined;
        }
        let shipped: u128 = records.iter().map(|r| u128::from(r.quantity_shipped)).sum();
        let mean_outstanding = outstanding as f64 / records.len() as f64;
        Turnover::Ratio(shipped as f64 / mean_outstanding)
    }

    /// Summed quantity per lane, saturating at `u64::MAX`.
    pub fn lane_volumes(records: &[ShipmentRecord]) -> BTreeMap<String, u64> {
        let mut lanes: BTreeMap<String, u64> = BTreeMap::new();
        for record in records {
            let volume = lanes.entry(record.lane.clone()).or_default();
            *volume = volume.saturating_add(record.quantity_shipped);
        }
        lanes.retain(|_, volume| *volume > 0);
        lanes
    }

    /// Origin -> destination links sorted by origin then destination.
    /// Volumes saturate like lane volumes.
    pub fn flows(records: &[ShipmentRecord]) -> Vec<FlowLink> {
        let mut links: BTreeMap<(&str, &str), u64> = BTreeMap::new();
        for record in records {
            let volume = links
                .entry((record.origin.as_str(), record.destination.as_str()))
                .or_default();
            *volume = volume.saturating_add(record.quantity_shipped);
        }
        links
            .into_iter()
            .filter(|(_, volume)| *volume > 0)
            .map(|((origin, destination), volume)| FlowLink {
                origin: origin.to_string(),
                destination: destination.to_string(),
                volume,
            })
            .collect()
    }
}
