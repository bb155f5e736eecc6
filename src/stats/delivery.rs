//! Delivery delay statistics.

use crate::data::ShipmentRecord;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Distribution, Max, Median, OrderStatistics};

/// Summary of how far actual delivery lands from the promised date.
///
/// Delays are in days; negative values mean early delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryStats {
    pub late_shipments: usize,
    pub mean_delay_days: f64,
    pub median_delay_days: f64,
    pub p95_delay_days: f64,
    pub max_delay_days: f64,
    /// Mean order-to-delivery time over rows that carry an order date.
    pub mean_lead_time_days: Option<f64>,
}

impl DeliveryStats {
    /// `None` when there are no shipments.
    pub fn from_records(records: &[ShipmentRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }

        let delays: Vec<f64> = records.iter().map(|r| r.delay_days() as f64).collect();
        let late_shipments = records.iter().filter(|r| !r.is_on_time()).count();

        let mut data = Data::new(delays);
        let mean_delay_days = data.mean().unwrap_or(0.0);
        let median_delay_days = data.median();
        let max_delay_days = data.max();
        let p95_delay_days = data.percentile(95);

        let lead_times: Vec<f64> = records
            .iter()
            .filter_map(|r| r.lead_time_days())
            .map(|d| d as f64)
            .collect();
        let mean_lead_time_days = if lead_times.is_empty() {
            None
        } else {
            Data::new(lead_times).mean()
        };

        Some(Self {
            late_shipments,
            mean_delay_days,
            median_delay_days,
            p95_delay_days,
            max_delay_days,
            mean_lead_time_days,
        })
    }
}
