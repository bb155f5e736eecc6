//! Typed shipment rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One validated shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentRecord {
    pub shipment_id: String,
    pub origin: String,
    pub destination: String,
    pub order_date: Option<NaiveDate>,
    pub promised_date: NaiveDate,
    pub actual_date: NaiveDate,
    pub quantity_shipped: u64,
    pub quantity_received: u64,
    pub lane: String,
}

impl ShipmentRecord {
    pub fn is_on_time(&self) -> bool {
        self.actual_date <= self.promised_date
    }

    /// Days between promised and actual delivery; negative when early.
    pub fn delay_days(&self) -> i64 {
        (self.actual_date - self.promised_date).num_days()
    }

    /// Days from order to delivery, when the order date is known.
    pub fn lead_time_days(&self) -> Option<i64> {
        self.order_date
            .map(|ordered| (self.actual_date - ordered).num_days())
    }

    /// Quantity shipped but not yet received.
    pub fn outstanding(&self) -> u64 {
        self.quantity_shipped.saturating_sub(self.quantity_received)
    }
}
