//! Stats module - KPI computation, trends and delay statistics

mod calculator;
mod delivery;
mod trend;

pub use calculator::{FlowLink, KpiCalculator, KpiReport, KpiResult, Turnover};
pub use delivery::DeliveryStats;
pub use trend::{on_time_trend, Granularity, TrendPoint};
