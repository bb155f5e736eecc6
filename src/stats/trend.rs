//! On-time trend bucketing.

use crate::data::ShipmentRecord;
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Width of one trend bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    #[default]
    Week,
    Month,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Granularity::Day, Granularity::Week, Granularity::Month];

    /// First day of the bucket containing `date`. Weeks start on Monday.
    pub fn bucket(self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Day => date,
            Granularity::Week => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            Granularity::Month => date.with_day(1).unwrap_or(date),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Granularity::Day => "Daily",
            Granularity::Week => "Weekly",
            Granularity::Month => "Monthly",
        }
    }

    /// Axis label for a bucket starting at `start`.
    pub fn format_period(self, start: NaiveDate) -> String {
        match self {
            Granularity::Month => start.format("%Y-%m").to_string(),
            Granularity::Day | Granularity::Week => start.format("%Y-%m-%d").to_string(),
        }
    }
}

impl std::str::FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" | "daily" => Ok(Granularity::Day),
            "week" | "weekly" => Ok(Granularity::Week),
            "month" | "monthly" => Ok(Granularity::Month),
            other => Err(format!("unknown granularity `{other}` (expected day, week or month)")),
        }
    }
}

/// On-time performance for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub period_start: NaiveDate,
    pub shipments: usize,
    pub on_time: usize,
    pub on_time_rate: f64,
}

/// Bucket shipments by actual delivery date, oldest period first.
pub fn on_time_trend(records: &[ShipmentRecord], granularity: Granularity) -> Vec<TrendPoint> {
    let mut buckets: BTreeMap<NaiveDate, (usize, usize)> = BTreeMap::new();
    for record in records {
        let entry = buckets
            .entry(granularity.bucket(record.actual_date))
            .or_default();
        entry.0 += 1;
        if record.is_on_time() {
            entry.1 += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(period_start, (shipments, on_time))| TrendPoint {
            period_start,
            shipments,
            on_time,
            on_time_rate: on_time as f64 / shipments as f64,
        })
        .collect()
}
