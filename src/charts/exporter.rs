//! Static PNG export of the dashboard charts.
//!
//! Writes `lane_volumes.png` and `on_time_trend.png` with plotters' bitmap
//! backend so reports can be shared without the GUI.

use crate::stats::{Granularity, KpiReport, KpiResult, TrendPoint};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const LANE_CHART_FILE: &str = "lane_volumes.png";
pub const TREND_CHART_FILE: &str = "on_time_trend.png";

const BAR_COLOR: RGBColor = RGBColor(52, 152, 219);
const LINE_COLOR: RGBColor = RGBColor(46, 204, 113);

#[derive(Error, Debug)]
pub enum ChartExportError {
    #[error("Failed to draw chart: {0}")]
    Draw(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn draw_err<E: std::fmt::Display>(e: E) -> ChartExportError {
    ChartExportError::Draw(e.to_string())
}

/// Renders report charts to PNG files.
#[derive(Debug, Clone, Copy)]
pub struct ChartExporter {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartExporter {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
        }
    }
}

impl ChartExporter {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Write every chart for `report` into `dir`, returning the files written.
    pub fn export_all(
        &self,
        report: &KpiReport,
        dir: impl AsRef<Path>,
    ) -> Result<Vec<PathBuf>, ChartExportError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let lanes = dir.join(LANE_CHART_FILE);
        self.lane_volumes(&report.kpis, &lanes)?;
        let trend = dir.join(TREND_CHART_FILE);
        self.on_time_trend(&report.trend, report.granularity, &trend)?;

        info!(dir = %dir.display(), "exported charts");
        Ok(vec![lanes, trend])
    }

    /// Bar chart of units shipped per lane.
    pub fn lane_volumes(&self, kpis: &KpiResult, path: &Path) -> Result<(), ChartExportError> {
        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        if kpis.lane_volumes.is_empty() {
            draw_placeholder(&root, self.width, self.height)?;
            return root.present().map_err(draw_err);
        }

        let labels: Vec<&str> = kpis.lane_volumes.keys().map(String::as_str).collect();
        let max = kpis.lane_volumes.values().copied().max().unwrap_or(0);
        let n = labels.len() as u32;

        let mut chart = ChartBuilder::on(&root)
            .caption("Units shipped by lane", ("sans-serif", 26))
            .margin(16)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d((0..n).into_segmented(), 0u64..nice_ceiling(max))
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(labels.len())
            .x_label_formatter(&|v| match v {
                SegmentValue::CenterOf(i) => labels
                    .get(*i as usize)
                    .map(|s| s.to_string())
                    .unwrap_or_default(),
                _ => String::new(),
            })
            .x_desc("Lane")
            .y_desc("Units shipped")
            .draw()
            .map_err(draw_err)?;

        chart
            .draw_series(
                Histogram::vertical(&chart)
                    .style(BAR_COLOR.filled())
                    .margin(12)
                    .data(kpis.lane_volumes.values().enumerate().map(|(i, v)| (i as u32, *v))),
            )
            .map_err(draw_err)?;

        root.present().map_err(draw_err)
    }

    /// Line chart of the on-time rate per period.
    pub fn on_time_trend(
        &self,
        trend: &[TrendPoint],
        granularity: Granularity,
        path: &Path,
    ) -> Result<(), ChartExportError> {
        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        if trend.is_empty() {
            draw_placeholder(&root, self.width, self.height)?;
            return root.present().map_err(draw_err);
        }

        let labels: Vec<String> = trend
            .iter()
            .map(|p| granularity.format_period(p.period_start))
            .collect();
        let x_max = (trend.len() as f64 - 0.5).max(0.5);

        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!("{} on-time rate", granularity.label()),
                ("sans-serif", 26),
            )
            .margin(16)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(-0.5f64..x_max, 0f64..1.05f64)
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .x_labels(labels.len().min(12))
            .x_label_formatter(&|x| {
                let rounded = x.round();
                if (x - rounded).abs() > 1e-6 || rounded < 0.0 {
                    return String::new();
                }
                labels.get(rounded as usize).cloned().unwrap_or_default()
            })
            .y_label_formatter(&|y| format!("{:.0}%", y * 100.0))
            .x_desc("Period")
            .y_desc("On time")
            .draw()
            .map_err(draw_err)?;

        let points: Vec<(f64, f64)> = trend
            .iter()
            .enumerate()
            .map(|(i, p)| (i as f64, p.on_time_rate))
            .collect();

        chart
            .draw_series(LineSeries::new(
                points.iter().copied(),
                LINE_COLOR.stroke_width(2),
            ))
            .map_err(draw_err)?;
        chart
            .draw_series(
                points
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), 4, LINE_COLOR.filled())),
            )
            .map_err(draw_err)?;

        root.present().map_err(draw_err)
    }
}

fn draw_placeholder(
    root: &DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>,
    width: u32,
    height: u32,
) -> Result<(), ChartExportError> {
    let style = TextStyle::from(("sans-serif", 24).into_font())
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    root.draw(&Text::new(
        "No data",
        ((width / 2) as i32, (height / 2) as i32),
        style,
    ))
    .map_err(draw_err)
}

/// Round `max` up to a tidy axis bound (1, 2 or 5 times a power of ten per step).
pub fn nice_ceiling(max: u64) -> u64 {
    if max == 0 {
        return 1;
    }
    let step = nice_step(max as f64, 5);
    let ceiling = ((max as f64 / step).ceil() * step) as u64;
    ceiling.max(max)
}

fn nice_step(range: f64, target_steps: usize) -> f64 {
    let raw = range / target_steps as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let nice = match raw / magnitude {
        n if n <= 1.0 => 1.0,
        n if n <= 2.0 => 2.0,
        n if n <= 5.0 => 5.0,
        _ => 10.0,
    };
    nice * magnitude
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nice_ceiling_rounds_up_to_tidy_bounds() {
        assert_eq!(nice_ceiling(0), 1);
        assert_eq!(nice_ceiling(7), 8);
        assert_eq!(nice_ceiling(15), 15);
        assert_eq!(nice_ceiling(87), 100);
        assert_eq!(nice_ceiling(1234), 1500);
    }

    #[test]
    fn nice_step_picks_one_two_five() {
        assert_eq!(nice_step(10.0, 5), 2.0);
        assert_eq!(nice_step(30.0, 5), 10.0);
    }
}
