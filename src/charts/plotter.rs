//! Chart Plotter Module
//! Interactive dashboard charts using egui_plot.

use crate::stats::{DeliveryStats, Granularity, KpiResult, TrendPoint};
use egui::{Color32, RichText};
use egui_plot::{Bar, BarChart, Line, Plot, PlotPoints, Points};

pub const PALETTE: [Color32; 10] = [
    Color32::from_rgb(52, 152, 219),  // Blue
    Color32::from_rgb(46, 204, 113),  // Green
    Color32::from_rgb(155, 89, 182),  // Purple
    Color32::from_rgb(243, 156, 18),  // Orange
    Color32::from_rgb(26, 188, 156),  // Teal
    Color32::from_rgb(233, 30, 99),   // Pink
    Color32::from_rgb(0, 188, 212),   // Cyan
    Color32::from_rgb(255, 87, 34),   // Deep Orange
    Color32::from_rgb(121, 85, 72),   // Brown
    Color32::from_rgb(231, 76, 60),   // Red
];

const GOOD: Color32 = Color32::from_rgb(46, 204, 113);
const WARN: Color32 = Color32::from_rgb(243, 156, 18);
const BAD: Color32 = Color32::from_rgb(220, 53, 69);

/// Rates at or above this are shown as healthy.
pub const ON_TIME_TARGET: f64 = 0.95;
/// Rates below this are shown as failing.
pub const ON_TIME_FLOOR: f64 = 0.80;

pub struct ChartPlotter;

impl ChartPlotter {
    pub fn lane_color(index: usize) -> Color32 {
        PALETTE[index % PALETTE.len()]
    }

    /// Traffic-light colour for an on-time rate.
    pub fn on_time_color(rate: f64) -> Color32 {
        if rate >= ON_TIME_TARGET {
            GOOD
        } else if rate >= ON_TIME_FLOOR {
            WARN
        } else {
            BAD
        }
    }

    pub fn format_percent(rate: f64) -> String {
        format!("{:.1}%", rate * 100.0)
    }

    /// Units shipped per lane, one bar per lane.
    pub fn draw_lane_volumes(ui: &mut egui::Ui, kpis: &KpiResult, height: f32) {
        let labels: Vec<String> = kpis.lane_volumes.keys().cloned().collect();

        let bars: Vec<Bar> = kpis
            .lane_volumes
            .iter()
            .enumerate()
            .map(|(i, (lane, volume))| {
                Bar::new(i as f64, *volume as f64)
                    .name(lane)
                    .width(0.6)
                    .fill(Self::lane_color(i))
            })
            .collect();

        Plot::new("lane_volumes")
            .height(height)
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .include_y(0.0)
            .x_axis_label("Lane")
            .y_axis_label("Units shipped")
            .x_axis_formatter(move |mark, _range| {
                let idx = mark.value.round();
                if (mark.value - idx).abs() > 1e-6 || idx < 0.0 {
                    return String::new();
                }
                labels.get(idx as usize).cloned().unwrap_or_default()
            })
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).name("Units shipped"));
            });
    }

    /// On-time rate per period as a line with markers.
    pub fn draw_on_time_trend(
        ui: &mut egui::Ui,
        trend: &[TrendPoint],
        granularity: Granularity,
        height: f32,
    ) {
        let labels: Vec<String> = trend
            .iter()
            .map(|p| granularity.format_period(p.period_start))
            .collect();
        let points: Vec<[f64; 2]> = trend
            .iter()
            .enumerate()
            .map(|(i, p)| [i as f64, p.on_time_rate])
            .collect();
        let target: Vec<[f64; 2]> = if trend.is_empty() {
            Vec::new()
        } else {
            vec![[0.0, ON_TIME_TARGET], [(trend.len() - 1) as f64, ON_TIME_TARGET]]
        };

        Plot::new("on_time_trend")
            .height(height)
            .allow_scroll(false)
            .include_y(0.0)
            .include_y(1.0)
            .x_axis_label(format!("{} period", granularity.label()))
            .y_axis_label("On time")
            .x_axis_formatter(move |mark, _range| {
                let idx = mark.value.round();
                if (mark.value - idx).abs() > 1e-6 || idx < 0.0 {
                    return String::new();
                }
                labels.get(idx as usize).cloned().unwrap_or_default()
            })
            .y_axis_formatter(|mark, _range| format!("{:.0}%", mark.value * 100.0))
            .show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new(PlotPoints::from_iter(points.iter().copied()))
                        .color(GOOD)
                        .width(2.0)
                        .name("On-time rate"),
                );
                plot_ui.points(
                    Points::new(PlotPoints::from_iter(points.iter().copied()))
                        .radius(3.5)
                        .color(GOOD),
                );
                if !target.is_empty() {
                    plot_ui.line(
                        Line::new(PlotPoints::from(target))
                            .color(Color32::GRAY)
                            .style(egui_plot::LineStyle::dashed_loose())
                            .name("Target"),
                    );
                }
            });
    }

    /// Headline number with a caption underneath.
    pub fn draw_metric_card(ui: &mut egui::Ui, title: &str, value: &str, color: Color32) {
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(6.0)
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.set_min_width(150.0);
                ui.vertical(|ui| {
                    ui.label(RichText::new(title).size(12.0).weak());
                    ui.label(RichText::new(value).size(26.0).strong().color(color));
                });
            });
    }

    /// Delay statistics for late deliveries.
    pub fn draw_delivery_table(ui: &mut egui::Ui, stats: &DeliveryStats) {
        let days = |v: f64| format!("{v:.1} d");
        let rows = [
            ("Late shipments", stats.late_shipments.to_string()),
            ("Mean delay", days(stats.mean_delay_days)),
            ("Median delay", days(stats.median_delay_days)),
            ("P95 delay", days(stats.p95_delay_days)),
            ("Max delay", days(stats.max_delay_days)),
            (
                "Mean lead time",
                stats
                    .mean_lead_time_days
                    .map_or_else(|| "-".to_string(), days),
            ),
        ];

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                egui::Grid::new("delivery_stats")
                    .striped(true)
                    .min_col_width(90.0)
                    .spacing([12.0, 4.0])
                    .show(ui, |ui| {
                        for (name, value) in rows {
                            ui.label(RichText::new(name).size(11.0).strong());
                            ui.label(RichText::new(value).size(11.0));
                            ui.end_row();
                        }
                    });
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_time_color_bands() {
        assert_eq!(ChartPlotter::on_time_color(1.0), GOOD);
        assert_eq!(ChartPlotter::on_time_color(0.95), GOOD);
        assert_eq!(ChartPlotter::on_time_color(0.85), WARN);
        assert_eq!(ChartPlotter::on_time_color(0.5), BAD);
    }

    #[test]
    fn percent_formatting() {
        assert_eq!(ChartPlotter::format_percent(0.5), "50.0%");
        assert_eq!(ChartPlotter::format_percent(2.0 / 3.0), "66.7%");
    }

    #[test]
    fn lane_colors_wrap() {
        assert_eq!(ChartPlotter::lane_color(0), ChartPlotter::lane_color(PALETTE.len()));
    }
}
