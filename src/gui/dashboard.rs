//! Dashboard View
//! Central panel: KPI cards and charts for a valid table, or the full list of
//! validation errors when the table was rejected.

use crate::charts::{draw_sankey, ChartPlotter};
use crate::data::{ValidationError, ValidationErrors};
use crate::stats::KpiReport;
use egui::{Color32, RichText, ScrollArea};

const SECTION_SPACING: f32 = 15.0;
const CHART_HEIGHT: f32 = 280.0;
const SANKEY_HEIGHT: f32 = 260.0;
const ERROR_ROW_HEIGHT: f32 = 20.0;
const ERROR_RED: Color32 = Color32::from_rgb(220, 53, 69);

/// What the central panel currently shows.
#[derive(Default)]
pub enum DashboardState {
    #[default]
    Empty,
    Report(Box<KpiReport>),
    Rejected(ValidationErrors),
}

#[derive(Default)]
pub struct Dashboard {
    pub state: DashboardState,
}

/// Row, column and reason cells for the error grid. Rows are 1-based.
pub fn error_cells(error: &ValidationError) -> [String; 3] {
    let row = error
        .row
        .map_or_else(|| "-".to_string(), |r| (r + 1).to_string());
    [row, error.column.clone(), error.reason.clone()]
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.state = DashboardState::Empty;
    }

    pub fn set_report(&mut self, report: KpiReport) {
        self.state = DashboardState::Report(Box::new(report));
    }

    pub fn set_errors(&mut self, errors: ValidationErrors) {
        self.state = DashboardState::Rejected(errors);
    }

    pub fn report(&self) -> Option<&KpiReport> {
        match &self.state {
            DashboardState::Report(report) => Some(report.as_ref()),
            _ => None,
        }
    }

    pub fn show(&self, ui: &mut egui::Ui) {
        match &self.state {
            DashboardState::Empty => {
                ui.centered_and_justified(|ui| {
                    ui.label(RichText::new("No Data").size(20.0));
                });
            }
            DashboardState::Rejected(errors) => Self::show_errors(ui, errors),
            DashboardState::Report(report) => {
                ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| Self::show_report(ui, report));
            }
        }
    }

    fn show_errors(ui: &mut egui::Ui, errors: &ValidationErrors) {
        ui.label(
            RichText::new(format!("⚠ {} validation error(s)", errors.len()))
                .size(18.0)
                .strong()
                .color(ERROR_RED),
        );
        ui.label(
            RichText::new("The file was rejected. No KPIs were computed.")
                .size(12.0)
                .color(Color32::GRAY),
        );
        ui.add_space(10.0);

        let widths = [60.0, 180.0];
        ui.horizontal(|ui| {
            ui.add_sized(
                [widths[0], ERROR_ROW_HEIGHT],
                egui::Label::new(RichText::new("Row").strong()),
            );
            ui.add_sized(
                [widths[1], ERROR_ROW_HEIGHT],
                egui::Label::new(RichText::new("Column").strong()),
            );
            ui.label(RichText::new("Reason").strong());
        });
        ui.separator();

        let errors: Vec<&ValidationError> = errors.iter().collect();
        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show_rows(ui, ERROR_ROW_HEIGHT, errors.len(), |ui, rows| {
                for error in &errors[rows] {
                    let [row, column, reason] = error_cells(error);
                    ui.horizontal(|ui| {
                        ui.add_sized([widths[0], ERROR_ROW_HEIGHT], egui::Label::new(row));
                        ui.add_sized(
                            [widths[1], ERROR_ROW_HEIGHT],
                            egui::Label::new(RichText::new(column).monospace()),
                        );
                        ui.label(RichText::new(reason).color(ERROR_RED));
                    });
                }
            });
    }

    fn show_report(ui: &mut egui::Ui, report: &KpiReport) {
        let kpis = &report.kpis;
        let strong = ui.visuals().strong_text_color();

        ui.horizontal_wrapped(|ui| {
            ChartPlotter::draw_metric_card(
                ui,
                "Shipments",
                &kpis.shipments.to_string(),
                strong,
            );
            ChartPlotter::draw_metric_card(
                ui,
                "On-time rate",
                &ChartPlotter::format_percent(kpis.on_time_rate),
                ChartPlotter::on_time_color(kpis.on_time_rate),
            );
            ChartPlotter::draw_metric_card(
                ui,
                "Inventory turnover",
                &kpis.inventory_turnover.to_string(),
                strong,
            );
            ChartPlotter::draw_metric_card(
                ui,
                "Lanes",
                &kpis.lane_volumes.len().to_string(),
                strong,
            );
        });

        ui.add_space(SECTION_SPACING);
        ui.label(RichText::new("Flows by origin and destination").size(14.0).strong());
        draw_sankey(ui, &report.flows, SANKEY_HEIGHT);

        ui.add_space(SECTION_SPACING);
        ui.columns(2, |columns| {
            columns[0].label(RichText::new("Units shipped by lane").size(14.0).strong());
            ChartPlotter::draw_lane_volumes(&mut columns[0], kpis, CHART_HEIGHT);

            columns[1].label(RichText::new("On-time trend").size(14.0).strong());
            ChartPlotter::draw_on_time_trend(
                &mut columns[1],
                &report.trend,
                report.granularity,
                CHART_HEIGHT,
            );
        });

        if let Some(delivery) = &report.delivery {
            ui.add_space(SECTION_SPACING);
            ui.label(RichText::new("Delivery performance").size(14.0).strong());
            ChartPlotter::draw_delivery_table(ui, delivery);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_rows_are_one_based() {
        let cell = ValidationError::cell(0, "lane", "must not be blank");
        assert_eq!(
            error_cells(&cell),
            ["1".to_string(), "lane".to_string(), "must not be blank".to_string()]
        );

        let schema = ValidationError::schema("origin", "required column is missing");
        assert_eq!(error_cells(&schema)[0], "-");
    }

    #[test]
    fn report_only_when_accepted() {
        let mut dashboard = Dashboard::new();
        assert!(dashboard.report().is_none());
        dashboard.clear();
        assert!(matches!(dashboard.state, DashboardState::Empty));
    }
}
