//! Control Panel Widget
//! Left side panel with data source, report settings and run history.

use crate::charts::ChartPlotter;
use crate::stats::Granularity;
use crate::store::KpiSnapshot;
use egui::{Color32, ComboBox, RichText};
use std::path::PathBuf;

/// User settings for a dashboard run
#[derive(Default, Clone, Debug, PartialEq)]
pub struct UserSettings {
    pub csv_path: Option<PathBuf>,
    pub granularity: Granularity,
    pub save_to_store: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Error,
}

impl StatusLevel {
    fn color(self) -> Color32 {
        match self {
            StatusLevel::Info => Color32::GRAY,
            StatusLevel::Success => Color32::from_rgb(40, 167, 69),
            StatusLevel::Error => Color32::from_rgb(220, 53, 69),
        }
    }
}

/// Left side control panel with file selection and report controls.
pub struct ControlPanel {
    pub settings: UserSettings,
    pub progress: f32,
    pub status: String,
    pub status_level: StatusLevel,
    pub export_enabled: bool,
    pub store_available: bool,
    pub history: Vec<KpiSnapshot>,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            settings: UserSettings::default(),
            progress: 0.0,
            status: "Ready".to_string(),
            status_level: StatusLevel::Info,
            export_enabled: false,
            store_available: false,
            history: Vec::new(),
        }
    }
}

impl ControlPanel {
    pub fn new(granularity: Granularity, store_available: bool, save_to_store: bool) -> Self {
        Self {
            settings: UserSettings {
                granularity,
                save_to_store: store_available && save_to_store,
                ..UserSettings::default()
            },
            store_available,
            ..Self::default()
        }
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("🚚 Supply KPI")
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.label(
                RichText::new("Shipment dashboard")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== CSV File Section =====
        ui.label(RichText::new("📁 Shipments CSV").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    let path_text = self
                        .settings
                        .csv_path
                        .as_ref()
                        .and_then(|p| p.file_name())
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| "No file selected".to_string());

                    let color = if self.settings.csv_path.is_some() {
                        ui.visuals().strong_text_color()
                    } else {
                        Color32::GRAY
                    };
                    ui.label(RichText::new(&path_text).size(12.0).color(color));

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("📂 Browse").clicked() {
                            action = ControlPanelAction::BrowseCsv;
                        }
                    });
                });
            });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Report Section =====
        ui.label(RichText::new("⚙️ Report").size(14.0).strong());
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            ui.add_sized([110.0, 20.0], egui::Label::new("Trend buckets:"));
            ComboBox::from_id_salt("granularity")
                .width(150.0)
                .selected_text(self.settings.granularity.label())
                .show_ui(ui, |ui| {
                    for g in Granularity::ALL {
                        if ui
                            .selectable_label(self.settings.granularity == g, g.label())
                            .clicked()
                            && self.settings.granularity != g
                        {
                            self.settings.granularity = g;
                            if self.settings.csv_path.is_some() {
                                action = ControlPanelAction::Rerun;
                            }
                        }
                    }
                });
        });

        ui.add_space(5.0);
        ui.add_enabled_ui(self.store_available, |ui| {
            ui.checkbox(&mut self.settings.save_to_store, "Save shipments and KPIs");
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Action Buttons =====
        ui.vertical_centered(|ui| {
            ui.add_enabled_ui(self.settings.csv_path.is_some(), |ui| {
                let button = egui::Button::new(RichText::new("▶ Reload").size(16.0))
                    .min_size(egui::vec2(200.0, 35.0));
                if ui.add(button).clicked() {
                    action = ControlPanelAction::Rerun;
                }
            });

            ui.add_space(8.0);

            ui.add_enabled_ui(self.export_enabled, |ui| {
                let export = egui::Button::new(RichText::new("🖼 Export Charts").size(14.0))
                    .min_size(egui::vec2(150.0, 30.0));
                if ui.add(export).clicked() {
                    action = ControlPanelAction::ExportCharts;
                }
            });
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Progress Section =====
        ui.label(RichText::new("📊 Progress").size(14.0).strong());
        ui.add_space(5.0);

        ui.add(
            egui::ProgressBar::new(self.progress / 100.0)
                .show_percentage()
                .animate(self.progress > 0.0 && self.progress < 100.0),
        );

        ui.add_space(5.0);
        ui.label(
            RichText::new(&self.status)
                .size(11.0)
                .color(self.status_level.color()),
        );

        if self.store_available {
            ui.add_space(15.0);
            ui.separator();
            ui.add_space(10.0);
            self.show_history(ui, &mut action);
        }

        action
    }

    fn show_history(&self, ui: &mut egui::Ui, action: &mut ControlPanelAction) {
        ui.horizontal(|ui| {
            ui.label(RichText::new("🕘 History").size(14.0).strong());
            if ui.small_button("⟳").on_hover_text("Refresh").clicked() {
                *action = ControlPanelAction::RefreshHistory;
            }
        });
        ui.add_space(5.0);

        if self.history.is_empty() {
            ui.label(RichText::new("No stored runs").size(11.0).color(Color32::GRAY));
            return;
        }

        egui::Grid::new("kpi_history")
            .striped(true)
            .spacing([8.0, 4.0])
            .show(ui, |ui| {
                ui.label(RichText::new("When").strong().size(11.0));
                ui.label(RichText::new("N").strong().size(11.0));
                ui.label(RichText::new("On time").strong().size(11.0));
                ui.label(RichText::new("Turnover").strong().size(11.0));
                ui.end_row();

                for snap in &self.history {
                    ui.label(
                        RichText::new(snap.recorded_at.format("%m-%d %H:%M").to_string())
                            .size(11.0),
                    );
                    ui.label(RichText::new(snap.shipments.to_string()).size(11.0));
                    ui.label(
                        RichText::new(ChartPlotter::format_percent(snap.on_time_rate))
                            .size(11.0)
                            .color(ChartPlotter::on_time_color(snap.on_time_rate)),
                    );
                    ui.label(RichText::new(snap.inventory_turnover.to_string()).size(11.0));
                    ui.end_row();
                }
            });
    }

    /// Set progress and status
    pub fn set_progress(&mut self, progress: f32, status: &str) {
        self.progress = progress;
        self.status = status.to_string();
        self.status_level = if progress >= 100.0 {
            StatusLevel::Success
        } else {
            StatusLevel::Info
        };
    }

    pub fn set_error(&mut self, status: &str) {
        self.progress = 0.0;
        self.status = status.to_string();
        self.status_level = StatusLevel::Error;
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    BrowseCsv,
    Rerun,
    ExportCharts,
    RefreshHistory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saving_requires_a_store() {
        let panel = ControlPanel::new(Granularity::Month, false, true);
        assert!(!panel.settings.save_to_store);
        assert_eq!(panel.settings.granularity, Granularity::Month);

        let panel = ControlPanel::new(Granularity::Week, true, true);
        assert!(panel.settings.save_to_store);
    }

    #[test]
    fn status_level_tracks_progress() {
        let mut panel = ControlPanel::default();
        panel.set_progress(40.0, "Validating...");
        assert_eq!(panel.status_level, StatusLevel::Info);
        panel.set_progress(100.0, "Complete");
        assert_eq!(panel.status_level, StatusLevel::Success);
        panel.set_error("Error: bad file");
        assert_eq!(panel.status_level, StatusLevel::Error);
        assert_eq!(panel.progress, 0.0);
    }
}
