//! Supply KPI Main Application
//! Main window with control panel and dashboard.

use crate::charts::ChartExporter;
use crate::data::ValidationErrors;
use crate::gui::{ControlPanel, ControlPanelAction, Dashboard};
use crate::pipeline::{Pipeline, PipelineError};
use crate::stats::KpiReport;
use crate::store::ShipmentStore;
use egui::SidePanel;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

const HISTORY_LIMIT: usize = 10;

/// Pipeline result from background thread
enum RunResult {
    Progress(f32, String),
    Complete(KpiReport),
    Rejected(ValidationErrors),
    Error(String),
}

impl RunResult {
    fn is_final(&self) -> bool {
        !matches!(self, RunResult::Progress(..))
    }
}

/// Everything one poll of the worker channel produced.
struct WorkerPoll {
    results: Vec<RunResult>,
    /// The worker hung up without sending a final result.
    lost: bool,
}

fn poll_worker(rx: &Receiver<RunResult>) -> WorkerPoll {
    let mut results = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(result) => results.push(result),
            Err(TryRecvError::Empty) => return WorkerPoll { results, lost: false },
            Err(TryRecvError::Disconnected) => {
                let lost = !results.iter().any(RunResult::is_final);
                return WorkerPoll { results, lost };
            }
        }
    }
}

/// Main application window.
pub struct KpiDashboardApp {
    pipeline: Pipeline,
    store: Option<Arc<dyn ShipmentStore>>,
    control_panel: ControlPanel,
    dashboard: Dashboard,

    run_rx: Option<Receiver<RunResult>>,
    is_running: bool,
}

impl KpiDashboardApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        pipeline: Pipeline,
        store: Option<Arc<dyn ShipmentStore>>,
        save_on_load: bool,
    ) -> Self {
        let control_panel =
            ControlPanel::new(pipeline.granularity(), store.is_some(), save_on_load);
        let mut app = Self {
            pipeline,
            store,
            control_panel,
            dashboard: Dashboard::new(),
            run_rx: None,
            is_running: false,
        };
        app.refresh_history();
        app
    }

    /// Handle CSV file selection
    fn handle_browse_csv(&mut self) {
        if self.is_running {
            return;
        }

        if let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv"])
            .pick_file()
        {
            self.control_panel.settings.csv_path = Some(path);
            self.start_run();
        }
    }

    /// Run the pipeline on the selected file in a background thread
    fn start_run(&mut self) {
        if self.is_running {
            return;
        }
        let Some(path) = self.control_panel.settings.csv_path.clone() else {
            self.control_panel.set_error("No file selected");
            return;
        };

        let settings = &self.control_panel.settings;
        let mut pipeline = self.pipeline.clone().with_granularity(settings.granularity);
        if settings.save_to_store {
            if let Some(store) = &self.store {
                pipeline = pipeline.with_store(Arc::clone(store));
            }
        }

        self.dashboard.clear();
        self.control_panel.export_enabled = false;
        self.control_panel.set_progress(5.0, "Loading CSV file...");
        self.is_running = true;

        let (tx, rx) = channel();
        self.run_rx = Some(rx);

        thread::spawn(move || Self::run_pipeline(tx, pipeline, path));
    }

    /// Run the pipeline (called from background thread)
    fn run_pipeline(tx: Sender<RunResult>, pipeline: Pipeline, path: PathBuf) {
        let _ = tx.send(RunResult::Progress(
            20.0,
            "Parsing and validating...".to_string(),
        ));

        let result = match pipeline.run_path(&path) {
            Ok(report) => RunResult::Complete(report),
            Err(PipelineError::Invalid(errors)) => RunResult::Rejected(errors),
            Err(e) => RunResult::Error(e.to_string()),
        };
        let _ = tx.send(result);
    }

    /// Check for pipeline results
    fn check_run_results(&mut self) {
        let Some(rx) = self.run_rx.take() else {
            return;
        };
        let poll = poll_worker(&rx);
        let mut should_keep_receiver = !poll.lost;

        for result in poll.results {
            match result {
                RunResult::Progress(progress, status) => {
                    self.control_panel.set_progress(progress, &status);
                }
                RunResult::Complete(report) => {
                    let status = format!(
                        "Complete! {} shipments, {} lanes",
                        report.kpis.shipments,
                        report.kpis.lane_volumes.len()
                    );
                    self.dashboard.set_report(report);
                    self.control_panel.export_enabled = true;
                    self.control_panel.set_progress(100.0, &status);
                    self.is_running = false;
                    should_keep_receiver = false;
                    self.refresh_history();
                }
                RunResult::Rejected(errors) => {
                    self.control_panel
                        .set_error(&format!("Rejected: {} validation error(s)", errors.len()));
                    self.dashboard.set_errors(errors);
                    self.is_running = false;
                    should_keep_receiver = false;
                }
                RunResult::Error(error) => {
                    self.control_panel.set_error(&format!("Error: {}", error));
                    self.is_running = false;
                    should_keep_receiver = false;
                }
            }
        }

        if poll.lost {
            warn!("pipeline worker stopped without a result");
            self.control_panel
                .set_error("Error: background run stopped unexpectedly");
            self.is_running = false;
        }

        if should_keep_receiver {
            self.run_rx = Some(rx);
        }
    }

    /// Write PNG charts into a folder the user picks, then open it
    fn handle_export_charts(&mut self) {
        let Some(report) = self.dashboard.report() else {
            self.control_panel.set_error("No charts to export");
            return;
        };

        let Some(dir) = rfd::FileDialog::new().pick_folder() else {
            return;
        };

        match ChartExporter::default().export_all(report, &dir) {
            Ok(files) => {
                self.control_panel.set_progress(
                    100.0,
                    &format!("Exported {} charts to {}", files.len(), dir.display()),
                );
                if let Err(e) = open::that(&dir) {
                    warn!(error = %e, dir = %dir.display(), "could not open export folder");
                }
            }
            Err(e) => {
                self.control_panel.set_error(&format!("Export error: {}", e));
            }
        }
    }

    fn refresh_history(&mut self) {
        let Some(store) = &self.store else {
            return;
        };
        match store.kpi_history(HISTORY_LIMIT) {
            Ok(history) => {
                info!(entries = history.len(), "loaded KPI history");
                self.control_panel.history = history;
            }
            Err(e) => {
                warn!(error = %e, "failed to load KPI history");
                self.control_panel.set_error(&format!("History error: {}", e));
            }
        }
    }
}

impl eframe::App for KpiDashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_run_results();

        if self.is_running {
            ctx.request_repaint();
        }

        // Left panel - Control Panel
        SidePanel::left("control_panel")
            .min_width(300.0)
            .max_width(350.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    match self.control_panel.show(ui) {
                        ControlPanelAction::BrowseCsv => self.handle_browse_csv(),
                        ControlPanelAction::Rerun => self.start_run(),
                        ControlPanelAction::ExportCharts => self.handle_export_charts(),
                        ControlPanelAction::RefreshHistory => self.refresh_history(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        // Central panel - Dashboard
        egui::CentralPanel::default().show(ctx, |ui| {
            self.dashboard.show(ui);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_that_hangs_up_early_is_reported_lost() {
        let (tx, rx) = channel();
        tx.send(RunResult::Progress(20.0, "Parsing".to_string())).unwrap();
        drop(tx);

        let poll = poll_worker(&rx);
        assert_eq!(poll.results.len(), 1);
        assert!(poll.lost);
    }

    #[test]
    fn finished_or_running_worker_is_not_lost() {
        let (tx, rx) = channel();
        tx.send(RunResult::Progress(20.0, "Parsing".to_string())).unwrap();
        assert!(!poll_worker(&rx).lost);

        tx.send(RunResult::Error("boom".to_string())).unwrap();
        drop(tx);
        let poll = poll_worker(&rx);
        assert!(!poll.lost);
        assert!(matches!(poll.results.as_slice(), [RunResult::Error(e)] if e == "boom"));
    }
}
