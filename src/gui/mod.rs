//! GUI module - User interface components

mod app;
mod control_panel;
mod dashboard;

pub use app::KpiDashboardApp;
pub use control_panel::{ControlPanel, ControlPanelAction, StatusLevel, UserSettings};
pub use dashboard::{error_cells, Dashboard, DashboardState};
