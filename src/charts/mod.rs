//! Charts module - Dashboard plots, Sankey flows and PNG export

mod exporter;
mod plotter;
mod sankey;

pub use exporter::{nice_ceiling, ChartExportError, ChartExporter, LANE_CHART_FILE, TREND_CHART_FILE};
pub use plotter::{ChartPlotter, ON_TIME_FLOOR, ON_TIME_TARGET, PALETTE};
pub use sankey::{draw_sankey, SankeyBand, SankeyLayout, SankeyNode};
