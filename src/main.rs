//! Supply KPI - Shipment dashboard
//!
//! Starts the dashboard window, or with `--headless` runs one CSV through the
//! pipeline and prints the report as JSON.

use clap::Parser;
use eframe::egui;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use supply_kpi::config::{project_dirs, LoggingConfig};
use supply_kpi::gui::KpiDashboardApp;
use supply_kpi::{load_config, open_store, Granularity, Pipeline, PipelineError, ShipmentStore};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Exit status when the input could not be read or parsed as CSV.
const EXIT_PARSE: u8 = 1;
/// Exit status when the CSV parsed but failed validation.
const EXIT_INVALID: u8 = 2;

/// Supply KPI: validate shipment CSVs and chart delivery KPIs
#[derive(Parser, Debug)]
#[command(name = "supply-kpi", version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Process this CSV without the GUI and print the report as JSON
    #[arg(long, value_name = "CSV")]
    headless: Option<PathBuf>,

    /// Trend bucket size: day, week or month
    #[arg(short, long)]
    granularity: Option<Granularity>,

    /// Persist shipments and KPIs to the configured store
    #[arg(long)]
    save: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(logging: &LoggingConfig, verbose: u8) -> Option<WorkerGuard> {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level)),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter);

    let (json_layer, guard) = if logging.file {
        let log_dir = project_dirs()
            .map(|d| d.data_dir().join("logs"))
            .unwrap_or_else(|| PathBuf::from("."));
        let _ = std::fs::create_dir_all(&log_dir);
        let file_appender = tracing_appender::rolling::daily(&log_dir, "supply_kpi.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_filter(EnvFilter::new("debug"));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();
    guard
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    if let Some(granularity) = cli.granularity {
        config.report.granularity = granularity;
    }
    let save = cli.save || config.store.save_on_load;

    let _guard = init_tracing(&config.logging, cli.verbose);
    info!(backend = ?config.store.backend, granularity = ?config.report.granularity, "starting");

    let pipeline = Pipeline::from_config(&config)?;

    if let Some(csv) = cli.headless {
        let pipeline = if save {
            pipeline.with_store(Arc::from(open_store(&config.store)?))
        } else {
            pipeline
        };
        return run_headless(&pipeline, &csv);
    }

    let store: Arc<dyn ShipmentStore> = Arc::from(open_store(&config.store)?);
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 800.0])
            .with_min_inner_size([1200.0, 700.0])
            .with_title("Supply KPI"),
        ..Default::default()
    };

    eframe::run_native(
        "Supply KPI",
        options,
        Box::new(move |cc| {
            Ok(Box::new(KpiDashboardApp::new(
                cc,
                pipeline,
                Some(store),
                save,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("GUI error: {}", e))?;

    Ok(ExitCode::SUCCESS)
}

fn run_headless(pipeline: &Pipeline, csv: &Path) -> anyhow::Result<ExitCode> {
    match pipeline.run_path(csv) {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(PipelineError::Invalid(errors)) => {
            for error in &errors {
                eprintln!("{error}");
            }
            eprintln!("{errors}");
            Ok(ExitCode::from(EXIT_INVALID))
        }
        Err(PipelineError::Parse(e)) => {
            eprintln!("{}: {e}", csv.display());
            Ok(ExitCode::from(EXIT_PARSE))
        }
        Err(e) => Err(e.into()),
    }
}
