mod app;
mod color;
mod data;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::{Context, Result};
use app::DeviceDashboardApp;
use clap::Parser;
use eframe::egui;

/// Interactive dashboard of discontinued consumer devices.
#[derive(Debug, Parser)]
#[command(name = "device-lifecycle", version, about)]
struct Cli {
    /// Lifecycle table to load (.xlsx, .xls, .csv, .json or .parquet)
    #[arg(default_value = "lifecycledata.xlsx")]
    data: PathBuf,

    /// Initial window width in points
    #[arg(long, default_value_t = 1400.0)]
    width: f32,

    /// Initial window height in points
    #[arg(long, default_value_t = 900.0)]
    height: f32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    log::info!("Starting with data file {}", cli.data.display());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([cli.width, cli.height])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    let data_path = cli.data;
    eframe::run_native(
        "Device Lifecycle Dashboard",
        options,
        Box::new(move |_cc| Ok(Box::new(DeviceDashboardApp::new(data_path)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
    .context("running the dashboard window")
}
