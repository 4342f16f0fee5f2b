// src/main.rs
mod api;
mod config;
mod geometry;
mod loader;
mod model;
mod optimizer;
mod pool;
mod report;
mod types;

use std::process::ExitCode;

use config::{AppConfig, RunMode};

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = dotenvy::dotenv() {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("⚠️ Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();

    match app_config.mode {
        RunMode::Serve => {
            println!("🚀 Packing service starting...");
            api::start_api_server(app_config.api, app_config.optimizer).await;
            ExitCode::SUCCESS
        }
        RunMode::Report => run_report(&app_config).await,
    }
}

async fn run_report(app_config: &AppConfig) -> ExitCode {
    let (boxes, blocks) = match loader::load_inputs(&app_config.loader).await {
        Ok(inputs) => inputs,
        Err(err) => {
            eprintln!("❌ Could not load input data: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let started = std::time::Instant::now();
    let result = optimizer::pack_blocks_with_config(
        boxes,
        blocks,
        app_config.optimizer.packing_config(),
    );
    let summary = report::RunSummary::from_result(&result);
    println!(
        "📦 Packed {}/{} blocks into {}/{} boxes ({:.1}%), {} regions in pool, {:?}",
        summary.placed,
        summary.blocks,
        summary.used_boxes,
        summary.boxes,
        summary.placement_rate_percent,
        summary.pool_size,
        started.elapsed()
    );

    if let Err(err) = report::print_report(&result, app_config.report.hide_output()) {
        eprintln!("❌ Could not render report: {}", err);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
