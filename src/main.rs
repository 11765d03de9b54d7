//! # yt_harvest
//!
//! Replays recorded snapshots of a growing video feed or channel grid,
//! collects every video link they expose and exports the result as CSV and
//! JSON.
//!
//! ## Usage
//!
//! ```sh
//! yt_harvest -s ./snapshots -o ./out
//! yt_harvest -s ./snapshots -o ./out --mode grid
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

use yt_harvest::cli::Cli;
use yt_harvest::config::{HarvestConfig, ScanMode, load_config};
use yt_harvest::models::{LinkDescriptor, VideoRecord};
use yt_harvest::outputs::FileSink;
use yt_harvest::scrapers::SnapshotSource;
use yt_harvest::utils::{ensure_writable_dir, preview_table};
use yt_harvest::{HarvestReport, harvest};

const PREVIEW_ROWS: usize = 10;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("yt_harvest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    if let Err(e) = run(&args).await {
        error!(error = %e, "Harvest failed");
        return Err(e.into());
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

#[instrument(level = "info", skip_all, fields(snapshots = %args.snapshots))]
async fn run(args: &Cli) -> yt_harvest::Result<()> {
    let mut config: HarvestConfig = load_config(args.config.as_deref(), args.mode)?;
    if args.dry_run {
        config.export.dry_run = true;
    }
    info!(scan = ?config.scan, mode = ?config.collect.mode, dry_run = config.export.dry_run, "Configuration loaded");

    if !config.export.dry_run {
        ensure_writable_dir(&args.output_dir).await?;
    }

    let mut source = SnapshotSource::from_dir(&args.snapshots, &config).await?;
    let channel = args
        .channel
        .clone()
        .unwrap_or_else(|| source.channel_name());
    info!(%channel, "Harvesting");

    let mut sink = FileSink::new(&args.output_dir);
    let report: HarvestReport = match config.scan {
        ScanMode::Links => {
            let (_, report) =
                harvest::<LinkDescriptor, _, _>(&config, &mut source, &mut sink, Some(&channel)).await?;
            report
        }
        ScanMode::Grid => {
            let (records, report) =
                harvest::<VideoRecord, _, _>(&config, &mut source, &mut sink, Some(&channel)).await?;
            for line in preview_table(&records, PREVIEW_ROWS) {
                info!("{}", line);
            }
            report
        }
    };

    for delivery in &report.deliveries {
        debug!(file = %delivery.payload.filename, status = ?delivery.status, "Export");
    }
    report.log_summary();
    Ok(())
}
