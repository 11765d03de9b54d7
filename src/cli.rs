//! Command-line interface definitions for yt_harvest.
//!
//! Every option can also be supplied through an environment variable.

use clap::Parser;

use crate::config::ScanMode;

/// Command-line arguments for the harvester.
///
/// # Examples
///
/// ```sh
/// # Replay recorded pages and export links to ./out
/// yt_harvest -s ./snapshots -o ./out
///
/// # Grid scan with a config overlay, without writing anything
/// yt_harvest -s ./snapshots -o ./out --mode grid -c harvest.yaml --dry-run
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory of recorded HTML page snapshots, replayed in filename order
    #[arg(short, long, env = "YT_HARVEST_SNAPSHOTS")]
    pub snapshots: String,

    /// Output directory for the CSV and JSON exports
    #[arg(short, long, env = "YT_HARVEST_OUTPUT_DIR", default_value = ".")]
    pub output_dir: String,

    /// Optional path to a YAML config file
    #[arg(short, long, env = "YT_HARVEST_CONFIG")]
    pub config: Option<String>,

    /// Scan mode; overrides the config file
    #[arg(short, long, value_enum, env = "YT_HARVEST_MODE")]
    pub mode: Option<ScanMode>,

    /// Channel name used for split exports instead of the one found in the page
    #[arg(long, env = "YT_HARVEST_CHANNEL")]
    pub channel: Option<String>,

    /// Build the exports and report them without writing files
    #[arg(long, env = "YT_HARVEST_DRY_RUN")]
    pub dry_run: bool,
}
