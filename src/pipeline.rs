//! One harvest run: collect, filter, export, report.

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::collector::{Capture, Collector, StopReason};
use crate::config::HarvestConfig;
use crate::error::Result;
use crate::filters::{FilterEngine, Filterable};
use crate::outputs::{Delivery, ExportSink, Exporter};
use crate::scrapers::ContentSource;

/// Counts and outcome of a finished run.
#[derive(Debug)]
pub struct HarvestReport {
    pub raw_seen: usize,
    pub rejected: usize,
    pub unique: usize,
    pub kept: usize,
    pub iterations: usize,
    pub stop_reason: StopReason,
    pub deliveries: Vec<Delivery>,
}

/// Why a run ended up with nothing to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyResult {
    /// The page never showed a single candidate link.
    NoLinks,
    /// Links were seen, but none was a recognized video link.
    NoneRecognized,
    /// Records were found and the filters removed all of them.
    AllFiltered,
}

impl HarvestReport {
    pub fn empty_result(&self) -> Option<EmptyResult> {
        if self.kept > 0 {
            None
        } else if self.raw_seen == 0 {
            Some(EmptyResult::NoLinks)
        } else if self.unique == 0 {
            Some(EmptyResult::NoneRecognized)
        } else {
            Some(EmptyResult::AllFiltered)
        }
    }

    /// Write the end-of-run summary to the log.
    pub fn log_summary(&self) {
        info!(
            raw_seen = self.raw_seen,
            rejected = self.rejected,
            unique = self.unique,
            kept = self.kept,
            iterations = self.iterations,
            reason = %self.stop_reason,
            files = self.deliveries.len(),
            "Harvest summary"
        );
        if let StopReason::SourceFailed(e) = &self.stop_reason {
            warn!(error = %e, kept = self.kept, "Content source failed; exported partial results");
        }
        match self.empty_result() {
            Some(EmptyResult::NoLinks) => warn!("No links present on the page"),
            Some(EmptyResult::NoneRecognized) => {
                warn!(seen = self.raw_seen, "Links present but none recognized or accessible")
            }
            Some(EmptyResult::AllFiltered) => {
                warn!(unique = self.unique, "Every collected record was removed by the filters")
            }
            None => {}
        }
    }
}

/// Run a full harvest against `source`, delivering exports to `sink`.
///
/// # Arguments
///
/// * `config` - Collection, filter and export policies for the run.
/// * `source` - Content source to scroll and poll.
/// * `sink` - Destination for the CSV and JSON payloads.
/// * `channel` - Names the split exports when `export.split_by_channel` is on.
///
/// # Returns
///
/// The records that passed the filters, in discovery order, alongside the
/// [`HarvestReport`].
///
/// # Errors
///
/// Only export encoding failures abort the run. A failing content source
/// ends collection early and the partial records are still exported.
#[instrument(level = "info", skip_all, fields(scan = ?config.scan))]
pub async fn harvest<R, S, K>(
    config: &HarvestConfig,
    source: &mut S,
    sink: &mut K,
    channel: Option<&str>,
) -> Result<(Vec<R>, HarvestReport)>
where
    R: Capture + Filterable + Serialize,
    S: ContentSource,
    K: ExportSink,
{
    let outcome = Collector::new(config).collect::<R, S>(source).await;
    let unique = outcome.records.len();

    let filters = FilterEngine::new(config);
    let records = filters.apply(outcome.records);

    let exporter = Exporter::new(&config.export);
    let groups = exporter.groups(&records, &filters, channel);
    let deliveries = exporter.export(&groups, sink).await?;

    let report = HarvestReport {
        raw_seen: outcome.raw_seen,
        rejected: outcome.rejected,
        unique,
        kept: records.len(),
        iterations: outcome.iterations,
        stop_reason: outcome.stop_reason,
        deliveries,
    };
    Ok((records, report))
}
