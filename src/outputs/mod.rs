//! Export of record sets as CSV and JSON payloads.
//!
//! # Submodules
//!
//! - [`csv`]: CSV encoding with configurable delimiter, terminator and BOM
//! - [`json`]: pretty JSON array encoding
//! - [`sink`]: destinations for finished payloads ([`FileSink`], [`MemorySink`])
//!
//! # Naming
//!
//! Without channel splitting, one CSV and one JSON payload are produced with
//! the configured filenames. With `split_by_channel`, regular and short-form
//! records are exported separately:
//!
//! ```text
//! output_dir/
//! ├── <Channel>_video.csv
//! ├── <Channel>_video.json
//! ├── <Channel>_short.csv
//! └── <Channel>_short.json
//! ```
//!
//! Empty groups produce no files.

pub mod csv;
pub mod json;
pub mod sink;

use serde::Serialize;
use tracing::{error, info, instrument};

use crate::config::ExportPolicy;
use crate::error::{HarvestError, Result};
use crate::filters::{FilterEngine, Filterable};
use crate::utils::safe_filename;

pub use sink::{ExportSink, FileSink, MemorySink};

pub const CSV_MEDIA_TYPE: &str = "text/csv;charset=utf-8";
pub const JSON_MEDIA_TYPE: &str = "application/json;charset=utf-8";

/// Encoded export ready for a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub content: String,
    /// Suggested filename.
    pub filename: String,
    pub media_type: &'static str,
}

/// What happened to one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered,
    /// Built but not handed to the sink.
    DryRun,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct Delivery {
    pub payload: Payload,
    pub status: DeliveryStatus,
}

/// A named slice of the final record set.
#[derive(Debug)]
pub struct ExportGroup<'a, R> {
    pub csv_filename: String,
    pub json_filename: String,
    pub records: Vec<&'a R>,
}

/// Builds payloads and hands them to a sink.
#[derive(Debug, Clone)]
pub struct Exporter {
    policy: ExportPolicy,
}

impl Exporter {
    pub fn new(policy: &ExportPolicy) -> Self {
        Self {
            policy: policy.clone(),
        }
    }

    /// Split records into export groups according to the naming policy.
    ///
    /// `channel` is only used when `split_by_channel` is on; it is made
    /// filesystem-safe first.
    pub fn groups<'a, R: Filterable>(
        &self,
        records: &'a [R],
        filters: &FilterEngine,
        channel: Option<&str>,
    ) -> Vec<ExportGroup<'a, R>> {
        if !self.policy.split_by_channel {
            return vec![ExportGroup {
                csv_filename: self.policy.csv_filename.clone(),
                json_filename: self.policy.json_filename.clone(),
                records: records.iter().collect(),
            }];
        }

        let stem = safe_filename(channel.unwrap_or_default());
        let (shorts, videos): (Vec<&R>, Vec<&R>) =
            records.iter().partition(|r| filters.is_short_form(*r));
        [("video", videos), ("short", shorts)]
            .into_iter()
            .map(|(suffix, records)| ExportGroup {
                csv_filename: format!("{}_{}.csv", stem, suffix),
                json_filename: format!("{}_{}.json", stem, suffix),
                records,
            })
            .collect()
    }

    /// Encode one group as a CSV and a JSON payload; an empty group yields none.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::CsvEncode`] or [`HarvestError::Encode`] if a
    /// record cannot be serialized or the CSV policy is unusable.
    pub fn payloads<R: Serialize>(&self, group: &ExportGroup<'_, R>) -> Result<Vec<Payload>> {
        if group.records.is_empty() {
            return Ok(Vec::new());
        }

        let csv = csv::to_csv(&group.records, &self.policy).map_err(|source| HarvestError::CsvEncode {
            filename: group.csv_filename.clone(),
            source,
        })?;
        let json = json::to_json(&group.records).map_err(|source| HarvestError::Encode {
            filename: group.json_filename.clone(),
            source,
        })?;

        Ok(vec![
            Payload {
                content: csv,
                filename: group.csv_filename.clone(),
                media_type: CSV_MEDIA_TYPE,
            },
            Payload {
                content: json,
                filename: group.json_filename.clone(),
                media_type: JSON_MEDIA_TYPE,
            },
        ])
    }

    /// Encode every group and deliver the payloads.
    ///
    /// A sink failure is logged and recorded for that payload only; the
    /// remaining payloads are still delivered. In dry-run mode nothing
    /// reaches the sink.
    ///
    /// # Errors
    ///
    /// Only encoding failures are returned as errors.
    #[instrument(level = "info", skip_all, fields(groups = groups.len(), dry_run = self.policy.dry_run))]
    pub async fn export<R, S>(&self, groups: &[ExportGroup<'_, R>], sink: &mut S) -> Result<Vec<Delivery>>
    where
        R: Serialize,
        S: ExportSink,
    {
        let mut deliveries = Vec::new();
        for group in groups {
            for payload in self.payloads(group)? {
                let status = if self.policy.dry_run {
                    info!(
                        file = %payload.filename,
                        media_type = payload.media_type,
                        bytes = payload.content.len(),
                        "Dry run; payload not delivered"
                    );
                    DeliveryStatus::DryRun
                } else {
                    match sink.deliver(&payload).await {
                        Ok(()) => DeliveryStatus::Delivered,
                        Err(e) => {
                            error!(file = %payload.filename, error = %e, "Export delivery failed");
                            DeliveryStatus::Failed(e.to_string())
                        }
                    }
                };
                deliveries.push(Delivery { payload, status });
            }
        }
        Ok(deliveries)
    }
}
