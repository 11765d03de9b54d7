//! Error types for the harvesting pipeline.
//!
//! Per-item problems (a URL that is not a video link, a view count that
//! cannot be read) are never errors; they surface as `None` values. The
//! variants here are the failures that abort a run or a single export.

/// Fatal error raised by configuration, content sources or export sinks.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// Configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid YAML for [`crate::config::HarvestConfig`].
    #[error("invalid config {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// The content source could not be polled.
    #[error("content source failed: {0}")]
    Source(String),

    /// Records could not be encoded for export.
    #[error("failed to encode {filename}: {source}")]
    Encode {
        filename: String,
        #[source]
        source: serde_json::Error,
    },

    /// Records could not be encoded as CSV.
    #[error("failed to encode {filename}: {source}")]
    CsvEncode {
        filename: String,
        #[source]
        source: crate::outputs::csv::CsvError,
    },

    /// The export sink could not deliver a payload.
    #[error("failed to deliver {filename}: {source}")]
    Sink {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    /// Any other I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, HarvestError>;
