//! Export sinks: where finished payloads go.

use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument};

use super::Payload;
use crate::error::{HarvestError, Result};

/// Delivers a payload (download, file write, upload, ...).
#[allow(async_fn_in_trait)]
pub trait ExportSink {
    async fn deliver(&mut self, payload: &Payload) -> Result<()>;
}

/// Writes each payload to `<dir>/<filename>`, creating `dir` if needed.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ExportSink for FileSink {
    #[instrument(level = "info", skip_all, fields(dir = %self.dir.display(), file = %payload.filename))]
    async fn deliver(&mut self, payload: &Payload) -> Result<()> {
        let path = self.dir.join(&payload.filename);
        let io_err = |source| HarvestError::Sink {
            filename: payload.filename.clone(),
            source,
        };
        fs::create_dir_all(&self.dir).await.map_err(io_err)?;
        fs::write(&path, payload.content.as_bytes()).await.map_err(io_err)?;
        info!(path = %path.display(), bytes = payload.content.len(), "Wrote export file");
        Ok(())
    }
}

/// Keeps delivered payloads in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub delivered: Vec<Payload>,
}

impl ExportSink for MemorySink {
    async fn deliver(&mut self, payload: &Payload) -> Result<()> {
        self.delivered.push(payload.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(name: &str, content: &str) -> Payload {
        Payload {
            content: content.to_string(),
            filename: name.to_string(),
            media_type: "text/plain",
        }
    }

    #[tokio::test]
    async fn test_file_sink_writes_into_dir() {
        let dir = std::env::temp_dir().join(format!("yt_harvest_sink_{}", std::process::id()));
        let mut sink = FileSink::new(&dir);
        sink.deliver(&payload("out.csv", "\u{FEFF}a\r\n")).await.unwrap();
        let written = std::fs::read_to_string(dir.join("out.csv")).unwrap();
        assert_eq!(written, "\u{FEFF}a\r\n");
    }

    #[tokio::test]
    async fn test_file_sink_reports_filename_on_failure() {
        let blocker = std::env::temp_dir().join(format!("yt_harvest_blocker_{}", std::process::id()));
        std::fs::write(&blocker, "not a directory").unwrap();
        let mut sink = FileSink::new(blocker.join("nested"));
        let err = sink.deliver(&payload("x.json", "[]")).await.unwrap_err();
        assert!(matches!(err, HarvestError::Sink { ref filename, .. } if filename == "x.json"));
    }

    #[tokio::test]
    async fn test_memory_sink_collects() {
        let mut sink = MemorySink::default();
        sink.deliver(&payload("a", "1")).await.unwrap();
        sink.deliver(&payload("b", "2")).await.unwrap();
        assert_eq!(sink.delivered.len(), 2);
        assert_eq!(sink.delivered[1].filename, "b");
    }
}
