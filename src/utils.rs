//! Small helpers for filenames, log formatting and output directories.

use std::fs as stdfs;
use std::path::Path;

use itertools::Itertools;
use tokio::fs;
use tracing::{info, instrument};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::error::{HarvestError, Result};
use crate::models::VideoRecord;

const MAX_FILENAME_CHARS: usize = 80;
const DEFAULT_FILENAME: &str = "youtube";

/// Turn a channel name into something usable as a file stem.
///
/// Accented letters are folded to their ASCII base (NFKD, combining marks
/// dropped). Only ASCII alphanumerics, `-`, `_` and `.` survive; whitespace
/// runs become a single `_`.
///
/// # Arguments
///
/// * `name` - Channel name as shown on the page.
///
/// # Returns
///
/// At most 80 characters, or `youtube` when nothing usable remains.
///
/// ```ignore
/// assert_eq!(safe_filename("Lofi Girl"), "Lofi_Girl");
/// assert_eq!(safe_filename("Sơn Tùng M-TP"), "Son_Tung_M-TP");
/// assert_eq!(safe_filename("///"), "youtube");
/// ```
pub fn safe_filename(name: &str) -> String {
    let folded: String = name
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || matches!(c, '-' | '_' | '.'))
        .collect();

    let out: String = folded
        .split_whitespace()
        .join("_")
        .chars()
        .take(MAX_FILENAME_CHARS)
        .collect();
    if out.is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        out
    }
}

/// Truncate a string for logging.
///
/// Cuts at a character boundary at or below `max` bytes and appends
/// `"…(+N bytes)"` with the number of bytes dropped.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Render the first `limit` records as fixed-width preview lines, header first.
pub fn preview_table(records: &[VideoRecord], limit: usize) -> Vec<String> {
    let dash = || "-".to_string();
    let mut lines = vec![format!(
        "{:>3}  {:<11}  {:<48}  {:>8}  {:>12}  {:<10}",
        "#", "id", "title", "duration", "views", "published"
    )];
    for (i, r) in records.iter().take(limit).enumerate() {
        lines.push(format!(
            "{:>3}  {:<11}  {:<48}  {:>8}  {:>12}  {:<10}",
            i + 1,
            r.link.id,
            truncate_for_log(r.title.as_deref().unwrap_or_default(), 45),
            r.duration_text.clone().unwrap_or_else(dash),
            r.view_count.map(|v| v.to_string()).unwrap_or_else(dash),
            r.published_at
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(dash),
        ));
    }
    lines
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a marker file.
///
/// # Errors
///
/// Returns [`HarvestError::Sink`] when the directory cannot be created or
/// written to.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub async fn ensure_writable_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let sink_err = |source| HarvestError::Sink {
        filename: path.display().to_string(),
        source,
    };

    fs::create_dir_all(path).await.map_err(sink_err)?;
    let marker = path.join("..__write_check__");
    stdfs::File::create(&marker).map_err(sink_err)?;
    let _ = stdfs::remove_file(&marker);
    info!("Output directory is writable");
    Ok(())
}
