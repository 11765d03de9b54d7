//! Run configuration.
//!
//! A [`HarvestConfig`] is built once (from defaults, optionally overlaid with
//! a YAML file) and then handed out by reference; each component receives the
//! policy group it needs at construction and never mutates it.
//!
//! # Example
//!
//! ```yaml
//! scan: grid
//! collect:
//!   mode: all
//!   delay_ms: 1500
//! filters:
//!   include_short_form: false
//!   title_excludes: ["live"]
//! export:
//!   dry_run: true
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::{HarvestError, Result};

/// Which record variant a run produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Every video link on the page, identity fields only.
    #[default]
    Links,
    /// Channel grid tiles with title, duration, views and publish date.
    Grid,
}

/// How the collector decides it has seen enough.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectMode {
    /// Stop once `target_count` raw items are visible (or the iteration cap hits).
    #[default]
    Count,
    /// Ignore the target; run until growth stops or the exhaustive cap hits.
    All,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub scan: ScanMode,
    /// Base used to resolve relative links found in snapshots.
    pub base_url: String,
    pub normalize: NormalizePolicy,
    pub collect: CollectPolicy,
    pub filters: FilterPolicy,
    pub export: ExportPolicy,
    pub selectors: GridSelectors,
    /// Thumbnail resolution tags attached to grid records.
    pub thumbnails: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizePolicy {
    /// When false, no record is ever flagged as short-form.
    pub detect_short_form: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectPolicy {
    /// Pause after each growth trigger, in milliseconds.
    pub delay_ms: u64,
    pub stop_on_no_growth: bool,
    pub stop_on_no_new_records: bool,
    /// Iteration cap in [`CollectMode::Count`].
    pub max_iterations: usize,
    /// Iteration cap in [`CollectMode::All`].
    pub exhaustive_iteration_cap: usize,
    pub mode: CollectMode,
    pub target_count: Option<usize>,
    /// Keep only the first `target_count` records after filtering.
    pub limit_to_target: bool,
    pub log_every_iteration: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterPolicy {
    pub include_short_form: bool,
    /// Known durations strictly below this count as short-form.
    pub short_form_max_seconds: u64,
    pub min_duration_secs: Option<u64>,
    pub max_duration_secs: Option<u64>,
    /// Every keyword must appear in the title (case-insensitive).
    pub title_includes: Vec<String>,
    /// No keyword may appear in the title (case-insensitive).
    pub title_excludes: Vec<String>,
    pub published_from: Option<DateTime<Utc>>,
    pub published_to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportPolicy {
    pub csv_filename: String,
    pub json_filename: String,
    /// Single ASCII field separator.
    pub delimiter: char,
    pub line_terminator: String,
    pub add_bom: bool,
    /// Render nested values (thumbnails) as JSON text in CSV cells.
    pub flatten_objects: bool,
    /// Build payloads but do not hand them to the sink.
    pub dry_run: bool,
    /// Export `<channel>_video.*` and `<channel>_short.*` instead of the fixed filenames.
    pub split_by_channel: bool,
}

/// CSS selectors for one channel-grid tile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSelectors {
    pub container: String,
    pub title_link: String,
    pub title_alt: String,
    pub metadata_line: String,
    pub duration: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self::preset(ScanMode::Links)
    }
}

impl HarvestConfig {
    /// Defaults tuned for a scan mode.
    pub fn preset(scan: ScanMode) -> Self {
        let (collect, export) = match scan {
            ScanMode::Links => (CollectPolicy::default(), ExportPolicy::default()),
            ScanMode::Grid => (
                CollectPolicy {
                    delay_ms: 2000,
                    stop_on_no_new_records: false,
                    max_iterations: 30,
                    target_count: Some(50),
                    ..CollectPolicy::default()
                },
                ExportPolicy {
                    csv_filename: "youtube_videos.csv".to_string(),
                    json_filename: "youtube_videos.json".to_string(),
                    split_by_channel: true,
                    ..ExportPolicy::default()
                },
            ),
        };
        Self {
            scan,
            base_url: "https://www.youtube.com".to_string(),
            normalize: NormalizePolicy::default(),
            collect,
            filters: FilterPolicy::default(),
            export,
            selectors: GridSelectors::default(),
            thumbnails: ["default", "mqdefault", "hqdefault", "maxresdefault"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for NormalizePolicy {
    fn default() -> Self {
        Self {
            detect_short_form: true,
        }
    }
}

impl Default for CollectPolicy {
    fn default() -> Self {
        Self {
            delay_ms: 1200,
            stop_on_no_growth: true,
            stop_on_no_new_records: true,
            max_iterations: 100,
            exhaustive_iteration_cap: 500,
            mode: CollectMode::Count,
            target_count: None,
            limit_to_target: true,
            log_every_iteration: true,
        }
    }
}

impl CollectPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Absolute bound on loop iterations for the active mode.
    pub fn iteration_cap(&self) -> usize {
        match self.mode {
            CollectMode::Count => self.max_iterations,
            CollectMode::All => self.exhaustive_iteration_cap,
        }
    }

    /// Raw-item target, only meaningful in count mode.
    pub fn active_target(&self) -> Option<usize> {
        match self.mode {
            CollectMode::Count => self.target_count.filter(|&n| n > 0),
            CollectMode::All => None,
        }
    }
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            include_short_form: true,
            short_form_max_seconds: 60,
            min_duration_secs: None,
            max_duration_secs: None,
            title_includes: Vec::new(),
            title_excludes: Vec::new(),
            published_from: None,
            published_to: None,
        }
    }
}

impl Default for ExportPolicy {
    fn default() -> Self {
        Self {
            csv_filename: "youtube_links.csv".to_string(),
            json_filename: "youtube_links.json".to_string(),
            delimiter: ',',
            line_terminator: "\r\n".to_string(),
            add_bom: true,
            flatten_objects: true,
            dry_run: false,
            split_by_channel: false,
        }
    }
}

impl Default for GridSelectors {
    fn default() -> Self {
        Self {
            container: "ytd-rich-grid-media".to_string(),
            title_link: "a#video-title-link".to_string(),
            title_alt: "a#video-title".to_string(),
            metadata_line: "#metadata-line span".to_string(),
            duration: "ytd-thumbnail-overlay-time-status-renderer span".to_string(),
        }
    }
}

/// Load configuration from an optional YAML file.
///
/// The file only needs the keys it changes. Its values are overlaid on the
/// preset for its `scan` mode (or `scan_override` when given), so a file
/// containing just `scan: grid` gets the grid defaults.
///
/// # Errors
///
/// Returns [`HarvestError::ConfigRead`] if the file cannot be read and
/// [`HarvestError::ConfigParse`] if it is not valid YAML for this schema.
#[instrument(level = "info")]
pub fn load_config(path: Option<&str>, scan_override: Option<ScanMode>) -> Result<HarvestConfig> {
    let label = path.unwrap_or("<defaults>").to_string();
    let parse_err = |source| HarvestError::ConfigParse {
        path: label.clone(),
        source,
    };

    let overlay = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p).map_err(|source| HarvestError::ConfigRead {
                path: p.to_string(),
                source,
            })?;
            serde_yaml::from_str::<Value>(&text).map_err(parse_err)?
        }
        None => Value::Null,
    };

    let file_scan = overlay
        .get("scan")
        .cloned()
        .map(serde_yaml::from_value::<ScanMode>)
        .transpose()
        .map_err(parse_err)?;
    let scan = scan_override.or(file_scan).unwrap_or_default();

    let mut merged = serde_yaml::to_value(HarvestConfig::preset(scan)).map_err(parse_err)?;
    if !overlay.is_null() {
        merge_yaml(&mut merged, overlay);
    }
    let mut config: HarvestConfig = serde_yaml::from_value(merged).map_err(parse_err)?;
    config.scan = scan;

    debug!(?config, "Loaded configuration");
    Ok(config)
}

/// Deep-merge `overlay` into `base`; mappings merge key by key, anything else replaces.
fn merge_yaml(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => merge_yaml(slot, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, body: &str) -> String {
        let path = std::env::temp_dir().join(format!("yt_harvest_{}_{}.yaml", name, std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_defaults_without_file() {
        let config = load_config(None, None).unwrap();
        assert_eq!(config.scan, ScanMode::Links);
        assert_eq!(config.collect.delay_ms, 1200);
        assert_eq!(config.collect.iteration_cap(), 100);
        assert_eq!(config.export.csv_filename, "youtube_links.csv");
        assert_eq!(config.export.line_terminator, "\r\n");
    }

    #[test]
    fn test_grid_preset_from_file_scan_key() {
        let path = write_temp("grid", "scan: grid\ncollect:\n  delay_ms: 10\n");
        let config = load_config(Some(&path), None).unwrap();
        assert_eq!(config.scan, ScanMode::Grid);
        assert_eq!(config.collect.delay_ms, 10);
        assert_eq!(config.collect.max_iterations, 30);
        assert_eq!(config.collect.target_count, Some(50));
        assert!(config.export.split_by_channel);
        assert!(config.collect.stop_on_no_growth);
    }

    #[test]
    fn test_override_beats_file_scan() {
        let path = write_temp("override", "scan: grid\n");
        let config = load_config(Some(&path), Some(ScanMode::Links)).unwrap();
        assert_eq!(config.scan, ScanMode::Links);
        assert_eq!(config.collect.max_iterations, 100);
    }

    #[test]
    fn test_filter_dates_parse() {
        let path = write_temp(
            "dates",
            "filters:\n  published_from: 2024-01-01T00:00:00Z\n  title_includes: [rust]\n",
        );
        let config = load_config(Some(&path), None).unwrap();
        assert_eq!(
            config.filters.published_from.unwrap().to_rfc3339(),
            "2024-01-01T00:00:00+00:00"
        );
        assert_eq!(config.filters.title_includes, vec!["rust".to_string()]);
    }

    #[test]
    fn test_export_delimiter_is_a_single_char() {
        let path = write_temp("delim", "export:\n  delimiter: \";\"\n  add_bom: false\n");
        let config = load_config(Some(&path), None).unwrap();
        assert_eq!(config.export.delimiter, ';');
        assert!(!config.export.add_bom);

        let path = write_temp("delim_wide", "export:\n  delimiter: \";;\"\n");
        let err = load_config(Some(&path), None).unwrap_err();
        assert!(matches!(err, HarvestError::ConfigParse { .. }));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = load_config(Some("/nonexistent/yt_harvest.yaml"), None).unwrap_err();
        assert!(matches!(err, HarvestError::ConfigRead { .. }));
    }

    #[test]
    fn test_bad_yaml_is_parse_error() {
        let path = write_temp("bad", "collect:\n  delay_ms: soon\n");
        let err = load_config(Some(&path), None).unwrap_err();
        assert!(matches!(err, HarvestError::ConfigParse { .. }));
    }

    #[test]
    fn test_exhaustive_mode_ignores_target() {
        let policy = CollectPolicy {
            mode: CollectMode::All,
            target_count: Some(10),
            ..CollectPolicy::default()
        };
        assert_eq!(policy.active_target(), None);
        assert_eq!(policy.iteration_cap(), 500);
    }
}
