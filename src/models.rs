//! Data models for harvested links and their enriched representations.
//!
//! - [`RawItem`]: attribute/text tuple observed by a content source
//! - [`Poll`]: one observation of the page (items plus growth metric)
//! - [`LinkDescriptor`]: a recognized video link in canonical form
//! - [`VideoRecord`]: a link enriched with grid metadata
//!
//! Records serialize with camelCase keys. Field declaration order is the
//! column order of the CSV export and the key order of the JSON export.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The URL shape a video identifier was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceType {
    /// `youtube.com/watch?v=<id>`
    Primary,
    /// `youtube.com/shorts/<id>`
    ShortForm,
    /// `youtube.com/embed/<id>`
    Embedded,
    /// `youtu.be/<id>`
    ShortLink,
}

/// A URL recognized as a video link.
///
/// Two descriptors with the same `id` are the same video, whatever their
/// `source_type` or `original_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDescriptor {
    pub id: String,
    pub canonical_url: String,
    /// The URL as observed, after redirect unwrapping.
    pub original_url: String,
    pub source_type: SourceType,
    pub is_short_form: bool,
}

/// What a content source saw for one item on the page.
///
/// Link scans only fill `url`; grid scans also fill the text fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub url: Option<String>,
    pub title: Option<String>,
    pub duration_text: Option<String>,
    pub views_text: Option<String>,
    pub date_text: Option<String>,
}

impl RawItem {
    pub fn link(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }
}

/// Result of polling a content source once.
#[derive(Debug, Clone, Default)]
pub struct Poll {
    pub items: Vec<RawItem>,
    /// Scalar proxy for page size (content height, document length, ...).
    pub growth_metric: u64,
}

/// A grid tile: link identity plus parsed metadata.
///
/// The raw texts are kept next to their parsed values so unparseable
/// fragments stay visible in the export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    #[serde(flatten)]
    pub link: LinkDescriptor,
    pub title: Option<String>,
    pub duration_text: Option<String>,
    pub duration_seconds: Option<u64>,
    pub views_text: Option<String>,
    pub view_count: Option<u64>,
    pub date_text: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub scraped_at: DateTime<Utc>,
    /// Resolution tag to URL, in configured tag order.
    pub thumbnail_urls: Map<String, Value>,
}

/// Thumbnail URLs for a video id, restricted to the given resolution tags.
///
/// Keys keep the order of `tags`; unknown tags are ignored.
pub fn thumbnail_urls(id: &str, tags: &[String]) -> Map<String, Value> {
    const KNOWN: [&str; 4] = ["default", "mqdefault", "hqdefault", "maxresdefault"];
    tags.iter()
        .filter(|tag| KNOWN.contains(&tag.as_str()))
        .map(|tag| {
            let url = format!("https://i.ytimg.com/vi/{}/{}.jpg", id, tag);
            (tag.clone(), Value::String(url))
        })
        .collect()
}
