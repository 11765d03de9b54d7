//! Record filtering and target truncation.
//!
//! A record survives only if every configured predicate accepts it. Missing
//! metadata never fails a range check: an unknown duration passes the
//! duration bounds and an unknown publish date passes the date range.

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::config::{FilterPolicy, HarvestConfig};
use crate::models::{LinkDescriptor, VideoRecord};

/// Metadata the filter predicates read.
pub trait Filterable {
    fn title(&self) -> Option<&str>;
    fn duration_seconds(&self) -> Option<u64>;
    fn published_at(&self) -> Option<DateTime<Utc>>;
    /// Short-form by URL shape.
    fn short_form_link(&self) -> bool;
}

impl Filterable for LinkDescriptor {
    fn title(&self) -> Option<&str> {
        None
    }

    fn duration_seconds(&self) -> Option<u64> {
        None
    }

    fn published_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn short_form_link(&self) -> bool {
        self.is_short_form
    }
}

impl Filterable for VideoRecord {
    fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    fn duration_seconds(&self) -> Option<u64> {
        self.duration_seconds
    }

    fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    fn short_form_link(&self) -> bool {
        self.link.is_short_form
    }
}

/// Applies [`FilterPolicy`] and the post-filter target limit.
#[derive(Debug, Clone)]
pub struct FilterEngine {
    policy: FilterPolicy,
    includes: Vec<String>,
    excludes: Vec<String>,
    limit: Option<usize>,
}

fn lowered(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

impl FilterEngine {
    pub fn new(config: &HarvestConfig) -> Self {
        let policy = config.filters.clone();
        Self {
            includes: lowered(&policy.title_includes),
            excludes: lowered(&policy.title_excludes),
            limit: config
                .collect
                .limit_to_target
                .then(|| config.collect.active_target())
                .flatten(),
            policy,
        }
    }

    /// Short-form by URL shape, or by a known duration under the threshold.
    pub fn is_short_form<R: Filterable>(&self, record: &R) -> bool {
        record.short_form_link()
            || record
                .duration_seconds()
                .is_some_and(|d| d < self.policy.short_form_max_seconds)
    }

    pub fn passes<R: Filterable>(&self, record: &R) -> bool {
        let p = &self.policy;

        if !p.include_short_form && self.is_short_form(record) {
            return false;
        }

        if let Some(d) = record.duration_seconds() {
            if p.min_duration_secs.is_some_and(|min| d < min)
                || p.max_duration_secs.is_some_and(|max| d > max)
            {
                return false;
            }
        }

        if !self.includes.is_empty() || !self.excludes.is_empty() {
            let title = record.title().unwrap_or_default().to_lowercase();
            if !self.includes.iter().all(|k| title.contains(k.as_str())) {
                return false;
            }
            if self.excludes.iter().any(|k| title.contains(k.as_str())) {
                return false;
            }
        }

        if let Some(published) = record.published_at() {
            if p.published_from.is_some_and(|from| published < from)
                || p.published_to.is_some_and(|to| published > to)
            {
                return false;
            }
        }

        true
    }

    /// Keep passing records in order, then truncate to the target if configured.
    #[instrument(level = "info", skip_all, fields(input = records.len()))]
    pub fn apply<R: Filterable>(&self, records: Vec<R>) -> Vec<R> {
        let mut kept: Vec<R> = records.into_iter().filter(|r| self.passes(r)).collect();
        let passed = kept.len();
        if let Some(limit) = self.limit {
            kept.truncate(limit);
        }
        debug!(passed, kept = kept.len(), "Applied filters");
        kept
    }
}
