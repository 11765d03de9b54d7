//! Incremental collection over a growing page.
//!
//! Each iteration asks the content source for more material, waits for it to
//! load, polls everything currently visible and appends whatever normalizes.
//! Duplicates are tolerated in the accumulator; the unique count is
//! recomputed after every poll to judge progress.
//!
//! The loop stops on the first of:
//! - the iteration cap (always enforced),
//! - count mode only: the visible raw-item count reaching the target,
//! - the growth metric not changing (if `stop_on_no_growth`),
//! - the unique count not changing while non-zero (if `stop_on_no_new_records`),
//! - a content-source failure, in which case the records found so far are kept.

use chrono::{DateTime, Utc};
use std::fmt;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::config::{CollectPolicy, HarvestConfig};
use crate::dedupe::{Identity, dedupe, unique_count};
use crate::models::{LinkDescriptor, RawItem, VideoRecord, thumbnail_urls};
use crate::normalize::Normalizer;
use crate::parsers::{parse_duration, parse_published_at, parse_view_count};
use crate::scrapers::ContentSource;

/// Shared inputs for turning raw items of one poll into records.
pub struct CaptureContext<'a> {
    pub normalizer: &'a Normalizer,
    /// Capture time of the poll; also the reference for relative dates.
    pub scraped_at: DateTime<Utc>,
    pub thumbnails: &'a [String],
}

/// A record type the collector can build from a [`RawItem`].
pub trait Capture: Identity + Sized {
    /// `None` when the item's URL is not a recognized video link.
    fn capture(raw: &RawItem, ctx: &CaptureContext<'_>) -> Option<Self>;
}

impl Capture for LinkDescriptor {
    fn capture(raw: &RawItem, ctx: &CaptureContext<'_>) -> Option<Self> {
        ctx.normalizer.normalize(raw.url.as_deref()?)
    }
}

impl Capture for VideoRecord {
    fn capture(raw: &RawItem, ctx: &CaptureContext<'_>) -> Option<Self> {
        let link = ctx.normalizer.normalize(raw.url.as_deref()?)?;
        let non_blank = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        };
        let duration_text = non_blank(&raw.duration_text);
        let views_text = non_blank(&raw.views_text);
        let date_text = non_blank(&raw.date_text);

        Some(VideoRecord {
            thumbnail_urls: thumbnail_urls(&link.id, ctx.thumbnails),
            link,
            title: non_blank(&raw.title),
            duration_seconds: duration_text.as_deref().and_then(parse_duration),
            duration_text,
            view_count: views_text.as_deref().and_then(parse_view_count),
            views_text,
            published_at: date_text
                .as_deref()
                .and_then(|t| parse_published_at(t, ctx.scraped_at)),
            date_text,
            scraped_at: ctx.scraped_at,
        })
    }
}

/// Why the collection loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    IterationCap,
    TargetReached,
    NoGrowth,
    NoNewRecords,
    SourceFailed(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IterationCap => f.write_str("iteration cap reached"),
            Self::TargetReached => f.write_str("target count reached"),
            Self::NoGrowth => f.write_str("page stopped growing"),
            Self::NoNewRecords => f.write_str("no new records"),
            Self::SourceFailed(e) => write!(f, "content source failed: {}", e),
        }
    }
}

/// Result of one collection run.
#[derive(Debug)]
pub struct CollectOutcome<R> {
    /// Deduplicated records in first-discovered order.
    pub records: Vec<R>,
    pub iterations: usize,
    pub stop_reason: StopReason,
    /// Raw items seen across all polls, duplicates included.
    pub raw_seen: usize,
    /// Raw items that did not normalize to a video link.
    pub rejected: usize,
}

/// Drives a [`ContentSource`] until a stop condition holds.
#[derive(Debug, Clone)]
pub struct Collector {
    policy: CollectPolicy,
    normalizer: Normalizer,
    thumbnails: Vec<String>,
    clock: fn() -> DateTime<Utc>,
}

impl Collector {
    pub fn new(config: &HarvestConfig) -> Self {
        Self {
            policy: config.collect.clone(),
            normalizer: Normalizer::new(&config.normalize),
            thumbnails: config.thumbnails.clone(),
            clock: Utc::now,
        }
    }

    /// Replace the wall clock used for `scrapedAt` and relative dates.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Scroll, poll and capture until a stop condition holds.
    ///
    /// Each iteration triggers growth, waits the configured delay, polls the
    /// source and re-captures every visible item. The run stops at the
    /// iteration cap, when the active target is reached, or when the page
    /// stops growing or yields no new records (each rule can be disabled).
    ///
    /// # Arguments
    ///
    /// * `source` - The page being harvested. It is never polled before its
    ///   first growth trigger.
    ///
    /// # Returns
    ///
    /// A [`CollectOutcome`] with the deduplicated records, the iteration count,
    /// the stop reason and raw/rejected item counters. A source failure is
    /// reported as [`StopReason::SourceFailed`] and the records gathered so
    /// far are kept.
    #[instrument(level = "info", skip_all, fields(cap = self.policy.iteration_cap(), mode = ?self.policy.mode))]
    pub async fn collect<R, S>(&self, source: &mut S) -> CollectOutcome<R>
    where
        R: Capture,
        S: ContentSource,
    {
        let policy = &self.policy;
        let delay = policy.delay();
        let target = policy.active_target();

        let mut accumulated: Vec<R> = Vec::new();
        let mut last_growth = 0u64;
        let mut last_unique = 0usize;
        let mut iterations = 0usize;
        let mut raw_seen = 0usize;
        let mut rejected = 0usize;
        let mut stop_reason = StopReason::IterationCap;

        for step in 1..=policy.iteration_cap() {
            iterations = step;

            if let Err(e) = source.trigger_growth().await {
                warn!(step, error = %e, "Growth trigger failed; keeping records found so far");
                stop_reason = StopReason::SourceFailed(e.to_string());
                break;
            }
            if !delay.is_zero() {
                sleep(delay).await;
            }
            let poll = match source.poll().await {
                Ok(poll) => poll,
                Err(e) => {
                    warn!(step, error = %e, "Poll failed; keeping records found so far");
                    stop_reason = StopReason::SourceFailed(e.to_string());
                    break;
                }
            };

            let ctx = CaptureContext {
                normalizer: &self.normalizer,
                scraped_at: (self.clock)(),
                thumbnails: &self.thumbnails,
            };
            let visible = poll.items.len();
            raw_seen += visible;
            for raw in &poll.items {
                match R::capture(raw, &ctx) {
                    Some(record) => accumulated.push(record),
                    None => rejected += 1,
                }
            }

            let growth = poll.growth_metric;
            let unique = unique_count(&accumulated);
            if policy.log_every_iteration {
                info!(step, growth, visible, unique, "Polled content source");
            } else {
                debug!(step, growth, visible, unique, "Polled content source");
            }

            if target.is_some_and(|t| visible >= t) {
                stop_reason = StopReason::TargetReached;
                break;
            }
            if policy.stop_on_no_growth && growth == last_growth {
                stop_reason = StopReason::NoGrowth;
                break;
            }
            if policy.stop_on_no_new_records && unique == last_unique && unique > 0 {
                stop_reason = StopReason::NoNewRecords;
                break;
            }
            last_growth = growth;
            last_unique = unique;
        }

        if rejected > 0 {
            debug!(rejected, "Skipped items that are not video links");
        }
        let records = dedupe(accumulated);
        info!(
            iterations,
            raw_seen,
            unique = records.len(),
            reason = %stop_reason,
            "Collection finished"
        );

        CollectOutcome {
            records,
            iterations,
            stop_reason,
            raw_seen,
            rejected,
        }
    }
}
