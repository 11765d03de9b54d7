//! Content sources the collector can drive.
//!
//! A content source is anything that can be asked to grow (scroll, load
//! more, advance a recording) and then polled for the items currently
//! visible. Polls may overlap; the collector deduplicates.
//!
//! # Sources
//!
//! | Source | Module | Notes |
//! |--------|--------|-------|
//! | Recorded HTML pages | [`snapshot`] | One snapshot per poll, parsed with `scraper` |
//! | In-memory polls | [`ScriptedSource`] | Fixtures and test doubles |
//!
//! Both sources repeat their last observation once exhausted, which is how a
//! page that stopped loading behaves.

pub mod snapshot;

use crate::error::Result;
use crate::models::Poll;

pub use snapshot::SnapshotSource;

/// The page being harvested.
///
/// `trigger_growth` is the "scroll to bottom" signal; its effect is observed
/// through the next `poll`.
#[allow(async_fn_in_trait)]
pub trait ContentSource {
    async fn trigger_growth(&mut self) -> Result<()>;

    async fn poll(&mut self) -> Result<Poll>;
}

/// Replays a fixed list of polls, one per growth trigger.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    polls: Vec<Poll>,
    cursor: usize,
}

impl ScriptedSource {
    pub fn new(polls: Vec<Poll>) -> Self {
        Self { polls, cursor: 0 }
    }

    /// Number of growth triggers received so far.
    pub fn triggers(&self) -> usize {
        self.cursor
    }
}

impl ContentSource for ScriptedSource {
    async fn trigger_growth(&mut self) -> Result<()> {
        self.cursor += 1;
        Ok(())
    }

    async fn poll(&mut self) -> Result<Poll> {
        Ok(replay_index(self.cursor, self.polls.len())
            .map(|i| self.polls[i].clone())
            .unwrap_or_default())
    }
}

/// Index of the observation to serve after `triggers` growth requests.
fn replay_index(triggers: usize, len: usize) -> Option<usize> {
    (len > 0).then(|| triggers.saturating_sub(1).min(len - 1))
}
