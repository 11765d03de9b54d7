//! # yt_harvest
//!
//! Collects video links from a page that keeps growing as it is scrolled,
//! normalizes them to canonical watch URLs, deduplicates, filters and exports
//! the result as CSV and JSON.
//!
//! ## Pipeline
//!
//! 1. **Collect**: trigger growth on a [`scrapers::ContentSource`], poll,
//!    normalize every raw item, stop when the page is exhausted
//! 2. **Deduplicate**: first occurrence wins, keyed by id, then canonical URL,
//!    then original URL
//! 3. **Filter**: short-form, duration, title keywords, publish date, target
//! 4. **Export**: CSV and JSON payloads handed to an [`outputs::ExportSink`]
//!
//! Two record shapes are supported: plain [`models::LinkDescriptor`]s from a
//! link scan and metadata-rich [`models::VideoRecord`]s from a channel grid.

pub mod cli;
pub mod collector;
pub mod config;
pub mod dedupe;
pub mod error;
pub mod filters;
pub mod models;
pub mod normalize;
pub mod outputs;
pub mod parsers;
pub mod pipeline;
pub mod scrapers;
pub mod utils;

pub use error::{HarvestError, Result};
pub use pipeline::{HarvestReport, harvest};
