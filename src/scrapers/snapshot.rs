//! Recorded page snapshots as a content source.
//!
//! A directory of `.html` files, sorted by filename, stands in for a page
//! captured after successive scrolls. Every growth trigger advances to the
//! next snapshot; the last one repeats once the recording runs out.
//!
//! # Extraction
//!
//! - **Links scan**: `a[href]`, `iframe[src]`, `video[src]`, `source[src]`,
//!   `link[href]`, plus bare `http(s)://` URLs in the rendered body text
//!   (`script`, `style`, `noscript` and `template` contents are skipped).
//!   Relative references are resolved against the configured base URL.
//! - **Grid scan**: one item per grid tile (see [`GridSelectors`]) with
//!   title, link, view text, date text and duration text.
//!
//! The growth metric is the snapshot's length in bytes.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument};
use url::Url;

use super::{ContentSource, replay_index};
use crate::config::{GridSelectors, HarvestConfig, ScanMode};
use crate::error::{HarvestError, Result};
use crate::models::{Poll, RawItem};

static LINK_ATTRS: Lazy<Vec<(Selector, &'static str)>> = Lazy::new(|| {
    [
        ("a[href]", "href"),
        ("iframe[src]", "src"),
        ("video[src]", "src"),
        ("source[src]", "src"),
        ("link[href]", "href"),
    ]
    .into_iter()
    .map(|(css, attr)| (Selector::parse(css).unwrap(), attr))
    .collect()
});
const NON_RENDERED: [&str; 4] = ["script", "style", "noscript", "template"];
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());
static BARE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"https?://[^\s"'<>]+"#).unwrap());
static YOUTUBE_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s*-\s*YouTube\s*$").unwrap());

/// Compiled form of [`GridSelectors`].
#[derive(Debug, Clone)]
struct GridQuery {
    container: Selector,
    title_link: Selector,
    title_alt: Selector,
    metadata_line: Selector,
    duration: Selector,
}

impl GridQuery {
    fn compile(selectors: &GridSelectors) -> Result<Self> {
        let parse = |css: &str| {
            Selector::parse(css)
                .map_err(|e| HarvestError::Source(format!("invalid selector {:?}: {}", css, e)))
        };
        Ok(Self {
            container: parse(&selectors.container)?,
            title_link: parse(&selectors.title_link)?,
            title_alt: parse(&selectors.title_alt)?,
            metadata_line: parse(&selectors.metadata_line)?,
            duration: parse(&selectors.duration)?,
        })
    }
}

/// Replays recorded HTML snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    pages: Vec<String>,
    cursor: usize,
    base: Url,
    scan: ScanMode,
    grid: GridQuery,
}

impl SnapshotSource {
    /// Build a source from in-memory snapshots.
    ///
    /// # Errors
    ///
    /// Fails when the base URL or a configured grid selector does not parse.
    pub fn new(pages: Vec<String>, config: &HarvestConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url).map_err(|e| {
            HarvestError::Source(format!("invalid base url {:?}: {}", config.base_url, e))
        })?;
        Ok(Self {
            pages,
            cursor: 0,
            base,
            scan: config.scan,
            grid: GridQuery::compile(&config.selectors)?,
        })
    }

    /// Load every `.html`/`.htm` file in `dir`, ordered by filename.
    #[instrument(level = "info", skip_all, fields(dir = %dir.as_ref().display()))]
    pub async fn from_dir(dir: impl AsRef<Path>, config: &HarvestConfig) -> Result<Self> {
        let mut entries = fs::read_dir(dir.as_ref()).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_html = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"));
            if is_html {
                paths.push(path);
            }
        }
        paths.sort();

        let mut pages = Vec::with_capacity(paths.len());
        for path in &paths {
            pages.push(fs::read_to_string(path).await?);
        }
        info!(count = pages.len(), "Loaded page snapshots");
        Self::new(pages, config)
    }

    fn current(&self) -> Option<&str> {
        replay_index(self.cursor, self.pages.len()).map(|i| self.pages[i].as_str())
    }

    /// Best-effort channel name for the current snapshot, `"youtube"` if none is found.
    pub fn channel_name(&self) -> String {
        self.current()
            .and_then(|html| channel_name_from_html(&Html::parse_document(html)))
            .unwrap_or_else(|| "youtube".to_string())
    }

    fn extract_links(&self, document: &Html) -> Vec<RawItem> {
        let mut urls = Vec::new();
        for (selector, attr) in LINK_ATTRS.iter() {
            for element in document.select(selector) {
                if let Some(value) = element.value().attr(attr) {
                    if let Ok(resolved) = self.base.join(value.trim()) {
                        urls.push(resolved.to_string());
                    }
                }
            }
        }

        if let Some(body) = document.select(&BODY).next() {
            let text = visible_text(body);
            urls.extend(BARE_URL.find_iter(&text).map(|m| m.as_str().to_string()));
        }

        urls.into_iter().map(RawItem::link).collect()
    }

    fn extract_grid(&self, document: &Html) -> Vec<RawItem> {
        let q = &self.grid;
        document
            .select(&q.container)
            .map(|tile| {
                let title_el = tile
                    .select(&q.title_link)
                    .next()
                    .or_else(|| tile.select(&q.title_alt).next());
                let url = title_el
                    .and_then(|el| el.value().attr("href"))
                    .and_then(|href| self.base.join(href.trim()).ok())
                    .map(|u| u.to_string());
                let spans: Vec<ElementRef> = tile.select(&q.metadata_line).collect();

                RawItem {
                    url,
                    title: title_el.and_then(element_text),
                    duration_text: tile.select(&q.duration).next().and_then(element_text),
                    views_text: spans.first().copied().and_then(element_text),
                    date_text: spans.get(1).copied().and_then(element_text),
                }
            })
            .collect()
    }
}

impl ContentSource for SnapshotSource {
    async fn trigger_growth(&mut self) -> Result<()> {
        self.cursor += 1;
        Ok(())
    }

    async fn poll(&mut self) -> Result<Poll> {
        let Some(html) = self.current() else {
            return Ok(Poll::default());
        };
        let growth_metric = html.len() as u64;
        let document = Html::parse_document(html);
        let items = match self.scan {
            ScanMode::Links => self.extract_links(&document),
            ScanMode::Grid => self.extract_grid(&document),
        };
        debug!(cursor = self.cursor, items = items.len(), growth_metric, "Parsed snapshot");
        Ok(Poll {
            items,
            growth_metric,
        })
    }
}

/// Text nodes under `root` that a browser would render, joined by spaces.
fn visible_text(root: ElementRef<'_>) -> String {
    root.descendants()
        .filter(|node| {
            !node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|e| NON_RENDERED.contains(&e.name()))
            })
        })
        .filter_map(|node| node.value().as_text().map(|t| &**t))
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Trimmed text content, `None` when blank.
fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<String>();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn channel_name_from_html(document: &Html) -> Option<String> {
    let text_of = |css: &str| {
        Selector::parse(css)
            .ok()
            .and_then(|s| document.select(&s).next().and_then(element_text))
    };
    let attr_of = |css: &str, attr: &str| {
        Selector::parse(css).ok().and_then(|s| {
            document
                .select(&s)
                .next()
                .and_then(|el| el.value().attr(attr).map(str::to_string))
        })
    };
    let strip_suffix = |s: String| YOUTUBE_SUFFIX.replace(&s, "").trim().to_string();

    text_of("ytd-c4-tabbed-header-renderer #channel-name #text")
        .or_else(|| text_of("ytd-channel-name#channel-name yt-formatted-string"))
        .or_else(|| attr_of(r#"meta[itemprop="name"]"#, "content"))
        .or_else(|| attr_of(r#"meta[property="og:title"]"#, "content").map(strip_suffix))
        .or_else(|| text_of("title").map(strip_suffix))
        .filter(|name| !name.trim().is_empty())
        .map(|name| name.trim().to_string())
}
