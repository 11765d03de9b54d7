//! Video link recognition and canonicalization.
//!
//! Many surface forms point at the same video:
//!
//! | Shape | Example | [`SourceType`] |
//! |-------|---------|----------------|
//! | watch page | `https://www.youtube.com/watch?v=<id>` | `Primary` |
//! | mobile watch page | `https://m.youtube.com/watch?v=<id>` | `Primary` |
//! | shorts | `https://youtube.com/shorts/<id>` | `ShortForm` |
//! | embed | `https://www.youtube.com/embed/<id>` | `Embedded` |
//! | short domain | `https://youtu.be/<id>` | `ShortLink` |
//!
//! Links wrapped by Facebook (`l.php?u=`) or Google (`/url?q=`) redirectors
//! are unwrapped once before matching. Anything else is "not a link" and
//! yields `None`; normalization never fails loudly.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::config::NormalizePolicy;
use crate::models::{LinkDescriptor, SourceType};

static VIDEO_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{6,}$").unwrap());

/// An intermediary URL whose real target lives in a query parameter.
struct RedirectWrapper {
    host: fn(&str) -> bool,
    path: fn(&str) -> bool,
    param: &'static str,
    /// Percent-decode the parameter value once more after query parsing.
    decode_again: bool,
}

fn is_facebook_host(host: &str) -> bool {
    host == "facebook.com" || host.ends_with(".facebook.com")
}

fn is_facebook_redirect_path(path: &str) -> bool {
    path.contains("/l.php")
}

fn is_google_host(host: &str) -> bool {
    host.contains("google.")
}

fn is_google_redirect_path(path: &str) -> bool {
    path == "/url"
}

const REDIRECT_WRAPPERS: &[RedirectWrapper] = &[
    RedirectWrapper {
        host: is_facebook_host,
        path: is_facebook_redirect_path,
        param: "u",
        decode_again: true,
    },
    RedirectWrapper {
        host: is_google_host,
        path: is_google_redirect_path,
        param: "q",
        decode_again: false,
    },
];

/// Turns raw absolute URLs into [`LinkDescriptor`]s.
#[derive(Debug, Clone)]
pub struct Normalizer {
    detect_short_form: bool,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(&NormalizePolicy::default())
    }
}

impl Normalizer {
    pub fn new(policy: &NormalizePolicy) -> Self {
        Self {
            detect_short_form: policy.detect_short_form,
        }
    }

    /// Recognize `raw` as a video link.
    ///
    /// Known redirect wrappers are unwrapped once before matching.
    ///
    /// # Arguments
    ///
    /// * `raw` - A URL exactly as found on the page, absolute or already
    ///   resolved against the page base.
    ///
    /// # Returns
    ///
    /// The [`LinkDescriptor`] with id, canonical URL, source type and short-form
    /// flag. `None` for unparseable URLs, foreign hosts, unknown paths and
    /// identifiers that fail validation.
    pub fn normalize(&self, raw: &str) -> Option<LinkDescriptor> {
        let unwrapped = unwrap_redirect(raw.trim());
        let url = Url::parse(&unwrapped).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }

        let host = url.host_str()?;
        let host = host.strip_prefix("www.").unwrap_or(host);
        let path = url.path();

        let (id, source_type) = match host {
            "youtube.com" | "m.youtube.com" if path == "/watch" => {
                (query_value(&url, "v")?, SourceType::Primary)
            }
            "youtube.com" => {
                if let Some(rest) = path.strip_prefix("/shorts/") {
                    (rest.to_string(), SourceType::ShortForm)
                } else if let Some(rest) = path.strip_prefix("/embed/") {
                    (rest.to_string(), SourceType::Embedded)
                } else {
                    return None;
                }
            }
            "youtu.be" => (path.trim_start_matches('/').to_string(), SourceType::ShortLink),
            _ => return None,
        };

        let id = id.strip_suffix('/').map(str::to_string).unwrap_or(id);
        if !is_valid_id(&id) {
            return None;
        }

        let is_short_form = self.detect_short_form
            && (source_type == SourceType::ShortForm || unwrapped.contains("/shorts/"));

        Some(LinkDescriptor {
            canonical_url: canonical_url(&id),
            id,
            original_url: unwrapped,
            source_type,
            is_short_form,
        })
    }
}

/// Identifier charset and minimum length check.
pub fn is_valid_id(id: &str) -> bool {
    VIDEO_ID.is_match(id)
}

/// The one canonical watch URL for an identifier.
pub fn canonical_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", id)
}

/// Replace a known redirect-wrapper URL by its target. Single pass, not recursive.
///
/// Returns the input unchanged when it is not a wrapper (or not a URL at all).
pub fn unwrap_redirect(raw: &str) -> String {
    let Ok(url) = Url::parse(raw) else {
        return raw.to_string();
    };
    let Some(host) = url.host_str() else {
        return raw.to_string();
    };

    for wrapper in REDIRECT_WRAPPERS {
        if !(wrapper.host)(host) || !(wrapper.path)(url.path()) {
            continue;
        }
        if let Some(target) = query_value(&url, wrapper.param).filter(|t| !t.is_empty()) {
            if wrapper.decode_again {
                return urlencoding::decode(&target)
                    .map(|decoded| decoded.into_owned())
                    .unwrap_or(target);
            }
            return target;
        }
    }
    raw.to_string()
}

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
