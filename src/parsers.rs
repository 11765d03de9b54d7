//! Text-to-value parsers for grid metadata.
//!
//! Grid tiles carry human-formatted text: `"12:34"`, `"1.2K views"`,
//! `"3 triệu lượt xem"`, `"2 weeks ago"`, `"3 tháng trước"`. Each parser
//! returns `None` for text it does not understand; it never errors.
//! English and Vietnamese forms are recognized.

use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Parse `HH:MM:SS` or `MM:SS` into seconds.
///
/// Components that would overflow a `u64` total make the text unreadable.
pub fn parse_duration(text: &str) -> Option<u64> {
    let parts = text
        .trim()
        .split(':')
        .map(|p| {
            let p = p.trim();
            if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            p.parse::<u64>().ok()
        })
        .collect::<Option<Vec<u64>>>()?;

    match parts.as_slice() {
        [h, m, s] => h.checked_mul(3600)?.checked_add(m.checked_mul(60)?)?.checked_add(*s),
        [m, s] => m.checked_mul(60)?.checked_add(*s),
        _ => None,
    }
}

static VIEW_UNIT_WORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(views?|lượt xem|lượt\s+xem)\b").unwrap());
static THOUSANDS_SEP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d)[.,](\d{3})\b").unwrap());
static DECIMAL_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d),(\d)").unwrap());
static COUNT_WITH_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)?)\s*([\p{L}\p{M}]*)\.?$").unwrap());

/// Magnitude multiplier for a lowercase suffix.
fn magnitude(suffix: &str) -> Option<f64> {
    match suffix {
        "" => Some(1.0),
        "k" | "n" | "thousand" | "nghìn" | "ngàn" | "ngan" => Some(1e3),
        "m" | "tr" | "triệu" | "million" | "mn" => Some(1e6),
        "b" | "bn" | "tỷ" | "tỉ" | "ty" | "billion" => Some(1e9),
        _ => None,
    }
}

/// Parse a view counter such as `"1.2K views"`, `"2,345"` or `"3 triệu lượt xem"`.
///
/// Thousands separators (`,` or `.` followed by exactly three digits) are
/// dropped, a remaining decimal comma becomes a decimal point, and a
/// magnitude suffix multiplies the number. The result is rounded.
pub fn parse_view_count(text: &str) -> Option<u64> {
    let cleaned = text.trim().replace('\u{00A0}', " ");
    let cleaned = VIEW_UNIT_WORDS.replace_all(&cleaned, "");
    let mut s = cleaned.trim().to_string();

    loop {
        let next = THOUSANDS_SEP.replace_all(&s, "$1$2").into_owned();
        if next == s {
            break;
        }
        s = next;
    }
    let s = DECIMAL_COMMA.replace_all(&s, "$1.$2").to_lowercase();

    let caps = COUNT_WITH_SUFFIX.captures(s.trim())?;
    let number: f64 = caps.get(1)?.as_str().parse().ok()?;
    let factor = magnitude(caps.get(2).map_or("", |m| m.as_str()))?;

    let value = (number * factor).round();
    (value.is_finite() && value >= 0.0).then_some(value as u64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgoUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

static AGO_RULES: Lazy<Vec<(AgoUnit, Regex)>> = Lazy::new(|| {
    [
        (AgoUnit::Second, r"seconds?|secs?|giây"),
        (AgoUnit::Minute, r"minutes?|mins?|phút"),
        (AgoUnit::Hour, r"hours?|giờ"),
        (AgoUnit::Day, r"days?|ngày"),
        (AgoUnit::Week, r"weeks?|tuần"),
        (AgoUnit::Month, r"months?|tháng"),
        (AgoUnit::Year, r"years?|năm"),
    ]
    .into_iter()
    .map(|(unit, words)| {
        let re = Regex::new(&format!(r"(\d+)\s*(?:{})\s*(?:ago|trước)", words)).unwrap();
        (unit, re)
    })
    .collect()
});

/// Parse a publish date relative to `now`.
///
/// `"N <unit> ago"` forms are tried first. Months and years roll the
/// calendar back (clamping to the end of shorter months); weeks are exactly
/// seven days. Otherwise a few absolute formats are attempted.
///
/// # Arguments
///
/// * `text` - Date line from a grid tile, English or Vietnamese.
/// * `now` - Reference instant for relative forms.
pub fn parse_published_at(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_lowercase();

    for (unit, re) in AGO_RULES.iter() {
        if let Some(caps) = re.captures(&lower) {
            let n: u32 = caps.get(1)?.as_str().parse().ok()?;
            return subtract(now, *unit, n);
        }
    }

    parse_absolute_date(trimmed)
}

fn subtract(now: DateTime<Utc>, unit: AgoUnit, n: u32) -> Option<DateTime<Utc>> {
    let n64 = i64::from(n);
    match unit {
        AgoUnit::Second => now.checked_sub_signed(Duration::seconds(n64)),
        AgoUnit::Minute => now.checked_sub_signed(Duration::minutes(n64)),
        AgoUnit::Hour => now.checked_sub_signed(Duration::hours(n64)),
        AgoUnit::Day => now.checked_sub_signed(Duration::days(n64)),
        AgoUnit::Week => now.checked_sub_signed(Duration::days(n64 * 7)),
        AgoUnit::Month => now.checked_sub_months(Months::new(n)),
        AgoUnit::Year => now.checked_sub_months(Months::new(n.checked_mul(12)?)),
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%b %d, %Y", "%B %d, %Y", "%d %b %Y", "%d %B %Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Absolute date fallback: RFC 3339, RFC 2822, then a handful of common layouts (as UTC).
fn parse_absolute_date(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}
