//! First-seen-wins deduplication.
//!
//! Each item is keyed by the first available of: video id, canonical URL,
//! original URL. Keys of different kinds never collide with each other.
//! Items with no usable key are all kept, so blank captures can slip
//! through as duplicates; callers that care should filter them first.

use std::collections::HashSet;

use crate::models::{LinkDescriptor, VideoRecord};

/// Identity fields used for deduplication. Empty strings count as absent.
pub trait Identity {
    fn identifier(&self) -> Option<&str>;
    fn canonical(&self) -> Option<&str>;
    fn original(&self) -> Option<&str>;

    /// The highest-priority key present.
    fn dedup_key(&self) -> Option<DedupKey<'_>> {
        non_empty(self.identifier())
            .map(DedupKey::Id)
            .or_else(|| non_empty(self.canonical()).map(DedupKey::Canonical))
            .or_else(|| non_empty(self.original()).map(DedupKey::Original))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DedupKey<'a> {
    Id(&'a str),
    Canonical(&'a str),
    Original(&'a str),
}

impl Identity for LinkDescriptor {
    fn identifier(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn canonical(&self) -> Option<&str> {
        Some(&self.canonical_url)
    }

    fn original(&self) -> Option<&str> {
        Some(&self.original_url)
    }
}

impl Identity for VideoRecord {
    fn identifier(&self) -> Option<&str> {
        self.link.identifier()
    }

    fn canonical(&self) -> Option<&str> {
        self.link.canonical()
    }

    fn original(&self) -> Option<&str> {
        self.link.original()
    }
}

/// Keep the first occurrence of every key, preserving traversal order.
pub fn dedupe<T: Identity>(items: Vec<T>) -> Vec<T> {
    let keep: Vec<bool> = {
        let mut seen = HashSet::new();
        items
            .iter()
            .map(|item| match item.dedup_key() {
                Some(key) => seen.insert(key),
                None => true,
            })
            .collect()
    };
    items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, keep)| keep.then_some(item))
        .collect()
}

/// Number of items [`dedupe`] would keep.
pub fn unique_count<T: Identity>(items: &[T]) -> usize {
    let mut seen = HashSet::new();
    let mut count = 0;
    for item in items {
        let fresh = match item.dedup_key() {
            Some(key) => seen.insert(key),
            None => true,
        };
        if fresh {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalizer;

    #[derive(Debug, Clone, PartialEq)]
    struct Capture {
        id: Option<&'static str>,
        url: Option<&'static str>,
        tag: u8,
    }

    impl Identity for Capture {
        fn identifier(&self) -> Option<&str> {
            self.id
        }
        fn canonical(&self) -> Option<&str> {
            None
        }
        fn original(&self) -> Option<&str> {
            self.url
        }
    }

    fn capture(id: Option<&'static str>, url: Option<&'static str>, tag: u8) -> Capture {
        Capture { id, url, tag }
    }

    #[test]
    fn test_first_occurrence_wins() {
        let items = vec![
            capture(Some("a"), None, 1),
            capture(Some("b"), None, 2),
            capture(Some("a"), None, 3),
        ];
        let out = dedupe(items);
        assert_eq!(out.iter().map(|c| c.tag).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_falls_back_to_url_key() {
        let items = vec![
            capture(None, Some("https://x/1"), 1),
            capture(None, Some("https://x/1"), 2),
            capture(Some(""), Some("https://x/2"), 3),
        ];
        let out = dedupe(items);
        assert_eq!(out.iter().map(|c| c.tag).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_id_and_url_keys_do_not_collide() {
        let items = vec![capture(Some("same"), None, 1), capture(None, Some("same"), 2)];
        assert_eq!(dedupe(items).len(), 2);
    }

    #[test]
    fn test_keyless_items_are_kept() {
        let items = vec![capture(None, None, 1), capture(None, None, 2), capture(None, Some(""), 3)];
        assert_eq!(dedupe(items.clone()).len(), 3);
        assert_eq!(unique_count(&items), 3);
    }

    #[test]
    fn test_idempotent() {
        let items = vec![
            capture(Some("a"), None, 1),
            capture(None, Some("u"), 2),
            capture(None, None, 3),
            capture(Some("a"), None, 4),
            capture(None, Some("u"), 5),
        ];
        let once = dedupe(items);
        let twice = dedupe(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_descriptors_with_same_id_collapse() {
        let normalizer = Normalizer::default();
        let items: Vec<_> = [
            "https://www.youtube.com/watch?v=abc123XYZ",
            "https://youtu.be/abc123XYZ",
            "https://www.youtube.com/embed/abc123XYZ",
            "https://www.youtube.com/shorts/def456UVW",
        ]
        .iter()
        .filter_map(|u| normalizer.normalize(u))
        .collect();
        assert_eq!(unique_count(&items), 2);
        let out = dedupe(items);
        assert_eq!(out[0].original_url, "https://www.youtube.com/watch?v=abc123XYZ");
        assert_eq!(out[1].id, "def456UVW");
    }
}
