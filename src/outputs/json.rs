//! JSON encoding.
//!
//! Records are written as a pretty-printed array (two-space indent). Keys
//! keep struct declaration order, which is also the CSV column order.

use serde::Serialize;

/// Encode `records` as a pretty JSON array.
///
/// # Errors
///
/// Fails only if a record cannot be represented as JSON.
pub fn to_json<T: Serialize>(records: &[T]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}
