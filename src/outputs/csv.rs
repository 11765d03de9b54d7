//! CSV encoding.
//!
//! Columns are the union of keys across all records, in order of first
//! appearance. The header is written bare and every data cell is
//! double-quoted. Line breaks inside a value are collapsed to a single space
//! before writing, so each record is exactly one line. Nested values
//! (thumbnail maps) become their JSON text when `flatten_objects` is on and
//! empty cells otherwise.

use ::csv::{QuoteStyle, Terminator, WriterBuilder};
use itertools::Itertools;
use serde::Serialize;
use serde_json::{Map, Value};
use std::string::FromUtf8Error;

use crate::config::ExportPolicy;

/// Byte-order mark prepended when `add_bom` is set, for spreadsheet tools.
pub const BOM: char = '\u{FEFF}';

/// Why a record set could not be encoded as CSV.
#[derive(Debug, thiserror::Error)]
pub enum CsvError {
    #[error("record is not representable as JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Write(#[from] ::csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("encoded CSV is not UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),

    /// The delimiter must be one ASCII character.
    #[error("unsupported CSV delimiter {0:?}")]
    Delimiter(char),

    /// The terminator must be `\r\n` or one ASCII character.
    #[error("unsupported CSV line terminator {0:?}")]
    Terminator(String),
}

/// Encode `records` as CSV text.
///
/// # Arguments
///
/// * `records` - Any serializable records. Non-object values land in a
///   single `value` column.
/// * `policy` - Delimiter, line terminator, BOM and nested-value handling.
///
/// # Returns
///
/// The encoded text, or an empty string for an empty slice.
///
/// # Errors
///
/// Fails if a record cannot be represented as JSON, or if the policy's
/// delimiter or terminator is not something the CSV writer can emit.
pub fn to_csv<T: Serialize>(records: &[T], policy: &ExportPolicy) -> Result<String, CsvError> {
    if records.is_empty() {
        return Ok(String::new());
    }

    let delimiter = u8::try_from(policy.delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or(CsvError::Delimiter(policy.delimiter))?;
    let terminator = terminator(&policy.line_terminator)?;

    let rows = records
        .iter()
        .map(|r| {
            serde_json::to_value(r).map(|v| match v {
                Value::Object(map) => map,
                other => Map::from_iter([("value".to_string(), other)]),
            })
        })
        .collect::<serde_json::Result<Vec<Map<String, Value>>>>()?;
    let columns: Vec<&String> = rows.iter().flat_map(|row| row.keys()).unique().collect();

    let mut builder = WriterBuilder::new();
    builder
        .has_headers(false)
        .delimiter(delimiter)
        .terminator(terminator);

    let mut buf = Vec::new();
    {
        let mut header = builder.quote_style(QuoteStyle::Necessary).from_writer(&mut buf);
        header.write_record(&columns)?;
        header.flush()?;
    }
    {
        let mut body = builder.quote_style(QuoteStyle::Always).from_writer(&mut buf);
        for row in &rows {
            body.write_record(
                columns
                    .iter()
                    .map(|&key| cell(row.get(key), policy.flatten_objects)),
            )?;
        }
        body.flush()?;
    }

    let text = String::from_utf8(buf)?;
    Ok(if policy.add_bom {
        format!("{}{}", BOM, text)
    } else {
        text
    })
}

fn terminator(eol: &str) -> Result<Terminator, CsvError> {
    match eol.as_bytes() {
        b"\r\n" => Ok(Terminator::CRLF),
        [b] if b.is_ascii() => Ok(Terminator::Any(*b)),
        _ => Err(CsvError::Terminator(eol.to_string())),
    }
}

fn cell(value: Option<&Value>, flatten_objects: bool) -> String {
    let raw = match value {
        None | Some(Value::Null) => return String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(nested @ (Value::Object(_) | Value::Array(_))) => {
            if !flatten_objects {
                return String::new();
            }
            nested.to_string()
        }
    };
    raw.replace("\r\n", " ").replace(['\r', '\n'], " ")
}
