//! JSON and CSV serializers for exported records.
//!
//! Both formats work on any `Serialize` record that encodes to a flat JSON
//! object. Field order follows the record's declaration order.

use crate::error::{ExportError, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// Output format for an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Pretty-printed JSON array.
    #[default]
    Json,
    /// Header row plus one CRLF-terminated row per record.
    Csv,
}

impl ExportFormat {
    /// File extension without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }

    /// MIME type of the serialized artifact.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Csv => "text/csv",
        }
    }

    /// Serializes `records` in this format.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Export`] if a record cannot be encoded.
    pub fn serialize<T: Serialize>(self, records: &[T]) -> Result<Vec<u8>> {
        match self {
            Self::Json => to_json(records).map(String::into_bytes),
            Self::Csv => to_csv(records).map(String::into_bytes),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Encodes records as a pretty-printed JSON array, keeping nulls.
///
/// # Errors
///
/// Returns [`crate::Error::Export`] if encoding fails.
pub fn to_json<T: Serialize>(records: &[T]) -> Result<String> {
    serde_json::to_string_pretty(records).map_err(|e| ExportError::from(e).into())
}

/// Encodes records as CSV.
///
/// The header is the field names of the first record; every row maps the
/// same fields in the same order. Null and missing fields become empty
/// cells, strings are written verbatim, and any other value (numbers,
/// booleans, nested arrays or objects) is written as its JSON text. Cells
/// are quoted only when they contain a delimiter, quote or line break, with
/// inner quotes doubled. An empty slice encodes to an empty string.
///
/// # Errors
///
/// Returns [`crate::Error::Export`] if a record is not a JSON object or the
/// writer fails.
///
/// # Examples
///
/// ```
/// use logscope::export::to_csv;
/// use serde_json::json;
///
/// let rows = vec![json!({"id": "a", "text": "x, \"y\""})];
/// assert_eq!(to_csv(&rows).unwrap(), "id,text\r\na,\"x, \"\"y\"\"\"\r\n");
/// ```
pub fn to_csv<T: Serialize>(records: &[T]) -> Result<String> {
    let Some(first) = records.first() else {
        return Ok(String::new());
    };

    let first = as_object(first, 0)?;
    let header: Vec<String> = first.keys().cloned().collect();

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(&header).map_err(ExportError::from)?;
    writer
        .write_record(header.iter().map(|field| cell(first.get(field))))
        .map_err(ExportError::from)?;

    for (index, record) in records.iter().enumerate().skip(1) {
        let object = as_object(record, index)?;
        writer
            .write_record(header.iter().map(|field| cell(object.get(field))))
            .map_err(ExportError::from)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Serialization(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Serialization(e.to_string()).into())
}

fn as_object<T: Serialize>(record: &T, index: usize) -> Result<Map<String, Value>> {
    match serde_json::to_value(record).map_err(ExportError::from)? {
        Value::Object(map) => Ok(map),
        _ => Err(ExportError::NotARecord { index }.into()),
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
