//! Flatten raw acquisition dumps into processed per-source datasets.
//!
//! Raw dumps are the JSON bodies returned by the upstream search endpoints:
//! news as `{"status": "ok", "articles": [...]}`, social as `{"posts": [...]}`.
//! Processing flattens nested objects into dotted columns, keeps the columns the
//! dashboard needs, renames them to the processed schema, and fills nulls with
//! empty strings.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants::datasets::NESTED_FIELD_SEPARATOR;
use crate::data::RawRecord;
use crate::errors::PipelineError;
use crate::source::SourceKind;
use crate::transport::fs::{processed_path, raw_path, read_json, write_json_pretty};

/// `(raw column, processed column)` pairs kept for news articles.
const NEWS_COLUMNS: &[(&str, &str)] = &[
    ("title", "title"),
    ("description", "description"),
    ("publishedAt", "timestamp"),
    ("source.name", "source"),
    ("url", "url"),
];

/// `(raw column, processed column)` pairs kept for social posts.
const SOCIAL_COLUMNS: &[(&str, &str)] = &[
    ("title", "title"),
    ("text", "text"),
    ("sentiment", "sentiment"),
    ("image", "image"),
    ("url", "url"),
    ("user.name", "source"),
    ("posted", "timestamp"),
];

fn column_map(kind: SourceKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        SourceKind::News => NEWS_COLUMNS,
        SourceKind::Social => SOCIAL_COLUMNS,
    }
}

/// Flatten nested objects into dotted keys (`{"source": {"name": "X"}}` → `source.name`).
///
/// Arrays and scalars are kept as values; key order follows the input.
pub fn flatten_object(object: &Map<String, Value>) -> RawRecord {
    let mut flat = RawRecord::new();
    flatten_into(&mut flat, None, object);
    flat
}

fn flatten_into(out: &mut RawRecord, prefix: Option<&str>, object: &Map<String, Value>) {
    for (key, value) in object {
        let column = match prefix {
            Some(prefix) => format!("{prefix}{NESTED_FIELD_SEPARATOR}{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(nested) if !nested.is_empty() => {
                flatten_into(out, Some(&column), nested)
            }
            other => {
                out.insert(column, other.clone());
            }
        }
    }
}

/// Turn a raw dump into processed rows for `kind`.
///
/// Fails with `Malformed` when the envelope key is absent and with `Schema` when a
/// kept column is absent from every item. Items that are not objects are skipped.
pub fn process_envelope(
    kind: SourceKind,
    envelope: &Value,
) -> Result<Vec<RawRecord>, PipelineError> {
    let items = envelope
        .get(kind.envelope_key())
        .and_then(Value::as_array)
        .ok_or_else(|| PipelineError::Malformed {
            source_id: kind.source_id().to_string(),
            details: format!("raw dump has no '{}' array", kind.envelope_key()),
        })?;

    let flattened: Vec<RawRecord> = items
        .iter()
        .filter_map(Value::as_object)
        .map(flatten_object)
        .collect();
    if flattened.is_empty() {
        return Ok(Vec::new());
    }

    let columns = column_map(kind);
    for (raw_column, _) in columns {
        if !flattened.iter().any(|row| row.contains_key(*raw_column)) {
            return Err(PipelineError::Schema {
                source_id: kind.source_id().to_string(),
                field: (*raw_column).to_string(),
            });
        }
    }

    Ok(flattened
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|(raw_column, processed_column)| {
                    let value = match row.get(*raw_column) {
                        None | Some(Value::Null) => Value::String(String::new()),
                        Some(value) => value.clone(),
                    };
                    ((*processed_column).to_string(), value)
                })
                .collect()
        })
        .collect())
}

/// Read `<source_id>_data.json` under `data_dir` and write `<source_id>_processed_data.json`.
///
/// Returns the path of the written dataset.
pub fn preprocess_raw_dump(data_dir: &Path, kind: SourceKind) -> Result<PathBuf, PipelineError> {
    let input = raw_path(data_dir, kind);
    if !input.exists() {
        return Err(PipelineError::MissingData {
            source_id: kind.source_id().to_string(),
            path: input,
        });
    }
    let envelope: Value = read_json(&input)?;
    let rows = process_envelope(kind, &envelope)?;
    let output = processed_path(data_dir, kind);
    write_json_pretty(&output, &rows)?;
    info!(
        source = kind.source_id(),
        rows = rows.len(),
        path = %output.display(),
        "processed raw dump"
    );
    Ok(output)
}
