//! Map source-specific raw rows onto the canonical record shape.
//!
//! Column resolution happens once per dataset: a column counts as present when
//! any row carries it. Rows missing a present column degrade to fallbacks
//! (`Unknown` timestamp, empty text) instead of being dropped, so the output
//! always has exactly one record per input row.

use serde_json::Value;
use tracing::debug;

use crate::constants::normalizer::{
    DESCRIPTION_FIELD, TEXT_FIELD, TITLE_DESCRIPTION_SEPARATOR, TITLE_FIELD, URL_FIELD,
};
use crate::data::{CanonicalRecord, RawRecord, RecordTimestamp};
use crate::errors::PipelineError;
use crate::hash::record_id;
use crate::source::SourceKind;
use crate::timestamps::parse_timestamp_value;
use crate::types::HashPart;

/// How record text is assembled for a dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextLayout {
    /// `title + " " + description` (news).
    TitleAndDescription,
    /// The `text` column as-is (social).
    Body,
}

/// Columns chosen for a dataset after fallback resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSchema {
    /// Column the timestamp is read from.
    pub timestamp_field: &'static str,
    /// How the record text is assembled.
    pub text_layout: TextLayout,
}

/// Resolve timestamp and text columns for `records`, or name the missing one.
pub fn resolve_schema(
    records: &[RawRecord],
    kind: SourceKind,
) -> Result<ResolvedSchema, PipelineError> {
    let has_column = |name: &str| records.iter().any(|row| row.contains_key(name));
    let schema_error = |field: &str| PipelineError::Schema {
        source_id: kind.source_id().to_string(),
        field: field.to_string(),
    };

    let [primary, fallback] = kind.timestamp_fields();
    let timestamp_field = if has_column(primary) {
        primary
    } else if has_column(fallback) {
        fallback
    } else {
        return Err(schema_error(primary));
    };

    let text_layout = if has_column(DESCRIPTION_FIELD) {
        TextLayout::TitleAndDescription
    } else if has_column(TEXT_FIELD) {
        TextLayout::Body
    } else {
        return Err(schema_error(TEXT_FIELD));
    };

    Ok(ResolvedSchema {
        timestamp_field,
        text_layout,
    })
}

/// Normalize every raw row of one source into canonical records.
///
/// Output length equals input length and preserves order. An empty input yields
/// an empty output without schema checks.
pub fn normalize_records(
    records: &[RawRecord],
    kind: SourceKind,
) -> Result<Vec<CanonicalRecord>, PipelineError> {
    if records.is_empty() {
        return Ok(Vec::new());
    }
    let schema = resolve_schema(records, kind)?;
    let label = kind.label();

    let normalized: Vec<CanonicalRecord> = records
        .iter()
        .map(|row| normalize_row(row, kind, &schema, &label))
        .collect();

    let unknown = normalized
        .iter()
        .filter(|record| record.timestamp.is_unknown())
        .count();
    debug!(
        source = kind.source_id(),
        rows = normalized.len(),
        timestamp_field = schema.timestamp_field,
        unknown_timestamps = unknown,
        "normalized records"
    );
    Ok(normalized)
}

fn normalize_row(
    row: &RawRecord,
    kind: SourceKind,
    schema: &ResolvedSchema,
    label: &str,
) -> CanonicalRecord {
    let raw_timestamp = row.get(schema.timestamp_field).unwrap_or(&Value::Null);
    let timestamp: RecordTimestamp = parse_timestamp_value(raw_timestamp);

    let text = match schema.text_layout {
        TextLayout::TitleAndDescription => format!(
            "{}{}{}",
            string_field(row, TITLE_FIELD),
            TITLE_DESCRIPTION_SEPARATOR,
            string_field(row, DESCRIPTION_FIELD)
        ),
        TextLayout::Body => string_field(row, TEXT_FIELD).to_string(),
    };

    let url = Some(string_field(row, URL_FIELD))
        .filter(|url| !url.is_empty())
        .map(str::to_string);

    let parts: [HashPart; 3] = [
        raw_timestamp.to_string(),
        text.clone(),
        url.clone().unwrap_or_default(),
    ];

    CanonicalRecord {
        id: record_id(kind.source_id(), &parts),
        timestamp,
        text,
        source: label.to_string(),
        url,
    }
}

/// String value of `field`, or `""` when absent, null, or not a string.
fn string_field<'a>(row: &'a RawRecord, field: &str) -> &'a str {
    row.get(field).and_then(Value::as_str).unwrap_or("")
}
