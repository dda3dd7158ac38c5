use serde_json::Value;
use thiserror::Error;

use crate::domain::extractor::{ExtractionFailure, ExtractionReport, Extractor};
use crate::domain::value::ValueKind;
use crate::domain::value_path::{PathSegment, ValuePath, ValuePathError};
use crate::engine::convert;

/// Path traversal failures. `path` is qualified up to the failing segment.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error(transparent)]
    InvalidPath(#[from] ValuePathError),

    #[error("`{path}`: field `{field}` not found")]
    MissingField { path: String, field: String },

    #[error("`{path}`: index {index} out of range (length {len})")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("`{path}`: field `{field}` cannot be applied to an array")]
    FieldOnSequence { path: String, field: String },

    #[error("`{path}`: index {index} cannot be applied to an object")]
    IndexOnRecord { path: String, index: usize },

    #[error("`{path}`: cannot descend into {kind}")]
    NotContainer { path: String, kind: ValueKind },

    #[error("`{path}`: value is null")]
    NullLeaf { path: String },

    #[error("`{path}`: {message}")]
    Conversion { path: String, message: String },
}

impl ExtractError {
    /// Stable machine-readable reason code.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidPath(_) => "invalid_path",
            Self::MissingField { .. } => "missing_field",
            Self::IndexOutOfRange { .. } => "index_out_of_range",
            Self::FieldOnSequence { .. } => "field_on_sequence",
            Self::IndexOnRecord { .. } => "index_on_record",
            Self::NotContainer { .. } => "not_container",
            Self::NullLeaf { .. } => "null_leaf",
            Self::Conversion { .. } => "conversion_failed",
        }
    }
}

/// Extracted leaf with its runtime type tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub kind: ValueKind,
    pub value: Value,
}

/// Evaluates `path` against `source`. A `null` leaf counts as a failure.
pub fn extract(path: &str, source: &Value) -> Result<Extracted, ExtractError> {
    let parsed = ValuePath::parse(path)?;
    extract_path(&parsed, source)
}

pub fn extract_path(path: &ValuePath, source: &Value) -> Result<Extracted, ExtractError> {
    let value = find(path, source)?;
    if value.is_null() {
        return Err(ExtractError::NullLeaf {
            path: path.to_string(),
        });
    }
    Ok(Extracted {
        kind: ValueKind::of(value),
        value: value.clone(),
    })
}

/// Walks `path` through `source`, failing at the first segment that does not resolve.
/// Unlike [`extract`], a `null` leaf is returned as found.
pub fn find<'a>(path: &ValuePath, source: &'a Value) -> Result<&'a Value, ExtractError> {
    let mut current = source;
    for (depth, segment) in path.segments().iter().enumerate() {
        let qualified = || path.prefix(depth + 1).to_string();
        current = match (segment, current) {
            (PathSegment::Key(field), Value::Object(map)) => {
                map.get(field).ok_or_else(|| ExtractError::MissingField {
                    path: qualified(),
                    field: field.clone(),
                })?
            }
            (PathSegment::Index(index), Value::Array(items)) => {
                items
                    .get(*index)
                    .ok_or_else(|| ExtractError::IndexOutOfRange {
                        path: qualified(),
                        index: *index,
                        len: items.len(),
                    })?
            }
            (PathSegment::Key(field), Value::Array(_)) => {
                return Err(ExtractError::FieldOnSequence {
                    path: qualified(),
                    field: field.clone(),
                });
            }
            (PathSegment::Index(index), Value::Object(_)) => {
                return Err(ExtractError::IndexOnRecord {
                    path: qualified(),
                    index: *index,
                });
            }
            (_, scalar) => {
                return Err(ExtractError::NotContainer {
                    path: path.prefix(depth).to_string(),
                    kind: ValueKind::of(scalar),
                });
            }
        };
    }
    Ok(current)
}

/// Runs every extractor against `source`, collecting values and failures separately.
pub fn extract_all(extractors: &[Extractor], source: &Value) -> ExtractionReport {
    let mut report = ExtractionReport::default();
    for extractor in extractors {
        match extract_one(extractor, source) {
            Ok(value) => {
                report.values.insert(extractor.name.clone(), value);
            }
            Err(error) => {
                tracing::debug!(
                    extractor = %extractor.name,
                    path = %extractor.path,
                    %error,
                    "extraction failed"
                );
                report.errors.push(ExtractionFailure {
                    name: extractor.name.clone(),
                    path: extractor.path.clone(),
                    reason: error.reason().to_string(),
                    message: error.to_string(),
                });
            }
        }
    }
    report
}

fn extract_one(extractor: &Extractor, source: &Value) -> Result<Value, ExtractError> {
    let extracted = extract(&extractor.path, source)?;
    convert::convert(
        &extracted.value,
        extractor.target,
        extractor.time_format.as_deref(),
    )
    .map_err(|error| ExtractError::Conversion {
        path: extractor.path.clone(),
        message: error.to_string(),
    })
}
