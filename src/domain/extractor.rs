use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::value::TargetType;

/// Pulls one named, typed value out of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Extractor {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub target: TargetType,
    #[serde(default)]
    pub time_format: Option<String>,
}

impl Extractor {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            target: TargetType::Any,
            time_format: None,
        }
    }

    pub fn with_target(mut self, target: TargetType) -> Self {
        self.target = target;
        self
    }
}

/// Extracted values plus the extractors that failed, kept apart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub values: BTreeMap<String, Value>,
    pub errors: Vec<ExtractionFailure>,
}

impl ExtractionReport {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionFailure {
    pub name: String,
    pub path: String,
    pub reason: String,
    pub message: String,
}
