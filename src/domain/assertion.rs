use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::GroupError;
use crate::domain::value::TargetType;

/// Comparison performed by an assertion.
///
/// Names that are not part of the closed set deserialize into `Unsupported` so
/// one bad entry fails its own assertion instead of the whole definition file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssertionKind {
    Equal,
    NotEqual,
    Contains,
    NotContains,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    RegexMatch,
    LengthEqual,
    TypeMatch,
    HasField,
    Unsupported(String),
}

impl AssertionKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Equal => "equal",
            Self::NotEqual => "not_equal",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::GreaterThan => "greater_than",
            Self::GreaterOrEqual => "greater_or_equal",
            Self::LessThan => "less_than",
            Self::LessOrEqual => "less_or_equal",
            Self::RegexMatch => "regex_match",
            Self::LengthEqual => "length_equal",
            Self::TypeMatch => "type_match",
            Self::HasField => "has_field",
            Self::Unsupported(name) => name,
        }
    }
}

impl From<String> for AssertionKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "equal" => Self::Equal,
            "not_equal" => Self::NotEqual,
            "contains" => Self::Contains,
            "not_contains" => Self::NotContains,
            "greater_than" => Self::GreaterThan,
            "greater_or_equal" => Self::GreaterOrEqual,
            "less_than" => Self::LessThan,
            "less_or_equal" => Self::LessOrEqual,
            "regex_match" => Self::RegexMatch,
            "length_equal" => Self::LengthEqual,
            "type_match" => Self::TypeMatch,
            "has_field" => Self::HasField,
            _ => Self::Unsupported(value),
        }
    }
}

impl From<AssertionKind> for String {
    fn from(value: AssertionKind) -> Self {
        match value {
            AssertionKind::Unsupported(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the expected value comes from. The two sources are exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expected {
    Literal(Value),
    /// Id of a dependency that the caller resolved beforehand.
    Dependency(String),
}

impl Default for Expected {
    fn default() -> Self {
        Self::Literal(Value::Null)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssertionOptions {
    pub ignore_case: bool,
    /// Numeric values closer than this compare equal.
    pub tolerance: f64,
    pub deep_comparison: bool,
    /// Converts the actual value before comparing.
    pub convert: Option<TargetType>,
}

/// One typed comparison between an actual and an expected value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Assertion {
    pub name: String,
    pub kind: AssertionKind,
    #[serde(default)]
    pub locator: Option<String>,
    #[serde(default)]
    pub actual: Value,
    #[serde(default)]
    pub expected: Expected,
    #[serde(default)]
    pub error_template: Option<String>,
    #[serde(default)]
    pub options: AssertionOptions,
}

impl Assertion {
    pub fn new(name: impl Into<String>, kind: AssertionKind) -> Self {
        Self {
            name: name.into(),
            kind,
            locator: None,
            actual: Value::Null,
            expected: Expected::default(),
            error_template: None,
            options: AssertionOptions::default(),
        }
    }

    pub fn with_actual(mut self, actual: Value) -> Self {
        self.actual = actual;
        self
    }

    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.locator = Some(locator.into());
        self
    }

    pub fn with_expected(mut self, expected: Value) -> Self {
        self.expected = Expected::Literal(expected);
        self
    }

    /// Takes the expected value from a resolved dependency, dropping any literal.
    pub fn with_dependency(mut self, dependency_id: impl Into<String>) -> Self {
        self.expected = Expected::Dependency(dependency_id.into());
        self
    }

    pub fn with_error_template(mut self, template: impl Into<String>) -> Self {
        self.error_template = Some(template.into());
        self
    }

    pub fn with_options(mut self, options: AssertionOptions) -> Self {
        self.options = options;
        self
    }
}

/// Outcome of evaluating one assertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionResult {
    pub name: String,
    pub passed: bool,
    pub actual: Value,
    pub expected: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub detail: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssertionGroup {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub assertions: Vec<Assertion>,
    #[serde(default)]
    pub options: GroupOptions,
}

impl AssertionGroup {
    pub fn new(name: impl Into<String>, assertions: Vec<Assertion>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            assertions,
            options: GroupOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GroupOptions) -> Self {
        self.options = options;
        self
    }

    /// Rejects option combinations that have no meaning.
    pub fn validate(&self) -> Result<(), GroupError> {
        if self.options.parallel && self.options.stop_on_first_failure {
            return Err(GroupError::InvalidOptions {
                group: self.name.clone(),
                reason: "stop_on_first_failure cannot be combined with parallel execution"
                    .to_string(),
            });
        }
        if self.options.timeout_ms == Some(0) {
            return Err(GroupError::InvalidOptions {
                group: self.name.clone(),
                reason: "timeout_ms must be > 0".to_string(),
            });
        }
        Ok(())
    }

    /// Uses `response` as the actual value of every assertion that has none.
    pub fn bind_response(&mut self, response: &Value) {
        for assertion in &mut self.assertions {
            if assertion.actual.is_null() {
                assertion.actual = response.clone();
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroupOptions {
    pub stop_on_first_failure: bool,
    pub timeout_ms: Option<u64>,
    pub parallel: bool,
    pub retry: Option<RetryConfig>,
}

impl GroupOptions {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategy {
    #[default]
    Constant,
    Linear,
    Exponential,
    Fibonacci,
    Random,
}

/// Caller-side retry of a whole assertion group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    pub max_retries: u32,
    #[serde(default)]
    pub strategy: RetryStrategy,
    pub interval_ms: u64,
    #[serde(default)]
    pub max_interval_ms: Option<u64>,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_multiplier() -> f64 {
    2.0
}

impl RetryConfig {
    pub fn new(max_retries: u32, strategy: RetryStrategy, interval: Duration) -> Self {
        Self {
            max_retries,
            strategy,
            interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            max_interval_ms: None,
            multiplier: default_multiplier(),
        }
    }

    pub fn with_max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval_ms = Some(u64::try_from(max_interval.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn max_interval(&self) -> Option<Duration> {
        self.max_interval_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionGroupResult {
    pub name: String,
    pub description: String,
    pub passed: bool,
    pub results: Vec<AssertionResult>,
    pub parallel: bool,
    /// Times the group was run, including retries.
    pub attempts: u32,
}

impl AssertionGroupResult {
    pub fn new(group: &AssertionGroup, results: Vec<AssertionResult>) -> Self {
        Self {
            name: group.name.clone(),
            description: group.description.clone(),
            passed: results.iter().all(|result| result.passed),
            results,
            parallel: group.options.parallel,
            attempts: 1,
        }
    }

    /// True when evaluation stopped before every assertion ran.
    pub fn stopped_early(&self, declared: usize) -> bool {
        self.results.len() < declared
    }
}
