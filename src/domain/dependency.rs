use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::value::TargetType;

/// Origin kind of a dependency's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Scene,
    Redis,
    Env,
    Generator,
    Custom,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scene => "scene",
            Self::Redis => "redis",
            Self::Env => "env",
            Self::Generator => "generator",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named request for a value, resolved before assertions run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dependency {
    pub id: String,
    pub source_type: SourceType,
    pub config: DConfig,
    #[serde(default)]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub fetch_strategy: FetchStrategy,
    #[serde(default)]
    pub transform: Option<Transform>,
}

impl Dependency {
    /// Builds a dependency whose declared source kind matches `config`.
    pub fn new(id: impl Into<String>, config: DConfig) -> Self {
        Self {
            id: id.into(),
            source_type: config.source_type(),
            config,
            default_value: None,
            fetch_strategy: FetchStrategy::default(),
            transform: None,
        }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_fetch_strategy(mut self, strategy: FetchStrategy) -> Self {
        self.fetch_strategy = strategy;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }
}

/// Source-specific configuration. Exactly one payload is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DConfig {
    Scene(SceneSelector),
    Redis(RedisSelector),
    Env(EnvSelector),
    Generator(GeneratorConfig),
    Custom(CustomSource),
}

impl DConfig {
    pub fn source_type(&self) -> SourceType {
        match self {
            Self::Scene(_) => SourceType::Scene,
            Self::Redis(_) => SourceType::Redis,
            Self::Env(_) => SourceType::Env,
            Self::Generator(_) => SourceType::Generator,
            Self::Custom(_) => SourceType::Custom,
        }
    }
}

/// Selects a value out of a previous step's recorded output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneSelector {
    pub scene_id: String,
    pub step_id: String,
    #[serde(default = "root_path")]
    pub path: String,
    #[serde(default)]
    pub default_value: Option<Value>,
}

fn root_path() -> String {
    "$".to_string()
}

/// Key-value store lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedisSelector {
    pub key: String,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub value_type: RedisValueType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedisValueType {
    #[default]
    String,
    Hash,
    List,
    Set,
    SortedSet,
}

impl RedisValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Hash => "hash",
            Self::List => "list",
            Self::Set => "set",
            Self::SortedSet => "sorted_set",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvSelector {
    pub name: String,
}

/// Literal value returned verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomSource {
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorKind {
    Timestamp,
    RandomInt,
    RandomString,
    Uuid,
    Sequence,
    CurrentTime,
}

impl GeneratorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
            Self::RandomInt => "random_int",
            Self::RandomString => "random_string",
            Self::Uuid => "uuid",
            Self::Sequence => "sequence",
            Self::CurrentTime => "current_time",
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    pub kind: GeneratorKind,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub cache: Option<CacheConfig>,
}

impl GeneratorConfig {
    pub fn new(kind: GeneratorKind) -> Self {
        Self {
            kind,
            params: Map::new(),
            cache: None,
        }
    }

    pub fn with_param(mut self, name: &str, value: Value) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = Some(cache);
        self
    }
}

/// Generator cache descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Falls back to the cache service default when unset.
    pub ttl_ms: Option<u64>,
    pub key_prefix: String,
    /// Entries older than `ttl - refresh_before` are served stale and refreshed.
    pub refresh_before_ms: Option<u64>,
}

impl CacheConfig {
    pub fn enabled(key_prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            enabled: true,
            ttl_ms: Some(duration_ms(ttl)),
            key_prefix: key_prefix.into(),
            refresh_before_ms: None,
        }
    }

    pub fn with_refresh_before(mut self, lead: Duration) -> Self {
        self.refresh_before_ms = Some(duration_ms(lead));
        self
    }

    pub fn ttl_or(&self, default_ttl: Duration) -> Duration {
        self.ttl_ms.map(Duration::from_millis).unwrap_or(default_ttl)
    }

    pub fn refresh_before(&self) -> Duration {
        self.refresh_before_ms
            .map(Duration::from_millis)
            .unwrap_or_default()
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnFailure {
    #[default]
    Fail,
    Retry,
    UseDefault,
}

/// What the resolver does when a source lookup errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchStrategy {
    pub on_failure: OnFailure,
    pub max_retries: u32,
    pub retry_interval_ms: u64,
}

impl FetchStrategy {
    pub fn fail() -> Self {
        Self::default()
    }

    pub fn retry(max_retries: u32, interval: Duration) -> Self {
        Self {
            on_failure: OnFailure::Retry,
            max_retries,
            retry_interval_ms: duration_ms(interval),
        }
    }

    pub fn use_default() -> Self {
        Self {
            on_failure: OnFailure::UseDefault,
            ..Self::default()
        }
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Total source attempts this strategy allows.
    pub fn max_attempts(&self) -> u32 {
        match self.on_failure {
            OnFailure::Retry => self.max_retries.saturating_add(1),
            OnFailure::Fail | OnFailure::UseDefault => 1,
        }
    }
}

/// Post-resolution type conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Transform {
    pub enable_type_conversion: bool,
    pub target_type: TargetType,
    pub time_format: Option<String>,
}

impl Transform {
    pub fn convert_to(target_type: TargetType) -> Self {
        Self {
            enable_type_conversion: true,
            target_type,
            time_format: None,
        }
    }

    pub fn with_time_format(mut self, format: impl Into<String>) -> Self {
        self.time_format = Some(format.into());
        self
    }
}

/// Resolved dependency values keyed by dependency id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedValues {
    values: BTreeMap<String, Value>,
}

impl ResolvedValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `id`, replacing any earlier resolution.
    pub fn insert(&mut self, id: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(id.into(), value)
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.values.get(id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.values
    }
}

impl FromIterator<(String, Value)> for ResolvedValues {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
