//! Collaborator boundaries for dependency sources, with in-memory stand-ins.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::domain::dependency::{RedisSelector, RedisValueType};
use crate::domain::error::SourceError;

/// Recorded outputs of earlier scene steps.
#[async_trait]
pub trait SceneStore: Send + Sync {
    async fn step_output(&self, scene_id: &str, step_id: &str)
    -> Result<Option<Value>, SourceError>;
}

/// Key-value store with redis-like value types.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn fetch(&self, selector: &RedisSelector) -> Result<Value, SourceError>;
}

pub trait EnvSource: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed variable set, for tests and sandboxed runs.
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    vars: BTreeMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl EnvSource for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

#[derive(Debug, Default)]
pub struct MemorySceneStore {
    outputs: DashMap<(String, String), Value>,
}

impl MemorySceneStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `{scene_id: {step_id: output}}`.
    pub fn from_document(document: &Value) -> Result<Self, SourceError> {
        let store = Self::new();
        let Value::Object(scenes) = document else {
            return Err(SourceError::Unavailable(
                "scene document must be an object of scenes".to_string(),
            ));
        };
        for (scene_id, steps) in scenes {
            let Value::Object(steps) = steps else {
                return Err(SourceError::Unavailable(format!(
                    "scene `{scene_id}` must be an object of steps"
                )));
            };
            for (step_id, output) in steps {
                store.record(scene_id, step_id, output.clone());
            }
        }
        Ok(store)
    }

    pub fn record(&self, scene_id: &str, step_id: &str, output: Value) {
        self.outputs
            .insert((scene_id.to_string(), step_id.to_string()), output);
    }
}

#[async_trait]
impl SceneStore for MemorySceneStore {
    async fn step_output(
        &self,
        scene_id: &str,
        step_id: &str,
    ) -> Result<Option<Value>, SourceError> {
        Ok(self
            .outputs
            .get(&(scene_id.to_string(), step_id.to_string()))
            .map(|output| output.value().clone()))
    }
}

/// One stored value, tagged with its redis type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum KvEntry {
    String(String),
    Hash(BTreeMap<String, String>),
    List(Vec<Value>),
    Set(Vec<String>),
    SortedSet(Vec<ScoredMember>),
}

impl KvEntry {
    fn value_type(&self) -> RedisValueType {
        match self {
            Self::String(_) => RedisValueType::String,
            Self::Hash(_) => RedisValueType::Hash,
            Self::List(_) => RedisValueType::List,
            Self::Set(_) => RedisValueType::Set,
            Self::SortedSet(_) => RedisValueType::SortedSet,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMember {
    pub member: String,
    pub score: f64,
}

#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: DashMap<String, KvEntry>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: BTreeMap<String, KvEntry>) -> Self {
        let store = Self::new();
        for (key, entry) in entries {
            store.set(key, entry);
        }
        store
    }

    pub fn set(&self, key: impl Into<String>, entry: KvEntry) {
        self.entries.insert(key.into(), entry);
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn fetch(&self, selector: &RedisSelector) -> Result<Value, SourceError> {
        let entry = self
            .entries
            .get(&selector.key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SourceError::NotFound {
                key: selector.key.clone(),
            })?;
        if entry.value_type() != selector.value_type {
            return Err(SourceError::WrongType {
                key: selector.key.clone(),
                expected: selector.value_type.as_str(),
                actual: entry.value_type().as_str(),
            });
        }
        read_entry(selector, entry)
    }
}

/// Applies the optional field: hash field, list index, set membership or member score.
fn read_entry(selector: &RedisSelector, entry: KvEntry) -> Result<Value, SourceError> {
    let missing = |field: &str| SourceError::NotFound {
        key: format!("{}.{field}", selector.key),
    };
    let field = selector.field.as_deref();
    match (entry, field) {
        (KvEntry::String(text), _) => Ok(Value::String(text)),
        (KvEntry::Hash(map), None) => Ok(Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect::<Map<String, Value>>(),
        )),
        (KvEntry::Hash(map), Some(field)) => map
            .get(field)
            .cloned()
            .map(Value::String)
            .ok_or_else(|| missing(field)),
        (KvEntry::List(items), None) => Ok(Value::Array(items)),
        (KvEntry::List(items), Some(field)) => field
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index).cloned())
            .ok_or_else(|| missing(field)),
        (KvEntry::Set(members), None) => Ok(Value::Array(
            members.into_iter().map(Value::String).collect(),
        )),
        (KvEntry::Set(members), Some(field)) => {
            Ok(Value::Bool(members.iter().any(|member| member == field)))
        }
        (KvEntry::SortedSet(mut members), None) => {
            members.sort_by(|left, right| left.score.total_cmp(&right.score));
            Ok(Value::Array(
                members
                    .into_iter()
                    .map(|scored| Value::String(scored.member))
                    .collect(),
            ))
        }
        (KvEntry::SortedSet(members), Some(field)) => members
            .iter()
            .find(|scored| scored.member == field)
            .and_then(|scored| Number::from_f64(scored.score))
            .map(Value::Number)
            .ok_or_else(|| missing(field)),
    }
}
