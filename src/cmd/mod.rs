pub mod r#assert;
pub mod extract;
pub mod resolve;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::config::KernelConfig;
use crate::domain::dependency::{Dependency, ResolvedValues};
use crate::domain::error::ResolveError;
use crate::engine::generator::{GeneratorCache, SweeperHandle};
use crate::engine::resolve::{
    KvEntry, MemoryKvStore, MemorySceneStore, ResolveContext, Resolver,
};
use crate::io::reader;

/// Structured command response that carries exit-code mapping and JSON payload.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommandResponse {
    pub exit_code: i32,
    pub payload: Value,
}

impl CommandResponse {
    fn report<T: Serialize>(report: &T, exit_code: i32, label: &str) -> Self {
        match serde_json::to_value(report) {
            Ok(payload) => Self { exit_code, payload },
            Err(error) => CommandError::Internal(format!("failed to serialize {label}: {error}"))
                .into(),
        }
    }
}

#[derive(Debug)]
enum CommandError {
    InputUsage(String),
    Resolution { dependency: String, message: String, timeout: bool },
    GroupTimeout(String),
    Internal(String),
}

impl From<CommandError> for CommandResponse {
    fn from(error: CommandError) -> Self {
        match error {
            CommandError::InputUsage(message) => Self {
                exit_code: 3,
                payload: json!({"error": "input_usage_error", "message": message}),
            },
            CommandError::Resolution {
                dependency,
                message,
                timeout,
            } => Self {
                exit_code: 1,
                payload: json!({
                    "error": "resolve_error",
                    "message": message,
                    "dependency": dependency,
                    "timeout": timeout,
                }),
            },
            CommandError::GroupTimeout(message) => Self {
                exit_code: 2,
                payload: json!({"error": "group_timeout", "message": message}),
            },
            CommandError::Internal(message) => Self {
                exit_code: 1,
                payload: json!({"error": "internal_error", "message": message}),
            },
        }
    }
}

impl From<ResolveError> for CommandError {
    fn from(error: ResolveError) -> Self {
        Self::Resolution {
            dependency: error.dependency_id().to_string(),
            timeout: error.is_timeout(),
            message: error.to_string(),
        }
    }
}

fn read_value(path: &Path, label: &str) -> Result<Value, CommandError> {
    reader::read_document_file(path).map_err(|error| {
        CommandError::InputUsage(format!("{label} `{}`: {error}", path.display()))
    })
}

fn load_document<T: DeserializeOwned>(path: &Path, label: &str) -> Result<T, CommandError> {
    let value = read_value(path, label)?;
    serde_json::from_value(value).map_err(|error| {
        CommandError::InputUsage(format!("invalid {label} `{}`: {error}", path.display()))
    })
}

/// Resolver wired to file-backed stores, plus the cache sweeper that lives as
/// long as the command.
struct Runtime {
    resolver: Resolver,
    context: ResolveContext,
    _sweeper: SweeperHandle,
}

impl Runtime {
    fn build(
        config: &KernelConfig,
        scenes: Option<&Path>,
        kv: Option<&Path>,
    ) -> Result<Self, CommandError> {
        let cache = Arc::new(GeneratorCache::new(config.cache.default_ttl()));
        let sweeper = cache.spawn_sweeper(config.cache.sweep_interval());
        let mut resolver = Resolver::new(cache);

        if let Some(path) = scenes {
            let document = read_value(path, "scene outputs")?;
            let store = MemorySceneStore::from_document(&document).map_err(|error| {
                CommandError::InputUsage(format!("scene outputs `{}`: {error}", path.display()))
            })?;
            resolver = resolver.with_scene_store(Arc::new(store));
        }
        if let Some(path) = kv {
            let entries: BTreeMap<String, KvEntry> = load_document(path, "key-value entries")?;
            resolver = resolver.with_kv_store(Arc::new(MemoryKvStore::from_entries(entries)));
        }

        let context = match config.resolve.deadline() {
            Some(deadline) => ResolveContext::new().with_timeout(deadline),
            None => ResolveContext::new(),
        };
        Ok(Self {
            resolver,
            context,
            _sweeper: sweeper,
        })
    }

    async fn resolve_file(&self, deps: Option<&Path>) -> Result<ResolvedValues, CommandError> {
        let dependencies: Vec<Dependency> = match deps {
            Some(path) => load_document(path, "dependencies")?,
            None => Vec::new(),
        };
        Ok(self
            .resolver
            .resolve_all(&dependencies, &self.context)
            .await?)
    }
}
