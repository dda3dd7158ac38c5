pub mod context;
pub mod source;

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::dependency::{
    DConfig, Dependency, GeneratorConfig, OnFailure, ResolvedValues, SceneSelector,
};
use crate::domain::error::{ResolveError, SourceError};
use crate::engine::convert;
use crate::engine::extract;
use crate::engine::generator::{Generator, GeneratorCache};

pub use context::{CancelToken, ResolveContext};
pub use source::{
    EnvSource, KvEntry, KvStore, MapEnv, MemoryKvStore, MemorySceneStore, ProcessEnv, SceneStore,
    ScoredMember,
};

use context::{AttemptError, Interrupted};

/// Turns declared dependencies into concrete values.
///
/// Owns the source collaborators and shares the generator cache it was built
/// with; it keeps no per-dependency state.
pub struct Resolver {
    scenes: Arc<dyn SceneStore>,
    kv: Arc<dyn KvStore>,
    env: Arc<dyn EnvSource>,
    generator: Generator,
    cache: Arc<GeneratorCache>,
}

impl Resolver {
    /// Empty in-memory stores and the process environment.
    pub fn new(cache: Arc<GeneratorCache>) -> Self {
        Self {
            scenes: Arc::new(MemorySceneStore::new()),
            kv: Arc::new(MemoryKvStore::new()),
            env: Arc::new(ProcessEnv),
            generator: Generator::new(),
            cache,
        }
    }

    pub fn with_scene_store(mut self, scenes: Arc<dyn SceneStore>) -> Self {
        self.scenes = scenes;
        self
    }

    pub fn with_kv_store(mut self, kv: Arc<dyn KvStore>) -> Self {
        self.kv = kv;
        self
    }

    pub fn with_env(mut self, env: Arc<dyn EnvSource>) -> Self {
        self.env = env;
        self
    }

    pub fn cache(&self) -> &Arc<GeneratorCache> {
        &self.cache
    }

    /// Resolves one dependency, applying its fetch strategy and transform.
    pub async fn resolve(
        &self,
        dependency: &Dependency,
        context: &ResolveContext,
    ) -> Result<Value, ResolveError> {
        let configured = dependency.config.source_type();
        if configured != dependency.source_type {
            return Err(ResolveError::SourceMismatch {
                id: dependency.id.clone(),
                declared: dependency.source_type,
                configured,
            });
        }

        let value = self.fetch_with_strategy(dependency, context).await?;
        match &dependency.transform {
            Some(transform) if transform.enable_type_conversion => convert::convert(
                &value,
                transform.target_type,
                transform.time_format.as_deref(),
            )
            .map_err(|source| ResolveError::Conversion {
                id: dependency.id.clone(),
                source,
            }),
            _ => Ok(value),
        }
    }

    /// Resolves dependencies one at a time in declaration order, stopping at
    /// the first error.
    pub async fn resolve_all(
        &self,
        dependencies: &[Dependency],
        context: &ResolveContext,
    ) -> Result<ResolvedValues, ResolveError> {
        let mut resolved = ResolvedValues::new();
        for dependency in dependencies {
            let value = self.resolve(dependency, context).await?;
            resolved.insert(dependency.id.clone(), value);
        }
        Ok(resolved)
    }

    async fn fetch_with_strategy(
        &self,
        dependency: &Dependency,
        context: &ResolveContext,
    ) -> Result<Value, ResolveError> {
        let id = dependency.id.as_str();
        let strategy = &dependency.fetch_strategy;
        let max_attempts = strategy.max_attempts();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(
                dependency = id,
                source = %dependency.source_type,
                attempt,
                "fetching dependency"
            );

            let error = match self.attempt(dependency, context).await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Interrupted(interrupted)) => {
                    return Err(interrupted_error(id, interrupted));
                }
                Err(AttemptError::Source(error)) => error,
            };

            match strategy.on_failure {
                OnFailure::Fail => {
                    return Err(ResolveError::Source {
                        id: id.to_string(),
                        source: error,
                    });
                }
                OnFailure::UseDefault => {
                    warn!(dependency = id, %error, "source failed; using default value");
                    return Ok(dependency.default_value.clone().unwrap_or(Value::Null));
                }
                OnFailure::Retry if attempt >= max_attempts => {
                    return Err(ResolveError::RetriesExhausted {
                        id: id.to_string(),
                        attempts: attempt,
                        last: error,
                    });
                }
                OnFailure::Retry => {
                    warn!(
                        dependency = id,
                        attempt,
                        max_attempts,
                        %error,
                        "source failed; retrying"
                    );
                    context
                        .guard(tokio::time::sleep(strategy.retry_interval()))
                        .await
                        .map_err(|interrupted| interrupted_error(id, interrupted))?;
                }
            }
        }
    }

    async fn attempt(
        &self,
        dependency: &Dependency,
        context: &ResolveContext,
    ) -> Result<Value, AttemptError> {
        match context.guard(self.fetch_once(&dependency.config)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(AttemptError::Source(error)),
            Err(interrupted) => Err(AttemptError::Interrupted(interrupted)),
        }
    }

    async fn fetch_once(&self, config: &DConfig) -> Result<Value, SourceError> {
        match config {
            DConfig::Scene(selector) => self.fetch_scene(selector).await,
            DConfig::Redis(selector) => self.kv.fetch(selector).await,
            DConfig::Env(selector) => {
                self.env
                    .var(&selector.name)
                    .map(Value::String)
                    .ok_or_else(|| SourceError::NotFound {
                        key: format!("env:{}", selector.name),
                    })
            }
            DConfig::Generator(generator) => self.generate(generator),
            DConfig::Custom(custom) => Ok(custom.value.clone()),
        }
    }

    async fn fetch_scene(&self, selector: &SceneSelector) -> Result<Value, SourceError> {
        let output = self
            .scenes
            .step_output(&selector.scene_id, &selector.step_id)
            .await?;
        let extracted = match output {
            Some(output) => extract::extract(&selector.path, &output)
                .map(|extracted| extracted.value)
                .map_err(SourceError::from),
            None => Err(SourceError::NotFound {
                key: format!("scene:{}/{}", selector.scene_id, selector.step_id),
            }),
        };
        match (extracted, &selector.default_value) {
            (Ok(value), _) => Ok(value),
            (Err(error), Some(default)) => {
                debug!(
                    scene = %selector.scene_id,
                    step = %selector.step_id,
                    %error,
                    "scene value absent; using selector default"
                );
                Ok(default.clone())
            }
            (Err(error), None) => Err(error),
        }
    }

    fn generate(&self, config: &GeneratorConfig) -> Result<Value, SourceError> {
        let generate = || self.generator.generate(config.kind, &config.params);
        let value = match &config.cache {
            Some(cache) if cache.enabled => {
                self.cache
                    .get_or_generate(cache, config.kind, &config.params, generate)?
            }
            _ => generate()?,
        };
        Ok(value)
    }
}

fn interrupted_error(id: &str, interrupted: Interrupted) -> ResolveError {
    match interrupted {
        Interrupted::Cancelled => ResolveError::Cancelled { id: id.to_string() },
        Interrupted::DeadlineExceeded => ResolveError::Timeout { id: id.to_string() },
    }
}
