use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use apicheck::domain::dependency::{
    CacheConfig, DConfig, Dependency, EnvSelector, FetchStrategy, GeneratorConfig, GeneratorKind,
    RedisSelector, RedisValueType,
};
use apicheck::domain::error::{ResolveError, SourceError};
use apicheck::engine::generator::GeneratorCache;
use apicheck::engine::resolve::{KvStore, MapEnv, ResolveContext, Resolver};
use async_trait::async_trait;
use serde_json::{Value, json};

/// Times out every request, the way an overloaded store would.
#[derive(Default)]
struct SlowStore {
    calls: AtomicU32,
}

#[async_trait]
impl KvStore for SlowStore {
    async fn fetch(&self, _selector: &RedisSelector) -> Result<Value, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SourceError::Timeout)
    }
}

fn resolver() -> Resolver {
    Resolver::new(Arc::new(GeneratorCache::new(Duration::from_secs(300))))
}

fn counter_dependency() -> Dependency {
    Dependency::new(
        "counter",
        DConfig::Redis(RedisSelector {
            key: "counter".to_string(),
            field: None,
            value_type: RedisValueType::String,
        }),
    )
}

#[tokio::test(start_paused = true)]
async fn store_timeouts_are_retried_then_exhausted() {
    let store = Arc::new(SlowStore::default());
    let resolver = resolver().with_kv_store(store.clone());
    let dependency = counter_dependency()
        .with_fetch_strategy(FetchStrategy::retry(2, Duration::from_millis(250)));

    let started = tokio::time::Instant::now();
    let error = resolver
        .resolve(&dependency, &ResolveContext::new())
        .await
        .expect_err("exhausted");
    assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    assert!(started.elapsed() >= Duration::from_millis(500));
    match error {
        ResolveError::RetriesExhausted { attempts, last, .. } => {
            assert_eq!(attempts, 3);
            assert!(matches!(last, SourceError::Timeout));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn deadline_cuts_retry_waits_short() {
    let store = Arc::new(SlowStore::default());
    let resolver = resolver().with_kv_store(store.clone());
    let dependency = counter_dependency()
        .with_fetch_strategy(FetchStrategy::retry(10, Duration::from_secs(5)));
    let context = ResolveContext::new().with_timeout(Duration::from_secs(7));

    let error = resolver
        .resolve(&dependency, &context)
        .await
        .expect_err("deadline");
    assert!(error.is_timeout());
    assert_eq!(store.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn use_default_returns_configured_default() {
    let resolver = resolver().with_env(Arc::new(MapEnv::new()));
    let dependency = Dependency::new(
        "region",
        DConfig::Env(EnvSelector {
            name: "APICHECK_REGION".to_string(),
        }),
    )
    .with_default(json!("eu-west-1"))
    .with_fetch_strategy(FetchStrategy::use_default());

    let value = resolver
        .resolve(&dependency, &ResolveContext::new())
        .await
        .expect("default");
    assert_eq!(value, json!("eu-west-1"));
}

#[tokio::test(start_paused = true)]
async fn cached_generator_expires_after_ttl() {
    let resolver = resolver();
    let dependency = Dependency::new(
        "nonce",
        DConfig::Generator(
            GeneratorConfig::new(GeneratorKind::RandomString)
                .with_param("length", json!(24))
                .with_cache(CacheConfig::enabled("nonce", Duration::from_secs(10))),
        ),
    );
    let context = ResolveContext::new();

    let first = resolver.resolve(&dependency, &context).await.expect("first");
    tokio::time::advance(Duration::from_secs(9)).await;
    let second = resolver.resolve(&dependency, &context).await.expect("second");
    assert_eq!(first, second);

    tokio::time::advance(Duration::from_secs(2)).await;
    let third = resolver.resolve(&dependency, &context).await.expect("third");
    assert_ne!(first, third);
    assert_eq!(resolver.cache().stats().misses, 2);
}

#[tokio::test]
async fn dependencies_deserialize_from_yaml_definitions() {
    let yaml = r#"
- id: order_seq
  source_type: generator
  config:
    generator:
      kind: sequence
      params: {name: orders, start: 100}
- id: started_at
  source_type: custom
  config:
    custom:
      value: "2026-02-23T20:15:30+09:00"
  transform:
    enable_type_conversion: true
    target_type: timestamp
"#;
    let document = apicheck::io::reader::read_document(yaml.as_bytes(), apicheck::io::Format::Yaml)
        .expect("yaml");
    let dependencies: Vec<Dependency> = serde_json::from_value(document).expect("dependencies");
    let resolved = resolver()
        .resolve_all(&dependencies, &ResolveContext::new())
        .await
        .expect("resolved");
    assert_eq!(resolved.get("order_seq"), Some(&json!(100)));
    assert_eq!(resolved.get("started_at"), Some(&json!(1_771_845_330)));
}
