//! Runs an assertion group sequentially or as one task per assertion, and
//! wraps whole-group runs in the caller-side retry loop.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use serde_json::{Value, json};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::domain::assertion::{Assertion, AssertionGroup, AssertionGroupResult, AssertionResult};
use crate::domain::dependency::ResolvedValues;
use crate::domain::error::GroupError;
use crate::engine::assert::evaluate;
use crate::engine::assert::retry::backoff_delay;

/// Runs every assertion of `group` once.
pub async fn run_group(
    group: &AssertionGroup,
    resolved: Arc<ResolvedValues>,
) -> Result<AssertionGroupResult, GroupError> {
    group.validate()?;
    let results = if group.options.parallel {
        run_parallel(group, resolved).await
    } else {
        run_sequential(group, &resolved).await
    };

    let result = AssertionGroupResult::new(group, results);
    debug!(
        group = %group.name,
        passed = result.passed,
        ran = result.results.len(),
        declared = group.assertions.len(),
        "assertion group finished"
    );
    Ok(result)
}

async fn run_sequential(
    group: &AssertionGroup,
    resolved: &ResolvedValues,
) -> Vec<AssertionResult> {
    let mut results = Vec::with_capacity(group.assertions.len());
    for assertion in &group.assertions {
        let result = evaluate(assertion, resolved);
        let failed = !result.passed;
        results.push(result);
        if failed && group.options.stop_on_first_failure {
            debug!(group = %group.name, assertion = %assertion.name, "stopping at first failure");
            break;
        }
        tokio::task::yield_now().await;
    }
    results
}

async fn run_parallel(
    group: &AssertionGroup,
    resolved: Arc<ResolvedValues>,
) -> Vec<AssertionResult> {
    let mut tasks = JoinSet::new();
    for (index, assertion) in group.assertions.iter().enumerate() {
        let assertion = assertion.clone();
        let resolved = Arc::clone(&resolved);
        tasks.spawn(async move {
            let result = catch_unwind(AssertUnwindSafe(|| evaluate(&assertion, &resolved)))
                .unwrap_or_else(|_| panicked(&assertion));
            (index, result)
        });
    }

    let mut slots: Vec<Option<AssertionResult>> = vec![None; group.assertions.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(error) => warn!(group = %group.name, %error, "assertion task did not complete"),
        }
    }

    slots
        .into_iter()
        .zip(&group.assertions)
        .map(|(slot, assertion)| slot.unwrap_or_else(|| panicked(assertion)))
        .collect()
}

fn panicked(assertion: &Assertion) -> AssertionResult {
    AssertionResult {
        name: assertion.name.clone(),
        passed: false,
        actual: assertion.actual.clone(),
        expected: Value::Null,
        error: Some("assertion evaluation panicked".to_string()),
        detail: [("kind".to_string(), json!(assertion.kind.as_str()))]
            .into_iter()
            .collect(),
    }
}

/// Runs `group`, re-running it from scratch per its retry configuration while
/// it fails or times out.
///
/// Each run is bounded by the group timeout. Only the last run's outcome is
/// returned; `attempts` records how many runs happened.
pub async fn run_group_with_retry(
    group: &AssertionGroup,
    resolved: Arc<ResolvedValues>,
) -> Result<AssertionGroupResult, GroupError> {
    group.validate()?;
    retry_attempts(group, || run_group(group, Arc::clone(&resolved))).await
}

async fn retry_attempts<F, Fut>(
    group: &AssertionGroup,
    mut run_once: F,
) -> Result<AssertionGroupResult, GroupError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<AssertionGroupResult, GroupError>>,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let outcome = match group.options.timeout() {
            Some(timeout) => tokio::time::timeout(timeout, run_once())
                .await
                .unwrap_or_else(|_| {
                    Err(GroupError::Timeout {
                        group: group.name.clone(),
                        timeout,
                    })
                }),
            None => run_once().await,
        };

        let retryable = match &outcome {
            Ok(result) => !result.passed,
            Err(GroupError::Timeout { .. }) => true,
            Err(GroupError::InvalidOptions { .. }) => false,
        };
        let retry = match group.options.retry.as_ref() {
            Some(retry) if retryable && attempt <= retry.max_retries => retry,
            _ => {
                return outcome.map(|mut result| {
                    result.attempts = attempt;
                    info!(
                        group = %group.name,
                        passed = result.passed,
                        attempts = attempt,
                        "assertion group done"
                    );
                    result
                });
            }
        };

        let delay = backoff_delay(retry, attempt);
        match &outcome {
            Ok(_) => {
                warn!(group = %group.name, attempt, ?delay, "assertion group failed; retrying")
            }
            Err(error) => {
                warn!(group = %group.name, attempt, ?delay, %error, "retrying assertion group")
            }
        }
        tokio::time::sleep(delay).await;
    }
}
