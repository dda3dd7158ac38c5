use std::time::Duration;

use rand::Rng;

use crate::domain::assertion::{RetryConfig, RetryStrategy};

/// Delay before retry number `retry` (1-based) of a whole group.
///
/// Every strategy is capped by `max_interval` when one is configured.
pub fn backoff_delay(config: &RetryConfig, retry: u32) -> Duration {
    let retry = retry.max(1);
    let interval = config.interval();
    let delay = match config.strategy {
        RetryStrategy::Constant => interval,
        RetryStrategy::Linear => interval.saturating_mul(retry),
        RetryStrategy::Exponential => {
            let factor = config.multiplier.max(1.0).powi(retry as i32 - 1);
            scale(interval, factor)
        }
        RetryStrategy::Fibonacci => interval.saturating_mul(fibonacci(retry)),
        RetryStrategy::Random => match config.max_interval() {
            Some(max) if max > interval => rand::thread_rng().gen_range(interval..=max),
            _ => interval,
        },
    };
    match config.max_interval() {
        Some(max) => delay.min(max),
        None => delay,
    }
}

fn scale(interval: Duration, factor: f64) -> Duration {
    let secs = interval.as_secs_f64() * factor;
    if secs.is_finite() {
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    } else {
        Duration::MAX
    }
}

/// 1, 1, 2, 3, 5, ... saturating at `u32::MAX`.
fn fibonacci(n: u32) -> u32 {
    let (mut current, mut next) = (1u32, 1u32);
    for _ in 1..n {
        let sum = current.saturating_add(next);
        current = next;
        next = sum;
    }
    current
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::domain::assertion::{RetryConfig, RetryStrategy};

    use super::{backoff_delay, fibonacci};

    fn config(strategy: RetryStrategy) -> RetryConfig {
        RetryConfig::new(5, strategy, Duration::from_millis(100))
    }

    fn delays(config: &RetryConfig) -> Vec<u128> {
        (1..=5)
            .map(|retry| backoff_delay(config, retry).as_millis())
            .collect()
    }

    #[test]
    fn deterministic_strategies() {
        assert_eq!(delays(&config(RetryStrategy::Constant)), vec![100; 5]);
        assert_eq!(
            delays(&config(RetryStrategy::Linear)),
            vec![100, 200, 300, 400, 500]
        );
        assert_eq!(
            delays(&config(RetryStrategy::Exponential)),
            vec![100, 200, 400, 800, 1600]
        );
        assert_eq!(
            delays(&config(RetryStrategy::Fibonacci)),
            vec![100, 100, 200, 300, 500]
        );
    }

    #[test]
    fn max_interval_caps_growth() {
        let capped =
            config(RetryStrategy::Exponential).with_max_interval(Duration::from_millis(300));
        assert_eq!(delays(&capped), vec![100, 200, 300, 300, 300]);
    }

    #[test]
    fn random_stays_within_range() {
        let random = config(RetryStrategy::Random).with_max_interval(Duration::from_millis(250));
        for delay in delays(&random) {
            assert!((100..=250).contains(&delay), "{delay}");
        }
        assert_eq!(delays(&config(RetryStrategy::Random)), vec![100; 5]);
    }

    #[test]
    fn fibonacci_saturates() {
        assert_eq!(fibonacci(1), 1);
        assert_eq!(fibonacci(6), 8);
        assert_eq!(fibonacci(200), u32::MAX);
    }
}
