use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use crate::domain::error::SourceError;

/// Shared cancellation signal. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelState>,
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Completes once `cancel` has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Deadline and cancellation applied to every source attempt and retry wait.
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    deadline: Option<Instant>,
    cancel: CancelToken,
}

impl ResolveContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Runs `attempt` unless the context is cancelled or its deadline passes first.
    pub(crate) async fn guard<T, F>(&self, attempt: F) -> Result<T, Interrupted>
    where
        F: Future<Output = T>,
    {
        if self.cancel.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupted::Cancelled),
            _ = deadline => Err(Interrupted::DeadlineExceeded),
            output = attempt => Ok(output),
        }
    }
}

/// Why a guarded operation did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interrupted {
    Cancelled,
    DeadlineExceeded,
}

/// Outcome of one source attempt under a context.
pub(crate) enum AttemptError {
    Source(SourceError),
    Interrupted(Interrupted),
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{CancelToken, Interrupted, ResolveContext};

    #[tokio::test(start_paused = true)]
    async fn deadline_interrupts_slow_attempt() {
        let context = ResolveContext::new().with_timeout(Duration::from_millis(50));
        let outcome = context
            .guard(tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert_eq!(outcome, Err(Interrupted::DeadlineExceeded));
    }

    #[tokio::test]
    async fn cancellation_wins_over_pending_attempt() {
        let token = CancelToken::new();
        let context = ResolveContext::new().with_cancel(token.clone());
        let canceller = tokio::spawn(async move {
            tokio::task::yield_now().await;
            token.cancel();
        });
        let outcome = context.guard(std::future::pending::<()>()).await;
        assert_eq!(outcome, Err(Interrupted::Cancelled));
        canceller.await.expect("join");
    }

    #[tokio::test]
    async fn completes_when_not_interrupted() {
        let outcome = ResolveContext::new().guard(async { 7 }).await;
        assert_eq!(outcome, Ok(7));
    }
}
