//! Cancellation and deadline context for a single evaluation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::traits::{EngineError, EngineResult};

/// Cancellable context passed down to [`RuleEngine::evaluate`](crate::RuleEngine::evaluate).
///
/// Clones share the cancellation flag, so a host can keep one clone and cancel
/// an evaluation that is running with another.
#[derive(Debug, Clone)]
pub struct EvalContext {
    cancelled: Arc<watch::Sender<bool>>,
    deadline: Option<Instant>,
}

impl EvalContext {
    /// Creates a context with no deadline.
    #[must_use]
    pub fn new() -> Self {
        let (cancelled, _) = watch::channel(false);
        Self {
            cancelled: Arc::new(cancelled),
            deadline: None,
        }
    }

    /// Sets a deadline `timeout` from now and returns the updated context.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Sets an absolute deadline and returns the updated context.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels every evaluation observing this context.
    pub fn cancel(&self) {
        self.cancelled.send_replace(true);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Returns `true` once the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Fails fast when the context has already fired.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Cancelled`] or [`EngineError::DeadlineExceeded`].
    pub fn check(&self) -> EngineResult<()> {
        if self.is_cancelled() {
            Err(EngineError::Cancelled)
        } else if self.is_expired() {
            Err(EngineError::DeadlineExceeded)
        } else {
            Ok(())
        }
    }

    /// Resolves when the context is cancelled or its deadline passes, returning
    /// the matching error.
    pub async fn done(&self) -> EngineError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                () = self.wait_cancelled() => EngineError::Cancelled,
                () = tokio::time::sleep_until(deadline) => EngineError::DeadlineExceeded,
            },
            None => {
                self.wait_cancelled().await;
                EngineError::Cancelled
            }
        }
    }

    async fn wait_cancelled(&self) {
        let mut rx = self.cancelled.subscribe();
        loop {
            let fired = *rx.borrow_and_update();
            if fired {
                return;
            }
            // The sender lives as long as `self`, so this only fails if it is dropped.
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_is_shared_between_clones() {
        let ctx = EvalContext::new();
        let observer = ctx.clone();
        assert!(observer.check().is_ok());

        ctx.cancel();

        assert!(observer.is_cancelled());
        assert_eq!(observer.check(), Err(EngineError::Cancelled));
        assert_eq!(observer.done().await, EngineError::Cancelled);
    }

    #[tokio::test]
    async fn done_resolves_when_cancelled_later() {
        let ctx = EvalContext::new();
        let canceller = ctx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        assert_eq!(ctx.done().await, EngineError::Cancelled);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn deadline_expires() {
        let ctx = EvalContext::new().with_timeout(Duration::from_millis(5));

        assert_eq!(ctx.done().await, EngineError::DeadlineExceeded);
        assert!(ctx.is_expired());
        assert_eq!(ctx.check(), Err(EngineError::DeadlineExceeded));
    }

    #[test]
    fn earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = EvalContext::new()
            .with_deadline(now + Duration::from_secs(10))
            .with_deadline(now + Duration::from_secs(1));

        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(1)));
    }
}
