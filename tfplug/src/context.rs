//! Context implementation for request-scoped data and cancellation
//!
//! Every resource and data source operation receives a `Context`. It carries
//! an optional deadline, a cancellation signal and a small typed value bag.
//! Long running work (HTTP calls) should be wrapped with [`Context::run`] so
//! it stops when the deadline passes or Terraform asks the provider to stop.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};

/// Context carries request-scoped values like cancellation signals, timeouts, and metadata
/// Pass this as first parameter to all async trait methods
#[derive(Clone)]
pub struct Context {
    deadline: Option<Instant>,
    values: Arc<RwLock<HashMap<String, Box<dyn Any + Send + Sync>>>>,
    done: watch::Receiver<bool>,
    done_tx: Arc<watch::Sender<bool>>,
}

/// Why a guarded future did not complete
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("context deadline exceeded")]
    DeadlineExceeded,
    #[error("context cancelled")]
    Cancelled,
}

impl Context {
    pub fn new() -> Self {
        let (done_tx, done_rx) = watch::channel(false);

        Self {
            deadline: None,
            values: Arc::new(RwLock::new(HashMap::new())),
            done: done_rx,
            done_tx: Arc::new(done_tx),
        }
    }

    /// Derive a context that expires after `timeout`. An earlier deadline
    /// on the parent wins. Values and cancellation are shared with the parent.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };

        Self {
            deadline: Some(deadline),
            ..self
        }
    }

    pub async fn with_value<T: Send + Sync + 'static>(self, key: &str, value: T) -> Self {
        let mut values = self.values.write().await;
        values.insert(key.to_string(), Box::new(value));
        drop(values);
        self
    }

    pub async fn get_value<T>(&self, key: &str) -> Option<T>
    where
        T: Send + Sync + Clone + 'static,
    {
        let values = self.values.read().await;
        values.get(key).and_then(|v| v.downcast_ref::<T>()).cloned()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.done.borrow() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when there is no deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Returns a receiver that flips to `true` on cancellation
    pub fn done(&self) -> watch::Receiver<bool> {
        self.done.clone()
    }

    pub fn cancel(&self) {
        let _ = self.done_tx.send(true);
    }

    /// Drive `fut` to completion unless the context is cancelled or its
    /// deadline passes first.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, ContextError>
    where
        F: Future,
    {
        if *self.done.borrow() {
            return Err(ContextError::Cancelled);
        }

        let mut done = self.done.clone();
        let cancelled = async move {
            while done.changed().await.is_ok() {
                if *done.borrow() {
                    return;
                }
            }
            // Sender dropped without cancelling: never resolve
            std::future::pending::<()>().await
        };

        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            output = fut => Ok(output),
            _ = cancelled => Err(ContextError::Cancelled),
            _ = expired => Err(ContextError::DeadlineExceeded),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn context_stores_and_retrieves_values() {
        let ctx = Context::new();
        let ctx = ctx.with_value("request_id", "abc123".to_string()).await;

        let value: Option<String> = ctx.get_value("request_id").await;
        assert_eq!(value, Some("abc123".to_string()));
    }

    #[tokio::test]
    async fn context_timeout_cancels() {
        let ctx = Context::new().with_timeout(Duration::from_millis(50));

        assert!(!ctx.is_cancelled());
        sleep(Duration::from_millis(80)).await;
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn context_manual_cancel_is_shared_with_children() {
        let ctx = Context::new();
        let child = ctx.clone().with_timeout(Duration::from_secs(60));

        ctx.cancel();

        assert!(ctx.is_cancelled());
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn earlier_parent_deadline_wins() {
        let parent = Context::new().with_timeout(Duration::from_secs(1));
        let parent_deadline = parent.deadline();
        let child = parent.with_timeout(Duration::from_secs(30));

        assert_eq!(child.deadline(), parent_deadline);
        assert!(child.remaining().is_some());
    }

    #[tokio::test]
    async fn run_completes_fast_futures() {
        let ctx = Context::new().with_timeout(Duration::from_secs(5));
        let out = ctx.run(async { 7 }).await;
        assert_eq!(out, Ok(7));
    }

    #[tokio::test]
    async fn run_stops_at_deadline() {
        let ctx = Context::new().with_timeout(Duration::from_millis(20));
        let out = ctx.run(sleep(Duration::from_secs(5))).await;
        assert_eq!(out, Err(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let ctx = Context::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let out = ctx.run(sleep(Duration::from_secs(5))).await;
        assert_eq!(out, Err(ContextError::Cancelled));
    }
}
