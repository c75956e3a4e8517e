//! Context implementation for request-scoped cancellation
//!
//! This module provides the Context type which carries cancellation signals
//! and deadlines across async boundaries. A context is cancelled when it is
//! cancelled explicitly, when its deadline passes, or when Terraform asks the
//! provider to stop.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time;

/// Context carries request-scoped cancellation signals and timeouts
/// CRITICAL: Pass this as first parameter to ALL async trait methods
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    done_tx: watch::Sender<bool>,
    stop: Option<watch::Receiver<bool>>,
}

impl Context {
    pub fn new() -> Self {
        let (done_tx, _) = watch::channel(false);

        Self {
            inner: Arc::new(ContextInner {
                deadline: None,
                done_tx,
                stop: None,
            }),
        }
    }

    /// A fresh context that expires `timeout` from now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let (done_tx, _) = watch::channel(*self.inner.done_tx.borrow());

        Self {
            inner: Arc::new(ContextInner {
                deadline: Some(Instant::now() + timeout),
                done_tx,
                stop: self.inner.stop.clone(),
            }),
        }
    }

    /// Ties the context to the provider-wide stop signal
    pub fn with_stop(self, stop: watch::Receiver<bool>) -> Self {
        let (done_tx, _) = watch::channel(*self.inner.done_tx.borrow());

        Self {
            inner: Arc::new(ContextInner {
                deadline: self.inner.deadline,
                done_tx,
                stop: Some(stop),
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        if *self.inner.done_tx.borrow() {
            return true;
        }
        if self.inner.stop.as_ref().is_some_and(|rx| *rx.borrow()) {
            return true;
        }
        self.inner
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    pub fn cancel(&self) {
        self.inner.done_tx.send_replace(true);
    }

    /// Resolves once work done on behalf of this context should stop
    pub async fn cancelled(&self) {
        let mut done = self.inner.done_tx.subscribe();
        let mut stop = self.inner.stop.clone();

        let stop_signal = async {
            match stop.as_mut() {
                // A dropped sender can never signal, so wait forever
                Some(rx) => {
                    if rx.wait_for(|stopped| *stopped).await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        };

        let deadline = async {
            match self.inner.deadline {
                Some(deadline) => time::sleep_until(deadline.into()).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = done.wait_for(|cancelled| *cancelled) => {}
            _ = stop_signal => {}
            _ = deadline => {}
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
