//! Cooperative cancellation for `BarkService::send`.
//!
//! The send loop checks its context before each endpoint and races the
//! in-flight request against `SendContext::done`, so a cancel or an expired
//! deadline also abandons a request that is still waiting on the relay.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::CancelReason;

/// Cancellation flag plus an optional deadline.
///
/// Clones share the flag, so one copy can be handed to another task and
/// cancelled there while the original is passed to `send`.
#[derive(Debug, Clone)]
pub struct SendContext {
    cancelled: Arc<watch::Sender<bool>>,
    deadline: Option<Instant>,
}

impl Default for SendContext {
    fn default() -> Self {
        Self {
            cancelled: Arc::new(watch::Sender::new(false)),
            deadline: None,
        }
    }
}

impl SendContext {
    /// A context that is never done unless cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::default()
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.cancelled.send_replace(true);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Why the context is done, or `None` while it is still live. Explicit
    /// cancellation wins over an expired deadline.
    pub fn err(&self) -> Option<CancelReason> {
        if *self.cancelled.borrow() {
            return Some(CancelReason::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> CancelReason {
        let mut rx = self.cancelled.subscribe();
        let cancelled = async move {
            // The sender lives as long as `self`, so this only returns on cancel.
            if rx.wait_for(|c| *c).await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = cancelled => CancelReason::Cancelled,
                _ = tokio::time::sleep_until(deadline) => CancelReason::DeadlineExceeded,
            },
            None => {
                cancelled.await;
                CancelReason::Cancelled
            }
        }
    }
}
