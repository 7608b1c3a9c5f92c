//! Error-carrying cancellation token.

use crate::error::MirError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Notify;

struct TokenInner {
    cancelled: AtomicBool,
    error: Mutex<Option<MirError>>,
    notify: Notify,
    deadline: Option<Instant>,
    disarmed: AtomicBool,
}

/// Cancellation signal with the error that caused it.
///
/// The first [`cancel`](CancelToken::cancel) wins; later calls leave the
/// recorded error untouched. Clones share state.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Token that cancels itself with [`MirError::DeadlineExceeded`] once
    /// `deadline` passes.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::build(Some(deadline))
    }

    fn build(deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                error: Mutex::new(None),
                notify: Notify::new(),
                deadline,
                disarmed: AtomicBool::new(false),
            }),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Stop the deadline from firing. Explicit cancels still apply.
    pub fn disarm(&self) {
        self.inner.disarmed.store(true, Ordering::SeqCst);
    }

    /// Record `err` and wake every waiter. Returns false if already cancelled.
    pub fn cancel(&self, err: MirError) -> bool {
        {
            let mut slot = self.inner.error.lock();
            if slot.is_some() {
                return false;
            }
            *slot = Some(err);
            self.inner.cancelled.store(true, Ordering::SeqCst);
        }
        self.inner.notify.notify_waiters();
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.expire_if_due();
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// The recorded cancellation error, if any.
    pub fn err(&self) -> Option<MirError> {
        self.expire_if_due();
        self.inner.error.lock().clone()
    }

    /// Resolves once the token is cancelled or its armed deadline passes.
    pub async fn cancelled(&self) {
        if let Some(deadline) = self.inner.deadline {
            tokio::select! {
                _ = self.notified() => return,
                _ = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)) => {}
            }
            if self.expire() {
                return;
            }
        }
        self.notified().await
    }

    async fn notified(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent cancel is not missed.
            notified.as_mut().enable();
            if self.inner.cancelled.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }

    /// Cancel with [`MirError::DeadlineExceeded`] unless disarmed.
    fn expire(&self) -> bool {
        if self.inner.disarmed.load(Ordering::SeqCst) {
            return false;
        }
        self.cancel(MirError::DeadlineExceeded);
        true
    }

    fn expire_if_due(&self) {
        if let Some(deadline) = self.inner.deadline {
            // tokio's clock so paused test time is honoured.
            let now = tokio::time::Instant::now().into_std();
            if !self.inner.cancelled.load(Ordering::SeqCst) && now >= deadline {
                self.expire();
            }
        }
    }
}
