//! Two-party completion latch.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::warn;

/// Side of the pipeline that signals completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parser,
    Generator,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Parser => write!(f, "parser"),
            Stage::Generator => write!(f, "generator"),
        }
    }
}

struct LatchInner {
    parser: AtomicBool,
    generator: AtomicBool,
    notify: Notify,
}

/// Completes once both the parser and the generator have signalled.
#[derive(Clone)]
pub struct CompletionLatch {
    inner: Arc<LatchInner>,
}

impl Default for CompletionLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionLatch {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(LatchInner {
                parser: AtomicBool::new(false),
                generator: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    fn flag(&self, stage: Stage) -> &AtomicBool {
        match stage {
            Stage::Parser => &self.inner.parser,
            Stage::Generator => &self.inner.generator,
        }
    }

    /// Mark `stage` done. A repeated signal is ignored and returns false.
    pub fn signal(&self, stage: Stage) -> bool {
        if self.flag(stage).swap(true, Ordering::SeqCst) {
            warn!(stage = %stage, "Duplicate completion signal ignored");
            return false;
        }
        self.inner.notify.notify_waiters();
        true
    }

    pub fn is_done(&self, stage: Stage) -> bool {
        self.flag(stage).load(Ordering::SeqCst)
    }

    pub fn is_complete(&self) -> bool {
        self.is_done(Stage::Parser) && self.is_done(Stage::Generator)
    }

    /// Resolves once `stage` has signalled.
    pub async fn stage_done(&self, stage: Stage) {
        self.wait_until(|latch| latch.is_done(stage)).await
    }

    /// Resolves once both stages have signalled.
    pub async fn complete(&self) {
        self.wait_until(CompletionLatch::is_complete).await
    }

    async fn wait_until(&self, ready: impl Fn(&Self) -> bool) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if ready(self) {
                return;
            }
            notified.await;
        }
    }
}
