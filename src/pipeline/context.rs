//! Execution context shared by one parser and one generator for one run.
//!
//! Composes a [`CancelToken`], a [`CompletionLatch`] and the descriptor
//! queue. The context moves `Created -> Running -> {Completed | Cancelled}`;
//! both terminal phases are stable, so a cancel after completion is ignored
//! and done signals after cancellation never turn a run into a success.

use crate::error::MirError;
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::channel::{
    descriptor_queue, DescriptorReceiver, DescriptorSender, QueueRx, QueueTx, MAX_CAPACITY,
};
use crate::pipeline::latch::{CompletionLatch, Stage};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Lifecycle phase of an [`ExecutionContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Running,
    Completed,
    Cancelled,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Cancelled)
    }
}

struct ContextInner {
    capacity: usize,
    cancel: CancelToken,
    latch: CompletionLatch,
    phase: Mutex<Phase>,
    tx: Mutex<Option<QueueTx>>,
    rx: Arc<tokio::sync::Mutex<QueueRx>>,
}

/// Coordination object for one generation run. Clones share state.
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

impl ExecutionContext {
    /// Context whose descriptor queue buffers `capacity` items (0: unbounded).
    pub fn new(capacity: usize) -> Self {
        Self::build(capacity, CancelToken::new())
    }

    /// Context that cancels itself with [`MirError::DeadlineExceeded`] at `deadline`.
    pub fn with_deadline(capacity: usize, deadline: Instant) -> Self {
        Self::build(capacity, CancelToken::with_deadline(deadline))
    }

    pub fn with_timeout(capacity: usize, timeout: Duration) -> Self {
        Self::with_deadline(capacity, tokio::time::Instant::now().into_std() + timeout)
    }

    fn build(capacity: usize, cancel: CancelToken) -> Self {
        let capacity = if capacity > MAX_CAPACITY {
            warn!(requested = capacity, max = MAX_CAPACITY, "Descriptor buffer capacity clamped");
            MAX_CAPACITY
        } else {
            capacity
        };
        let (tx, rx) = descriptor_queue(capacity);
        Self {
            inner: Arc::new(ContextInner {
                capacity,
                cancel,
                latch: CompletionLatch::new(),
                phase: Mutex::new(Phase::Created),
                tx: Mutex::new(Some(tx)),
                rx: Arc::new(tokio::sync::Mutex::new(rx)),
            }),
        }
    }

    /// Buffer capacity fixed at creation.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.cancel.deadline()
    }

    /// Receive endpoint for the generator and send endpoint for the parser.
    pub fn pipe(&self) -> (DescriptorReceiver, DescriptorSender) {
        (self.receiver(), self.sender())
    }

    pub fn sender(&self) -> DescriptorSender {
        self.mark_running();
        DescriptorSender::new(
            self.inner.tx.lock().clone(),
            self.inner.cancel.clone(),
            self.inner.latch.clone(),
        )
    }

    pub fn receiver(&self) -> DescriptorReceiver {
        self.mark_running();
        DescriptorReceiver::new(
            self.inner.rx.clone(),
            self.inner.cancel.clone(),
            self.inner.latch.clone(),
        )
    }

    /// Cancel the run with `err`.
    ///
    /// Only the first call records its error. Returns false when the context
    /// was already cancelled or had completed.
    pub fn cancel(&self, err: MirError) -> bool {
        let mut phase = self.inner.phase.lock();
        if phase.is_terminal() {
            debug!(phase = ?*phase, error = %err, "Cancel on finished context ignored");
            return false;
        }
        if !self.inner.cancel.cancel(err.clone()) {
            // Deadline fired first; its error stands.
            *phase = Phase::Cancelled;
            return false;
        }
        *phase = Phase::Cancelled;
        debug!(error = %err, "Context cancelled");
        true
    }

    /// Parser side finished producing. Closes the queue for new sends.
    pub fn parser_done(&self) {
        self.signal(Stage::Parser);
        self.inner.tx.lock().take();
    }

    /// Generator side finished consuming.
    pub fn generator_done(&self) {
        self.signal(Stage::Generator);
    }

    fn signal(&self, stage: Stage) {
        let mut phase = self.inner.phase.lock();
        if !self.inner.latch.signal(stage) {
            return;
        }
        if *phase == Phase::Created {
            *phase = Phase::Running;
        }
        if self.inner.latch.is_complete() && !phase.is_terminal() {
            *phase = if self.inner.cancel.is_cancelled() {
                Phase::Cancelled
            } else {
                self.inner.cancel.disarm();
                Phase::Completed
            };
        }
        debug!(stage = %stage, phase = ?*phase, "Stage done");
    }

    /// Whether `stage` has signalled done.
    pub fn is_stage_done(&self, stage: Stage) -> bool {
        self.inner.latch.is_done(stage)
    }

    fn mark_running(&self) {
        let mut phase = self.inner.phase.lock();
        if *phase == Phase::Created {
            *phase = Phase::Running;
        }
    }

    /// Current phase. A passed deadline is observed here.
    pub fn phase(&self) -> Phase {
        let mut phase = self.inner.phase.lock();
        if !phase.is_terminal() && self.inner.cancel.is_cancelled() {
            *phase = Phase::Cancelled;
        }
        *phase
    }

    pub fn is_cancelled(&self) -> bool {
        self.phase() == Phase::Cancelled
    }

    /// Cancellation error, if the run was cancelled.
    pub fn err(&self) -> Option<MirError> {
        match self.phase() {
            Phase::Cancelled => self.inner.cancel.err(),
            _ => None,
        }
    }

    /// Resolves once the run is cancelled. Never resolves for a run that
    /// completed normally.
    pub async fn cancelled(&self) {
        loop {
            match self.phase() {
                Phase::Cancelled => return,
                Phase::Completed => return std::future::pending().await,
                Phase::Created | Phase::Running => {
                    tokio::select! {
                        _ = self.inner.latch.complete() => {}
                        _ = self.inner.cancel.cancelled() => {}
                    }
                }
            }
        }
    }

    /// Wait until both stages are done or the run is cancelled.
    pub async fn wait(&self) -> Result<(), MirError> {
        loop {
            match self.phase() {
                Phase::Completed => return Ok(()),
                Phase::Cancelled => {
                    return match self.inner.cancel.err() {
                        Some(err) => Err(err),
                        None => {
                            warn!("Cancelled context without recorded error");
                            Err(MirError::ChannelClosed)
                        }
                    };
                }
                Phase::Created | Phase::Running => {
                    tokio::select! {
                        _ = self.inner.latch.complete() => {}
                        _ = self.inner.cancel.cancelled() => {}
                    }
                }
            }
        }
    }
}
