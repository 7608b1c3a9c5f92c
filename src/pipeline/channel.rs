//! Directional descriptor endpoints.
//!
//! The parser only ever holds a [`DescriptorSender`] and the generator only a
//! [`DescriptorReceiver`]. Both observe the run's [`CancelToken`]; the
//! receiver also treats a finished parser with an empty buffer as end of
//! stream.

use crate::descriptor::Descriptor;
use crate::error::MirError;
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::latch::{CompletionLatch, Stage};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tracing::debug;

#[derive(Clone)]
pub(crate) enum QueueTx {
    Bounded(mpsc::Sender<Descriptor>),
    Unbounded(mpsc::UnboundedSender<Descriptor>),
}

pub(crate) enum QueueRx {
    Bounded(mpsc::Receiver<Descriptor>),
    Unbounded(mpsc::UnboundedReceiver<Descriptor>),
}

impl QueueRx {
    async fn recv(&mut self) -> Option<Descriptor> {
        match self {
            QueueRx::Bounded(rx) => rx.recv().await,
            QueueRx::Unbounded(rx) => rx.recv().await,
        }
    }

    fn try_recv(&mut self) -> Option<Descriptor> {
        match self {
            QueueRx::Bounded(rx) => rx.try_recv().ok(),
            QueueRx::Unbounded(rx) => rx.try_recv().ok(),
        }
    }
}

/// Largest bounded buffer tokio's channel can allocate permits for.
pub const MAX_CAPACITY: usize = Semaphore::MAX_PERMITS;

/// FIFO of the given capacity; 0 means unbounded. Larger than
/// [`MAX_CAPACITY`] is clamped.
pub(crate) fn descriptor_queue(capacity: usize) -> (QueueTx, QueueRx) {
    if capacity == 0 {
        let (tx, rx) = mpsc::unbounded_channel();
        (QueueTx::Unbounded(tx), QueueRx::Unbounded(rx))
    } else {
        let (tx, rx) = mpsc::channel(capacity.min(MAX_CAPACITY));
        (QueueTx::Bounded(tx), QueueRx::Bounded(rx))
    }
}

/// Send-only endpoint handed to the parser.
#[derive(Clone)]
pub struct DescriptorSender {
    tx: Option<QueueTx>,
    cancel: CancelToken,
    latch: CompletionLatch,
}

impl DescriptorSender {
    pub(crate) fn new(tx: Option<QueueTx>, cancel: CancelToken, latch: CompletionLatch) -> Self {
        Self { tx, cancel, latch }
    }

    /// Send one descriptor, waiting for buffer space.
    ///
    /// Fails with the cancellation error once the run is cancelled, and with
    /// [`MirError::ChannelClosed`] after the parser has signalled done.
    pub async fn send(&self, descriptor: Descriptor) -> Result<(), MirError> {
        if let Some(err) = self.cancel.err() {
            return Err(err);
        }
        let tx = match &self.tx {
            Some(tx) if !self.latch.is_done(Stage::Parser) => tx,
            _ => {
                debug!(type_name = %descriptor.type_name, "Send after parser done rejected");
                return Err(MirError::ChannelClosed);
            }
        };

        match tx {
            QueueTx::Unbounded(tx) => tx.send(descriptor).map_err(|_| MirError::ChannelClosed),
            QueueTx::Bounded(tx) => {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        Err(self.cancel.err().unwrap_or(MirError::ChannelClosed))
                    }
                    res = tx.send(descriptor) => res.map_err(|_| MirError::ChannelClosed),
                }
            }
        }
    }

    /// Send descriptors in order, stopping at the first failure.
    pub async fn send_all<I>(&self, descriptors: I) -> Result<usize, MirError>
    where
        I: IntoIterator<Item = Descriptor>,
    {
        let mut sent = 0;
        for descriptor in descriptors {
            self.send(descriptor).await?;
            sent += 1;
        }
        Ok(sent)
    }
}

/// Receive-only endpoint handed to the generator.
#[derive(Clone)]
pub struct DescriptorReceiver {
    rx: Arc<Mutex<QueueRx>>,
    cancel: CancelToken,
    latch: CompletionLatch,
}

impl DescriptorReceiver {
    pub(crate) fn new(rx: Arc<Mutex<QueueRx>>, cancel: CancelToken, latch: CompletionLatch) -> Self {
        Self { rx, cancel, latch }
    }

    /// Next descriptor in send order.
    ///
    /// Returns `None` when the parser has finished and the buffer is empty,
    /// or as soon as the run is cancelled. Descriptors still buffered at
    /// cancellation are abandoned.
    pub async fn recv(&self) -> Option<Descriptor> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let mut rx = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            guard = self.rx.lock() => guard,
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            descriptor = rx.recv() => descriptor,
            _ = self.latch.stage_done(Stage::Parser) => rx.try_recv(),
        }
    }
}
