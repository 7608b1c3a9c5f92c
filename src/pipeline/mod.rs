//! Parser/generator coordination: cancellation, completion and descriptor handoff.

pub mod cancel;
pub mod channel;
pub mod context;
pub mod latch;

pub use cancel::CancelToken;
pub use channel::{DescriptorReceiver, DescriptorSender, MAX_CAPACITY};
pub use context::{ExecutionContext, Phase};
pub use latch::{CompletionLatch, Stage};
