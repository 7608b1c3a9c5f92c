//! Parser and generator capabilities.
//!
//! A plugin is registered once under its [`Plugin::name`] and cloned per run;
//! the clone is initialized with its projected options and then driven
//! either in batch (serial modes) or as a streaming task over an
//! [`ExecutionContext`] (concurrent modes).

use crate::descriptor::{Descriptor, Descriptors, Entry};
use crate::error::MirError;
use crate::options::{GeneratorOpts, ParserOpts};
use crate::pipeline::ExecutionContext;
use async_trait::async_trait;

/// Anything registrable by name.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;
}

/// Turns route-description entries into descriptors.
#[async_trait]
pub trait Parser: Plugin {
    /// One-time setup for a run.
    fn init(&mut self, opts: &ParserOpts) -> Result<(), MirError>;

    /// Batch parse.
    fn parse(&self, entries: &[Entry]) -> Result<Descriptors, MirError>;

    /// Streaming parse: send descriptors through the context, cancel it on
    /// failure and signal `parser_done` exactly once on exit.
    ///
    /// The default runs [`Parser::parse`] and forwards the batch in order.
    async fn parse_context(&self, ctx: ExecutionContext, entries: Vec<Entry>) {
        let tx = ctx.sender();
        match self.parse(&entries) {
            Ok(descriptors) => {
                if let Err(err) = tx.send_all(descriptors).await {
                    ctx.cancel(err);
                }
            }
            Err(err) => {
                ctx.cancel(err);
            }
        }
        ctx.parser_done();
    }

    /// Independent instance for a fresh run.
    fn clone_parser(&self) -> Box<dyn Parser>;
}

/// Renders descriptors into router registration code.
#[async_trait]
pub trait Generator: Plugin {
    /// One-time setup for a run.
    fn init(&mut self, opts: &GeneratorOpts) -> Result<(), MirError>;

    /// Batch generate.
    fn generate(&self, descriptors: &[Descriptor]) -> Result<(), MirError>;

    /// Streaming generate: read descriptors until the stream ends or the run
    /// is cancelled, cancel on failure and signal `generator_done` exactly
    /// once on exit.
    ///
    /// The default collects the stream and hands it to [`Generator::generate`].
    async fn generate_context(&self, ctx: ExecutionContext) {
        let rx = ctx.receiver();
        let mut descriptors = Descriptors::new();
        while let Some(descriptor) = rx.recv().await {
            descriptors.push(descriptor);
        }
        if !ctx.is_cancelled() {
            if let Err(err) = self.generate(&descriptors) {
                ctx.cancel(err);
            }
        }
        ctx.generator_done();
    }

    /// Independent instance for a fresh run.
    fn clone_generator(&self) -> Box<dyn Generator>;
}
