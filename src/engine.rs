//! Generation engine: resolves plugins and drives one run.
//!
//! Serial modes parse then generate on the caller's task. Concurrent modes
//! run the two stages as separate tokio tasks connected by one
//! [`ExecutionContext`]; the outcome is whatever [`ExecutionContext::wait`]
//! reports.

use crate::config::MirConfig;
use crate::descriptor::Entry;
use crate::error::{MirError, PluginKind};
use crate::logus;
use crate::options::{init_from, InitOpts, Options};
use crate::pipeline::{ExecutionContext, Stage};
use crate::plugin::{Generator, Parser};
use crate::registry::PluginRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Driver of generation runs over a shared [`PluginRegistry`].
pub struct Engine {
    registry: Arc<PluginRegistry>,
    capacity: usize,
    timeout: Option<Duration>,
}

impl Engine {
    pub const DEFAULT_CAPACITY: usize = 10;

    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self {
            registry,
            capacity: Self::DEFAULT_CAPACITY,
            timeout: None,
        }
    }

    /// Engine sized from the `generation` section of a loaded config.
    pub fn from_config(registry: Arc<PluginRegistry>, config: &MirConfig) -> Self {
        let engine = Self::new(registry).with_capacity(config.generation.channel_capacity);
        match config.generation.timeout_secs {
            Some(secs) => engine.with_timeout(Duration::from_secs(secs)),
            None => engine,
        }
    }

    /// Descriptor buffer size of each run (0: unbounded).
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Cancel runs that take longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Run the configured parser and generator over `entries`.
    pub async fn generate(
        &self,
        entries: Vec<Entry>,
        options: Option<&Options>,
    ) -> Result<(), MirError> {
        let opts = init_from(options);
        let (parser, generator) = self.prepare(&opts)?;

        info!(
            parser = %opts.parser_name,
            generator = %opts.generator_name,
            run_mode = %opts.run_mode,
            entries = entries.len(),
            "Generation started"
        );
        logus!("run in {} with {} entries", opts.run_mode, entries.len());

        let ctx = self.context();
        let outcome = if opts.run_mode.is_concurrent() {
            run_concurrent(ctx, parser, generator, entries).await
        } else {
            run_serial(ctx, parser.as_ref(), generator.as_ref(), entries).await
        };

        match &outcome {
            Ok(()) => info!("Generation completed"),
            Err(err) => warn!(error = %err, "Generation failed"),
        }
        outcome
    }

    /// Resolve and initialize fresh clones of the selected plugins.
    fn prepare(&self, opts: &InitOpts) -> Result<(Box<dyn Parser>, Box<dyn Generator>), MirError> {
        let mut parser = self
            .registry
            .parser_by_name(&opts.parser_name)
            .ok_or_else(|| MirError::plugin_not_found(PluginKind::Parser, &opts.parser_name))?
            .clone_parser();
        let mut generator = self
            .registry
            .generator_by_name(&opts.generator_name)
            .ok_or_else(|| {
                MirError::plugin_not_found(PluginKind::Generator, &opts.generator_name)
            })?
            .clone_generator();

        parser.init(&opts.parser_opts())?;
        generator.init(&opts.generator_opts())?;
        logus!("initialized parser {} and generator {}", parser.name(), generator.name());
        Ok((parser, generator))
    }

    fn context(&self) -> ExecutionContext {
        match self.timeout {
            Some(timeout) => ExecutionContext::with_timeout(self.capacity, timeout),
            None => ExecutionContext::new(self.capacity),
        }
    }
}

async fn run_serial(
    ctx: ExecutionContext,
    parser: &dyn Parser,
    generator: &dyn Generator,
    entries: Vec<Entry>,
) -> Result<(), MirError> {
    let result = parser.parse(&entries).and_then(|descriptors| {
        logus!("parsed {} descriptors", descriptors.len());
        generator.generate(&descriptors)
    });
    if let Err(err) = result {
        ctx.cancel(err);
    }
    ctx.parser_done();
    ctx.generator_done();
    ctx.wait().await
}

async fn run_concurrent(
    ctx: ExecutionContext,
    parser: Box<dyn Parser>,
    generator: Box<dyn Generator>,
    entries: Vec<Entry>,
) -> Result<(), MirError> {
    let parser_task = {
        let ctx = ctx.clone();
        tokio::spawn(async move { parser.parse_context(ctx, entries).await })
    };
    let generator_task = {
        let ctx = ctx.clone();
        tokio::spawn(async move { generator.generate_context(ctx).await })
    };
    let parser_watch = tokio::spawn(supervise(ctx.clone(), Stage::Parser, parser_task));
    let generator_watch = tokio::spawn(supervise(ctx.clone(), Stage::Generator, generator_task));

    let outcome = ctx.wait().await;
    if outcome.is_ok() {
        // Both sides signalled; let their tasks unwind before reporting.
        let _ = tokio::join!(parser_watch, generator_watch);
    }
    outcome
}

/// Turn a panicking or silent stage into a terminal context state.
async fn supervise(ctx: ExecutionContext, stage: Stage, task: JoinHandle<()>) {
    if let Err(err) = task.await {
        warn!(stage = %stage, error = %err, "Stage task failed");
        ctx.cancel(MirError::StagePanicked(format!("{}: {}", stage, err)));
    }
    if !ctx.is_stage_done(stage) {
        debug!(stage = %stage, "Stage exited without signalling done");
        match stage {
            Stage::Parser => ctx.parser_done(),
            Stage::Generator => ctx.generator_done(),
        }
    }
}
