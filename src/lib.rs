//! Mir: pluggable router code generation
//!
//! A parser turns route-description entries into [`Descriptor`]s and a
//! generator renders them into router registration code. Both are plugins
//! looked up by name in a [`PluginRegistry`]; an [`Engine`] drives one run,
//! either serially or with the two stages running as concurrent tasks joined
//! by an [`ExecutionContext`].

pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod logging;
pub mod options;
pub mod pipeline;
pub mod plugin;
pub mod registry;

pub use descriptor::{Descriptor, Descriptors, Entry, FieldDescriptor};
pub use engine::Engine;
pub use error::{MirError, PluginKind};
pub use options::{InitOption, InitOpts, Options, RunMode};
pub use pipeline::ExecutionContext;
pub use plugin::{Generator, Parser, Plugin};
pub use registry::PluginRegistry;

#[doc(hidden)]
pub mod __private {
    pub use tracing;
}
