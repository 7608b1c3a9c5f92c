//! Error types for the mir generation pipeline.

use std::fmt;
use thiserror::Error;

/// Which plugin table a lookup or registration targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginKind {
    Parser,
    Generator,
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginKind::Parser => write!(f, "parser"),
            PluginKind::Generator => write!(f, "generator"),
        }
    }
}

/// Pipeline errors.
///
/// Cloneable so that the single error recorded by a cancelled run can be
/// handed back from every `wait` call unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MirError {
    #[error("{kind} not found: {name}")]
    PluginNotFound { kind: PluginKind, name: String },

    #[error("Failed to initialize {plugin}: {message}")]
    Init { plugin: String, message: String },

    #[error("Parse failed: {0}")]
    Parse(String),

    #[error("Generate failed: {0}")]
    Generate(String),

    #[error("Context deadline exceeded")]
    DeadlineExceeded,

    #[error("Descriptor channel closed")]
    ChannelClosed,

    #[error("Stage panicked: {0}")]
    StagePanicked(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MirError {
    pub fn plugin_not_found(kind: PluginKind, name: impl Into<String>) -> Self {
        MirError::PluginNotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn init(plugin: impl Into<String>, message: impl fmt::Display) -> Self {
        MirError::Init {
            plugin: plugin.into(),
            message: message.to_string(),
        }
    }
}

impl From<config::ConfigError> for MirError {
    fn from(err: config::ConfigError) -> Self {
        MirError::Config(err.to_string())
    }
}
