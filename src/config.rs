//! Configuration System
//!
//! Layered configuration on top of the `config` crate. Sources, lowest
//! precedence first: built-in defaults, an optional TOML file, then
//! `MIR_`-prefixed environment variables (`MIR_GENERATION__RUN_MODE`,
//! `MIR_LOGGING__LEVEL`, ...). The `generation` section converts into an
//! [`Options`] list so file and environment values go through the same
//! last-writer-wins setters as options passed in code.

use crate::error::MirError;
use crate::logging::LoggingConfig;
use crate::options::{self, Options, RunMode};
use crate::pipeline::MAX_CAPACITY;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirConfig {
    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Generation settings. Unset fields keep the option defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub run_mode: Option<RunMode>,

    #[serde(default)]
    pub parser: Option<String>,

    #[serde(default)]
    pub generator: Option<String>,

    #[serde(default)]
    pub sink_path: Option<PathBuf>,

    #[serde(default)]
    pub default_tag: Option<String>,

    #[serde(default)]
    pub none_query: Option<bool>,

    #[serde(default)]
    pub cleanup: Option<bool>,

    /// Descriptor buffer size (0: unbounded)
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Cancel a run after this many seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_channel_capacity() -> usize {
    10
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            run_mode: None,
            parser: None,
            generator: None,
            sink_path: None,
            default_tag: None,
            none_query: None,
            cleanup: None,
            channel_capacity: default_channel_capacity(),
            timeout_secs: None,
        }
    }
}

impl GenerationConfig {
    /// One setter per configured field.
    pub fn options(&self) -> Options {
        let mut opts = Options::new();
        if let Some(mode) = self.run_mode {
            opts.push(options::run_mode(mode));
        }
        if let Some(name) = &self.parser {
            opts.push(options::parser_name(name.clone()));
        }
        if let Some(name) = &self.generator {
            opts.push(options::generator_name(name.clone()));
        }
        if let Some(path) = &self.sink_path {
            opts.push(options::sink_path(path.clone()));
        }
        if let Some(tag) = &self.default_tag {
            opts.push(options::default_tag(tag.clone()));
        }
        if let Some(enable) = self.none_query {
            opts.push(options::none_query(enable));
        }
        if let Some(enable) = self.cleanup {
            opts.push(options::cleanup(enable));
        }
        opts
    }

    pub fn validate(&self) -> Result<(), String> {
        if matches!(&self.parser, Some(name) if name.is_empty()) {
            return Err("Parser name cannot be empty".to_string());
        }
        if matches!(&self.generator, Some(name) if name.is_empty()) {
            return Err("Generator name cannot be empty".to_string());
        }
        if matches!(&self.sink_path, Some(path) if path.as_os_str().is_empty()) {
            return Err("Sink path cannot be empty".to_string());
        }
        if self.channel_capacity > MAX_CAPACITY {
            return Err(format!(
                "Channel capacity {} exceeds maximum {}",
                self.channel_capacity, MAX_CAPACITY
            ));
        }
        if self.timeout_secs == Some(0) {
            return Err("Timeout must be at least one second".to_string());
        }
        Ok(())
    }
}

impl MirConfig {
    /// Configured setters followed by `overrides`, which win on conflict.
    pub fn options_with(&self, overrides: Options) -> Options {
        let mut opts = self.generation.options();
        opts.extend(overrides);
        opts
    }

    pub fn validate(&self) -> Result<(), MirError> {
        self.generation
            .validate()
            .map_err(|e| MirError::Config(format!("generation: {}", e)))
    }
}

/// Loads [`MirConfig`] from file and environment.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults plus environment.
    pub fn load() -> Result<MirConfig, MirError> {
        Self::build(None)
    }

    /// Defaults, the TOML file at `path`, then environment.
    pub fn load_from_file(path: &Path) -> Result<MirConfig, MirError> {
        if !path.exists() {
            return Err(MirError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        Self::build(Some(path))
    }

    fn build(path: Option<&Path>) -> Result<MirConfig, MirError> {
        let mut builder = Config::builder()
            .set_default("generation.channel_capacity", default_channel_capacity() as i64)?;

        if let Some(path) = path {
            debug!(config_path = %path.display(), "Loading config file");
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("MIR")
                .prefix_separator("_")
                .separator("__"),
        );

        let config: MirConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
