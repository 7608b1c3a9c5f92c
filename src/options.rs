//! Run options
//!
//! An [`Options`] list holds small setter commands ([`InitOption`]), each
//! touching exactly one field. [`Options::init_opts`] starts from the default
//! snapshot and applies them left to right, so a later option overrides an
//! earlier one on the same field. The resulting [`InitOpts`] is read-only;
//! [`ParserOpts`] and [`GeneratorOpts`] are projections of it.

use crate::logging;
use crate::registry::{GENERATOR_GIN, PARSER_STRUCT_TAG};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default output directory for generated code.
pub const DEFAULT_SINK_PATH: &str = ".gen";

/// Default struct field tag key read by the parser.
pub const DEFAULT_TAG: &str = "mir";

/// Process mode of a generation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    #[default]
    Serial,
    SerialDebug,
    Concurrent,
    ConcurrentDebug,
}

impl RunMode {
    /// Parser and generator run as independent tasks.
    pub fn is_concurrent(self) -> bool {
        matches!(self, RunMode::Concurrent | RunMode::ConcurrentDebug)
    }

    /// Diagnostic output is enabled.
    pub fn is_debug(self) -> bool {
        matches!(self, RunMode::SerialDebug | RunMode::ConcurrentDebug)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let desc = match self {
            RunMode::Serial => "serial mode",
            RunMode::SerialDebug => "serial debug mode",
            RunMode::Concurrent => "concurrent mode",
            RunMode::ConcurrentDebug => "concurrent debug mode",
        };
        f.write_str(desc)
    }
}

/// Resolved configuration of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOpts {
    pub run_mode: RunMode,
    pub generator_name: String,
    pub parser_name: String,
    pub sink_path: PathBuf,
    pub default_tag: String,
    pub none_query: bool,
    pub cleanup: bool,
}

impl Default for InitOpts {
    fn default() -> Self {
        Self {
            run_mode: RunMode::Serial,
            generator_name: GENERATOR_GIN.to_string(),
            parser_name: PARSER_STRUCT_TAG.to_string(),
            sink_path: PathBuf::from(DEFAULT_SINK_PATH),
            default_tag: DEFAULT_TAG.to_string(),
            none_query: false,
            cleanup: true,
        }
    }
}

impl InitOpts {
    /// Options a parser is initialized with
    pub fn parser_opts(&self) -> ParserOpts {
        ParserOpts {
            default_tag: self.default_tag.clone(),
            none_query: self.none_query,
        }
    }

    /// Options a generator is initialized with
    pub fn generator_opts(&self) -> GeneratorOpts {
        GeneratorOpts {
            sink_path: self.sink_path.clone(),
            cleanup: self.cleanup,
        }
    }
}

/// Parser view of [`InitOpts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOpts {
    /// Struct field tag key carrying route information
    pub default_tag: String,
    /// Skip query-string parsing
    pub none_query: bool,
}

/// Generator view of [`InitOpts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOpts {
    /// Directory generated code is written to
    pub sink_path: PathBuf,
    /// Remove previous output before writing
    pub cleanup: bool,
}

/// A single field setter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOption {
    RunMode(RunMode),
    GeneratorName(String),
    ParserName(String),
    SinkPath(PathBuf),
    DefaultTag(String),
    NoneQuery(bool),
    Cleanup(bool),
}

impl InitOption {
    fn apply(&self, opts: &mut InitOpts) {
        match self {
            InitOption::RunMode(mode) => opts.run_mode = *mode,
            InitOption::GeneratorName(name) => opts.generator_name = name.clone(),
            InitOption::ParserName(name) => opts.parser_name = name.clone(),
            InitOption::SinkPath(path) => opts.sink_path = path.clone(),
            InitOption::DefaultTag(tag) => opts.default_tag = tag.clone(),
            InitOption::NoneQuery(enable) => opts.none_query = *enable,
            InitOption::Cleanup(enable) => opts.cleanup = *enable,
        }
    }
}

/// Set run mode
pub fn run_mode(mode: RunMode) -> InitOption {
    InitOption::RunMode(mode)
}

/// Set generator name
pub fn generator_name(name: impl Into<String>) -> InitOption {
    InitOption::GeneratorName(name.into())
}

/// Set parser name
pub fn parser_name(name: impl Into<String>) -> InitOption {
    InitOption::ParserName(name.into())
}

/// Set generated code output directory
pub fn sink_path(path: impl Into<PathBuf>) -> InitOption {
    InitOption::SinkPath(path.into())
}

/// Set whether the generator cleans its output before regenerating
pub fn cleanup(enable: bool) -> InitOption {
    InitOption::Cleanup(enable)
}

/// Set whether the parser skips query parsing
pub fn none_query(enable: bool) -> InitOption {
    InitOption::NoneQuery(enable)
}

/// Set the parser's default struct field tag key
pub fn default_tag(tag: impl Into<String>) -> InitOption {
    InitOption::DefaultTag(tag.into())
}

/// Ordered list of setters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options(Vec<InitOption>);

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a setter; it overrides every earlier setter on the same field.
    pub fn with(mut self, option: InitOption) -> Self {
        self.0.push(option);
        self
    }

    pub fn push(&mut self, option: InitOption) {
        self.0.push(option);
    }

    /// Append all setters of `other` after the current ones.
    pub fn extend(&mut self, other: Options) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InitOption> {
        self.0.iter()
    }

    /// Apply every setter in order over the default snapshot.
    pub fn init_opts(&self) -> InitOpts {
        self.0.iter().fold(InitOpts::default(), |mut opts, option| {
            option.apply(&mut opts);
            opts
        })
    }
}

impl From<Vec<InitOption>> for Options {
    fn from(options: Vec<InitOption>) -> Self {
        Options(options)
    }
}

impl FromIterator<InitOption> for Options {
    fn from_iter<I: IntoIterator<Item = InitOption>>(iter: I) -> Self {
        Options(iter.into_iter().collect())
    }
}

/// Resolve the options of a run and set the diagnostic gate from its mode.
pub fn init_from(options: Option<&Options>) -> InitOpts {
    let opts = options.map(Options::init_opts).unwrap_or_default();
    logging::set_debug(opts.run_mode.is_debug());
    opts
}
