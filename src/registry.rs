//! Plugin registry
//!
//! Two name-keyed tables, one per capability. Registration is
//! last-write-wins and plugins with an empty name are skipped. The registry
//! is constructed by the driver and shared by reference; every table is
//! guarded by its own lock so registration and lookup may race freely.

use crate::error::{MirError, PluginKind};
use crate::plugin::{Generator, Parser, Plugin};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub const GENERATOR_GIN: &str = "gin";
pub const GENERATOR_CHI: &str = "chi";
pub const GENERATOR_MUX: &str = "mux";
pub const GENERATOR_ECHO: &str = "echo";
pub const GENERATOR_IRIS: &str = "iris";
pub const GENERATOR_FIBER: &str = "fiber";
pub const GENERATOR_MACARON: &str = "macaron";
pub const GENERATOR_HTTP_ROUTER: &str = "httprouter";

pub const PARSER_STRUCT_TAG: &str = "structTag";

/// Name-keyed table of one plugin capability.
pub struct PluginTable<P: ?Sized> {
    kind: PluginKind,
    default_name: String,
    entries: RwLock<HashMap<String, Arc<P>>>,
}

impl<P: ?Sized + Plugin> PluginTable<P> {
    pub fn new(kind: PluginKind, default_name: impl Into<String>) -> Self {
        Self {
            kind,
            default_name: default_name.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace the binding for the plugin's name.
    ///
    /// Returns false, leaving the table untouched, when the name is empty.
    pub fn register(&self, plugin: Arc<P>) -> bool {
        let name = plugin.name().to_string();
        if name.is_empty() {
            debug!(kind = %self.kind, "Skipping plugin with empty name");
            return false;
        }
        let replaced = self.entries.write().insert(name.clone(), plugin).is_some();
        debug!(kind = %self.kind, name = %name, replaced, "Registered plugin");
        true
    }

    pub fn get(&self, name: &str) -> Option<Arc<P>> {
        self.entries.read().get(name).cloned()
    }

    /// Like [`get`](Self::get) but reports a missing binding as an error.
    pub fn resolve(&self, name: &str) -> Result<Arc<P>, MirError> {
        self.get(name)
            .ok_or_else(|| MirError::plugin_not_found(self.kind, name))
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    pub fn default_plugin(&self) -> Option<Arc<P>> {
        self.get(&self.default_name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Parser and generator tables of one process.
pub struct PluginRegistry {
    parsers: PluginTable<dyn Parser>,
    generators: PluginTable<dyn Generator>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginRegistry {
    /// Empty registry defaulting to `structTag` and `gin`.
    pub fn new() -> Self {
        Self::with_defaults(PARSER_STRUCT_TAG, GENERATOR_GIN)
    }

    pub fn with_defaults(default_parser: &str, default_generator: &str) -> Self {
        Self {
            parsers: PluginTable::new(PluginKind::Parser, default_parser),
            generators: PluginTable::new(PluginKind::Generator, default_generator),
        }
    }

    pub fn parsers(&self) -> &PluginTable<dyn Parser> {
        &self.parsers
    }

    pub fn generators(&self) -> &PluginTable<dyn Generator> {
        &self.generators
    }

    /// Register parsers; empty-named ones are skipped. Returns how many were bound.
    pub fn register_parsers<I>(&self, parsers: I) -> usize
    where
        I: IntoIterator<Item = Arc<dyn Parser>>,
    {
        let mut bound = 0;
        for parser in parsers {
            if self.parsers.register(parser) {
                bound += 1;
            }
        }
        bound
    }

    /// Register generators; empty-named ones are skipped. Returns how many were bound.
    pub fn register_generators<I>(&self, generators: I) -> usize
    where
        I: IntoIterator<Item = Arc<dyn Generator>>,
    {
        let mut bound = 0;
        for generator in generators {
            if self.generators.register(generator) {
                bound += 1;
            }
        }
        bound
    }

    pub fn parser_by_name(&self, name: &str) -> Option<Arc<dyn Parser>> {
        self.parsers.get(name)
    }

    pub fn generator_by_name(&self, name: &str) -> Option<Arc<dyn Generator>> {
        self.generators.get(name)
    }

    pub fn default_parser(&self) -> Option<Arc<dyn Parser>> {
        self.parsers.default_plugin()
    }

    pub fn default_generator(&self) -> Option<Arc<dyn Generator>> {
        self.generators.default_plugin()
    }

    pub fn parser_names(&self) -> Vec<String> {
        self.parsers.names()
    }

    pub fn generator_names(&self) -> Vec<String> {
        self.generators.names()
    }
}
