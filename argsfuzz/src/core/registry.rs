//! Named plugin generators for `custom` values and per-argument overrides.

use std::collections::BTreeMap;

use rand::RngCore;

use crate::document::Params;

/// A plugin: draws from the shared random stream and renders one token.
pub type GeneratorFn = fn(&mut dyn RngCore, &Params) -> String;

/// Name → generator table, built once at startup and passed by reference.
#[derive(Debug, Clone, Default)]
pub struct GeneratorRegistry {
    generators: BTreeMap<String, GeneratorFn>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in plugins.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::plugins::register_builtins(&mut registry);
        registry
    }

    /// Register `generator` under `name`, returning any generator it replaces.
    pub fn register(&mut self, name: impl Into<String>, generator: GeneratorFn) -> Option<GeneratorFn> {
        self.generators.insert(name.into(), generator)
    }

    pub fn lookup(&self, name: &str) -> Option<GeneratorFn> {
        self.generators.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.generators.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}
