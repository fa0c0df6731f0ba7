use std::collections::HashMap;
use std::fmt;

use crate::module_system::capability::{Factory, Instance};

/// An implementation compiled into the host process.
#[derive(Clone)]
pub struct BuiltinEntry {
    pub class_name: String,
    pub store_once: bool,
    factory: Factory,
}

impl BuiltinEntry {
    pub fn instantiate(&self, arguments: &[String]) -> Result<Instance, String> {
        (*self.factory)(arguments)
    }
}

impl fmt::Debug for BuiltinEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinEntry")
            .field("class_name", &self.class_name)
            .field("store_once", &self.store_once)
            .finish()
    }
}

/// Registration table: capability -> built-in implementations, in registration order.
#[derive(Debug, Default)]
pub struct BuiltinTable {
    entries: HashMap<String, Vec<BuiltinEntry>>,
}

impl BuiltinTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) `class_name` as a built-in implementation of `capability`.
    pub fn register(
        &mut self,
        capability: impl Into<String>,
        class_name: impl Into<String>,
        store_once: bool,
        factory: Factory,
    ) {
        let class_name = class_name.into();
        let entries = self.entries.entry(capability.into()).or_default();
        entries.retain(|e| e.class_name != class_name);
        entries.push(BuiltinEntry {
            class_name,
            store_once,
            factory,
        });
    }

    /// Named implementation, or the first one registered when `class_name` is `None`.
    pub fn find(&self, capability: &str, class_name: Option<&str>) -> Option<&BuiltinEntry> {
        let entries = self.entries.get(capability)?;
        match class_name {
            Some(name) => entries.iter().find(|e| e.class_name == name),
            None => entries.first(),
        }
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.entries.get(capability).is_some_and(|e| !e.is_empty())
    }

    pub fn capabilities(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
