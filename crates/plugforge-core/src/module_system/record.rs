use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use libloading::Library;
use uuid::Uuid;

use crate::module_system::abi::{ExportKind, ExportedType};
use crate::module_system::capability::{Factory, Instance};
use crate::utils::fs::display_name;

/// Identifier of a canonical record in the module cache
pub type CacheId = Uuid;

/// Ownership of an opened module: its exported surface, its factories and
/// (for native modules) the library they live in.
pub struct ModuleHandle {
    exports: Vec<ExportedType>,
    // Declared before `library` so factories drop first.
    factories: HashMap<String, Factory>,
    library: Option<Library>,
}

impl ModuleHandle {
    pub fn new(exports: Vec<ExportedType>, factories: HashMap<String, Factory>) -> Self {
        Self {
            exports,
            factories,
            library: None,
        }
    }

    pub fn with_library(mut self, library: Library) -> Self {
        self.library = Some(library);
        self
    }

    pub fn exports(&self) -> &[ExportedType] {
        &self.exports
    }

    pub fn is_native(&self) -> bool {
        self.library.is_some()
    }

    /// Implementation names that provide `capability`, in export order.
    pub fn implementations_of(&self, capability: &str) -> Vec<&str> {
        self.exports
            .iter()
            .filter(|t| t.kind == ExportKind::Implementation)
            .filter(|t| t.implements.iter().any(|c| c == capability))
            .map(|t| t.name.as_str())
            .collect()
    }

    /// Instantiate `class_name` (or the first implementation of `capability`).
    pub fn instantiate(
        &self,
        capability: &str,
        class_name: Option<&str>,
        arguments: &[String],
    ) -> Result<Instance, String> {
        let candidates = self.implementations_of(capability);
        let class_name = match class_name {
            Some(name) if candidates.contains(&name) => name,
            Some(name) => {
                return Err(format!(
                    "type '{}' is not an exported implementation of '{}'",
                    name, capability
                ));
            }
            None => *candidates
                .first()
                .ok_or_else(|| format!("no exported implementation of '{}'", capability))?,
        };
        let factory = self
            .factories
            .get(class_name)
            .ok_or_else(|| format!("no factory registered for '{}'", class_name))?;
        (**factory)(arguments)
    }
}

impl Drop for ModuleHandle {
    fn drop(&mut self) {
        self.factories.clear();
        // Instances handed out may still run code from the library: never unmap it.
        if let Some(library) = self.library.take() {
            std::mem::forget(library);
        }
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("exports", &self.exports)
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .field("native", &self.library.is_some())
            .finish()
    }
}

/// One successfully opened module.
#[derive(Debug)]
pub struct LoadedModule {
    /// Assigned when the record becomes canonical
    pub cache_id: Option<CacheId>,
    pub file_path: PathBuf,
    pub display_name: String,
    /// Reported by the module during registration
    pub version: Option<String>,
    pub loaded_at: DateTime<Utc>,
    capability_types: Vec<String>,
    handle: ModuleHandle,
}

impl LoadedModule {
    pub fn new(file_path: impl Into<PathBuf>, handle: ModuleHandle) -> Self {
        let file_path = file_path.into();
        Self {
            cache_id: None,
            display_name: display_name(&file_path),
            file_path,
            version: None,
            loaded_at: Utc::now(),
            capability_types: Vec::new(),
            handle,
        }
    }

    /// Append capabilities, skipping ones already present; returns how many were new.
    pub fn add_capability_types<I, S>(&mut self, capabilities: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let before = self.capability_types.len();
        for capability in capabilities {
            let capability = capability.into();
            if !self.capability_types.contains(&capability) {
                self.capability_types.push(capability);
            }
        }
        self.capability_types.len() - before
    }

    pub fn capability_types(&self) -> &[String] {
        &self.capability_types
    }

    pub fn exposes(&self, capability: &str) -> bool {
        self.capability_types.iter().any(|c| c == capability)
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn handle(&self) -> &ModuleHandle {
        &self.handle
    }

    /// Sorted capability set, the second half of the cache's dedup key.
    pub fn capability_set(&self) -> Vec<&str> {
        let mut set: Vec<&str> = self.capability_types.iter().map(String::as_str).collect();
        set.sort_unstable();
        set
    }
}
