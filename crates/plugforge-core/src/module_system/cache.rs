//! # Module Cache
//!
//! Canonical [`LoadedModule`] records, partitioned by [`Scope`] and kept in
//! insertion order. Records are never evicted.
//!
//! Two records are the same module when they share a file path, display name
//! and set of capabilities; adding such a record again is a no-op.
use std::path::Path;
use std::sync::Arc;

use log::debug;

use crate::module_system::diagnostics::DiagnosticsLedger;
use crate::module_system::error::ModuleSystemError;
use crate::module_system::record::{CacheId, LoadedModule};
use crate::module_system::scope::Scope;

#[derive(Debug)]
pub struct ModuleCache {
    local: Vec<LoadedModule>,
    application: Vec<LoadedModule>,
    diagnostics: Arc<DiagnosticsLedger>,
}

impl ModuleCache {
    pub fn new(diagnostics: Arc<DiagnosticsLedger>) -> Self {
        Self {
            local: Vec::new(),
            application: Vec::new(),
            diagnostics,
        }
    }

    fn records(&self, scope: Scope) -> &Vec<LoadedModule> {
        match scope {
            Scope::Local => &self.local,
            Scope::Application => &self.application,
        }
    }

    fn records_mut(&mut self, scope: Scope) -> &mut Vec<LoadedModule> {
        match scope {
            Scope::Local => &mut self.local,
            Scope::Application => &mut self.application,
        }
    }

    /// Insert a canonical record into `scope`.
    ///
    /// Returns the cache id of the record now representing this module: the
    /// given record's id, or the id of the equivalent record already cached.
    /// Fails with `InvalidArgument` if the record has no cache id or exposes
    /// no capabilities.
    pub fn add(&mut self, record: LoadedModule, scope: Scope) -> Result<CacheId, ModuleSystemError> {
        let Some(cache_id) = record.cache_id else {
            return Err(ModuleSystemError::InvalidArgument {
                parameter: "record",
                message: format!("module '{}' has no cache id", record.display_name),
            });
        };
        if record.capability_types().is_empty() {
            return Err(ModuleSystemError::InvalidArgument {
                parameter: "record",
                message: format!("module '{}' exposes no capabilities", record.display_name),
            });
        }

        let key = record.capability_set();
        if let Some(existing) = self
            .records(scope)
            .iter()
            .find(|r| {
                r.file_path == record.file_path
                    && r.display_name == record.display_name
                    && r.capability_set() == key
            })
        {
            debug!("Module {} already cached in {} scope", record.display_name, scope);
            return existing.cache_id.ok_or_else(|| ModuleSystemError::InvalidArgument {
                parameter: "record",
                message: format!("cached module '{}' lost its cache id", existing.display_name),
            });
        }

        debug!("Caching module {} ({}) in {} scope", record.display_name, cache_id, scope);
        self.records_mut(scope).push(record);
        Ok(cache_id)
    }

    /// Most recently loaded record exposing `capability`.
    ///
    /// `path_filter` restricts the search to one file; `None` means any path.
    /// The local scope is searched first; the application scope only if the
    /// local scope has no match. Equal load times resolve to the later insert.
    pub fn find_by_capability(&self, capability: &str, path_filter: Option<&Path>) -> Option<CacheId> {
        if self.is_empty() {
            return None;
        }

        for scope in Scope::ALL {
            let matches: Vec<&LoadedModule> = self
                .records(scope)
                .iter()
                .filter(|r| r.exposes(capability))
                .filter(|r| path_filter.is_none_or(|path| r.file_path == path))
                .collect();

            if matches.len() > 1 {
                self.diagnostics.note(format!(
                    "Cached modules contain multiple modules defining capability: {}",
                    capability
                ));
            }

            if let Some(chosen) = matches.into_iter().max_by_key(|r| r.loaded_at) {
                return chosen.cache_id;
            }
        }
        None
    }

    /// Record loaded from `path`, local scope first, whatever it exposes.
    pub fn find_by_path(&self, path: &Path) -> Option<CacheId> {
        self.iter().find(|r| r.file_path == path).and_then(|r| r.cache_id)
    }

    pub fn get(&self, cache_id: CacheId) -> Option<&LoadedModule> {
        self.iter().find(|r| r.cache_id == Some(cache_id))
    }

    /// Scope a cached record lives in.
    pub fn scope_of(&self, cache_id: CacheId) -> Option<Scope> {
        Scope::ALL
            .into_iter()
            .find(|&scope| self.records(scope).iter().any(|r| r.cache_id == Some(cache_id)))
    }

    pub fn scope_records(&self, scope: Scope) -> &[LoadedModule] {
        self.records(scope)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoadedModule> {
        self.local.iter().chain(self.application.iter())
    }

    pub fn len(&self, scope: Scope) -> usize {
        self.records(scope).len()
    }

    pub fn is_empty(&self) -> bool {
        self.local.is_empty() && self.application.is_empty()
    }
}
