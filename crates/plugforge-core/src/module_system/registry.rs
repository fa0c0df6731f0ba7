//! # Module Registry
//!
//! [`ModuleRegistry`] is the single context object hosts talk to. Given a
//! capability identifier it returns a concrete instance, trying in order:
//!
//! 1. the instance cache (capabilities declared `store_once`),
//! 2. any cached module exposing the capability,
//! 3. each valid declared module for the capability, loading it on demand
//!    (local scope first, then application scope),
//! 4. a built-in implementation registered by the host.
//!
//! Every step yields a [`Resolution`]; misses are recorded in the diagnostics
//! ledger and resolution moves on. Only when every step misses does the caller
//! get a [`ModuleSystemError::TypeLoadError`].
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::{debug, info};
use uuid::Uuid;

use crate::config::RegistrySettings;
use crate::kernel::error::{Error, Result};
use crate::module_system::builtin::BuiltinTable;
use crate::module_system::cache::ModuleCache;
use crate::module_system::capability::{Capability, Factory, Instance, downcast_instance, factory};
use crate::module_system::declaration::DeclarationStore;
use crate::module_system::diagnostics::{DiagnosticsLedger, Incident};
use crate::module_system::error::ModuleSystemError;
use crate::module_system::loader::{CapabilityClassifier, ModuleLoader, ModuleOpener, NativeOpener};
use crate::module_system::record::CacheId;
use crate::module_system::scope::Scope;
use crate::utils::fs::list_files_with_extension;

/// Registry shared between threads; one lock guards the whole resolution.
pub type SharedRegistry = Arc<Mutex<ModuleRegistry>>;

/// Explicit module reference for [`ModuleRegistry::get_specific`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleRequest {
    /// Module file to use; `None` falls back to built-in implementations
    pub module_path: Option<PathBuf>,
    /// Concrete type to instantiate; `None` picks the first implementation
    pub class_name: Option<String>,
    pub arguments: Vec<String>,
    pub store_once: bool,
}

impl ModuleRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_module(path: impl Into<PathBuf>) -> Self {
        Self {
            module_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn with_arguments(mut self, arguments: Vec<String>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn store_once(mut self, store_once: bool) -> Self {
        self.store_once = store_once;
        self
    }
}

/// Outcome of one resolution step.
#[derive(Debug)]
pub enum Resolution {
    Hit(Instance),
    Miss(Miss),
}

/// Why a resolution step produced nothing.
#[derive(Debug, Clone)]
pub struct Miss {
    pub module_path: Option<PathBuf>,
    pub reason: String,
}

impl Miss {
    fn new(module_path: Option<&Path>, reason: impl Into<String>) -> Self {
        Self {
            module_path: module_path.map(Path::to_path_buf),
            reason: reason.into(),
        }
    }
}

/// A declared module to try, detached from the declaration store.
#[derive(Debug, Clone)]
struct Candidate {
    scope: Scope,
    path: PathBuf,
    class_name: Option<String>,
    arguments: Vec<String>,
    store_once: bool,
}

/// Memoized instances keyed by capability. A `None` entry is stale and is
/// dropped the next time it is looked up.
#[derive(Debug, Default)]
struct InstanceCache {
    entries: HashMap<String, Option<Instance>>,
}

impl InstanceCache {
    fn get(&mut self, capability: &str) -> Option<Instance> {
        match self.entries.get(capability) {
            Some(Some(instance)) => Some(instance.clone()),
            Some(None) => {
                self.entries.remove(capability);
                None
            }
            None => None,
        }
    }

    fn store(&mut self, capability: &str, instance: Instance) {
        self.entries.insert(capability.to_string(), Some(instance));
    }

    fn invalidate(&mut self, capability: &str) -> bool {
        match self.entries.get_mut(capability) {
            Some(entry) if entry.is_some() => {
                *entry = None;
                true
            }
            _ => false,
        }
    }
}

/// Builder for a [`ModuleRegistry`] with non-default loader seams.
pub struct RegistryBuilder {
    settings: RegistrySettings,
    opener: Option<Box<dyn ModuleOpener>>,
    classifier: Option<CapabilityClassifier>,
}

impl RegistryBuilder {
    pub fn settings(mut self, settings: RegistrySettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn opener(mut self, opener: Box<dyn ModuleOpener>) -> Self {
        self.opener = Some(opener);
        self
    }

    pub fn classifier(mut self, classifier: CapabilityClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Build without reading any declarations; call [`ModuleRegistry::initialize`].
    pub fn build(self) -> ModuleRegistry {
        let diagnostics = Arc::new(DiagnosticsLedger::new());
        let opener = self.opener.unwrap_or_else(|| Box::new(NativeOpener));
        let mut loader = ModuleLoader::with_opener(opener, diagnostics.clone());
        if let Some(classifier) = self.classifier {
            loader = loader.with_classifier(classifier);
        }
        ModuleRegistry {
            settings: self.settings,
            declarations: DeclarationStore::new(diagnostics.clone()),
            cache: ModuleCache::new(diagnostics.clone()),
            loader,
            builtins: BuiltinTable::new(),
            instances: InstanceCache::default(),
            diagnostics,
        }
    }
}

/// Capability registry and module factory.
#[derive(Debug)]
pub struct ModuleRegistry {
    settings: RegistrySettings,
    declarations: DeclarationStore,
    cache: ModuleCache,
    loader: ModuleLoader,
    builtins: BuiltinTable,
    instances: InstanceCache,
    diagnostics: Arc<DiagnosticsLedger>,
}

impl ModuleRegistry {
    /// Registry using native modules; declarations are not read yet.
    pub fn new(settings: RegistrySettings) -> Self {
        Self::builder().settings(settings).build()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            settings: RegistrySettings::default(),
            opener: None,
            classifier: None,
        }
    }

    /// Construct and read declarations for every configured scope.
    pub fn bootstrap(settings: RegistrySettings) -> Self {
        let mut registry = Self::new(settings);
        registry.initialize();
        registry
    }

    /// Read declarations for every configured scope; returns how many scopes loaded.
    ///
    /// Missing or invalid declaration files leave that scope empty and are
    /// recorded in the ledger.
    pub fn initialize(&mut self) -> usize {
        let mut loaded = 0;
        for scope in Scope::ALL {
            let Some(dir) = self.settings.dir_for(scope).map(Path::to_path_buf) else {
                debug!("No directory configured for {} scope", scope);
                continue;
            };
            if self.declarations.load_scope(scope, &dir) {
                loaded += 1;
            }
        }
        info!("Registry initialized with {} declaration scope(s)", loaded);
        loaded
    }

    pub fn shared(self) -> SharedRegistry {
        Arc::new(Mutex::new(self))
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    pub fn declarations(&self) -> &DeclarationStore {
        &self.declarations
    }

    pub fn declarations_mut(&mut self) -> &mut DeclarationStore {
        &mut self.declarations
    }

    pub fn cache(&self) -> &ModuleCache {
        &self.cache
    }

    pub fn loader(&self) -> &ModuleLoader {
        &self.loader
    }

    pub fn builtins(&self) -> &BuiltinTable {
        &self.builtins
    }

    pub fn diagnostics(&self) -> Arc<DiagnosticsLedger> {
        self.diagnostics.clone()
    }

    /// Register a built-in implementation of `capability`.
    pub fn register_builtin(
        &mut self,
        capability: impl Into<String>,
        class_name: impl Into<String>,
        store_once: bool,
        factory: Factory,
    ) {
        self.builtins.register(capability, class_name, store_once, factory);
    }

    /// Typed variant of [`register_builtin`](Self::register_builtin).
    pub fn register_builtin_as<T, F>(&mut self, class_name: impl Into<String>, store_once: bool, build: F)
    where
        T: Capability + ?Sized,
        F: Fn(&[String]) -> std::result::Result<Arc<T>, String> + Send + Sync + 'static,
    {
        self.builtins.register(T::NAME, class_name, store_once, factory(build));
    }

    /// Current implementation of `capability` as declared by configuration.
    pub fn get_current(&mut self, capability: &str) -> Result<Instance> {
        if let Some(instance) = self.instances.get(capability) {
            debug!("Instance cache hit for {}", capability);
            return Ok(instance);
        }

        let candidates = self.candidates(capability);
        let mut last_miss: Option<Miss> = None;

        // Any module already cached for this capability.
        let cached_id = self.cache.find_by_capability(capability, None);
        if let Some(cache_id) = cached_id {
            let declared = self.declared_for(cache_id, &candidates);
            let (class_name, arguments, store_once) = match declared {
                Some(c) => (c.class_name.clone(), c.arguments.clone(), c.store_once),
                None => (None, Vec::new(), false),
            };
            match self.instantiate_cached(cache_id, capability, class_name.as_deref(), &arguments) {
                Resolution::Hit(instance) => return Ok(self.finish(capability, instance, store_once)),
                Resolution::Miss(miss) => last_miss = Some(miss),
            }
        }

        // Declared modules, loading on demand.
        for candidate in &candidates {
            if cached_id.is_some() && self.cache.find_by_path(&candidate.path) == cached_id {
                continue;
            }
            let resolution = self.resolve_module(
                capability,
                &candidate.path,
                candidate.scope,
                candidate.class_name.as_deref(),
                &candidate.arguments,
            );
            match resolution {
                Resolution::Hit(instance) => {
                    return Ok(self.finish(capability, instance, candidate.store_once));
                }
                Resolution::Miss(miss) => last_miss = Some(miss),
            }
        }

        // Built-in fallback.
        let class_hint = candidates.first().and_then(|c| c.class_name.clone());
        let arguments = candidates.first().map(|c| c.arguments.clone()).unwrap_or_default();
        let declared_once = candidates.first().is_some_and(|c| c.store_once);
        match self.resolve_builtin(capability, class_hint.as_deref(), &arguments, true) {
            (Resolution::Hit(instance), builtin_once) => {
                Ok(self.finish(capability, instance, declared_once || builtin_once))
            }
            (Resolution::Miss(miss), _) => {
                let miss = match last_miss {
                    Some(module_miss) => Miss {
                        module_path: module_miss.module_path,
                        reason: format!("{}; {}", module_miss.reason, miss.reason),
                    },
                    None => miss,
                };
                Err(self.fail(capability, miss))
            }
        }
    }

    /// Typed variant of [`get_current`](Self::get_current).
    pub fn get_current_as<T: Capability + ?Sized>(&mut self) -> Result<Arc<T>> {
        let instance = self.get_current(T::NAME)?;
        self.downcast::<T>(&instance)
    }

    /// Implementation of `capability` from an explicitly referenced module.
    ///
    /// Unlike [`get_current`](Self::get_current), a request naming a module
    /// path never falls back to built-ins.
    pub fn get_specific(&mut self, capability: &str, request: &ModuleRequest) -> Result<Instance> {
        if request.module_path.is_none() {
            info!("get_specific for {} without a module path", capability);
        }

        if let Some(instance) = self.instances.get(capability) {
            debug!("Instance cache hit for {}", capability);
            return Ok(instance);
        }

        let class_name = request.class_name.as_deref();
        let resolution = match request.module_path.as_deref() {
            Some(path) => {
                let scope = self.scope_for_path(path);
                self.resolve_module(capability, path, scope, class_name, &request.arguments)
            }
            None => match self.cache.find_by_capability(capability, None) {
                Some(cache_id) => {
                    self.instantiate_cached(cache_id, capability, class_name, &request.arguments)
                }
                None => self.resolve_builtin(capability, class_name, &request.arguments, false).0,
            },
        };

        match resolution {
            Resolution::Hit(instance) => Ok(self.finish(capability, instance, request.store_once)),
            Resolution::Miss(miss) => Err(self.fail(capability, miss)),
        }
    }

    /// Typed variant of [`get_specific`](Self::get_specific).
    pub fn get_specific_as<T: Capability + ?Sized>(&mut self, request: &ModuleRequest) -> Result<Arc<T>> {
        let instance = self.get_specific(T::NAME, request)?;
        self.downcast::<T>(&instance)
    }

    /// Mark a memoized instance stale; returns whether one was stored.
    pub fn invalidate_instance(&mut self, capability: &str) -> bool {
        self.instances.invalidate(capability)
    }

    /// Load every valid declared module of `scope` into the cache.
    ///
    /// Returns how many modules were newly cached. Individual failures are
    /// recorded and skipped.
    pub fn preload_scope(&mut self, scope: Scope) -> Result<usize> {
        let dir = self.scope_dir(scope)?;
        let declared: Vec<PathBuf> = self
            .declarations
            .declared_modules(scope)
            .iter()
            .filter(|m| m.is_valid())
            .filter_map(|m| m.resolved_path().map(Path::to_path_buf))
            .collect();

        let mut cached = 0;
        for path in declared {
            if self.cache.find_by_path(&path).is_some() {
                continue;
            }
            if self.load_into_cache(&path, scope).is_ok() {
                cached += 1;
            }
        }
        info!("Preloaded {} module(s) from {}", cached, dir.display());
        Ok(cached)
    }

    /// Module files present in the directory of `scope`, sorted by path.
    pub fn discover_module_files(&self, scope: Scope) -> Result<Vec<PathBuf>> {
        let dir = self.scope_dir(scope)?;
        list_files_with_extension(&dir, &self.settings.module_extension)
            .map_err(|e| Error::io(e, "discover_modules", dir))
    }

    /// Snapshot (and optionally clear) every absorbed failure.
    pub fn drain_diagnostics(&self, clear: bool) -> HashMap<String, Incident> {
        self.diagnostics.drain_all(clear)
    }

    pub fn has_incidents(&self) -> bool {
        self.diagnostics.has_incidents()
    }

    // --- Resolution steps ---

    fn candidates(&self, capability: &str) -> Vec<Candidate> {
        self.declarations
            .candidates_for(capability)
            .into_iter()
            .filter_map(|(scope, declaration)| {
                declaration.resolved_path().map(|path| Candidate {
                    scope,
                    path: path.to_path_buf(),
                    class_name: declaration.class_name.clone(),
                    arguments: declaration.arguments.clone(),
                    store_once: declaration.store_once,
                })
            })
            .collect()
    }

    /// Declaration matching a cached record's path, else the first declaration.
    fn declared_for<'a>(&self, cache_id: CacheId, candidates: &'a [Candidate]) -> Option<&'a Candidate> {
        let path = self.cache.get(cache_id).map(|r| r.file_path.clone());
        candidates
            .iter()
            .find(|c| Some(&c.path) == path.as_ref())
            .or_else(|| candidates.first())
    }

    fn instantiate_cached(
        &self,
        cache_id: CacheId,
        capability: &str,
        class_name: Option<&str>,
        arguments: &[String],
    ) -> Resolution {
        let Some(record) = self.cache.get(cache_id) else {
            return Resolution::Miss(Miss::new(None, format!("cache id {} not found", cache_id)));
        };
        match record.handle().instantiate(capability, class_name, arguments) {
            Ok(instance) => {
                debug!("Instantiated {} from {}", capability, record.display_name);
                Resolution::Hit(instance)
            }
            Err(reason) => {
                let error = ModuleSystemError::type_load(
                    capability,
                    Some(record.file_path.clone()),
                    reason.clone(),
                );
                self.diagnostics.record_failure(
                    &format!("Error instantiating {} from {}", capability, record.display_name),
                    &error,
                );
                Resolution::Miss(Miss::new(Some(&record.file_path), reason))
            }
        }
    }

    /// Instantiate `capability` from `path`, loading and caching it first if
    /// no record for that file exists yet. A cached file is never reopened.
    fn resolve_module(
        &mut self,
        capability: &str,
        path: &Path,
        scope: Scope,
        class_name: Option<&str>,
        arguments: &[String],
    ) -> Resolution {
        let (cache_id, fresh) = match self.cache.find_by_path(path) {
            Some(cache_id) => (cache_id, false),
            None => match self.load_into_cache(path, scope) {
                Ok(cache_id) => (cache_id, true),
                Err(miss) => return Resolution::Miss(miss),
            },
        };

        if self.cache.get(cache_id).is_some_and(|r| r.exposes(capability)) {
            return self.instantiate_cached(cache_id, capability, class_name, arguments);
        }
        if fresh {
            let error = ModuleSystemError::ZeroCapabilityModule { path: path.to_path_buf() };
            self.diagnostics.record_failure(
                &format!("Module {} does not expose {}", path.display(), capability),
                &error,
            );
        } else {
            debug!("Cached module {} does not expose {}", path.display(), capability);
        }
        Resolution::Miss(Miss::new(Some(path), format!("module does not expose '{}'", capability)))
    }

    /// Open `path` and insert its record; zero-capability modules are discarded.
    fn load_into_cache(&mut self, path: &Path, scope: Scope) -> std::result::Result<CacheId, Miss> {
        let mut record = match self.loader.load_from_path(path) {
            Ok(record) => record,
            Err(error) => {
                self.diagnostics
                    .record_failure(&format!("Error loading module {}", path.display()), &error);
                return Err(Miss::new(Some(path), error.to_string()));
            }
        };

        if record.capability_types().is_empty() {
            let error = ModuleSystemError::ZeroCapabilityModule { path: path.to_path_buf() };
            self.diagnostics
                .record_failure(&format!("Discarded module {}", path.display()), &error);
            return Err(Miss::new(Some(path), error.to_string()));
        }

        record.cache_id = Some(Uuid::new_v4());
        self.cache.add(record, scope).map_err(|error| {
            self.diagnostics
                .record_failure(&format!("Error caching module {}", path.display()), &error);
            Miss::new(Some(path), error.to_string())
        })
    }

    /// Built-in implementation; the flag reports the entry's `store_once`.
    fn resolve_builtin(
        &self,
        capability: &str,
        class_name: Option<&str>,
        arguments: &[String],
        allow_any_class: bool,
    ) -> (Resolution, bool) {
        let entry = self.builtins.find(capability, class_name).or_else(|| {
            if allow_any_class {
                self.builtins.find(capability, None)
            } else {
                None
            }
        });
        let Some(entry) = entry else {
            let reason = match class_name {
                Some(name) => format!("no built-in implementation '{}'", name),
                None => "no built-in implementation".to_string(),
            };
            return (Resolution::Miss(Miss::new(None, reason)), false);
        };

        match entry.instantiate(arguments) {
            Ok(instance) => {
                debug!("Instantiated built-in {} for {}", entry.class_name, capability);
                (Resolution::Hit(instance), entry.store_once)
            }
            Err(reason) => {
                let error = ModuleSystemError::type_load(capability, None, reason.clone());
                self.diagnostics.record_failure(
                    &format!("Error instantiating built-in {}", entry.class_name),
                    &error,
                );
                (Resolution::Miss(Miss::new(None, reason)), false)
            }
        }
    }

    fn finish(&mut self, capability: &str, instance: Instance, store_once: bool) -> Instance {
        if store_once {
            self.instances.store(capability, instance.clone());
        }
        instance
    }

    fn fail(&self, capability: &str, miss: Miss) -> Error {
        let error = ModuleSystemError::type_load(capability, miss.module_path, miss.reason);
        self.diagnostics
            .record_failure(&format!("Error locating {}", capability), &error);
        Error::from(error)
    }

    fn downcast<T: Capability + ?Sized>(&self, instance: &Instance) -> Result<Arc<T>> {
        downcast_instance::<T>(instance).ok_or_else(|| {
            let error = ModuleSystemError::type_load(
                T::NAME,
                None,
                "instance is not of the requested interface type",
            );
            self.diagnostics
                .record_failure(&format!("Type mismatch for {}", T::NAME), &error);
            Error::from(error)
        })
    }

    fn scope_dir(&self, scope: Scope) -> Result<PathBuf> {
        let dir = self
            .declarations
            .scope_dir(scope)
            .or_else(|| self.settings.dir_for(scope))
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::Other(format!("No directory configured for {} scope", scope)))?;
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(Error::Config {
                path: dir,
                message: format!("{} module directory not found", scope),
            })
        }
    }

    fn scope_for_path(&self, path: &Path) -> Scope {
        match self.settings.dir_for(Scope::Local) {
            Some(local) if path.starts_with(local) => Scope::Local,
            _ => Scope::Application,
        }
    }
}
