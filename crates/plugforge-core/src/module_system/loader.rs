//! # Module Loader
//!
//! Turns a module file path into a [`LoadedModule`]. Opening is delegated to a
//! [`ModuleOpener`] (the native one uses `libloading`), and deciding which
//! exported types count as capabilities is delegated to a
//! [`CapabilityClassifier`], so both seams can be replaced in tests.
use std::panic;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use libloading::{Library, Symbol};
use log::{debug, info};
use semver::{Version, VersionReq};

use crate::kernel::constants::{ABI_VERSION, MODULE_REGISTER_SYMBOL};
use crate::module_system::abi::{ExportKind, ExportedType, ModuleRegisterFn, ModuleRegistrar};
use crate::module_system::diagnostics::DiagnosticsLedger;
use crate::module_system::error::{ModuleLoadErrorSource, ModuleSystemError};
use crate::module_system::record::{LoadedModule, ModuleHandle};

/// Decides whether an exported type is a capability.
pub type CapabilityClassifier = fn(&ExportedType) -> bool;

/// Default classification: public, interface-shaped exports.
pub fn is_public_capability(exported: &ExportedType) -> bool {
    exported.kind == ExportKind::Capability && exported.is_public()
}

/// Result of opening a module file.
#[derive(Debug)]
pub struct OpenedModule {
    pub handle: ModuleHandle,
    pub version: Option<String>,
}

impl OpenedModule {
    /// Build from a filled registrar, without a backing library.
    pub fn from_registrar(registrar: ModuleRegistrar) -> Self {
        let version = registrar.module_version().map(str::to_string);
        let (exports, factories) = registrar.into_parts();
        Self {
            handle: ModuleHandle::new(exports, factories),
            version,
        }
    }
}

/// Opens a module file and collects its exported surface.
pub trait ModuleOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<OpenedModule, ModuleSystemError>;
}

/// Opens native dynamic libraries exporting `_module_register`.
#[derive(Debug, Clone, Default)]
pub struct NativeOpener;

impl NativeOpener {
    fn check_abi(path: &Path, registrar: &ModuleRegistrar) -> Result<(), ModuleSystemError> {
        let required = format!("^{}", ABI_VERSION);
        let incompatible = |found: &str| {
            ModuleSystemError::load(
                path,
                ModuleLoadErrorSource::IncompatibleAbi {
                    found: found.to_string(),
                    required: required.clone(),
                },
            )
        };
        let found = registrar.abi_version().ok_or_else(|| incompatible("<none>"))?;
        let version = Version::parse(found).map_err(|_| incompatible(found))?;
        let req = VersionReq::parse(&required)
            .map_err(|e| ModuleSystemError::load(path, ModuleLoadErrorSource::Other(e.to_string())))?;
        if req.matches(&version) {
            Ok(())
        } else {
            Err(incompatible(found))
        }
    }
}

impl ModuleOpener for NativeOpener {
    fn open(&self, path: &Path) -> Result<OpenedModule, ModuleSystemError> {
        if !path.is_file() {
            return Err(ModuleSystemError::load(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "module file not found"),
            ));
        }

        let library = unsafe { Library::new(path) }.map_err(|e| ModuleSystemError::load(path, e))?;

        let register_fn: ModuleRegisterFn = {
            let register: Symbol<ModuleRegisterFn> = unsafe { library.get(MODULE_REGISTER_SYMBOL) }
                .map_err(|_| {
                    ModuleSystemError::load(
                        path,
                        ModuleLoadErrorSource::MissingEntryPoint("_module_register".to_string()),
                    )
                })?;
            *register
        };

        let mut registrar = ModuleRegistrar::new();
        let outcome = panic::catch_unwind(panic::AssertUnwindSafe(|| unsafe {
            register_fn(&mut registrar)
        }));
        if let Err(panic_obj) = outcome {
            let panic_msg = if let Some(s_ref) = panic_obj.downcast_ref::<&'static str>() {
                (*s_ref).to_string()
            } else if let Some(s_obj) = panic_obj.downcast_ref::<String>() {
                s_obj.clone()
            } else {
                "Unknown panic reason".to_string()
            };
            return Err(ModuleSystemError::load(path, ModuleLoadErrorSource::Panic(panic_msg)));
        }

        Self::check_abi(path, &registrar)?;

        let mut opened = OpenedModule::from_registrar(registrar);
        opened.handle = opened.handle.with_library(library);
        Ok(opened)
    }
}

/// Loads module files into provisional [`LoadedModule`] records.
pub struct ModuleLoader {
    opener: Box<dyn ModuleOpener>,
    classifier: CapabilityClassifier,
    diagnostics: Arc<DiagnosticsLedger>,
    load_count: AtomicUsize,
}

impl ModuleLoader {
    pub fn with_opener(opener: Box<dyn ModuleOpener>, diagnostics: Arc<DiagnosticsLedger>) -> Self {
        Self {
            opener,
            classifier: is_public_capability,
            diagnostics,
            load_count: AtomicUsize::new(0),
        }
    }

    pub fn with_classifier(mut self, classifier: CapabilityClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Number of open attempts made so far.
    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }

    /// Open `path` and build a provisional record (no cache id yet).
    ///
    /// A module that exposes no capabilities is still returned; the note is
    /// left in the ledger and the caller decides what to do with it.
    pub fn load_from_path(&self, path: &Path) -> Result<LoadedModule, ModuleSystemError> {
        self.load_count.fetch_add(1, Ordering::SeqCst);
        debug!("Opening module {}", path.display());

        let opened = self.opener.open(path)?;
        let capabilities: Vec<String> = opened
            .handle
            .exports()
            .iter()
            .filter(|exported| (self.classifier)(exported))
            .map(|exported| exported.name.clone())
            .collect();

        let mut record = LoadedModule::new(path, opened.handle);
        record.version = opened.version;
        let added = record.add_capability_types(capabilities);
        if added == 0 {
            self.diagnostics
                .note(format!("Module loader: {} loaded 0 capabilities", path.display()));
        } else {
            info!("Loaded module {} exposing {} capabilities", record.display_name, added);
        }
        Ok(record)
    }
}

impl std::fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("load_count", &self.load_count())
            .finish()
    }
}
