//! # Capability Declaration Store
//!
//! Holds, per [`Scope`], the two parsed catalogs the registry is driven by:
//! which capabilities exist and which source modules claim them
//! ([`CapabilityCatalog`]), and which module files are declared to implement
//! which capability ([`ModuleCatalog`]).
//!
//! Missing or unparsable catalogs never fail the caller: the scope is left
//! empty, the failure goes to the diagnostics ledger, and every query for that
//! scope answers "no module".
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::kernel::constants::{
    CAPABILITIES_FILE_STEM, LOCAL_CAPABILITIES_FILE_STEM, LOCAL_MODULES_FILE_STEM,
    MODULES_FILE_STEM,
};
use crate::kernel::error::Error as KernelError;
use crate::module_system::diagnostics::DiagnosticsLedger;
use crate::module_system::error::ModuleSystemError;
use crate::module_system::scope::Scope;

/// A source module and the capability names it claims to expose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilitySource {
    #[serde(rename = "source_dll_name", alias = "source_name")]
    pub source_name: String,
    #[serde(default)]
    pub interfaces: Vec<String>,
}

/// The "declared capabilities" record of one scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilityCatalog {
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub registered_app_id: Option<String>,
    #[serde(default)]
    pub interface_sources: Vec<CapabilitySource>,
}

impl CapabilityCatalog {
    pub fn declares(&self, capability: &str) -> bool {
        self.interface_sources
            .iter()
            .flat_map(|source| source.interfaces.iter())
            .any(|name| name == capability)
    }

    /// `registered_app_id` decoded from base64; the raw value if it is not
    /// base64-encoded UTF-8, empty if absent.
    pub fn decoded_app_id(&self) -> String {
        match self.registered_app_id.as_deref() {
            None | Some("") => String::new(),
            Some(raw) => STANDARD
                .decode(raw)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
                .unwrap_or_else(|| raw.to_string()),
        }
    }
}

/// A declared module entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDeclaration {
    /// Capability this module is declared to implement
    pub interface: String,
    /// Module file name, relative to the scope directory
    #[serde(rename = "dll_name", alias = "module_name")]
    pub module_name: String,
    /// Full name of the concrete type to instantiate
    #[serde(default)]
    pub class_name: Option<String>,
    /// Memoize the first instance
    #[serde(default)]
    pub store_once: bool,
    /// Constructor arguments
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(skip)]
    resolved_path: Option<PathBuf>,
    #[serde(skip)]
    valid: bool,
}

impl ModuleDeclaration {
    pub fn new(interface: impl Into<String>, module_name: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            module_name: module_name.into(),
            class_name: None,
            store_once: false,
            arguments: Vec::new(),
            resolved_path: None,
            valid: false,
        }
    }

    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn store_once(mut self, store_once: bool) -> Self {
        self.store_once = store_once;
        self
    }

    pub fn with_arguments(mut self, arguments: Vec<String>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Module file joined with the scope directory; set by validation.
    pub fn resolved_path(&self) -> Option<&Path> {
        self.resolved_path.as_deref()
    }

    /// True once some capability source in the same scope claims `interface`.
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// The "declared modules" record of one scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleCatalog {
    #[serde(default, alias = "interface_plugin_dlls")]
    pub modules: Vec<ModuleDeclaration>,
}

/// Everything declared for one scope.
#[derive(Debug, Clone, Default)]
pub struct ScopeDeclarations {
    pub dir: Option<PathBuf>,
    pub capabilities: Option<CapabilityCatalog>,
    pub modules: Option<ModuleCatalog>,
}

impl ScopeDeclarations {
    fn is_loaded(&self) -> bool {
        self.capabilities.is_some() && self.modules.is_some()
    }
}

/// Per-scope declaration catalogs and the queries the registry needs.
#[derive(Debug)]
pub struct DeclarationStore {
    local: ScopeDeclarations,
    application: ScopeDeclarations,
    diagnostics: Arc<DiagnosticsLedger>,
}

impl DeclarationStore {
    pub fn new(diagnostics: Arc<DiagnosticsLedger>) -> Self {
        Self {
            local: ScopeDeclarations::default(),
            application: ScopeDeclarations::default(),
            diagnostics,
        }
    }

    fn scope(&self, scope: Scope) -> &ScopeDeclarations {
        match scope {
            Scope::Local => &self.local,
            Scope::Application => &self.application,
        }
    }

    fn scope_mut(&mut self, scope: Scope) -> &mut ScopeDeclarations {
        match scope {
            Scope::Local => &mut self.local,
            Scope::Application => &mut self.application,
        }
    }

    fn file_stems(scope: Scope) -> (&'static str, &'static str) {
        match scope {
            Scope::Local => (LOCAL_CAPABILITIES_FILE_STEM, LOCAL_MODULES_FILE_STEM),
            Scope::Application => (CAPABILITIES_FILE_STEM, MODULES_FILE_STEM),
        }
    }

    /// Read both catalogs of `scope` from `dir`, then validate its entries.
    ///
    /// Returns whether the scope ended up with usable declarations. Failures
    /// are recorded in the ledger and leave the scope empty.
    pub fn load_scope(&mut self, scope: Scope, dir: &Path) -> bool {
        let (capabilities_stem, modules_stem) = Self::file_stems(scope);
        let capabilities = self.read_catalog::<CapabilityCatalog>(scope, dir, capabilities_stem);
        let modules = self.read_catalog::<ModuleCatalog>(scope, dir, modules_stem);

        let declarations = match (capabilities, modules) {
            (Some(capabilities), Some(modules)) => ScopeDeclarations {
                dir: Some(dir.to_path_buf()),
                capabilities: Some(capabilities),
                modules: Some(modules),
            },
            _ => ScopeDeclarations {
                dir: Some(dir.to_path_buf()),
                ..ScopeDeclarations::default()
            },
        };
        let loaded = declarations.is_loaded();
        *self.scope_mut(scope) = declarations;

        if loaded {
            let valid = self.validate_scope(scope);
            debug!("Loaded {} declarations from {} ({} valid modules)", scope, dir.display(), valid);
        }
        loaded
    }

    fn read_catalog<T: serde::de::DeserializeOwned>(
        &self,
        scope: Scope,
        dir: &Path,
        stem: &str,
    ) -> Option<T> {
        let Some(path) = config::locate_by_stem(dir, stem) else {
            let error = ModuleSystemError::ConfigurationMissing {
                scope,
                path: dir.join(format!("{}.json", stem)),
            };
            self.diagnostics
                .record_failure(&format!("Missing {} declarations", scope), &error);
            return None;
        };

        match config::read_config_file::<T>(&path) {
            Ok(catalog) => Some(catalog),
            Err(e) => {
                let message = match e {
                    KernelError::Config { message, .. } => message,
                    other => other.to_string(),
                };
                let error = ModuleSystemError::ConfigurationInvalid { path, message };
                self.diagnostics
                    .record_failure(&format!("Invalid {} declarations", scope), &error);
                None
            }
        }
    }

    /// Install already-parsed catalogs for a scope and validate them.
    pub fn set_scope(
        &mut self,
        scope: Scope,
        dir: impl Into<PathBuf>,
        capabilities: CapabilityCatalog,
        modules: ModuleCatalog,
    ) -> usize {
        *self.scope_mut(scope) = ScopeDeclarations {
            dir: Some(dir.into()),
            capabilities: Some(capabilities),
            modules: Some(modules),
        };
        self.validate_scope(scope)
    }

    /// True iff a capability source in `scope` lists `capability` and a
    /// declared module in `scope` names it.
    pub fn has_module_for_capability(&self, capability: &str, scope: Scope) -> bool {
        let declarations = self.scope(scope);
        let (Some(capabilities), Some(modules)) =
            (declarations.capabilities.as_ref(), declarations.modules.as_ref())
        else {
            return false;
        };
        capabilities.declares(capability)
            && modules.modules.iter().any(|m| m.interface == capability)
    }

    /// One-time fix-up of `resolved_path` and `is_valid`; returns the valid count.
    fn validate_scope(&mut self, scope: Scope) -> usize {
        let Some(dir) = self.scope(scope).dir.clone() else {
            return 0;
        };
        let supported: Vec<bool> = self
            .declared_modules(scope)
            .iter()
            .map(|m| self.has_module_for_capability(&m.interface, scope))
            .collect();

        let mut valid = 0;
        if let Some(modules) = self.scope_mut(scope).modules.as_mut() {
            for (declaration, supported) in modules.modules.iter_mut().zip(supported) {
                if supported && !declaration.valid {
                    declaration.resolved_path = Some(dir.join(&declaration.module_name));
                    declaration.valid = true;
                }
                if declaration.valid {
                    valid += 1;
                }
            }
        }
        valid
    }

    pub fn declared_modules(&self, scope: Scope) -> &[ModuleDeclaration] {
        self.scope(scope)
            .modules
            .as_ref()
            .map(|catalog| catalog.modules.as_slice())
            .unwrap_or(&[])
    }

    pub fn capability_catalog(&self, scope: Scope) -> Option<&CapabilityCatalog> {
        self.scope(scope).capabilities.as_ref()
    }

    pub fn scope_dir(&self, scope: Scope) -> Option<&Path> {
        self.scope(scope).dir.as_deref()
    }

    pub fn is_scope_loaded(&self, scope: Scope) -> bool {
        self.scope(scope).is_loaded()
    }

    /// Valid declarations for `capability`, local scope first, in file order.
    pub fn candidates_for(&self, capability: &str) -> Vec<(Scope, &ModuleDeclaration)> {
        Scope::ALL
            .iter()
            .flat_map(|&scope| {
                self.declared_modules(scope)
                    .iter()
                    .filter(move |m| m.valid && m.interface == capability)
                    .map(move |m| (scope, m))
            })
            .collect()
    }
}
