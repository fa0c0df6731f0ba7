//! # Module Self-Registration
//!
//! A loadable module exports a single entry point, `_module_register`, which
//! receives a [`ModuleRegistrar`] and fills it with the types the module
//! exposes and the factories for its concrete implementations. The host never
//! looks types up by name inside the library; it only calls this function.
//!
//! The entry point uses the Rust ABI, so modules must be built with the same
//! toolchain and the same `plugforge-core` as the host. Use
//! [`declare_module!`](crate::declare_module) to generate it.
use std::collections::HashMap;

use crate::kernel::constants::ABI_VERSION;
use crate::module_system::capability::Factory;

/// Signature of the `_module_register` entry point.
pub type ModuleRegisterFn = unsafe fn(registrar: &mut ModuleRegistrar);

/// Kind of an exported type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// Interface-shaped: something other modules or the host may ask for.
    Capability,
    /// A concrete type that can be instantiated through a factory.
    Implementation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Internal,
}

/// One entry of a module's exported type surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedType {
    /// Fully-qualified type name
    pub name: String,
    pub kind: ExportKind,
    pub visibility: Visibility,
    /// Capabilities an implementation provides (empty for capabilities)
    pub implements: Vec<String>,
}

impl ExportedType {
    pub fn capability(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ExportKind::Capability,
            visibility: Visibility::Public,
            implements: Vec::new(),
        }
    }

    pub fn implementation(name: impl Into<String>, implements: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind: ExportKind::Implementation,
            visibility: Visibility::Public,
            implements,
        }
    }

    pub fn internal(mut self) -> Self {
        self.visibility = Visibility::Internal;
        self
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }
}

/// Collects what a module exposes during registration.
#[derive(Clone, Default)]
pub struct ModuleRegistrar {
    abi_version: Option<String>,
    module_version: Option<String>,
    exports: Vec<ExportedType>,
    factories: HashMap<String, Factory>,
}

impl ModuleRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp the core ABI version this module was compiled against.
    pub fn set_abi_version(&mut self, version: impl Into<String>) -> &mut Self {
        self.abi_version = Some(version.into());
        self
    }

    /// Stamp the ABI version of the `plugforge-core` linked into the caller.
    pub fn stamp_current_abi(&mut self) -> &mut Self {
        self.set_abi_version(ABI_VERSION)
    }

    pub fn set_module_version(&mut self, version: impl Into<String>) -> &mut Self {
        self.module_version = Some(version.into());
        self
    }

    /// Export a public capability (interface-shaped type).
    pub fn export_capability(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        if !self.exports.iter().any(|t| t.name == name) {
            self.exports.push(ExportedType::capability(name));
        }
        self
    }

    /// Export an arbitrary type entry without a factory.
    pub fn export_type(&mut self, exported: ExportedType) -> &mut Self {
        self.exports.retain(|t| t.name != exported.name);
        self.exports.push(exported);
        self
    }

    /// Export a concrete implementation of `capability`.
    ///
    /// The capability itself is exported as well if it was not already.
    pub fn export_implementation(
        &mut self,
        class_name: impl Into<String>,
        capability: impl Into<String>,
        factory: Factory,
    ) -> &mut Self {
        let class_name = class_name.into();
        let capability = capability.into();
        self.export_capability(capability.clone());
        match self.exports.iter_mut().find(|t| t.name == class_name) {
            Some(existing) => {
                if !existing.implements.contains(&capability) {
                    existing.implements.push(capability);
                }
            }
            None => self
                .exports
                .push(ExportedType::implementation(class_name.clone(), vec![capability])),
        }
        self.factories.insert(class_name, factory);
        self
    }

    pub fn abi_version(&self) -> Option<&str> {
        self.abi_version.as_deref()
    }

    pub fn module_version(&self) -> Option<&str> {
        self.module_version.as_deref()
    }

    pub fn exports(&self) -> &[ExportedType] {
        &self.exports
    }

    pub(crate) fn into_parts(self) -> (Vec<ExportedType>, HashMap<String, Factory>) {
        (self.exports, self.factories)
    }
}

impl std::fmt::Debug for ModuleRegistrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistrar")
            .field("abi_version", &self.abi_version)
            .field("module_version", &self.module_version)
            .field("exports", &self.exports)
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Generates the `_module_register` entry point for a module crate.
///
/// ```ignore
/// fn register(registrar: &mut ModuleRegistrar) { /* export types */ }
/// plugforge_core::declare_module!(register);
/// ```
#[macro_export]
macro_rules! declare_module {
    ($register:path) => {
        #[unsafe(no_mangle)]
        pub fn _module_register(registrar: &mut $crate::module_system::abi::ModuleRegistrar) {
            registrar.stamp_current_abi();
            registrar.set_module_version(env!("CARGO_PKG_VERSION"));
            $register(registrar);
        }
    };
}
