#![cfg(test)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::config::RegistrySettings;

/// On-disk layout with an application and a local declarations directory.
pub struct Workspace {
    pub root: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("Failed to create temp directory");
        fs::create_dir_all(root.path().join("app")).unwrap();
        fs::create_dir_all(root.path().join("local")).unwrap();
        Self { root }
    }

    pub fn app_dir(&self) -> PathBuf {
        self.root.path().join("app")
    }

    pub fn local_dir(&self) -> PathBuf {
        self.root.path().join("local")
    }

    pub fn settings(&self) -> RegistrySettings {
        RegistrySettings::new(Some(self.local_dir()), Some(self.app_dir()))
    }

    /// Write JSON declarations claiming `capability` from `module_file`.
    pub fn declare_json(&self, dir: &Path, prefix: &str, capability: &str, module_file: &str, extra: &str) {
        let capabilities = format!(
            r#"{{
  "about": "integration fixture",
  "app_name": "plugforge",
  "interface_sources": [
    {{ "source_dll_name": "{module_file}", "interfaces": ["{capability}"] }}
  ]
}}"#
        );
        let modules = format!(
            r#"{{
  "interface_plugin_dlls": [
    {{ "interface": "{capability}", "dll_name": "{module_file}"{extra} }}
  ]
}}"#
        );
        fs::write(dir.join(format!("{prefix}capabilities.json")), capabilities).unwrap();
        fs::write(dir.join(format!("{prefix}modules.json")), modules).unwrap();
    }
}
