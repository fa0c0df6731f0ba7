#![cfg(test)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::tempdir;

use crate::module_system::abi::ExportedType;
use crate::module_system::diagnostics::DiagnosticsLedger;
use crate::module_system::error::{ModuleLoadErrorSource, ModuleSystemError};
use crate::module_system::loader::{ModuleLoader, ModuleOpener, NativeOpener};
use crate::module_system::tests::common::{
    MockOpener, register_empty, register_fast, register_suite,
};

fn mock_loader(opener: MockOpener) -> (ModuleLoader, Arc<DiagnosticsLedger>) {
    let diagnostics = Arc::new(DiagnosticsLedger::new());
    (ModuleLoader::with_opener(Box::new(opener), diagnostics.clone()), diagnostics)
}

#[test]
fn test_load_builds_provisional_record() {
    let opener = MockOpener::new().with_module("/mods/renderer.module", register_fast);
    let (loader, _) = mock_loader(opener);

    let record = loader
        .load_from_path(Path::new("/mods/renderer.module"))
        .expect("mock module should load");
    assert_eq!(record.cache_id, None);
    assert_eq!(record.display_name, "renderer.module");
    assert_eq!(record.version.as_deref(), Some("1.2.0"));
    assert_eq!(record.capability_types(), ["IRenderer".to_string()]);
    assert_eq!(loader.load_count(), 1);
}

#[test]
fn test_load_collects_every_public_capability() {
    let opener = MockOpener::new().with_module("/mods/suite.module", register_suite);
    let (loader, _) = mock_loader(opener);

    let record = loader.load_from_path(Path::new("/mods/suite.module")).unwrap();
    assert_eq!(record.capability_set(), vec!["IExporter", "IRenderer"]);
    assert_eq!(
        record.handle().implementations_of("IRenderer"),
        vec!["Acme.SlowRenderer", "Acme.EchoRenderer"]
    );
}

#[test]
fn test_zero_capability_module_is_returned_with_note() {
    let opener = MockOpener::new().with_module("/mods/helper.module", register_empty);
    let (loader, diagnostics) = mock_loader(opener);

    let record = loader.load_from_path(Path::new("/mods/helper.module")).unwrap();
    assert!(record.capability_types().is_empty());
    assert!(!diagnostics.has_incidents());
    let notes = diagnostics.drain_notes(false);
    assert_eq!(notes.len(), 1);
    assert!(notes[0].contains("loaded 0 capabilities"));
}

fn public_or_internal(exported: &ExportedType) -> bool {
    exported.kind == crate::module_system::abi::ExportKind::Capability
}

fn register_internal(registrar: &mut crate::module_system::abi::ModuleRegistrar) {
    registrar.stamp_current_abi();
    registrar.export_type(ExportedType::capability("IHidden").internal());
}

#[test]
fn test_classifier_decides_what_counts_as_capability() {
    let opener = MockOpener::new().with_module("/mods/hidden.module", register_internal);

    let (default_loader, _) = mock_loader(opener.clone());
    let record = default_loader.load_from_path(Path::new("/mods/hidden.module")).unwrap();
    assert!(record.capability_types().is_empty());

    let (loader, _) = mock_loader(opener);
    let loader = loader.with_classifier(public_or_internal);
    let record = loader.load_from_path(Path::new("/mods/hidden.module")).unwrap();
    assert_eq!(record.capability_types(), ["IHidden".to_string()]);
}

#[test]
fn test_open_failure_is_module_load_error() {
    let (loader, _) = mock_loader(MockOpener::new());

    let err = loader.load_from_path(Path::new("/mods/absent.module")).unwrap_err();
    assert!(matches!(err, ModuleSystemError::ModuleLoadError { .. }));
    assert_eq!(loader.load_count(), 1);
}

#[test]
fn test_native_opener_reports_missing_file() {
    let dir = tempdir().expect("Failed to create temp directory");
    let err = NativeOpener
        .open(&dir.path().join("absent.module"))
        .expect_err("missing file must fail");
    match err {
        ModuleSystemError::ModuleLoadError { source, .. } => {
            assert!(matches!(*source, ModuleLoadErrorSource::Io(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_native_opener_rejects_non_library_file() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("garbage.module");
    fs::write(&path, b"definitely not a shared object").unwrap();

    let err = NativeOpener.open(&path).expect_err("garbage must not load");
    match err {
        ModuleSystemError::ModuleLoadError { path: failed, source } => {
            assert_eq!(failed, path);
            assert!(matches!(*source, ModuleLoadErrorSource::Library(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
