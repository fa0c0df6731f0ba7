/// ABI version reported by modules built against this core
pub const ABI_VERSION: &str = "0.1.0";

/// Symbol every loadable module must export
pub const MODULE_REGISTER_SYMBOL: &[u8] = b"_module_register\0";

/// Default module file extension
pub const MODULE_EXTENSION: &str = "module";

/// Application scope capability declarations (file stem)
pub const CAPABILITIES_FILE_STEM: &str = "capabilities";

/// Application scope module declarations (file stem)
pub const MODULES_FILE_STEM: &str = "modules";

/// Local scope capability declarations (file stem)
pub const LOCAL_CAPABILITIES_FILE_STEM: &str = "local_capabilities";

/// Local scope module declarations (file stem)
pub const LOCAL_MODULES_FILE_STEM: &str = "local_modules";

/// Well-known module directories, relative to a base directory
pub const KNOWN_MODULE_DIRS: &[&str] = &[
    "resources/plugins",
    "plugins",
    "bin/plugins",
    "bin/resources/plugins",
];
