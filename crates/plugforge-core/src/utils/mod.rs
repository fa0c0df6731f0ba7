//! Filesystem helpers used by module discovery.
pub mod fs;

pub use fs::{display_name, list_files_with_extension, newest_file_named};
