use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// List the files directly inside `dir` that match a predicate, sorted by path
pub fn list_files<P, F>(dir: P, predicate: &F) -> io::Result<Vec<PathBuf>>
where
    P: AsRef<Path>,
    F: Fn(&Path) -> bool + ?Sized,
{
    let mut result = Vec::new();

    if !dir.as_ref().is_dir() {
        return Ok(result);
    }

    for entry in fs::read_dir(dir)? {
        let entry_path = entry?.path();
        if entry_path.is_file() && predicate(&entry_path) {
            result.push(entry_path);
        }
    }

    result.sort();
    Ok(result)
}

/// List files with a specific extension (case-insensitive)
pub fn list_files_with_extension<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<PathBuf>> {
    let extension_lower = extension.trim_start_matches('.').to_lowercase();
    list_files(dir, &move |p: &Path| match p.extension() {
        Some(ext) => ext.to_string_lossy().to_lowercase() == extension_lower,
        None => false,
    })
}

/// Most recently modified `file_name` across `dirs`; the earlier directory wins a tie
pub fn newest_file_named<P: AsRef<Path>>(dirs: &[P], file_name: &str) -> Option<PathBuf> {
    let mut newest: Option<(PathBuf, std::time::SystemTime)> = None;

    for dir in dirs {
        let candidate = dir.as_ref().join(file_name);
        let modified = match fs::metadata(&candidate).and_then(|m| m.modified()) {
            Ok(time) if candidate.is_file() => time,
            _ => continue,
        };
        match &newest {
            Some((_, current)) if *current >= modified => {}
            _ => newest = Some((candidate, modified)),
        }
    }

    newest.map(|(path, _)| path)
}

/// Base name of a module file, used as its display name
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
