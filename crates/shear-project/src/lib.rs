//! Project file discovery for the Shear refactoring engine.
//!
//! The engine only needs one thing from the workspace: the set of Java files
//! that may reference the class being refactored. Discovery returns that set
//! as a value; unreadable directories are logged and skipped, never fatal.

use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

/// Recursively lists Java source files under `root`, in a deterministic
/// (lexicographic) traversal order.
///
/// The extension match is case-insensitive (`.java` / `.Java` both occur in
/// the wild). Paths in `exclude` are omitted from the result; comparison is
/// on canonicalized paths where possible so relative and absolute spellings
/// of the same file agree.
pub fn list_java_files(root: &Path, exclude: &[&Path]) -> Vec<PathBuf> {
    let excluded: Vec<PathBuf> = exclude.iter().map(|path| canonical(path)).collect();

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let is_java = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("java"))
            .unwrap_or(false);
        if !is_java {
            continue;
        }
        if excluded.contains(&canonical(path)) {
            continue;
        }
        files.push(path.to_path_buf());
    }
    files
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
