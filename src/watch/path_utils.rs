// src/watch/path_utils.rs

use std::path::Path;

/// Path of `path` relative to `root`, with forward slashes.
///
/// Falls back to comparing canonical paths, since some platforms report
/// events under a different absolute prefix (symlinked temp dirs on macOS).
/// Returns `None` for paths outside `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(rel.to_string_lossy().replace('\\', "/"));
        }
    }

    None
}
