//! Locating an existing Premiere Pro installation.

use std::path::{Path, PathBuf};

pub const EXECUTABLE_NAME: &str = "Adobe Premiere Pro.exe";
const FOLDER_MARKER: &str = "Premiere Pro";

/// Folders Adobe's installer puts versioned Premiere directories under.
pub fn default_roots() -> Vec<PathBuf> {
    #[cfg(windows)]
    {
        vec![
            PathBuf::from(r"C:\Program Files\Adobe"),
            PathBuf::from(r"C:\Program Files (x86)\Adobe"),
        ]
    }
    #[cfg(not(windows))]
    {
        Vec::new()
    }
}

/// First `<root>/<*Premiere Pro*>/Adobe Premiere Pro.exe` that exists.
///
/// Folders are visited in name order so that detection is stable between runs.
pub fn find_installation(roots: &[PathBuf]) -> Option<PathBuf> {
    for root in roots {
        let Ok(entries) = std::fs::read_dir(root) else {
            continue;
        };
        let mut folders: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter(|e| e.file_name().to_string_lossy().contains(FOLDER_MARKER))
            .map(|e| e.path())
            .collect();
        folders.sort();
        for folder in folders {
            let candidate = folder.join(EXECUTABLE_NAME);
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "found installation");
                return Some(candidate);
            }
        }
    }
    None
}

/// A saved executable path is only usable while it still exists.
pub fn is_usable(path: &Path) -> bool {
    path.is_file()
}
