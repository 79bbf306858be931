use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

/// Collect regular files under `root`, sorted by path.
///
/// Without `recursive` only direct children are returned. Unreadable
/// entries are logged and skipped.
pub fn discover(root: &Path, recursive: bool) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(root).min_depth(1).follow_links(false);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("[WARN] Error reading directory entry: {}", e);
                continue;
            }
        };
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    debug!("Discovered {} files under {}", files.len(), root.display());
    files
}
