//! Output path utilities: collision-free naming and the scratch cache layout

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::domain::errors::DomainResult;

/// Return `path` if nothing exists there, otherwise the first free
/// `{stem}(n){ext}` sibling, counting from 1.
///
/// Best effort only: another writer may claim the name between this check
/// and the moment the encoder opens it.
pub fn resolve_non_duplicate(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1u32;
    loop {
        let candidate = directory.join(format!("{}({}){}", stem, counter, extension));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Scratch directories kept under the configured cache root
#[derive(Debug, Clone)]
pub struct CacheDirs {
    root: PathBuf,
}

impl CacheDirs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where extracted thumbnails go
    pub fn thumbnails(&self) -> PathBuf {
        self.root.join("thumbnails")
    }

    /// Where join intermediates, concat lists and merged files go
    pub fn join(&self) -> PathBuf {
        self.root.join("join")
    }

    /// Delete every file under the thumbnail and join directories.
    /// Missing directories are fine; files that cannot be removed are skipped.
    pub fn clear(&self) -> DomainResult<usize> {
        let mut removed = 0;

        for dir in [self.thumbnails(), self.join()] {
            if !dir.exists() {
                continue;
            }

            for entry in WalkDir::new(&dir).into_iter().filter_map(Result::ok) {
                if !entry.file_type().is_file() {
                    continue;
                }
                match std::fs::remove_file(entry.path()) {
                    Ok(()) => removed += 1,
                    Err(e) => debug!("Skipping cache file {}: {}", entry.path().display(), e),
                }
            }
        }

        info!("Cleared {} cached files under {}", removed, self.root.display());
        Ok(removed)
    }
}
