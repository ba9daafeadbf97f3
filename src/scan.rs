//! Directory scanning for wallpaper candidates.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use tracing::{debug, warn};

use crate::error::Error;

/// Extensions recognised as wallpapers (lowercase, without dot).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "jng"];

/// Produces the ordered wallpaper set under a root.
///
/// Implementations must return the same order for an unchanged tree;
/// reconciliation matches files to permutation slots by position alone.
pub trait FileLister {
    /// Enumerate every wallpaper under `root`.
    ///
    /// # Errors
    /// Returns [`Error::Enumeration`] if `root` itself cannot be opened.
    fn list(&self, root: &Path) -> Result<Vec<PathBuf>, Error>;

    /// Whether `path` is still present.
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Walks the filesystem depth-first in file-name order.
///
/// Traversal is iterative: `walkdir` keeps an explicit stack of open
/// directory readers, so deep trees do not grow the call stack and every
/// handle is released when its directory is exhausted.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryLister;

impl FileLister for DirectoryLister {
    fn list(&self, root: &Path) -> Result<Vec<PathBuf>, Error> {
        fs::read_dir(root).map_err(|source| Error::Enumeration {
            path: root.to_path_buf(),
            source,
        })?;

        let mut out = Vec::new();
        let walk = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e));
        for entry in walk {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    // Follows symlinks, like `exists`.
                    if path.is_file() && is_supported_image(path) {
                        out.push(path.to_path_buf());
                    }
                }
                Err(err) if err.depth() == 0 => {
                    return Err(Error::Enumeration {
                        path: root.to_path_buf(),
                        source: err.into(),
                    });
                }
                Err(err) => {
                    warn!(error = %err, "skipping unreadable entry");
                }
            }
        }
        debug!(root = %root.display(), count = out.len(), "enumerated wallpapers");
        Ok(out)
    }
}

/// Return `true` if `path` carries an allowed image extension, ignoring case.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

fn is_hidden(entry: &DirEntry) -> bool {
    // Never skip the root; tempfile roots can be dot-dirs.
    if entry.depth() == 0 {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|n| n.starts_with('.'))
}
