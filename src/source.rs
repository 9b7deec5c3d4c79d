//! Source-file enumeration under root directories
//!
//! Uses the `ignore` crate to respect .gitignore rules, filters by the
//! configured source extensions, and skips oversized files. Enumerated
//! paths are keyed relative to the project root so diff paths, cache keys,
//! and graph nodes all agree.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::extract::normalize_key;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Root directory not found: {0}")]
    RootNotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One enumerated source file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceFile {
    /// Project-relative, `/`-separated cache/graph key
    pub key: String,
    /// Absolute path on disk
    pub abs: PathBuf,
}

/// The root prefix (as a key) plus its files, used for import resolution
#[derive(Debug, Clone)]
pub struct RootListing {
    /// Project-relative key of the root dir, empty for the project root
    pub prefix: String,
    pub files: Vec<SourceFile>,
}

/// Enumerate source files under one root directory.
///
/// `project_root` anchors relative keys; `root` may be absolute or
/// relative to it. A missing root is an error the caller decides how to
/// treat (the graph builder skips it with a warning).
pub fn enumerate_root(
    project_root: &Path,
    root: &Path,
    config: &PipelineConfig,
) -> Result<RootListing, SourceError> {
    let abs_root = if root.is_absolute() {
        root.to_path_buf()
    } else {
        project_root.join(root)
    };
    let abs_root = dunce::canonicalize(&abs_root)
        .map_err(|_| SourceError::RootNotFound(abs_root.display().to_string()))?;
    if !abs_root.is_dir() {
        return Err(SourceError::RootNotFound(abs_root.display().to_string()));
    }

    let extensions = config.source_extensions_or_default();
    let max_file_size = config.max_file_size_or_default();

    let mut files = Vec::new();
    let walker = WalkBuilder::new(&abs_root)
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .build();

    for entry in walker.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let matches_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| extensions.iter().any(|want| want == ext));
        if !matches_extension {
            continue;
        }

        if let Ok(meta) = path.metadata() {
            if meta.len() > max_file_size {
                tracing::debug!(
                    "Skipping large file: {} ({} bytes)",
                    path.display(),
                    meta.len()
                );
                continue;
            }
        }

        files.push(SourceFile {
            key: key_for(project_root, path),
            abs: path.to_path_buf(),
        });
    }

    // Stable order keeps graph builds deterministic
    files.sort();

    Ok(RootListing {
        prefix: key_for(project_root, &abs_root),
        files,
    })
}

/// Project-relative `/`-separated key; falls back to the absolute path
/// when the file lies outside the project root.
fn key_for(project_root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(project_root).unwrap_or(path);
    let key = normalize_key(&rel.to_string_lossy());
    if key == "." {
        String::new()
    } else {
        key
    }
}
