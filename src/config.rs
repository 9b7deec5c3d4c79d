//! Configuration file support
//!
//! Config files are loaded in order (later overrides earlier):
//! 1. `~/.config/ripple/config.toml` (user defaults)
//! 2. `.ripple.toml` in the project root (project overrides)
//!
//! Values passed programmatically override all config file values.

use std::path::Path;

use serde::Deserialize;

/// Tunable pipeline options loaded from config files
///
/// # Example
///
/// ```toml
/// # ~/.config/ripple/config.toml or .ripple.toml
/// critical_threshold = 5      # importers needed to flag a module critical
/// max_file_size = 1048576     # bytes; larger files are skipped
/// source_extensions = ["py"]  # extensions enumerated under root dirs
/// package_init = "__init__.py"
/// private_prefix = "_"
/// workers = 4                 # extraction worker threads
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Reverse-edge count at which a module is flagged critical
    pub critical_threshold: Option<usize>,
    /// Maximum source file size to enumerate (bytes)
    pub max_file_size: Option<u64>,
    /// File extensions treated as source under root dirs
    pub source_extensions: Option<Vec<String>>,
    /// Package init filename for import resolution fallback
    pub package_init: Option<String>,
    /// Name prefix marking symbols private
    pub private_prefix: Option<String>,
    /// Extraction worker pool size (defaults to available parallelism)
    pub workers: Option<usize>,
}

impl PipelineConfig {
    /// Load configuration from user and project config files
    pub fn load(project_root: &Path) -> Self {
        let user_config = dirs::config_dir()
            .map(|d| d.join("ripple/config.toml"))
            .and_then(|p| Self::load_file(&p))
            .unwrap_or_default();

        let project_config =
            Self::load_file(&project_root.join(".ripple.toml")).unwrap_or_default();

        // Project overrides user
        let merged = user_config.override_with(project_config);
        tracing::debug!(
            critical_threshold = ?merged.critical_threshold,
            max_file_size = ?merged.max_file_size,
            workers = ?merged.workers,
            "Effective config after merge"
        );
        merged
    }

    /// Load configuration from a specific file
    fn load_file(path: &Path) -> Option<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read config {}: {}", path.display(), e);
                return None;
            }
        };

        match toml::from_str::<Self>(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("Failed to parse config {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Layer another config on top (other overrides self where present)
    pub fn override_with(self, other: Self) -> Self {
        PipelineConfig {
            critical_threshold: other.critical_threshold.or(self.critical_threshold),
            max_file_size: other.max_file_size.or(self.max_file_size),
            source_extensions: other.source_extensions.or(self.source_extensions),
            package_init: other.package_init.or(self.package_init),
            private_prefix: other.private_prefix.or(self.private_prefix),
            workers: other.workers.or(self.workers),
        }
    }

    // ===== Accessors with defaults =====

    /// Default importer count at which a module is flagged critical
    pub const DEFAULT_CRITICAL_THRESHOLD: usize = 5;
    /// Default maximum source file size (1MB)
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;
    /// Default package init filename
    pub const DEFAULT_PACKAGE_INIT: &'static str = "__init__.py";

    pub fn critical_threshold_or_default(&self) -> usize {
        self.critical_threshold
            .unwrap_or(Self::DEFAULT_CRITICAL_THRESHOLD)
    }

    pub fn max_file_size_or_default(&self) -> u64 {
        self.max_file_size.unwrap_or(Self::DEFAULT_MAX_FILE_SIZE)
    }

    pub fn source_extensions_or_default(&self) -> Vec<String> {
        self.source_extensions
            .clone()
            .unwrap_or_else(|| vec!["py".to_string()])
    }

    pub fn package_init_or_default(&self) -> String {
        self.package_init
            .clone()
            .unwrap_or_else(|| Self::DEFAULT_PACKAGE_INIT.to_string())
    }

    pub fn private_prefix_or_default(&self) -> String {
        self.private_prefix
            .clone()
            .unwrap_or_else(|| crate::summary::DEFAULT_PRIVATE_PREFIX.to_string())
    }

    pub fn workers_or_default(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}
