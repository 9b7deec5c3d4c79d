//! Structure extraction over the summary cache
//!
//! [`Extractor`] binds a pluggable [`SymbolParser`] to a [`SummaryCache`]
//! handle and exposes the three cache operations the pipeline is built on:
//! pure read, forced recompute, and read-then-compute-on-miss. Extraction
//! failures never abort anything: the cache gets a minimal summary and the
//! failure is reported alongside for aggregation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::cache::SummaryCache;
use crate::parser::{PythonParser, SymbolParser};
use crate::summary::FileSummary;

/// A recovered per-file extraction failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionFailure {
    pub path: String,
    pub message: String,
}

/// Parser + cache handle. Cheap to share by reference across workers;
/// the cache is shared by `Arc` so callers keep an owning handle too.
pub struct Extractor {
    parser: Box<dyn SymbolParser>,
    cache: Arc<SummaryCache>,
    root: PathBuf,
    private_prefix: String,
}

impl Extractor {
    pub fn new(
        parser: Box<dyn SymbolParser>,
        cache: Arc<SummaryCache>,
        root: impl Into<PathBuf>,
        private_prefix: impl Into<String>,
    ) -> Self {
        // Canonical root keeps relative keys stable when the caller hands
        // in a symlinked or non-normalized path
        let root = root.into();
        let root = dunce::canonicalize(&root).unwrap_or(root);
        Self {
            parser,
            cache,
            root,
            private_prefix: private_prefix.into(),
        }
    }

    /// Default Python parser over a fresh project root
    pub fn with_default_parser(cache: Arc<SummaryCache>, root: impl Into<PathBuf>) -> Self {
        Self::new(
            Box::new(PythonParser::new()),
            cache,
            root,
            crate::summary::DEFAULT_PRIVATE_PREFIX,
        )
    }

    pub fn cache(&self) -> &Arc<SummaryCache> {
        &self.cache
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the injected parser handles this path
    pub fn supports(&self, path: &str) -> bool {
        self.parser.supports(Path::new(path))
    }

    /// Pure cache read. Never computes.
    pub fn get_summary(&self, path: &str) -> Option<FileSummary> {
        self.cache.get(&normalize_key(path))
    }

    /// Read file content, parse, and unconditionally overwrite the cache
    /// entry. On failure the entry becomes a minimal summary and the
    /// failure is returned for aggregation, never an abort.
    pub fn update_summary(&self, path: &str) -> (FileSummary, Option<ExtractionFailure>) {
        let key = normalize_key(path);
        let (summary, failure) = self.compute(&key);
        self.cache.insert(summary.clone());
        (summary, failure)
    }

    /// Read-then-compute-on-miss. This is the lookup whose hit/miss
    /// outcome the pipeline reports.
    pub fn get_or_compute(&self, path: &str) -> (FileSummary, Option<ExtractionFailure>) {
        let key = normalize_key(path);
        if let Some(summary) = self.cache.get(&key) {
            self.cache.record_hit();
            return (summary, None);
        }
        self.cache.record_miss();
        self.update_summary(&key)
    }

    fn compute(&self, key: &str) -> (FileSummary, Option<ExtractionFailure>) {
        let abs = self.root.join(key);

        let content = match std::fs::read_to_string(&abs) {
            Ok(content) => content.replace("\r\n", "\n"),
            Err(e) => {
                tracing::warn!(path = key, error = %e, "Failed to read source file");
                return failed(key, &format!("read failed: {e}"));
            }
        };

        if !self.parser.supports(&abs) {
            tracing::debug!(path = key, "No parser for file type");
            return failed(key, "no parser for file type");
        }

        match self.parser.parse(&abs, &content) {
            Ok(raw) => {
                let summary = FileSummary::from_raw(key, raw, &self.private_prefix);
                (summary, None)
            }
            Err(e) => {
                tracing::warn!(path = key, error = %e, "Failed to parse source file");
                failed(key, &format!("parse failed: {e}"))
            }
        }
    }
}

fn failed(key: &str, message: &str) -> (FileSummary, Option<ExtractionFailure>) {
    (
        FileSummary::unparsed(key, message),
        Some(ExtractionFailure {
            path: key.to_string(),
            message: message.to_string(),
        }),
    )
}

/// Cache keys are `/`-separated regardless of platform
pub(crate) fn normalize_key(path: &str) -> String {
    path.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn extractor(root: &Path) -> Extractor {
        Extractor::with_default_parser(Arc::new(SummaryCache::new()), root)
    }

    #[test]
    fn test_get_summary_never_computes() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "def foo():\n    pass\n").unwrap();

        let ex = extractor(dir.path());
        assert!(ex.get_summary("a.py").is_none());
        assert!(ex.cache().is_empty());
    }

    #[test]
    fn test_update_summary_overwrites() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.py");
        fs::write(&file, "def foo():\n    pass\n").unwrap();

        let ex = extractor(dir.path());
        let (first, failure) = ex.update_summary("a.py");
        assert!(failure.is_none());
        assert_eq!(first.exports, vec!["foo"]);

        fs::write(&file, "def foo():\n    pass\n\ndef bar():\n    pass\n").unwrap();
        let (second, _) = ex.update_summary("a.py");
        assert_eq!(second.exports, vec!["foo", "bar"]);
        assert_eq!(ex.get_summary("a.py").unwrap().exports, vec!["foo", "bar"]);
    }

    #[test]
    fn test_get_or_compute_counts_hits_and_misses() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "x = 1\n").unwrap();

        let ex = extractor(dir.path());
        ex.get_or_compute("a.py");
        ex.get_or_compute("a.py");
        ex.get_or_compute("a.py");

        let stats = ex.cache().stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
    }

    #[test]
    fn test_unreadable_file_recovers_with_minimal_summary() {
        let dir = TempDir::new().unwrap();
        let ex = extractor(dir.path());

        let (summary, failure) = ex.update_summary("missing.py");
        assert!(failure.is_some());
        assert!(summary.exports.is_empty());
        assert_eq!(summary.complexity_score, 0.0);
        // The minimal summary still lands in the cache
        assert!(ex.get_summary("missing.py").is_some());
    }

    #[test]
    fn test_non_utf8_file_recovers() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.py"), [0xff, 0xfe, 0x00, 0x41]).unwrap();

        let ex = extractor(dir.path());
        let (_, failure) = ex.update_summary("bad.py");
        assert!(failure.is_some());
        assert!(failure.unwrap().message.contains("read failed"));
    }

    #[test]
    fn test_private_function_excluded_from_exports() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("x.py"),
            "def foo():\n    pass\n\ndef _bar():\n    pass\n",
        )
        .unwrap();

        let ex = extractor(dir.path());
        let (summary, _) = ex.update_summary("x.py");
        assert_eq!(summary.exports, vec!["foo"]);
        assert_eq!(summary.functions, vec!["foo", "_bar"]);
    }

    #[test]
    fn test_key_normalization() {
        assert_eq!(normalize_key(r"pkg\mod.py"), "pkg/mod.py");
        assert_eq!(normalize_key("pkg/mod.py"), "pkg/mod.py");
    }
}
