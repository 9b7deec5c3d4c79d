//! Pluggable symbol extraction
//!
//! A [`SymbolParser`] turns one source file into raw structural facts:
//! declared exports, imports, top-level definitions, and control-flow
//! counts. The summarization and caching contract lives above this seam
//! (see [`crate::summary`] and [`crate::extract`]); parsers only report
//! what the source says.

use std::path::Path;

use thiserror::Error;

mod python;

pub use python::PythonParser;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("Failed to parse: {0}")]
    ParseFailed(String),
    #[error("Failed to load grammar: {0}")]
    GrammarLoad(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw structural facts about one source file.
///
/// All symbol lists carry names only, in source order, undeduplicated;
/// the summarizer owns dedup, visibility filtering, and scoring.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSymbols {
    /// First line of the module doc comment, if any
    pub doc_line: Option<String>,
    /// Explicit public-surface declaration (`__all__` in Python), if any
    pub declared_exports: Option<Vec<String>>,
    /// Referenced module identifiers (dotted form, e.g. `pkg.util`)
    pub imports: Vec<String>,
    /// Top-level class names
    pub classes: Vec<String>,
    /// Top-level function names (nested functions and methods excluded)
    pub functions: Vec<String>,
    /// Loop statements anywhere in the file
    pub loop_count: usize,
    /// Conditional statements/expressions anywhere in the file
    pub conditional_count: usize,
    /// Total source lines
    pub loc_count: usize,
}

/// Language parser seam. Implementations must be cheap to call per file
/// and safe to share across extraction workers.
pub trait SymbolParser: Send + Sync {
    /// Whether this parser handles the given path (by extension)
    fn supports(&self, path: &Path) -> bool;

    /// Parse file content into raw symbols.
    ///
    /// `path` is for diagnostics only; content is always supplied by the
    /// caller, never read here.
    fn parse(&self, path: &Path, content: &str) -> Result<RawSymbols, ParserError>;
}
