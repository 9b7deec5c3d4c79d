//! # ripple - Incremental Code Intelligence
//!
//! Turn a diff into a report of what changed structurally, what it
//! transitively impacts, and which removed public symbols will break
//! dependents.
//!
//! ## Features
//!
//! - **Diff parsing**: unified `git diff` text into per-file changes
//! - **Cached summaries**: exports, imports, classes, functions, and a
//!   bounded complexity score per file, recomputed only when touched
//! - **Dependency graph**: resolved import edges, depth, critical-module
//!   flags, cycle detection
//! - **Impact analysis**: "what breaks if I touch file X"
//! - **Breaking changes**: removed public symbols between revisions
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::PathBuf;
//! use ripple::{impacted_by, Pipeline, RunOptions};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut pipeline = Pipeline::new(".")?;
//!
//! // Diff text comes from your VCS integration
//! let diff = std::fs::read_to_string("changes.diff")?;
//! let report = pipeline.run(&diff, &[PathBuf::from("src")], RunOptions::default())?;
//!
//! for change in &report.breaking_changes {
//!     println!("{}: {} {}", change.file_path, change.kind, change.symbol_name);
//! }
//!
//! // The rebuilt graph stays queryable
//! if let Some(graph) = pipeline.graph() {
//!     let blast_radius = impacted_by(graph, "src/models.py");
//!     println!("{} files depend on src/models.py", blast_radius.len() - 1);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The language parser is pluggable: implement
//! [`SymbolParser`](parser::SymbolParser) and hand it to
//! [`Pipeline::with_parser`] to analyze something other than Python.

pub mod breaking;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod diff;
pub mod extract;
pub mod graph;
pub mod impact;
pub mod parser;
pub mod pipeline;
pub mod resolve;
pub mod source;
pub mod summary;

pub use breaking::{detect, BreakingChange, BreakingKind};
pub use cache::{CacheStats, SummaryCache};
pub use cancel::CancelToken;
pub use config::PipelineConfig;
pub use diff::{parse_diff, ChangeKind, DiffReport, FileChange};
pub use extract::Extractor;
pub use graph::{Cycle, DependencyGraph, DependencyNode, GraphBuilder};
pub use impact::{impacted_by, impacted_by_many};
pub use pipeline::{Pipeline, RunOptions, RunPhase, RunReport};
pub use summary::FileSummary;
