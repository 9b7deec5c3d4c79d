//! Pipeline orchestration
//!
//! Wires diff parsing, summary extraction, graph rebuild, and
//! breaking-change detection into one run. A run always produces a
//! [`RunReport`] unless progress is meaningless (no enumerable root at
//! all); everything recoverable lands in `report.errors` and callers
//! branch on non-emptiness, not on exceptions.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::breaking::{self, BreakingChange};
use crate::cache::SummaryCache;
use crate::cancel::CancelToken;
use crate::config::PipelineConfig;
use crate::diff::parse_diff;
use crate::extract::{ExtractionFailure, Extractor};
use crate::graph::{DependencyGraph, GraphBuildError, GraphBuilder};
use crate::parser::{PythonParser, SymbolParser};
use crate::summary::FileSummary;

/// Where a run currently is (or stopped)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    ParsingDiff,
    UpdatingContexts,
    RebuildingGraph,
    DetectingBreaks,
    Done,
    Failed,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ParsingDiff => "parsing_diff",
            Self::UpdatingContexts => "updating_contexts",
            Self::RebuildingGraph => "rebuilding_graph",
            Self::DetectingBreaks => "detecting_breaks",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Which recoverable failure class an issue belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    /// Unreadable or unparseable source file, recovered with a minimal
    /// summary
    Extraction,
    /// A root directory that could not be enumerated and was skipped
    GraphBuild,
}

/// One recovered error, aggregated into [`RunReport::errors`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunIssue {
    pub category: IssueCategory,
    pub path: Option<String>,
    pub message: String,
}

impl From<ExtractionFailure> for RunIssue {
    fn from(failure: ExtractionFailure) -> Self {
        Self {
            category: IssueCategory::Extraction,
            path: Some(failure.path),
            message: failure.message,
        }
    }
}

/// Caller-supplied run options
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Whether the supplied diff text covers staged changes. Diff
    /// acquisition is the caller's job, so this is metadata echoed into
    /// the report, not a behavior switch.
    pub include_staged: bool,
}

/// Immutable result of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Diff files whose summaries were recomputed (successfully or not)
    pub files_processed: usize,
    /// Cache lookups during the graph rebuild that were already fresh
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub breaking_changes: Vec<BreakingChange>,
    pub errors: Vec<RunIssue>,
    pub duration_ms: u64,
    pub cancelled: bool,
    pub include_staged: bool,
    /// Last phase entered; [`RunPhase::Done`] for complete runs
    pub phase_reached: RunPhase,
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("graph build failed: {0}")]
    Graph(#[from] GraphBuildError),
    #[error("fatal pipeline error: {0}")]
    Fatal(String),
}

/// One summary recompute, with the prior summary captured first
struct Recompute {
    old: Option<FileSummary>,
    new: FileSummary,
    failure: Option<ExtractionFailure>,
}

/// Orchestrates a full run over a diff. Owns the cache handle, the
/// extractor, and a bounded worker pool; the dependency graph of the most
/// recent run stays queryable via [`Pipeline::graph`].
pub struct Pipeline {
    root: PathBuf,
    config: PipelineConfig,
    extractor: Extractor,
    pool: rayon::ThreadPool,
    phase: RunPhase,
    graph: Option<DependencyGraph>,
}

impl Pipeline {
    /// Pipeline rooted at a project directory, config loaded from the
    /// usual files (see [`PipelineConfig::load`]).
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, RunError> {
        let root = root.into();
        let config = PipelineConfig::load(&root);
        Self::with_config(root, config)
    }

    pub fn with_config(root: impl Into<PathBuf>, config: PipelineConfig) -> Result<Self, RunError> {
        let root = root.into();
        let root = dunce::canonicalize(&root).unwrap_or(root);
        let cache = Arc::new(SummaryCache::new());
        let extractor = Extractor::new(
            Box::new(PythonParser::new()),
            cache,
            &root,
            config.private_prefix_or_default(),
        );
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers_or_default())
            .build()
            .map_err(|e| RunError::Fatal(format!("worker pool: {e}")))?;

        Ok(Self {
            root,
            config,
            extractor,
            pool,
            phase: RunPhase::Idle,
            graph: None,
        })
    }

    /// Swap in a different language parser (same cache)
    pub fn with_parser(mut self, parser: Box<dyn SymbolParser>) -> Self {
        let cache = self.extractor.cache().clone();
        self.extractor = Extractor::new(
            parser,
            cache,
            &self.root,
            self.config.private_prefix_or_default(),
        );
        self
    }

    /// Share or restore a cache (e.g. one rebuilt from a snapshot)
    pub fn with_cache(mut self, cache: Arc<SummaryCache>) -> Self {
        let parser = Box::new(PythonParser::new());
        self.extractor = Extractor::new(
            parser,
            cache,
            &self.root,
            self.config.private_prefix_or_default(),
        );
        self
    }

    pub fn cache(&self) -> &Arc<SummaryCache> {
        self.extractor.cache()
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Dependency graph from the most recent run, if one completed the
    /// rebuild phase
    pub fn graph(&self) -> Option<&DependencyGraph> {
        self.graph.as_ref()
    }

    /// Run the pipeline over one diff.
    pub fn run(
        &mut self,
        diff_text: &str,
        roots: &[PathBuf],
        options: RunOptions,
    ) -> Result<RunReport, RunError> {
        self.run_with_cancel(diff_text, roots, options, &CancelToken::new())
    }

    /// Like [`Pipeline::run`], checking the token between files. A
    /// cancelled run still returns a partial report of completed work.
    pub fn run_with_cancel(
        &mut self,
        diff_text: &str,
        roots: &[PathBuf],
        options: RunOptions,
        cancel: &CancelToken,
    ) -> Result<RunReport, RunError> {
        let _span = tracing::info_span!("pipeline_run", roots = roots.len()).entered();
        let started = Instant::now();
        let stats_before = self.extractor.cache().stats();
        let mut errors: Vec<RunIssue> = Vec::new();

        self.phase = RunPhase::ParsingDiff;
        let diff = parse_diff(diff_text);
        tracing::debug!(
            files = diff.total_files_changed,
            added = diff.files_added.len(),
            modified = diff.files_modified.len(),
            "Diff parsed"
        );

        self.phase = RunPhase::UpdatingContexts;
        let targets: Vec<String> = diff
            .recompute_targets()
            .into_iter()
            .filter(|path| {
                let supported = self.extractor.supports(path);
                if !supported {
                    tracing::debug!(path = %path, "Skipping non-source diff path");
                }
                supported
            })
            .collect();

        let extractor = &self.extractor;
        let recomputes: Vec<Recompute> = self.pool.install(|| {
            targets
                .par_iter()
                .filter_map(|path| {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    // Capture the prior summary before the forced
                    // recompute so detection never compares a summary
                    // against itself.
                    let old = extractor.get_summary(path);
                    let (new, failure) = extractor.update_summary(path);
                    Some(Recompute { old, new, failure })
                })
                .collect()
        });

        let files_processed = recomputes.len();
        for recompute in &recomputes {
            if let Some(failure) = &recompute.failure {
                errors.push(failure.clone().into());
            }
        }

        if cancel.is_cancelled() {
            let breaking_changes = detect_all(&recomputes);
            return Ok(self.finish(
                started,
                stats_before,
                files_processed,
                breaking_changes,
                errors,
                options,
                true,
                RunPhase::UpdatingContexts,
            ));
        }

        self.phase = RunPhase::RebuildingGraph;
        let builder = GraphBuilder::new(&self.extractor, &self.config);
        let outcome = match self.pool.install(|| builder.build_with_cancel(roots, cancel)) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Graph rebuild failed");
                self.phase = RunPhase::Failed;
                return Err(e.into());
            }
        };
        for skipped in outcome.skipped_roots {
            errors.push(RunIssue {
                category: IssueCategory::GraphBuild,
                path: Some(skipped),
                message: "root directory skipped: not enumerable".to_string(),
            });
        }
        // Diff targets already carry their failure from the recompute
        // above; their cache entries are fresh, so the rebuild cannot
        // report them twice.
        errors.extend(outcome.failures.into_iter().map(RunIssue::from));
        self.graph = Some(outcome.graph);

        if cancel.is_cancelled() {
            let breaking_changes = detect_all(&recomputes);
            return Ok(self.finish(
                started,
                stats_before,
                files_processed,
                breaking_changes,
                errors,
                options,
                true,
                RunPhase::RebuildingGraph,
            ));
        }

        self.phase = RunPhase::DetectingBreaks;
        let breaking_changes = detect_all(&recomputes);

        Ok(self.finish(
            started,
            stats_before,
            files_processed,
            breaking_changes,
            errors,
            options,
            false,
            RunPhase::Done,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &mut self,
        started: Instant,
        stats_before: crate::cache::CacheStats,
        files_processed: usize,
        breaking_changes: Vec<BreakingChange>,
        errors: Vec<RunIssue>,
        options: RunOptions,
        cancelled: bool,
        phase_reached: RunPhase,
    ) -> RunReport {
        self.phase = phase_reached;
        let stats_after = self.extractor.cache().stats();
        let report = RunReport {
            files_processed,
            cache_hits: stats_after.hits - stats_before.hits,
            cache_misses: stats_after.misses - stats_before.misses,
            breaking_changes,
            errors,
            duration_ms: started.elapsed().as_millis() as u64,
            cancelled,
            include_staged: options.include_staged,
            phase_reached,
        };
        tracing::info!(
            files = report.files_processed,
            breaking = report.breaking_changes.len(),
            errors = report.errors.len(),
            cancelled = report.cancelled,
            duration_ms = report.duration_ms,
            "Pipeline run finished"
        );
        report
    }
}

/// Per-path comparison against the summary captured just before that
/// path's recompute in this run
fn detect_all(recomputes: &[Recompute]) -> Vec<BreakingChange> {
    let mut changes = Vec::new();
    for recompute in recomputes {
        changes.extend(breaking::detect(recompute.old.as_ref(), &recompute.new));
    }
    changes
}
