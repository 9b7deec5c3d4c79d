//! Import dependency graph
//!
//! Builds the project-wide import graph from cached summaries: forward
//! edges from resolved imports, reverse edges as the exact transpose,
//! depth by multi-source BFS from the zero-import leaves, criticality from
//! reverse-edge counts, and cycles by DFS with a recursion stack.
//!
//! Nodes reference each other by path-string keys in a flat map, never by
//! owned pointers, so cyclic graphs are just edges in an index and the
//! whole structure stays serializable.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cancel::CancelToken;
use crate::config::PipelineConfig;
use crate::extract::{ExtractionFailure, Extractor};
use crate::resolve::ImportResolver;
use crate::source::{enumerate_root, SourceFile};

#[derive(Error, Debug)]
pub enum GraphBuildError {
    #[error("No enumerable root directory among: {0}")]
    NoEnumerableRoot(String),
}

/// One module in the dependency graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyNode {
    pub path: String,
    /// Files this module imports, resolved to project-relative keys
    pub imports_resolved: Vec<String>,
    /// Files importing this module (exact transpose of `imports_resolved`)
    pub imported_by: Vec<String>,
    /// Distance above the zero-import leaves; 0 for leaves and for nodes
    /// unreachable from any leaf (cycle-isolated, a documented
    /// approximation)
    pub depth: usize,
    /// Whether `imported_by` meets the configured critical threshold
    pub is_critical: bool,
}

/// An ordered closed import loop. Builds may report several, possibly
/// overlapping, cycles; there is no dedup pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub members: Vec<String>,
}

/// The full node map, rebuilt wholesale per build. Always a derived view
/// over the summary cache, never independently mutated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub nodes: HashMap<String, DependencyNode>,
    pub cycles: Vec<Cycle>,
}

impl DependencyGraph {
    pub fn node(&self, path: &str) -> Option<&DependencyNode> {
        self.nodes.get(path)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Paths flagged critical, sorted
    pub fn critical_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self
            .nodes
            .values()
            .filter(|n| n.is_critical)
            .map(|n| n.path.as_str())
            .collect();
        paths.sort_unstable();
        paths
    }
}

/// Everything a build produced: the graph plus recovered per-file trouble
#[derive(Debug, Default)]
pub struct BuildOutcome {
    pub graph: DependencyGraph,
    /// Extraction failures recovered with minimal summaries
    pub failures: Vec<ExtractionFailure>,
    /// Roots that could not be enumerated (missing, unreadable)
    pub skipped_roots: Vec<String>,
}

/// Builds a [`DependencyGraph`] from summaries, computing them on demand
/// through the extractor's cache.
pub struct GraphBuilder<'a> {
    extractor: &'a Extractor,
    config: &'a PipelineConfig,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(extractor: &'a Extractor, config: &'a PipelineConfig) -> Self {
        Self { extractor, config }
    }

    /// Full rebuild over the given roots.
    pub fn build(&self, roots: &[PathBuf]) -> Result<BuildOutcome, GraphBuildError> {
        self.build_with_cancel(roots, &CancelToken::new())
    }

    /// Full rebuild, checking the token between files. A cancelled build
    /// returns the nodes completed so far rather than discarding them.
    pub fn build_with_cancel(
        &self,
        roots: &[PathBuf],
        cancel: &CancelToken,
    ) -> Result<BuildOutcome, GraphBuildError> {
        let _span = tracing::info_span!("graph_build", roots = roots.len()).entered();

        let mut listings = Vec::new();
        let mut skipped_roots = Vec::new();
        for root in roots {
            match enumerate_root(self.extractor.root(), root, self.config) {
                Ok(listing) => listings.push(listing),
                Err(e) => {
                    tracing::warn!(root = %root.display(), error = %e, "Skipping root directory");
                    skipped_roots.push(root.display().to_string());
                }
            }
        }
        if listings.is_empty() {
            let attempted: Vec<String> =
                roots.iter().map(|r| r.display().to_string()).collect();
            return Err(GraphBuildError::NoEnumerableRoot(attempted.join(", ")));
        }

        let root_prefixes: Vec<String> = listings.iter().map(|l| l.prefix.clone()).collect();

        // Overlapping roots may list a file twice; first root wins
        let mut seen = HashSet::new();
        let mut files: Vec<SourceFile> = Vec::new();
        for listing in listings {
            for file in listing.files {
                if seen.insert(file.key.clone()) {
                    files.push(file);
                }
            }
        }

        // Summaries in parallel; the cache partitions writes by path
        // because every file appears exactly once in `files`.
        let extracted: Vec<(String, Vec<String>, Option<ExtractionFailure>)> = files
            .par_iter()
            .filter_map(|file| {
                if cancel.is_cancelled() {
                    return None;
                }
                let (summary, failure) = self.extractor.get_or_compute(&file.key);
                Some((file.key.clone(), summary.imports, failure))
            })
            .collect();

        let mut failures = Vec::new();
        let mut imports_by_key: Vec<(String, Vec<String>)> = Vec::with_capacity(extracted.len());
        for (key, imports, failure) in extracted {
            if let Some(failure) = failure {
                failures.push(failure);
            }
            imports_by_key.push((key, imports));
        }
        imports_by_key.sort_by(|a, b| a.0.cmp(&b.0));

        let known: HashSet<String> = imports_by_key.iter().map(|(k, _)| k.clone()).collect();
        let extensions = self.config.source_extensions_or_default();
        let package_init = self.config.package_init_or_default();
        let resolver = ImportResolver::new(&known, &root_prefixes, &extensions, &package_init);

        let mut forward: HashMap<String, Vec<String>> = HashMap::new();
        let mut reverse: HashMap<String, Vec<String>> = HashMap::new();
        for key in &known {
            forward.insert(key.clone(), Vec::new());
            reverse.insert(key.clone(), Vec::new());
        }

        for (key, imports) in &imports_by_key {
            for identifier in imports {
                let Some(target) = resolver.resolve(identifier) else {
                    // External dependency, silently dropped
                    continue;
                };
                if target == *key {
                    continue;
                }
                let edges = forward.entry(key.clone()).or_default();
                if !edges.contains(&target) {
                    edges.push(target.clone());
                    reverse.entry(target).or_default().push(key.clone());
                }
            }
        }
        for edges in forward.values_mut() {
            edges.sort_unstable();
        }
        for edges in reverse.values_mut() {
            edges.sort_unstable();
        }

        let depths = compute_depths(&imports_by_key, &forward, &reverse);
        let cycles = detect_cycles(&imports_by_key, &forward);
        let critical_threshold = self.config.critical_threshold_or_default();

        let mut nodes = HashMap::with_capacity(imports_by_key.len());
        for (key, _) in imports_by_key {
            let imports_resolved = forward.remove(&key).unwrap_or_default();
            let imported_by = reverse.remove(&key).unwrap_or_default();
            let node = DependencyNode {
                depth: depths.get(&key).copied().unwrap_or(0),
                is_critical: imported_by.len() >= critical_threshold,
                imports_resolved,
                imported_by,
                path: key.clone(),
            };
            nodes.insert(key, node);
        }

        tracing::info!(
            nodes = nodes.len(),
            cycles = cycles.len(),
            failures = failures.len(),
            "Dependency graph built"
        );

        Ok(BuildOutcome {
            graph: DependencyGraph { nodes, cycles },
            failures,
            skipped_roots,
        })
    }
}

/// Multi-source BFS seeded at every zero-import node (depth 0), pushing
/// minimum depths up the reverse edges. Nodes no leaf can reach keep
/// depth 0.
fn compute_depths(
    keys_sorted: &[(String, Vec<String>)],
    forward: &HashMap<String, Vec<String>>,
    reverse: &HashMap<String, Vec<String>>,
) -> HashMap<String, usize> {
    let mut depths: HashMap<String, usize> = HashMap::new();
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();

    for (key, _) in keys_sorted {
        if forward.get(key).map_or(true, Vec::is_empty) {
            depths.insert(key.clone(), 0);
            queue.push_back((key.clone(), 0));
        }
    }

    while let Some((current, d)) = queue.pop_front() {
        if let Some(importers) = reverse.get(&current) {
            for importer in importers {
                match depths.entry(importer.clone()) {
                    Entry::Vacant(e) => {
                        e.insert(d + 1);
                        queue.push_back((importer.clone(), d + 1));
                    }
                    Entry::Occupied(mut e) => {
                        // Keep the shortest path from any leaf
                        if d + 1 < *e.get() {
                            *e.get_mut() = d + 1;
                            queue.push_back((importer.clone(), d + 1));
                        }
                    }
                }
            }
        }
    }

    depths
}

/// DFS from every node with a recursion stack and an ordered path. On
/// revisiting an on-stack node, the sub-path from its first occurrence is
/// one cycle. Globally-visited nodes outside the current tree are not
/// re-explored, so overlapping cycles may or may not all surface,
/// acceptable for reporting, which only promises at least one per loop.
fn detect_cycles(
    keys_sorted: &[(String, Vec<String>)],
    forward: &HashMap<String, Vec<String>>,
) -> Vec<Cycle> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut cycles = Vec::new();

    for (key, _) in keys_sorted {
        if !visited.contains(key) {
            let mut on_stack = HashSet::new();
            let mut path = Vec::new();
            dfs_cycles(key, forward, &mut visited, &mut on_stack, &mut path, &mut cycles);
        }
    }

    cycles
}

fn dfs_cycles(
    node: &str,
    forward: &HashMap<String, Vec<String>>,
    visited: &mut HashSet<String>,
    on_stack: &mut HashSet<String>,
    path: &mut Vec<String>,
    cycles: &mut Vec<Cycle>,
) {
    visited.insert(node.to_string());
    on_stack.insert(node.to_string());
    path.push(node.to_string());

    if let Some(targets) = forward.get(node) {
        for next in targets {
            if on_stack.contains(next) {
                if let Some(pos) = path.iter().position(|p| p == next) {
                    cycles.push(Cycle {
                        members: path[pos..].to_vec(),
                    });
                }
            } else if !visited.contains(next) {
                dfs_cycles(next, forward, visited, on_stack, path, cycles);
            }
        }
    }

    path.pop();
    on_stack.remove(node);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SummaryCache;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn project(files: &[(&str, &str)]) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        let root = dunce::canonicalize(dir.path()).unwrap();
        (dir, root)
    }

    fn build(root: &Path, config: &PipelineConfig) -> BuildOutcome {
        let extractor = Extractor::with_default_parser(Arc::new(SummaryCache::new()), root);
        GraphBuilder::new(&extractor, config)
            .build(&[PathBuf::from(".")])
            .unwrap()
    }

    #[test]
    fn test_forward_and_reverse_edges() {
        let (_dir, root) = project(&[
            ("app.py", "import util\n"),
            ("util.py", "x = 1\n"),
        ]);
        let outcome = build(&root, &PipelineConfig::default());
        let graph = outcome.graph;

        assert_eq!(graph.node("app.py").unwrap().imports_resolved, vec!["util.py"]);
        assert_eq!(graph.node("util.py").unwrap().imported_by, vec!["app.py"]);
        assert!(graph.node("app.py").unwrap().imported_by.is_empty());
    }

    #[test]
    fn test_external_imports_dropped() {
        let (_dir, root) = project(&[("app.py", "import os\nimport numpy\n")]);
        let outcome = build(&root, &PipelineConfig::default());
        assert!(outcome.graph.node("app.py").unwrap().imports_resolved.is_empty());
        assert!(outcome.failures.is_empty(), "external imports are not errors");
    }

    #[test]
    fn test_depths_from_leaves() {
        let (_dir, root) = project(&[
            ("leaf.py", "x = 1\n"),
            ("mid.py", "import leaf\n"),
            ("top.py", "import mid\n"),
        ]);
        let graph = build(&root, &PipelineConfig::default()).graph;

        assert_eq!(graph.node("leaf.py").unwrap().depth, 0);
        assert_eq!(graph.node("mid.py").unwrap().depth, 1);
        assert_eq!(graph.node("top.py").unwrap().depth, 2);
    }

    #[test]
    fn test_depth_is_min_over_importers() {
        let (_dir, root) = project(&[
            ("leaf.py", "x = 1\n"),
            ("mid.py", "import leaf\n"),
            ("top.py", "import mid\nimport leaf\n"),
        ]);
        let graph = build(&root, &PipelineConfig::default()).graph;
        // top imports leaf directly, so its shortest path from a leaf is 1
        assert_eq!(graph.node("top.py").unwrap().depth, 1);
    }

    #[test]
    fn test_isolated_file_depth_zero_never_critical() {
        let (_dir, root) = project(&[("alone.py", "x = 1\n")]);
        let graph = build(&root, &PipelineConfig::default()).graph;
        let node = graph.node("alone.py").unwrap();
        assert_eq!(node.depth, 0);
        assert!(!node.is_critical);
        assert!(node.imports_resolved.is_empty());
        assert!(node.imported_by.is_empty());
    }

    #[test]
    fn test_cycle_members_depth_zero() {
        let (_dir, root) = project(&[
            ("a.py", "import b\n"),
            ("b.py", "import a\n"),
        ]);
        let graph = build(&root, &PipelineConfig::default()).graph;
        // No zero-import leaf reaches a two-cycle; both keep the default
        assert_eq!(graph.node("a.py").unwrap().depth, 0);
        assert_eq!(graph.node("b.py").unwrap().depth, 0);
    }

    #[test]
    fn test_three_cycle_detected() {
        let (_dir, root) = project(&[
            ("a.py", "import b\n"),
            ("b.py", "import c\n"),
            ("c.py", "import a\n"),
        ]);
        let graph = build(&root, &PipelineConfig::default()).graph;

        assert!(!graph.cycles.is_empty());
        let members: HashSet<&str> = graph.cycles[0]
            .members
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(members, HashSet::from(["a.py", "b.py", "c.py"]));
    }

    #[test]
    fn test_critical_threshold() {
        let (_dir, root) = project(&[
            ("hub.py", "x = 1\n"),
            ("u1.py", "import hub\n"),
            ("u2.py", "import hub\n"),
            ("u3.py", "import hub\n"),
        ]);
        let config = PipelineConfig {
            critical_threshold: Some(3),
            ..PipelineConfig::default()
        };
        let graph = build(&root, &config).graph;
        assert!(graph.node("hub.py").unwrap().is_critical);
        assert!(!graph.node("u1.py").unwrap().is_critical);
        assert_eq!(graph.critical_paths(), vec!["hub.py"]);
    }

    #[test]
    fn test_build_is_idempotent() {
        let (_dir, root) = project(&[
            ("app.py", "import util\nimport helpers\n"),
            ("util.py", "import helpers\n"),
            ("helpers.py", "x = 1\n"),
        ]);
        let extractor = Extractor::with_default_parser(Arc::new(SummaryCache::new()), &root);
        let config = PipelineConfig::default();
        let builder = GraphBuilder::new(&extractor, &config);

        let first = builder.build(&[PathBuf::from(".")]).unwrap().graph;
        let second = builder.build(&[PathBuf::from(".")]).unwrap().graph;
        assert_eq!(first.nodes, second.nodes);
    }

    #[test]
    fn test_second_build_hits_cache() {
        let (_dir, root) = project(&[("a.py", "x = 1\n"), ("b.py", "y = 2\n")]);
        let extractor = Extractor::with_default_parser(Arc::new(SummaryCache::new()), &root);
        let config = PipelineConfig::default();
        let builder = GraphBuilder::new(&extractor, &config);

        builder.build(&[PathBuf::from(".")]).unwrap();
        let after_first = extractor.cache().stats();
        assert_eq!(after_first.misses, 2);
        assert_eq!(after_first.hits, 0);

        builder.build(&[PathBuf::from(".")]).unwrap();
        let after_second = extractor.cache().stats();
        assert_eq!(after_second.misses, 2);
        assert_eq!(after_second.hits, 2);
    }

    #[test]
    fn test_missing_root_skipped() {
        let (_dir, root) = project(&[("a.py", "x = 1\n")]);
        let extractor = Extractor::with_default_parser(Arc::new(SummaryCache::new()), &root);
        let config = PipelineConfig::default();
        let builder = GraphBuilder::new(&extractor, &config);

        let outcome = builder
            .build(&[PathBuf::from("."), PathBuf::from("no_such_dir")])
            .unwrap();
        assert_eq!(outcome.graph.len(), 1);
        assert_eq!(outcome.skipped_roots.len(), 1);
    }

    #[test]
    fn test_all_roots_missing_is_fatal() {
        let (_dir, root) = project(&[]);
        let extractor = Extractor::with_default_parser(Arc::new(SummaryCache::new()), &root);
        let config = PipelineConfig::default();
        let builder = GraphBuilder::new(&extractor, &config);

        let result = builder.build(&[PathBuf::from("ghost")]);
        assert!(matches!(result, Err(GraphBuildError::NoEnumerableRoot(_))));
    }

    #[test]
    fn test_unparseable_file_still_becomes_node() {
        let (_dir, root) = project(&[("good.py", "import bad\n")]);
        fs::write(root.join("bad.py"), [0xff, 0xfe]).unwrap();

        let outcome = build(&root, &PipelineConfig::default());
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.graph.node("bad.py").is_some());
        // The minimal summary has no imports, but the edge into it holds
        assert_eq!(outcome.graph.node("bad.py").unwrap().imported_by, vec!["good.py"]);
    }

    #[test]
    fn test_graph_serializes() {
        let (_dir, root) = project(&[("a.py", "import b\n"), ("b.py", "x = 1\n")]);
        let graph = build(&root, &PipelineConfig::default()).graph;

        let json = serde_json::to_string(&graph).unwrap();
        let restored: DependencyGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.nodes, graph.nodes);
    }
}
