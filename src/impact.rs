//! Transitive impact analysis
//!
//! BFS over reverse (`imported_by`) edges: everything that transitively
//! depends on a changed file is in its impact set.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::graph::DependencyGraph;

/// Every file transitively depending on `changed_path`, including
/// `changed_path` itself. Unknown paths yield an empty set, not an error.
pub fn impacted_by(graph: &DependencyGraph, changed_path: &str) -> HashSet<String> {
    let Some(start) = graph.node(changed_path) else {
        return HashSet::new();
    };

    let mut impacted: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();
    impacted.insert(start.path.clone());
    queue.push_back(start.path.clone());

    while let Some(current) = queue.pop_front() {
        if let Some(node) = graph.node(&current) {
            for importer in &node.imported_by {
                if impacted.insert(importer.clone()) {
                    queue.push_back(importer.clone());
                }
            }
        }
    }

    impacted
}

/// Multi-source variant: BFS from all changed paths at once, returning
/// each impacted file with its minimum distance from any starting point.
/// Cheaper than one traversal per changed file when a diff touches many.
pub fn impacted_by_many(graph: &DependencyGraph, changed_paths: &[&str]) -> HashMap<String, usize> {
    let mut impacted: HashMap<String, usize> = HashMap::new();
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();

    for &path in changed_paths {
        if graph.node(path).is_some() {
            impacted.insert(path.to_string(), 0);
            queue.push_back((path.to_string(), 0));
        }
    }

    while let Some((current, d)) = queue.pop_front() {
        if let Some(node) = graph.node(&current) {
            for importer in &node.imported_by {
                match impacted.entry(importer.clone()) {
                    Entry::Vacant(e) => {
                        e.insert(d + 1);
                        queue.push_back((importer.clone(), d + 1));
                    }
                    Entry::Occupied(mut e) => {
                        // Keep the shortest distance from any changed file
                        if d + 1 < *e.get() {
                            *e.get_mut() = d + 1;
                            queue.push_back((importer.clone(), d + 1));
                        }
                    }
                }
            }
        }
    }

    impacted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DependencyNode;
    use std::collections::HashMap;

    /// Hand-built graph from forward edge pairs
    fn graph(edges: &[(&str, &str)]) -> DependencyGraph {
        let mut forward: HashMap<String, Vec<String>> = HashMap::new();
        let mut reverse: HashMap<String, Vec<String>> = HashMap::new();
        let mut all: Vec<String> = Vec::new();
        for (from, to) in edges {
            forward.entry(from.to_string()).or_default().push(to.to_string());
            reverse.entry(to.to_string()).or_default().push(from.to_string());
            for key in [from, to] {
                if !all.contains(&key.to_string()) {
                    all.push(key.to_string());
                }
            }
        }

        let mut nodes = HashMap::new();
        for key in all {
            nodes.insert(
                key.clone(),
                DependencyNode {
                    imports_resolved: forward.remove(&key).unwrap_or_default(),
                    imported_by: reverse.remove(&key).unwrap_or_default(),
                    depth: 0,
                    is_critical: false,
                    path: key,
                },
            );
        }
        DependencyGraph {
            nodes,
            cycles: Vec::new(),
        }
    }

    #[test]
    fn test_direct_and_transitive_impact() {
        // a imports b, b imports c: touching c impacts all three
        let g = graph(&[("a.py", "b.py"), ("b.py", "c.py")]);
        let impacted = impacted_by(&g, "c.py");
        assert_eq!(
            impacted,
            HashSet::from(["a.py".to_string(), "b.py".to_string(), "c.py".to_string()])
        );
    }

    #[test]
    fn test_impact_includes_self() {
        let g = graph(&[("a.py", "b.py")]);
        assert!(impacted_by(&g, "a.py").contains("a.py"));
    }

    #[test]
    fn test_leaf_change_does_not_impact_dependencies() {
        let g = graph(&[("a.py", "b.py")]);
        let impacted = impacted_by(&g, "a.py");
        assert!(!impacted.contains("b.py"), "a's dependency is not impacted by a");
    }

    #[test]
    fn test_unknown_path_yields_empty_set() {
        let g = graph(&[("a.py", "b.py")]);
        assert!(impacted_by(&g, "ghost.py").is_empty());
    }

    #[test]
    fn test_impact_in_cycle_terminates() {
        let g = graph(&[("a.py", "b.py"), ("b.py", "a.py")]);
        let impacted = impacted_by(&g, "a.py");
        assert_eq!(impacted.len(), 2);
    }

    #[test]
    fn test_multi_source_min_distance() {
        let g = graph(&[("top.py", "mid.py"), ("mid.py", "leaf.py")]);
        let impacted = impacted_by_many(&g, &["leaf.py", "mid.py"]);
        assert_eq!(impacted.get("mid.py"), Some(&0), "a changed file is distance 0");
        assert_eq!(impacted.get("top.py"), Some(&1));
    }

    #[test]
    fn test_multi_source_skips_unknown() {
        let g = graph(&[("a.py", "b.py")]);
        let impacted = impacted_by_many(&g, &["ghost.py"]);
        assert!(impacted.is_empty());
    }
}
