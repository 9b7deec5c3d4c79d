//! Dependency graph and impact analysis over real temp directories

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ripple::{impacted_by, Extractor, GraphBuilder, PipelineConfig, SummaryCache};

fn write(root: &Path, name: &str, content: &str) {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn build_graph(root: &Path, config: &PipelineConfig) -> ripple::DependencyGraph {
    let extractor = Extractor::with_default_parser(Arc::new(SummaryCache::new()), root);
    GraphBuilder::new(&extractor, config)
        .build(&[PathBuf::from(".")])
        .unwrap()
        .graph
}

#[test]
fn test_three_node_cycle() {
    let dir = tempfile::TempDir::new().unwrap();
    write(dir.path(), "a.py", "import b\n");
    write(dir.path(), "b.py", "import c\n");
    write(dir.path(), "c.py", "import a\n");

    let graph = build_graph(dir.path(), &PipelineConfig::default());

    assert!(!graph.cycles.is_empty());
    let members: HashSet<&str> = graph
        .cycles
        .iter()
        .flat_map(|c| c.members.iter().map(String::as_str))
        .collect();
    assert_eq!(members, HashSet::from(["a.py", "b.py", "c.py"]));
}

#[test]
fn test_transitive_impact() {
    let dir = tempfile::TempDir::new().unwrap();
    write(dir.path(), "app.py", "import service\n");
    write(dir.path(), "service.py", "import core\n");
    write(dir.path(), "core.py", "x = 1\n");
    write(dir.path(), "bystander.py", "y = 2\n");

    let graph = build_graph(dir.path(), &PipelineConfig::default());
    let impacted = impacted_by(&graph, "core.py");

    assert!(impacted.contains("core.py"), "the changed file itself is impacted");
    assert!(impacted.contains("service.py"), "direct importer");
    assert!(impacted.contains("app.py"), "transitive importer");
    assert!(!impacted.contains("bystander.py"));
}

#[test]
fn test_impact_of_unknown_file_is_empty() {
    let dir = tempfile::TempDir::new().unwrap();
    write(dir.path(), "a.py", "x = 1\n");

    let graph = build_graph(dir.path(), &PipelineConfig::default());
    assert!(impacted_by(&graph, "never_indexed.py").is_empty());
}

#[test]
fn test_package_imports_resolve_through_init() {
    let dir = tempfile::TempDir::new().unwrap();
    write(dir.path(), "pkg/__init__.py", "");
    write(dir.path(), "pkg/util.py", "x = 1\n");
    write(dir.path(), "main.py", "import pkg\nimport pkg.util\n");

    let graph = build_graph(dir.path(), &PipelineConfig::default());
    let imports = &graph.node("main.py").unwrap().imports_resolved;

    assert!(imports.contains(&"pkg/__init__.py".to_string()));
    assert!(imports.contains(&"pkg/util.py".to_string()));
}

#[test]
fn test_critical_at_default_threshold() {
    let dir = tempfile::TempDir::new().unwrap();
    write(dir.path(), "hub.py", "x = 1\n");
    for i in 0..5 {
        write(dir.path(), &format!("user{i}.py"), "import hub\n");
    }

    let graph = build_graph(dir.path(), &PipelineConfig::default());
    assert!(graph.node("hub.py").unwrap().is_critical);
    assert_eq!(graph.critical_paths(), vec!["hub.py"]);
}

#[test]
fn test_below_threshold_not_critical() {
    let dir = tempfile::TempDir::new().unwrap();
    write(dir.path(), "hub.py", "x = 1\n");
    for i in 0..4 {
        write(dir.path(), &format!("user{i}.py"), "import hub\n");
    }

    let graph = build_graph(dir.path(), &PipelineConfig::default());
    assert!(!graph.node("hub.py").unwrap().is_critical);
}

#[test]
fn test_rebuild_is_idempotent() {
    let dir = tempfile::TempDir::new().unwrap();
    write(dir.path(), "a.py", "import b\nimport c\n");
    write(dir.path(), "b.py", "import c\n");
    write(dir.path(), "c.py", "x = 1\n");

    let extractor = Extractor::with_default_parser(Arc::new(SummaryCache::new()), dir.path());
    let config = PipelineConfig::default();
    let builder = GraphBuilder::new(&extractor, &config);

    let first = builder.build(&[PathBuf::from(".")]).unwrap().graph;
    let second = builder.build(&[PathBuf::from(".")]).unwrap().graph;

    assert_eq!(first.nodes, second.nodes);
    assert_eq!(first.cycles, second.cycles);
}

#[test]
fn test_depth_layers() {
    let dir = tempfile::TempDir::new().unwrap();
    write(dir.path(), "settings.py", "x = 1\n");
    write(dir.path(), "db.py", "import settings\n");
    write(dir.path(), "handlers.py", "import db\nimport settings\n");

    let graph = build_graph(dir.path(), &PipelineConfig::default());
    assert_eq!(graph.node("settings.py").unwrap().depth, 0);
    assert_eq!(graph.node("db.py").unwrap().depth, 1);
    assert_eq!(
        graph.node("handlers.py").unwrap().depth,
        1,
        "depth is the shortest path from a zero-import leaf"
    );
}
