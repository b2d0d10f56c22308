// tests/graph_validation.rs

use std::error::Error;

use gantry::errors::GantryError;
use gantry::graph::{TaskGraph, TaskSpec};
use gantry_test_utils::builders::task;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn registering_duplicate_name_fails_and_leaves_graph_unchanged() -> TestResult {
    let mut graph = TaskGraph::new();
    graph.register(task("css", "sass app:dist", &[]))?;
    graph.register(task("js", "esbuild app:dist", &["css"]))?;

    let err = graph
        .register(task("css", "something else", &["js"]))
        .unwrap_err();
    assert!(matches!(err, GantryError::DuplicateTask(name) if name == "css"));

    // The original registration is untouched.
    assert_eq!(graph.len(), 2);
    assert_eq!(graph.get("css").map(|s| s.cmd.as_str()), Some("sass app:dist"));
    assert_eq!(graph.dependents_of("js"), &[] as &[String]);

    Ok(())
}

#[test]
fn unknown_dependency_is_rejected_at_validation() -> TestResult {
    let mut graph = TaskGraph::new();
    graph.register(task("build", "make", &["clean"]))?;

    let err = graph.validate().unwrap_err();
    assert!(matches!(
        err,
        GantryError::MissingDependency { task, dependency }
            if task == "build" && dependency == "clean"
    ));

    Ok(())
}

#[test]
fn self_dependency_is_rejected() -> TestResult {
    let mut graph = TaskGraph::new();
    graph.register(task("loop", "true", &["loop"]))?;

    let err = graph.validate().unwrap_err();
    assert!(matches!(err, GantryError::MissingDependency { .. }));

    Ok(())
}

#[test]
fn two_task_cycle_is_rejected() -> TestResult {
    let mut graph = TaskGraph::new();
    graph.register(task("a", "echo a", &["b"]))?;
    graph.register(task("b", "echo b", &["a"]))?;

    let err = graph.validate().unwrap_err();
    assert!(matches!(err, GantryError::Cycle(_)));

    Ok(())
}

#[test]
fn acyclic_graph_validates_and_exposes_adjacency() -> TestResult {
    let mut graph = TaskGraph::new();
    graph.register(task("clean", "rm -rf dist", &[]))?;
    graph.register(task("css", "sass app:dist", &["clean"]))?;
    graph.register(task("js", "esbuild app:dist", &["clean"]))?;
    graph.register(task("default", "true", &["css", "js"]))?;
    graph.validate()?;

    assert_eq!(graph.dependencies_of("default"), &["css", "js"]);
    let mut dependents = graph.dependents_of("clean").to_vec();
    dependents.sort();
    assert_eq!(dependents, vec!["css".to_string(), "js".to_string()]);

    Ok(())
}

#[test]
fn register_accepts_forward_references_until_validate() -> TestResult {
    // Dependencies may be registered after their dependents; only
    // validate() requires the graph to be complete.
    let mut graph = TaskGraph::new();
    graph.register(TaskSpec {
        name: "build".to_string(),
        cmd: "make".to_string(),
        after: vec!["clean".to_string()],
    })?;
    graph.register(task("clean", "rm -rf dist", &[]))?;
    graph.validate()?;

    Ok(())
}
