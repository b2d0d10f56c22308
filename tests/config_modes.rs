// tests/config_modes.rs

use std::error::Error;
use std::io::Write;

use gantry::config::{load_and_validate, validate_config, ConfigFile};
use gantry::errors::GantryError;
use gantry::graph::TaskGraph;

type TestResult = Result<(), Box<dyn Error>>;

const PIPELINE_TOML: &str = r#"
[config]
default_task = "default"

[default]
watch = ["app/**/*"]
exclude = ["dist/**"]

[task.clean]
cmd = "rm -rf dist"
watch = []

[task.css]
cmd = "sass app/scss:dist/css"
after = ["clean"]
watch = ["app/scss/**/*.scss"]

[task.css.mode.production]
cmd = "sass --style=compressed app/scss:dist/css"

[task.default]
cmd = "true"
after = ["css"]
watch = []
"#;

#[test]
fn pipeline_config_parses_with_defaults() -> TestResult {
    let cfg: ConfigFile = toml::from_str(PIPELINE_TOML)?;
    validate_config(&cfg)?;

    assert_eq!(cfg.config.default_task, "default");
    assert_eq!(cfg.config.queue_length, 1);
    assert_eq!(cfg.config.debounce, "200ms");
    assert_eq!(cfg.modes.default, "development");
    assert_eq!(
        cfg.modes.known,
        vec!["development".to_string(), "production".to_string()]
    );

    Ok(())
}

#[test]
fn mode_override_resolves_at_graph_construction() -> TestResult {
    let cfg: ConfigFile = toml::from_str(PIPELINE_TOML)?;

    let dev = TaskGraph::from_config(&cfg, "development")?;
    assert_eq!(
        dev.get("css").map(|s| s.cmd.as_str()),
        Some("sass app/scss:dist/css")
    );

    let prod = TaskGraph::from_config(&cfg, "production")?;
    assert_eq!(
        prod.get("css").map(|s| s.cmd.as_str()),
        Some("sass --style=compressed app/scss:dist/css")
    );
    // Tasks without an override keep their base command.
    assert_eq!(prod.get("clean").map(|s| s.cmd.as_str()), Some("rm -rf dist"));

    Ok(())
}

#[test]
fn unrecognized_mode_override_is_rejected() -> TestResult {
    let toml_src = r#"
[task.css]
cmd = "sass app:dist"

[task.css.mode.staging]
cmd = "sass --quiet app:dist"
"#;
    let cfg: ConfigFile = toml::from_str(toml_src)?;
    let err = validate_config(&cfg).unwrap_err();
    assert!(matches!(err, GantryError::Config(msg) if msg.contains("staging")));

    Ok(())
}

#[test]
fn cyclic_config_is_rejected_and_nothing_is_runnable() -> TestResult {
    let toml_src = r#"
[task.a]
cmd = "echo a"
after = ["b"]

[task.b]
cmd = "echo b"
after = ["a"]
"#;
    let cfg: ConfigFile = toml::from_str(toml_src)?;
    assert!(matches!(
        validate_config(&cfg).unwrap_err(),
        GantryError::Cycle(_)
    ));
    // Graph construction fails the same way, so no session can be built.
    assert!(matches!(
        TaskGraph::from_config(&cfg, "development").unwrap_err(),
        GantryError::Cycle(_)
    ));

    Ok(())
}

#[test]
fn dangling_dependency_is_rejected() -> TestResult {
    let toml_src = r#"
[task.build]
cmd = "make"
after = ["clean"]
"#;
    let cfg: ConfigFile = toml::from_str(toml_src)?;
    assert!(matches!(
        validate_config(&cfg).unwrap_err(),
        GantryError::MissingDependency { task, dependency }
            if task == "build" && dependency == "clean"
    ));

    Ok(())
}

#[test]
fn empty_task_table_is_rejected() -> TestResult {
    let cfg: ConfigFile = toml::from_str("")?;
    assert!(matches!(
        validate_config(&cfg).unwrap_err(),
        GantryError::Config(_)
    ));

    Ok(())
}

#[test]
fn invalid_debounce_duration_is_rejected() -> TestResult {
    let toml_src = r#"
[config]
debounce = "fast"

[task.a]
cmd = "echo a"
"#;
    let cfg: ConfigFile = toml::from_str(toml_src)?;
    assert!(matches!(
        validate_config(&cfg).unwrap_err(),
        GantryError::Config(_)
    ));

    Ok(())
}

#[test]
fn serve_section_parses_and_validates() -> TestResult {
    let toml_src = r#"
[serve]
cmd = "node server.js"
ready_pattern = "listening on"
restart_delay = "500ms"

[task.a]
cmd = "echo a"
"#;
    let cfg: ConfigFile = toml::from_str(toml_src)?;
    validate_config(&cfg)?;

    let serve = cfg.serve.expect("serve section");
    assert_eq!(serve.cmd, "node server.js");
    assert_eq!(serve.max_restarts, 3);
    assert_eq!(serve.reload_addr, "127.0.0.1:35729");

    Ok(())
}

#[test]
fn invalid_ready_pattern_is_rejected() -> TestResult {
    let toml_src = r#"
[serve]
cmd = "node server.js"
ready_pattern = "("

[task.a]
cmd = "echo a"
"#;
    let cfg: ConfigFile = toml::from_str(toml_src)?;
    assert!(matches!(
        validate_config(&cfg).unwrap_err(),
        GantryError::Config(msg) if msg.contains("ready_pattern")
    ));

    Ok(())
}

#[test]
fn load_and_validate_reads_from_disk() -> TestResult {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(PIPELINE_TOML.as_bytes())?;

    let cfg = load_and_validate(file.path())?;
    assert_eq!(cfg.task.len(), 3);

    Ok(())
}
