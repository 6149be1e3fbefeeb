use nova_config::{init_tracing, load_for_workspace, LoggingConfig};
use nova_impact::{DeclState, ImpactConfig};
use pretty_assertions::assert_eq;

use super::support::{TestProject, A, FIELD_PROJECT};

#[test]
fn workspace_config_sets_the_search_limit() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("nova.toml"),
        "[impact]\nmaxFilesToSearchUsagesIn = 1\n",
    )
    .unwrap();

    let (config, path) = load_for_workspace(dir.path()).unwrap();
    assert!(path.is_some());
    assert_eq!(config.impact.max_files_to_search_usages_in, 1);

    // Both A and B mention `field`: two files is past the limit.
    let mut project = TestProject::with_config(FIELD_PROJECT, config.impact);
    project.replace(A, "field", "f");
    project.highlight(A);
    assert_eq!(project.engine.problem_count(), 0);
    let field = project.decl(A, "A.f");
    assert_eq!(project.engine.state(field), Some(DeclState::Unknown));
}

#[test]
fn missing_config_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let (config, path) = load_for_workspace(dir.path()).unwrap();
    assert_eq!(path, None);
    assert_eq!(config.impact, ImpactConfig::default());
    assert_eq!(
        config.impact.max_files_to_search_usages_in,
        ImpactConfig::DEFAULT_MAX_FILES_TO_SEARCH_USAGES_IN
    );
}

#[test]
fn disabled_engine_reports_nothing() {
    let config = ImpactConfig {
        enabled: false,
        ..ImpactConfig::default()
    };
    let mut project = TestProject::with_config(FIELD_PROJECT, config);
    project.replace(A, "field", "f");
    project.highlight(A);
    assert_eq!(project.engine.problem_count(), 0);
    assert_eq!(project.engine.state(project.decl(A, "A.f")), Some(DeclState::Clean));
}

#[test]
fn too_many_outcome_is_traced() {
    let buffer = init_tracing(&LoggingConfig {
        level: "warn,nova.impact=debug".to_owned(),
        stderr: false,
        ..LoggingConfig::default()
    });

    let mut project = TestProject::with_limit(FIELD_PROJECT, 1);
    project.replace(A, "field", "f");
    project.highlight(A);

    let lines = buffer.last_lines(LoggingConfig::DEFAULT_BUFFER_LINES);
    assert!(
        lines
            .iter()
            .any(|line| line.contains("too many files to search for usages")),
        "{lines:#?}"
    );
}
