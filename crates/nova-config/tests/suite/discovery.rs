use std::ffi::OsString;
use std::path::Path;

use nova_config::{
    discover_config_path, load_for_workspace, load_for_workspace_with_diagnostics,
    with_config_env_lock, ConfigWarning, NovaConfig, NOVA_CONFIG_ENV_VAR,
};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

/// Sets (or clears) the override variable for the duration of `f`, under the discovery lock.
fn with_override<R>(value: Option<&OsString>, f: impl FnOnce() -> R) -> R {
    with_config_env_lock(|| {
        let previous = std::env::var_os(NOVA_CONFIG_ENV_VAR);
        match value {
            Some(value) => std::env::set_var(NOVA_CONFIG_ENV_VAR, value),
            None => std::env::remove_var(NOVA_CONFIG_ENV_VAR),
        }
        let result = f();
        match previous {
            Some(previous) => std::env::set_var(NOVA_CONFIG_ENV_VAR, previous),
            None => std::env::remove_var(NOVA_CONFIG_ENV_VAR),
        }
        result
    })
}

fn canonical(path: &Path) -> std::path::PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[test]
fn nova_toml_wins_over_hidden_config() {
    let dir = tempdir().unwrap();
    let hidden = dir.path().join(".nova.toml");
    std::fs::write(&hidden, "[impact]\nmax_files_to_search_usages_in = 3\n").unwrap();

    let (config, path) = with_override(None, || load_for_workspace(dir.path())).unwrap();
    assert_eq!(config.impact.max_files_to_search_usages_in, 3);
    assert_eq!(path, Some(canonical(&hidden)));

    let visible = dir.path().join("nova.toml");
    std::fs::write(&visible, "[impact]\nmax_files_to_search_usages_in = 7\n").unwrap();
    let discovered = with_override(None, || discover_config_path(dir.path()));
    assert_eq!(discovered, Some(canonical(&visible)));
}

#[test]
fn env_override_is_resolved_against_the_workspace_root() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("nova.toml"), "[impact]\nenabled = true\n").unwrap();
    let override_path = dir.path().join("override.toml");
    std::fs::write(
        &override_path,
        "[impact]\nenabled = false\n[logging]\nlevel = \"debug\"\n",
    )
    .unwrap();

    let relative = OsString::from("override.toml");
    let (config, path) =
        with_override(Some(&relative), || load_for_workspace(dir.path())).unwrap();
    assert!(!config.impact.enabled);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(path, Some(canonical(&override_path)));

    let absolute = override_path.clone().into_os_string();
    let elsewhere = tempdir().unwrap();
    let path = with_override(Some(&absolute), || discover_config_path(elsewhere.path()));
    assert_eq!(path, Some(canonical(&override_path)));
}

#[test]
fn missing_config_returns_defaults() {
    let dir = tempdir().unwrap();
    let (config, path, diagnostics) =
        with_override(None, || load_for_workspace_with_diagnostics(dir.path())).unwrap();
    assert_eq!(path, None);
    assert_eq!(config, NovaConfig::default());
    assert!(diagnostics.is_empty());
}

#[test]
fn workspace_diagnostics_report_unknown_keys_and_warnings() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("nova.toml"),
        "[impact]\nmaxFilesToSearchUsagesIn = 0\nthreshold = 4\n",
    )
    .unwrap();

    let (config, _path, diagnostics) =
        with_override(None, || load_for_workspace_with_diagnostics(dir.path())).unwrap();
    assert_eq!(config.impact.max_files_to_search_usages_in, 0);
    assert_eq!(diagnostics.unknown_keys, vec!["impact.threshold"]);
    assert!(matches!(
        diagnostics.warnings.as_slice(),
        [ConfigWarning::InvalidValue { .. }]
    ));
    assert!(diagnostics.is_ok());

    // The plain loader logs the same findings and still succeeds.
    let (logged, _path) = with_override(None, || load_for_workspace(dir.path())).unwrap();
    assert_eq!(logged, config);
}
