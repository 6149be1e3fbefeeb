use nova_config::{ConfigError, ConfigValidationError, ConfigWarning, NovaConfig};
use pretty_assertions::assert_eq;
use tempfile::{tempdir, NamedTempFile};

#[test]
fn reports_unknown_keys_with_full_paths() {
    let text = r#"
typo = 1

[impact]
enabeld = true
max_files_to_search_usages_in = 5

[logging]
levle = "debug"
"#;

    let (config, diagnostics) = NovaConfig::parse_with_diagnostics(text).expect("config parses");
    assert_eq!(
        diagnostics.unknown_keys,
        vec!["impact.enabeld", "logging.levle", "typo"]
    );
    assert_eq!(config.impact.max_files_to_search_usages_in, 5);
    assert!(diagnostics.is_ok());
}

#[test]
fn zero_search_limit_warns_but_loads() {
    let text = "[impact]\nmaxFilesToSearchUsagesIn = 0\n";
    let (config, diagnostics) = NovaConfig::parse_with_diagnostics(text).expect("config parses");
    assert_eq!(config.impact.max_files_to_search_usages_in, 0);
    assert!(diagnostics.unknown_keys.is_empty());
    assert!(matches!(
        diagnostics.warnings.as_slice(),
        [ConfigWarning::InvalidValue { toml_path, .. }] if toml_path == "impact.max_files_to_search_usages_in"
    ));
}

#[test]
fn zero_buffer_lines_is_an_error() {
    let (_config, diagnostics) =
        NovaConfig::parse_with_diagnostics("[logging]\nbuffer_lines = 0\n").expect("config parses");
    assert!(!diagnostics.is_ok());
    assert_eq!(
        diagnostics.errors,
        vec![ConfigValidationError::InvalidValue {
            toml_path: "logging.buffer_lines".to_owned(),
            message: "must be >= 1".to_owned(),
        }]
    );
}

#[test]
fn partial_logging_table_keeps_defaults() {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), "[logging]\njson = true\n").unwrap();
    let (config, diagnostics) =
        NovaConfig::load_from_path_with_diagnostics(file.path()).expect("config loads");
    assert!(diagnostics.is_empty());
    assert!(config.logging.json);
    assert!(config.logging.stderr);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn type_errors_surface_as_toml_errors() {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), "[impact]\nmax_files_to_search_usages_in = \"many\"\n").unwrap();

    let err = NovaConfig::load_from_path(file.path()).expect_err("type mismatch");
    assert!(matches!(err, ConfigError::Toml(_)), "{err:?}");
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempdir().unwrap();
    let err = NovaConfig::load_from_path(dir.path().join("absent.toml")).expect_err("no file");
    assert!(matches!(err, ConfigError::Io { .. }), "{err:?}");
}
