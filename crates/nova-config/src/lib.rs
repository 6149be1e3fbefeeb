//! `nova.toml` loading, validation and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use parking_lot::ReentrantMutex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod diagnostics;
mod logging;
mod schema;
mod validation;

pub use diagnostics::{
    ConfigDiagnostics, ConfigValidationError, ConfigWarning, ValidationDiagnostics,
};
pub use logging::{global_log_buffer, init_tracing, LogBuffer, LoggingConfig};
pub use schema::json_schema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[schemars(deny_unknown_fields)]
/// Top-level Nova configuration loaded from TOML.
///
/// Cross-file impact analysis is configured via the `[impact]` table:
/// ```toml
/// [impact]
/// enabled = true
/// # Give up (and retract problems) when more files than this would need rechecking.
/// max_files_to_search_usages_in = 10
/// ```
///
/// The camel-case spelling `maxFilesToSearchUsagesIn` is accepted as an alias.
pub struct NovaConfig {
    /// Cross-file impact analysis settings.
    #[serde(default)]
    pub impact: ImpactConfig,

    /// Global logging settings for Nova crates.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct ImpactConfig {
    /// When disabled, highlighting passes detect nothing and reported problems are retracted.
    #[serde(default = "ImpactConfig::default_enabled")]
    pub enabled: bool,

    /// Maximum number of files searched for usages of a changed declaration.
    ///
    /// When a change would require looking at more files than this, the engine
    /// reports nothing for that declaration rather than a partial result.
    #[serde(
        default = "ImpactConfig::default_max_files_to_search_usages_in",
        alias = "maxFilesToSearchUsagesIn"
    )]
    pub max_files_to_search_usages_in: usize,
}

impl ImpactConfig {
    pub const DEFAULT_MAX_FILES_TO_SEARCH_USAGES_IN: usize = 10;

    fn default_enabled() -> bool {
        true
    }

    fn default_max_files_to_search_usages_in() -> usize {
        Self::DEFAULT_MAX_FILES_TO_SEARCH_USAGES_IN
    }
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            max_files_to_search_usages_in: Self::default_max_files_to_search_usages_in(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The default `Display` embeds a source snippet; keep just the message.
        ConfigError::Toml(err.message().to_owned())
    }
}

impl NovaConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::parse(&read_config_text(path.as_ref())?)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Parses `text`, also returning unknown keys and validation findings.
    pub fn parse_with_diagnostics(text: &str) -> Result<(Self, ConfigDiagnostics), ConfigError> {
        let (config, unknown_keys) =
            diagnostics::deserialize_toml_with_unknown_keys::<NovaConfig>(text)?;
        let mut diagnostics = ConfigDiagnostics {
            unknown_keys,
            ..ConfigDiagnostics::default()
        };
        diagnostics.extend_validation(config.validate());
        Ok((config, diagnostics))
    }

    pub fn load_from_path_with_diagnostics(
        path: impl AsRef<Path>,
    ) -> Result<(Self, ConfigDiagnostics), ConfigError> {
        Self::parse_with_diagnostics(&read_config_text(path.as_ref())?)
    }
}

fn read_config_text(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Names an explicit config file, absolute or relative to the workspace root.
pub const NOVA_CONFIG_ENV_VAR: &str = "NOVA_CONFIG_PATH";

const CONFIG_FILE_NAMES: [&str; 2] = ["nova.toml", ".nova.toml"];

fn env_lock() -> &'static ReentrantMutex<()> {
    static LOCK: OnceLock<ReentrantMutex<()>> = OnceLock::new();
    LOCK.get_or_init(ReentrantMutex::default)
}

/// Runs `f` with config discovery blocked.
///
/// Tests that set [`NOVA_CONFIG_ENV_VAR`] hold this around the mutation and the lookup.
pub fn with_config_env_lock<R>(f: impl FnOnce() -> R) -> R {
    let _guard = env_lock().lock();
    f()
}

/// Finds the config file for `workspace_root`: [`NOVA_CONFIG_ENV_VAR`] first, then
/// `nova.toml`, then `.nova.toml`.
pub fn discover_config_path(workspace_root: &Path) -> Option<PathBuf> {
    let _guard = env_lock().lock();
    let path = match std::env::var_os(NOVA_CONFIG_ENV_VAR) {
        Some(value) => workspace_root.join(PathBuf::from(value)),
        None => CONFIG_FILE_NAMES
            .iter()
            .map(|name| workspace_root.join(name))
            .find(|path| path.is_file())?,
    };
    Some(path.canonicalize().unwrap_or(path))
}

/// Loads the workspace config, or the defaults when there is none.
///
/// Unknown keys and validation findings are logged, not returned.
pub fn load_for_workspace(
    workspace_root: &Path,
) -> Result<(NovaConfig, Option<PathBuf>), ConfigError> {
    let (config, path, diagnostics) = load_for_workspace_with_diagnostics(workspace_root)?;
    for key in &diagnostics.unknown_keys {
        tracing::warn!(target: "nova.config", key = %key, "unknown config key");
    }
    for warning in &diagnostics.warnings {
        tracing::warn!(target: "nova.config", ?warning, "questionable config value");
    }
    for error in &diagnostics.errors {
        tracing::error!(target: "nova.config", ?error, "invalid config value");
    }
    Ok((config, path))
}

pub fn load_for_workspace_with_diagnostics(
    workspace_root: &Path,
) -> Result<(NovaConfig, Option<PathBuf>, ConfigDiagnostics), ConfigError> {
    match discover_config_path(workspace_root) {
        Some(path) => {
            let (config, diagnostics) = NovaConfig::load_from_path_with_diagnostics(&path)?;
            Ok((config, Some(path), diagnostics))
        }
        None => Ok((NovaConfig::default(), None, ConfigDiagnostics::default())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn impact_section_defaults() {
        let config: NovaConfig = toml::from_str("").expect("empty config parses");
        assert_eq!(config, NovaConfig::default());
        assert!(config.impact.enabled);
        assert_eq!(
            config.impact.max_files_to_search_usages_in,
            ImpactConfig::DEFAULT_MAX_FILES_TO_SEARCH_USAGES_IN
        );
    }

    #[test]
    fn impact_limit_accepts_camel_case_alias() {
        let config: NovaConfig =
            toml::from_str("[impact]\nmaxFilesToSearchUsagesIn = 4\n").expect("config parses");
        assert_eq!(config.impact.max_files_to_search_usages_in, 4);

        let config: NovaConfig =
            toml::from_str("[impact]\nmax_files_to_search_usages_in = 2\nenabled = false\n")
                .expect("config parses");
        assert_eq!(
            config.impact,
            ImpactConfig {
                enabled: false,
                max_files_to_search_usages_in: 2,
            }
        );
    }

    #[test]
    fn toml_errors_do_not_echo_input() {
        let err = NovaConfig::parse("[impact]\nenabled = \"secret\"\n").expect_err("type mismatch");
        let message = err.to_string();
        assert!(message.starts_with("failed to parse toml config"));
        assert!(!message.contains("[impact]"), "{message}");
    }
}
