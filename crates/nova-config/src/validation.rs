use crate::diagnostics::{ConfigValidationError, ConfigWarning, ValidationDiagnostics};
use crate::{LoggingConfig, NovaConfig};

impl NovaConfig {
    /// Semantic checks serde cannot express. Reports every finding, not just the first.
    #[must_use]
    pub fn validate(&self) -> ValidationDiagnostics {
        let mut out = ValidationDiagnostics::default();
        self.validate_impact(&mut out);
        self.validate_logging(&mut out);
        out
    }

    fn validate_impact(&self, out: &mut ValidationDiagnostics) {
        if self.impact.enabled && self.impact.max_files_to_search_usages_in == 0 {
            out.warnings.push(ConfigWarning::InvalidValue {
                toml_path: "impact.max_files_to_search_usages_in".to_owned(),
                message: "must be >= 1; with 0 every breaking change is reported as unknown"
                    .to_owned(),
            });
        }
    }

    fn validate_logging(&self, out: &mut ValidationDiagnostics) {
        let level = &self.logging.level;
        let normalized = LoggingConfig::normalize_level_directives(level);
        if tracing_subscriber::EnvFilter::try_new(&normalized).is_err() {
            out.warnings.push(ConfigWarning::LoggingLevelInvalid {
                value: level.clone(),
                normalized,
            });
        }

        if self.logging.buffer_lines == 0 {
            out.errors.push(ConfigValidationError::InvalidValue {
                toml_path: "logging.buffer_lines".to_owned(),
                message: "must be >= 1".to_owned(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn zero_search_limit_is_a_warning() {
        let mut config = NovaConfig::default();
        config.impact.max_files_to_search_usages_in = 0;
        let diagnostics = config.validate();
        assert!(diagnostics.errors.is_empty());
        assert_eq!(
            diagnostics.warnings,
            vec![ConfigWarning::InvalidValue {
                toml_path: "impact.max_files_to_search_usages_in".to_owned(),
                message: "must be >= 1; with 0 every breaking change is reported as unknown"
                    .to_owned(),
            }]
        );

        // Irrelevant while the engine is off.
        config.impact.enabled = false;
        assert!(config.validate().warnings.is_empty());
    }

    #[test]
    fn invalid_logging_settings_are_reported() {
        let mut config = NovaConfig::default();
        config.logging.level = "info,[".to_owned();
        config.logging.buffer_lines = 0;
        let diagnostics = config.validate();
        assert!(matches!(
            diagnostics.warnings.as_slice(),
            [ConfigWarning::LoggingLevelInvalid { .. }]
        ));
        assert_eq!(diagnostics.errors.len(), 1);
    }
}
