use serde::de::DeserializeOwned;

/// Everything noticed while loading a config that still deserialized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDiagnostics {
    /// Dotted paths of keys the schema does not know, e.g. `impact.max_files`.
    pub unknown_keys: Vec<String>,
    pub warnings: Vec<ConfigWarning>,
    /// Values the engine cannot run with.
    pub errors: Vec<ConfigValidationError>,
}

impl ConfigDiagnostics {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unknown_keys.is_empty() && self.warnings.is_empty() && self.errors.is_empty()
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn extend_validation(&mut self, validation: ValidationDiagnostics) {
        self.warnings.extend(validation.warnings);
        self.errors.extend(validation.errors);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationDiagnostics {
    pub warnings: Vec<ConfigWarning>,
    pub errors: Vec<ConfigValidationError>,
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    InvalidValue { toml_path: String, message: String },
    LoggingLevelInvalid { value: String, normalized: String },
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    InvalidValue { toml_path: String, message: String },
}

/// Deserializes `text`, collecting the sorted, deduplicated paths of ignored keys.
pub(crate) fn deserialize_toml_with_unknown_keys<T: DeserializeOwned>(
    text: &str,
) -> Result<(T, Vec<String>), toml::de::Error> {
    let mut unknown = Vec::new();
    let value = serde_ignored::deserialize(toml::de::Deserializer::new(text), |path| {
        unknown.push(path.to_string());
    })?;
    unknown.sort();
    unknown.dedup();
    Ok((value, unknown))
}
