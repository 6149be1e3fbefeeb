use schemars::schema::{RootSchema, Schema};
use schemars::schema_for;
use serde_json::json;

use crate::NovaConfig;

/// JSON schema for `nova.toml`.
///
/// This schema is intended for editor tooling (TOML JSON schema integration) and CI validation.
#[must_use]
pub fn json_schema() -> RootSchema {
    let mut schema = schema_for!(NovaConfig);
    allow_aliases(&mut schema);
    schema
}

fn schema_from_json(value: serde_json::Value) -> Option<Schema> {
    serde_json::from_value(value).ok()
}

fn allow_aliases(schema: &mut RootSchema) {
    // `deny_unknown_fields` would otherwise reject spellings serde accepts.
    let Some(alias) = schema_from_json(json!({
        "description": "Alias for `impact.max_files_to_search_usages_in`.",
        "type": "integer",
        "format": "uint",
        "minimum": 0.0
    })) else {
        return;
    };
    add_property(schema, "ImpactConfig", "maxFilesToSearchUsagesIn", alias);
}

fn add_property(
    schema: &mut RootSchema,
    definition_name: &str,
    property_name: &str,
    property_schema: Schema,
) {
    let Some(definition) = schema.definitions.get_mut(definition_name) else {
        return;
    };

    let Schema::Object(obj) = definition else {
        return;
    };

    let object_validation = obj.object();
    object_validation
        .properties
        .insert(property_name.to_string(), property_schema);
}
