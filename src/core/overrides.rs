//! Caller-supplied field value overrides
//!
//! The override payload arrives as a URL-encoded JSON object. Form clients
//! encode it twice, so it is decoded `passes` times (2 by default, see
//! `Config::override_decode_passes`) before parsing.

use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};

use crate::core::error::{MapperError, Result};
use crate::core::form::FormModel;

pub const DEFAULT_DECODE_PASSES: usize = 2;

/// Decode and parse an override payload into field name → value
pub fn decode_field_overrides(raw: &str, passes: usize) -> Result<Map<String, Value>> {
    let mut decoded = raw.to_string();
    for _ in 0..passes {
        decoded = percent_decode_str(&decoded)
            .decode_utf8()
            .map_err(|e| MapperError::MalformedOverride(e.to_string()))?
            .into_owned();
    }

    match serde_json::from_str::<Value>(&decoded) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(MapperError::MalformedOverride(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(MapperError::MalformedOverride(e.to_string())),
    }
}

/// Overwrite the values of matching top-level fields; unknown names are ignored
///
/// Returns the number of fields that were overridden.
pub fn apply_field_overrides(model: &mut FormModel, overrides: Map<String, Value>) -> usize {
    let mut applied = 0;
    for (name, value) in overrides {
        if let Some(field) = model.find_field_mut(&name) {
            field.value = Some(value);
            applied += 1;
        }
    }
    applied
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::form::FormField;
    use serde_json::json;

    // {"age":35} encoded twice
    const DOUBLE_ENCODED: &str = "%257B%2522age%2522%253A35%257D";

    #[test]
    fn test_double_decode() {
        let overrides = decode_field_overrides(DOUBLE_ENCODED, 2).unwrap();
        assert_eq!(overrides.get("age"), Some(&json!(35)));
    }

    #[test]
    fn test_single_decode_is_configurable() {
        let overrides = decode_field_overrides("%7B%22age%22%3A35%7D", 1).unwrap();
        assert_eq!(overrides.get("age"), Some(&json!(35)));
    }

    #[test]
    fn test_too_few_passes_is_malformed() {
        let err = decode_field_overrides(DOUBLE_ENCODED, 1).unwrap_err();
        assert!(matches!(err, MapperError::MalformedOverride(_)));
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        assert!(matches!(
            decode_field_overrides("not-json", 2),
            Err(MapperError::MalformedOverride(_))
        ));
        assert!(matches!(
            decode_field_overrides("[1,2]", 2),
            Err(MapperError::MalformedOverride(_))
        ));
    }

    #[test]
    fn test_apply_ignores_unknown_fields() {
        let mut model = FormModel::default();
        model.form.fields.push(FormField::new("age").with_value(json!(30)));

        let mut overrides = Map::new();
        overrides.insert("age".to_string(), json!(35));
        overrides.insert("parity".to_string(), json!(2));

        assert_eq!(apply_field_overrides(&mut model, overrides), 1);
        assert_eq!(model.find_field("age").unwrap().value, Some(json!(35)));
        assert!(model.find_field("parity").is_none());
    }
}
