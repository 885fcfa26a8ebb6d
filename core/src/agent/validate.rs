//! Argument checks against a tool's JSON-schema-like input description.
//!
//! Only the subset tool descriptors actually use is understood: top-level
//! `type: object`, `required`, per-property `type` (single or list), `enum`,
//! and `additionalProperties: false`. Anything else in the schema is ignored.

use crate::error::{LoopError, Result};
use serde_json::{Map, Value};

pub fn validate_arguments(tool: &str, schema: &Value, args: &Value) -> Result<()> {
    let Some(schema) = schema.as_object() else {
        return Ok(());
    };

    let empty = Map::new();
    let args = match args {
        Value::Object(map) => map,
        // Models sometimes send `null` for tools that take no parameters.
        Value::Null => &empty,
        other => {
            return Err(LoopError::validation(
                tool,
                format!("expected an object, got {}", type_name(other)),
            ));
        }
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        let missing: Vec<&str> = required
            .iter()
            .filter_map(Value::as_str)
            .filter(|key| args.get(*key).is_none_or(Value::is_null))
            .collect();
        if !missing.is_empty() {
            return Err(LoopError::validation(
                tool,
                format!("missing required field(s): {}", missing.join(", ")),
            ));
        }
    }

    let properties = schema.get("properties").and_then(Value::as_object);

    for (key, value) in args {
        let Some(property) = properties.and_then(|p| p.get(key)) else {
            if schema.get("additionalProperties") == Some(&Value::Bool(false)) {
                return Err(LoopError::validation(tool, format!("unexpected field '{key}'")));
            }
            continue;
        };

        if let Some(expected) = property.get("type")
            && !matches_type(expected, value)
        {
            return Err(LoopError::validation(
                tool,
                format!(
                    "field '{key}' should be {}, got {}",
                    describe_type(expected),
                    type_name(value)
                ),
            ));
        }

        if let Some(allowed) = property.get("enum").and_then(Value::as_array)
            && !allowed.contains(value)
        {
            return Err(LoopError::validation(
                tool,
                format!("field '{key}' must be one of {}", Value::Array(allowed.clone())),
            ));
        }
    }

    Ok(())
}

fn matches_type(expected: &Value, value: &Value) -> bool {
    match expected {
        Value::String(name) => matches_named_type(name, value),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| matches_named_type(name, value)),
        _ => true,
    }
}

fn matches_named_type(name: &str, value: &Value) -> bool {
    match name {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn describe_type(expected: &Value) -> String {
    match expected {
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" or "),
        other => other.as_str().unwrap_or("any").to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weather_schema() -> Value {
        json!({
            "type": "object",
            "required": ["city"],
            "properties": {
                "city": {"type": "string"},
                "days": {"type": "integer"},
                "units": {"type": "string", "enum": ["metric", "imperial"]}
            }
        })
    }

    #[test]
    fn accepts_valid_arguments() {
        validate_arguments("get_weather", &weather_schema(), &json!({"city": "Beijing"})).unwrap();
        validate_arguments(
            "get_weather",
            &weather_schema(),
            &json!({"city": "Beijing", "days": 3, "units": "metric", "extra": true}),
        )
        .unwrap();
    }

    #[test]
    fn reports_missing_required_field() {
        let err = validate_arguments("get_weather", &weather_schema(), &json!({})).unwrap_err();
        assert!(err.to_string().contains("city"));
        let err =
            validate_arguments("get_weather", &weather_schema(), &json!({"city": null})).unwrap_err();
        assert!(matches!(err, LoopError::ArgumentValidation { .. }));
    }

    #[test]
    fn reports_type_mismatch() {
        let err = validate_arguments("get_weather", &weather_schema(), &json!({"city": 42}))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid arguments for tool 'get_weather': field 'city' should be string, got integer"
        );
        assert!(
            validate_arguments("get_weather", &weather_schema(), &json!({"city": "x", "days": 1.5}))
                .is_err()
        );
    }

    #[test]
    fn enforces_enum_and_closed_objects() {
        assert!(
            validate_arguments("w", &weather_schema(), &json!({"city": "x", "units": "kelvin"}))
                .is_err()
        );
        let closed = json!({"type": "object", "properties": {"a": {}}, "additionalProperties": false});
        assert!(validate_arguments("t", &closed, &json!({"a": 1})).is_ok());
        assert!(validate_arguments("t", &closed, &json!({"b": 1})).is_err());
    }

    #[test]
    fn non_object_arguments_are_rejected() {
        assert!(validate_arguments("t", &weather_schema(), &json!("Beijing")).is_err());
        let empty = json!({"type": "object", "properties": {}});
        assert!(validate_arguments("t", &empty, &Value::Null).is_ok());
    }

    #[test]
    fn union_types_accept_any_member() {
        let schema = json!({"properties": {"v": {"type": ["string", "null"]}}});
        assert!(validate_arguments("t", &schema, &json!({"v": null})).is_ok());
        assert!(validate_arguments("t", &schema, &json!({"v": "x"})).is_ok());
        assert!(validate_arguments("t", &schema, &json!({"v": 1})).is_err());
    }
}
