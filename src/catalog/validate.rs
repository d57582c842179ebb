use serde_json::Value;

use crate::core::error::FieldError;
use crate::core::tool::ToolDefinition;

/// Check `params` against a tool's declared schema. Returns every offending
/// field; an empty vector means the call is valid. Undeclared fields are
/// accepted.
pub fn validate_params(definition: &ToolDefinition, params: &Value) -> Vec<FieldError> {
    let object = match params {
        Value::Object(map) => map,
        Value::Null => return missing_required(definition, &serde_json::Map::new()),
        other => {
            return vec![FieldError {
                field: "(params)".into(),
                expected: "object".into(),
                received: json_type_name(other).into(),
            }];
        }
    };

    let mut errors = missing_required(definition, object);

    let mut names: Vec<&String> = definition.parameters.keys().collect();
    names.sort();

    for name in names {
        let schema = &definition.parameters[name];
        let Some(value) = object.get(name) else {
            continue;
        };
        // Null counts as absent; required nulls were reported above
        if value.is_null() {
            continue;
        }

        if !matches_type(&schema.param_type, value) {
            errors.push(FieldError {
                field: name.clone(),
                expected: schema.param_type.clone(),
                received: json_type_name(value).into(),
            });
            continue;
        }

        if let (Some(allowed), Some(s)) = (&schema.enum_values, value.as_str()) {
            if !allowed.iter().any(|a| a == s) {
                errors.push(FieldError {
                    field: name.clone(),
                    expected: format!("one of [{}]", allowed.join(", ")),
                    received: format!("\"{s}\""),
                });
            }
        }
    }

    errors
}

fn missing_required(
    definition: &ToolDefinition,
    object: &serde_json::Map<String, Value>,
) -> Vec<FieldError> {
    definition
        .required
        .iter()
        .filter(|name| object.get(*name).map_or(true, Value::is_null))
        .map(|name| FieldError {
            field: name.clone(),
            expected: definition
                .parameters
                .get(name)
                .map_or_else(|| "a value".to_string(), |s| s.param_type.clone()),
            received: "missing".into(),
        })
        .collect()
}

fn matches_type(param_type: &str, value: &Value) -> bool {
    match param_type {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        // Unknown declared types are not enforced
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
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
