//! JSON Schema processing for Function parameters (§4.7).
//!
//! Functions declare a superset schema with a `visible` array per object
//! level; an Agent only ever sees the visible subset, while the engine still
//! needs to supply defaults for required-but-invisible properties before
//! dispatching to the upstream API.

use serde_json::Value;

/// Recursively strips non-visible properties (and the `visible` marker
/// itself) from an object schema, narrowing `required` to match.
/// Non-object schemas are returned unchanged.
pub fn filter_visible_properties(schema: &Value) -> Value {
    let mut schema = schema.clone();
    filter_in_place(&mut schema);
    schema
}

fn filter_in_place(schema: &mut Value) {
    let Value::Object(map) = schema else {
        return;
    };
    if map.get("type").and_then(Value::as_str) != Some("object") {
        return;
    }

    let visible: Vec<String> = map
        .remove("visible")
        .and_then(|v| v.as_array().cloned())
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();

    let Some(Value::Object(properties)) = map.get_mut("properties") else {
        return;
    };

    properties.retain(|key, _| visible.contains(key));
    for (_, value) in properties.iter_mut() {
        filter_in_place(value);
    }

    if let Some(Value::Array(required)) = map.get_mut("required") {
        required.retain(|key| key.as_str().map(|k| visible.contains(&k.to_string())).unwrap_or(false));
    }
}

/// Fills in default values for properties that are required by the schema
/// but not part of its visible surface, so the Agent never has to supply
/// them. Recurses into nested objects present in `input_data`.
///
/// A required∧invisible non-object property with no `default` is a broken
/// schema: there is no value to inject and the Agent was never given the
/// chance to supply one, so this fails loudly instead of silently sending
/// the upstream API a request it will reject.
pub fn inject_invisible_required_defaults(schema: &Value, input_data: &mut Value) -> Result<(), String> {
    let Value::Object(input_map) = input_data else {
        return Ok(());
    };
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };
    let required: Vec<&str> =
        schema.get("required").and_then(Value::as_array).into_iter().flatten().filter_map(Value::as_str).collect();
    let visible: Vec<&str> =
        schema.get("visible").and_then(Value::as_array).into_iter().flatten().filter_map(Value::as_str).collect();

    for (prop, subschema) in properties {
        if !input_map.contains_key(prop) && required.contains(&prop.as_str()) && !visible.contains(&prop.as_str()) {
            if let Some(default) = subschema.get("default") {
                input_map.insert(prop.clone(), default.clone());
            } else if subschema.get("type").and_then(Value::as_str) == Some("object") {
                input_map.insert(prop.clone(), Value::Object(Default::default()));
            } else {
                return Err(format!(
                    "No default value found for property: {prop}, type: {}",
                    subschema.get("type").and_then(Value::as_str).unwrap_or("unknown")
                ));
            }
        }

        if let Some(nested) = input_map.get_mut(prop) {
            if nested.is_object() {
                inject_invisible_required_defaults(subschema, nested)?;
            }
        }
    }
    Ok(())
}

/// Validates `input_data` against a (already-filtered) JSON Schema, covering
/// the subset of Draft 7 actually used by Function parameter schemas:
/// `type`, `properties`/`required`/`additionalProperties` for objects,
/// `items` for arrays, and `enum`. Returns the first violation found rather
/// than collecting all of them.
pub fn validate_against_schema(schema: &Value, input_data: &Value) -> Result<(), String> {
    validate_at(schema, input_data, "$")
}

fn validate_at(schema: &Value, data: &Value, path: &str) -> Result<(), String> {
    let Value::Object(schema_map) = schema else {
        return Ok(());
    };

    if let Some(expected) = schema_map.get("type").and_then(Value::as_str) {
        if !type_matches(expected, data) {
            return Err(format!("{path}: expected type '{expected}', got {}", type_name(data)));
        }
    }

    if let Some(allowed) = schema_map.get("enum").and_then(Value::as_array) {
        if !allowed.contains(data) {
            return Err(format!("{path}: value is not one of the allowed enum values"));
        }
    }

    match data {
        Value::Object(data_map) => {
            let required: Vec<&str> = schema_map
                .get("required")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
                .collect();
            for key in &required {
                if !data_map.contains_key(*key) {
                    return Err(format!("{path}: missing required property '{key}'"));
                }
            }

            if let Some(properties) = schema_map.get("properties").and_then(Value::as_object) {
                if schema_map.get("additionalProperties").and_then(Value::as_bool) == Some(false) {
                    for key in data_map.keys() {
                        if !properties.contains_key(key) {
                            return Err(format!("{path}: additional property '{key}' is not allowed"));
                        }
                    }
                }
                for (key, subschema) in properties {
                    if let Some(value) = data_map.get(key) {
                        validate_at(subschema, value, &format!("{path}.{key}"))?;
                    }
                }
            }
        }
        Value::Array(items) => {
            if let Some(item_schema) = schema_map.get("items") {
                for (i, item) in items.iter().enumerate() {
                    validate_at(item_schema, item, &format!("{path}[{i}]"))?;
                }
            }
        }
        _ => {}
    }

    Ok(())
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Object(_) => "object",
        Value::Array(_) => "array",
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Null => "null",
    }
}

/// Drops every `null` value from a JSON document, recursively, so the
/// upstream API never sees an explicit null the Agent didn't mean to send.
pub fn remove_none_values(data: Value) -> Value {
    match data {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, remove_none_values(v)))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.into_iter().filter(|v| !v.is_null()).map(remove_none_values).collect())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_visible_properties_keeps_only_visible_and_narrows_required() {
        let schema = json!({
            "type": "object",
            "visible": ["to", "subject"],
            "required": ["to", "subject", "api_key"],
            "properties": {
                "to": {"type": "string"},
                "subject": {"type": "string"},
                "api_key": {"type": "string", "default": "x"},
            }
        });

        let filtered = filter_visible_properties(&schema);
        let properties = filtered["properties"].as_object().unwrap();
        assert!(properties.contains_key("to"));
        assert!(properties.contains_key("subject"));
        assert!(!properties.contains_key("api_key"));
        assert_eq!(filtered["required"], json!(["to", "subject"]));
        assert!(filtered.get("visible").is_none());
    }

    #[test]
    fn filter_visible_properties_recurses_into_nested_objects() {
        let schema = json!({
            "type": "object",
            "visible": ["body"],
            "properties": {
                "body": {
                    "type": "object",
                    "visible": ["text"],
                    "properties": {
                        "text": {"type": "string"},
                        "internal": {"type": "string"},
                    }
                }
            }
        });
        let filtered = filter_visible_properties(&schema);
        let body_props = filtered["properties"]["body"]["properties"].as_object().unwrap();
        assert!(body_props.contains_key("text"));
        assert!(!body_props.contains_key("internal"));
    }

    #[test]
    fn inject_invisible_required_defaults_fills_missing_secret() {
        let schema = json!({
            "type": "object",
            "visible": ["to"],
            "required": ["to", "api_version"],
            "properties": {
                "to": {"type": "string"},
                "api_version": {"type": "string", "default": "v2"},
            }
        });
        let mut input = json!({"to": "a@example.com"});
        inject_invisible_required_defaults(&schema, &mut input).unwrap();
        assert_eq!(input["api_version"], "v2");
    }

    #[test]
    fn inject_invisible_required_defaults_empty_objects_without_default() {
        let schema = json!({
            "type": "object",
            "visible": [],
            "required": ["metadata"],
            "properties": {
                "metadata": {"type": "object"},
            }
        });
        let mut input = json!({});
        inject_invisible_required_defaults(&schema, &mut input).unwrap();
        assert_eq!(input["metadata"], json!({}));
    }

    #[test]
    fn inject_invisible_required_defaults_fails_without_default_for_scalar() {
        let schema = json!({
            "type": "object",
            "visible": [],
            "required": ["api_key"],
            "properties": {
                "api_key": {"type": "string"},
            }
        });
        let mut input = json!({});
        assert!(inject_invisible_required_defaults(&schema, &mut input).is_err());
    }

    #[test]
    fn remove_none_values_strips_nulls_recursively() {
        let data = json!({"a": 1, "b": null, "c": [1, null, 2], "d": {"e": null}});
        let cleaned = remove_none_values(data);
        assert_eq!(cleaned, json!({"a": 1, "c": [1, 2], "d": {}}));
    }

    fn visible_message_schema() -> Value {
        json!({
            "type": "object",
            "required": ["to", "subject"],
            "additionalProperties": false,
            "properties": {
                "to": {"type": "string"},
                "subject": {"type": "string"},
                "priority": {"type": "string", "enum": ["low", "high"]},
            }
        })
    }

    #[test]
    fn validate_against_schema_accepts_well_formed_input() {
        let input = json!({"to": "a@example.com", "subject": "hi"});
        assert!(validate_against_schema(&visible_message_schema(), &input).is_ok());
    }

    #[test]
    fn validate_against_schema_rejects_missing_required_property() {
        let input = json!({"subject": "hi"});
        assert!(validate_against_schema(&visible_message_schema(), &input).is_err());
    }

    #[test]
    fn validate_against_schema_rejects_wrong_type() {
        let input = json!({"to": 5, "subject": "hi"});
        assert!(validate_against_schema(&visible_message_schema(), &input).is_err());
    }

    #[test]
    fn validate_against_schema_rejects_fields_outside_the_visible_surface() {
        let input = json!({"to": "a@example.com", "subject": "hi", "api_key": "secret"});
        assert!(validate_against_schema(&visible_message_schema(), &input).is_err());
    }

    #[test]
    fn validate_against_schema_rejects_values_outside_enum() {
        let input = json!({"to": "a@example.com", "subject": "hi", "priority": "urgent"});
        assert!(validate_against_schema(&visible_message_schema(), &input).is_err());
    }
}
