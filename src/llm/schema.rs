//! Output schema for structured completions and its validator.

use std::sync::LazyLock;

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::models::{PROPERTY_FIELDS, UNIT_FIELDS};

/// Violations of [`OUTPUT_SCHEMA`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("{0} is not an object")]
    NotAnObject(String),

    #[error("missing required field {0}")]
    MissingField(String),

    #[error("unknown field {0}")]
    UnknownField(String),

    #[error("{path} should be {expected}")]
    WrongType { path: String, expected: &'static str },
}

/// JSON Schema of the canonical output, sent as the structured response format.
pub static OUTPUT_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    let text = json!({"type": ["string", "null"]});
    let number = json!({"type": ["string", "number", "null"]});
    let fields = |names: &[&str], numeric: &[&str]| -> Value {
        let props: Map<String, Value> = names
            .iter()
            .map(|name| {
                let ty = if numeric.contains(name) { number.clone() } else { text.clone() };
                (name.to_string(), ty)
            })
            .collect();
        Value::Object(props)
    };

    json!({
        "type": "object",
        "properties": {
            "property": {
                "type": "object",
                "properties": fields(&PROPERTY_FIELDS[..], &["sqft", "unit_count", "cap_rate"]),
                "additionalProperties": false
            },
            "units": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": fields(&UNIT_FIELDS[..], &["sqft", "rent"]),
                    "additionalProperties": false
                }
            },
            "sections": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": {"type": ["string", "null"]},
                        "text": {"type": ["string", "null"]},
                        "page": {"type": ["integer", "null"]},
                        "bbox": {"type": "array", "items": {"type": "number"}}
                    },
                    "additionalProperties": true
                }
            },
            "doc_type": {"type": ["string", "null"]}
        },
        "required": ["property", "units", "sections"]
    })
});

const NUMERIC_PROPERTY: [&str; 3] = ["sqft", "unit_count", "cap_rate"];
const NUMERIC_UNIT: [&str; 2] = ["sqft", "rent"];

fn object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, SchemaError> {
    value
        .as_object()
        .ok_or_else(|| SchemaError::NotAnObject(path.to_string()))
}

fn array<'a>(value: &'a Value, path: &str) -> Result<&'a Vec<Value>, SchemaError> {
    value.as_array().ok_or_else(|| SchemaError::WrongType {
        path: path.to_string(),
        expected: "an array",
    })
}

fn text_or_null(value: &Value, path: &str) -> Result<(), SchemaError> {
    match value {
        Value::String(_) | Value::Null => Ok(()),
        _ => Err(SchemaError::WrongType {
            path: path.to_string(),
            expected: "a string or null",
        }),
    }
}

fn scalar_or_null(value: &Value, path: &str) -> Result<(), SchemaError> {
    match value {
        Value::String(_) | Value::Number(_) | Value::Null => Ok(()),
        _ => Err(SchemaError::WrongType {
            path: path.to_string(),
            expected: "a string, number, or null",
        }),
    }
}

/// Check a closed record: only `allowed` keys, numeric keys may be numbers.
fn record(
    value: &Value,
    path: &str,
    allowed: &[&str],
    numeric: &[&str],
) -> Result<(), SchemaError> {
    for (key, field) in object(value, path)? {
        let field_path = format!("{}.{}", path, key);
        if !allowed.contains(&key.as_str()) {
            return Err(SchemaError::UnknownField(field_path));
        }
        if numeric.contains(&key.as_str()) {
            scalar_or_null(field, &field_path)?;
        } else {
            text_or_null(field, &field_path)?;
        }
    }
    Ok(())
}

fn section(value: &Value, path: &str) -> Result<(), SchemaError> {
    let obj = object(value, path)?;
    for key in ["title", "text"] {
        if let Some(v) = obj.get(key) {
            text_or_null(v, &format!("{}.{}", path, key))?;
        }
    }
    if let Some(page) = obj.get("page") {
        if !(page.is_null() || page.is_i64() || page.is_u64()) {
            return Err(SchemaError::WrongType {
                path: format!("{}.page", path),
                expected: "an integer or null",
            });
        }
    }
    if let Some(bbox) = obj.get("bbox") {
        let bbox_path = format!("{}.bbox", path);
        if !array(bbox, &bbox_path)?.iter().all(Value::is_number) {
            return Err(SchemaError::WrongType {
                path: bbox_path,
                expected: "an array of numbers",
            });
        }
    }
    Ok(())
}

/// Validate a structured-mode response against [`OUTPUT_SCHEMA`].
///
/// Unknown keys are rejected inside `property` and each unit; sections may
/// carry extra keys. Top-level keys other than the four canonical ones are
/// ignored.
pub fn validate_structured(value: &Value) -> Result<(), SchemaError> {
    let root = object(value, "response")?;
    for key in ["property", "units", "sections"] {
        if !root.contains_key(key) {
            return Err(SchemaError::MissingField(key.to_string()));
        }
    }

    record(&root["property"], "property", &PROPERTY_FIELDS, &NUMERIC_PROPERTY)?;

    for (i, unit) in array(&root["units"], "units")?.iter().enumerate() {
        record(unit, &format!("units[{}]", i), &UNIT_FIELDS, &NUMERIC_UNIT)?;
    }

    for (i, s) in array(&root["sections"], "sections")?.iter().enumerate() {
        section(s, &format!("sections[{}]", i))?;
    }

    if let Some(doc_type) = root.get("doc_type") {
        text_or_null(doc_type, "doc_type")?;
    }
    Ok(())
}
