//! Schema normalizer: coerce arbitrary extractor or model output into the
//! canonical record shape.
//!
//! Unknown keys are dropped, `sqft`/`unit_count` become integers, `cap_rate`
//! and `rent` become floats, everything else becomes a string. The output
//! is a fixed point: normalizing it again yields the same value.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::models::{is_blank, PropertyRecord, UnitRecord, PROPERTY_FIELDS, UNIT_FIELDS};

static FENCE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^```(?:json)?\s*").unwrap());
static TRAILING_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}\s*$").unwrap());

/// Canonical record produced by [`normalize`].
///
/// `sections` and `doc_type` are passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub property: PropertyRecord,
    pub units: Vec<UnitRecord>,
    pub sections: Vec<Value>,
    pub doc_type: Value,
}

impl NormalizedRecord {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Parse the JSON object at the end of a model response, tolerating a
/// leading markdown fence.
pub fn extract_json(text: &str) -> Result<Value, serde_json::Error> {
    let mut s = text.trim().to_string();
    if s.starts_with("```") {
        let unfenced = FENCE_OPEN
            .replace(&s, "")
            .trim_end_matches(['`', ' ', '\n', '\t'])
            .to_string();
        s = unfenced;
    }
    let candidate = TRAILING_OBJECT
        .find(&s)
        .map(|m| m.as_str())
        .unwrap_or(s.as_str());
    serde_json::from_str(candidate)
}

/// Integer coercion: `"1,234"` is 1234, floats truncate, blanks and garbage are `None`.
pub fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::Bool(b) => Some(*b as i64),
        Value::String(s) => s
            .replace(',', "")
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc() as i64),
        _ => None,
    }
}

/// Float coercion: strips thousands separators, `$` and `%`.
pub fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s
            .replace([',', '$', '%'], "")
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite()),
        _ => None,
    }
}

/// String coercion: `null` and missing become `""`, other scalars their JSON text.
fn to_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn normalize_property(obj: &Map<String, Value>) -> PropertyRecord {
    let text = |key: &str| to_text(obj.get(key));
    let null = Value::Null;
    let raw = |key: &str| obj.get(key).unwrap_or(&null);
    PropertyRecord {
        name: text("name"),
        address: text("address"),
        city: text("city"),
        state: text("state"),
        zipcode: text("zipcode"),
        year_built: text("year_built"),
        sqft: to_int(raw("sqft")),
        unit_count: to_int(raw("unit_count")),
        cap_rate: to_float(raw("cap_rate")),
        terms: Default::default(),
    }
}

fn normalize_unit(obj: &Map<String, Value>) -> UnitRecord {
    let text = |key: &str| to_text(obj.get(key));
    let null = Value::Null;
    let raw = |key: &str| obj.get(key).unwrap_or(&null);
    UnitRecord {
        unit_number: text("unit_number"),
        unit_type: text("unit_type"),
        beds: text("beds"),
        baths: text("baths"),
        sqft: to_int(raw("sqft")),
        rent: to_float(raw("rent")),
        status: text("status"),
        lease_start: text("lease_start"),
        lease_end: text("lease_end"),
    }
}

/// Coerce arbitrary JSON into the canonical shape. A JSON string is parsed
/// as a model response first; unparseable text normalizes to an empty record.
pub fn normalize(raw: &Value) -> NormalizedRecord {
    let parsed;
    let data = match raw {
        Value::String(s) => match extract_json(s) {
            Ok(v) => {
                parsed = v;
                &parsed
            }
            Err(e) => {
                warn!("normalize: input string is not JSON ({}), using empty record", e);
                return normalize(&Value::Object(Map::new()));
            }
        },
        other => other,
    };

    let empty = Map::new();
    let obj = data.as_object().unwrap_or(&empty);

    let property = normalize_property(obj.get("property").and_then(Value::as_object).unwrap_or(&empty));

    let units = obj
        .get("units")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|u| normalize_unit(u.as_object().unwrap_or(&empty)))
                .filter(|u| !u.is_blank())
                .collect()
        })
        .unwrap_or_default();

    let sections = obj
        .get("sections")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    NormalizedRecord {
        property,
        units,
        sections,
        doc_type: obj.get("doc_type").cloned().unwrap_or(Value::Null),
    }
}

/// [`normalize`] over raw response text.
pub fn normalize_str(text: &str) -> NormalizedRecord {
    normalize(&Value::String(text.to_string()))
}

/// True if every key of `value.property` and `value.units[*]` is canonical.
pub fn is_closed(value: &Value) -> bool {
    let prop_ok = value
        .get("property")
        .and_then(Value::as_object)
        .map_or(true, |p| p.keys().all(|k| PROPERTY_FIELDS.contains(&k.as_str())));
    let units_ok = value.get("units").and_then(Value::as_array).map_or(true, |units| {
        units.iter().all(|u| {
            u.as_object()
                .map_or(true, |o| o.keys().all(|k| UNIT_FIELDS.contains(&k.as_str())))
        })
    });
    prop_ok && units_ok
}

/// Doc type as a plain string, when one was given.
pub fn doc_type_text(value: &Value) -> Option<String> {
    if is_blank(value) {
        return None;
    }
    Some(match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}
