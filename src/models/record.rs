//! Canonical extraction output: property, units, sections, and citations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::word::BBox;

/// Canonical property keys, in output order.
pub const PROPERTY_FIELDS: [&str; 9] = [
    "name",
    "address",
    "city",
    "state",
    "zipcode",
    "year_built",
    "sqft",
    "unit_count",
    "cap_rate",
];

/// Canonical unit keys, in output order.
pub const UNIT_FIELDS: [&str; 9] = [
    "unit_number",
    "unit_type",
    "beds",
    "baths",
    "sqft",
    "rent",
    "status",
    "lease_start",
    "lease_end",
];

/// Requested document classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    Flyer,
    RentRoll,
    Lease,
    /// Route by keyword heuristic over the first page.
    #[default]
    Auto,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Flyer => "flyer",
            DocType::RentRoll => "rent_roll",
            DocType::Lease => "lease",
            DocType::Auto => "auto",
        }
    }

    /// Parse a requested type. Anything unrecognized falls through to `Auto`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "flyer" => DocType::Flyer,
            "rent_roll" => DocType::RentRoll,
            "lease" => DocType::Lease,
            _ => DocType::Auto,
        }
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Property attributes. String fields use `""` for missing, numeric fields `None`.
///
/// `terms` carries extractor-specific extras (lease terms such as
/// `lease_start` or `base_rent_monthly`). They serialize next to the
/// canonical keys and are never produced by the schema normalizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zipcode: String,
    #[serde(default)]
    pub year_built: String,
    #[serde(default)]
    pub sqft: Option<i64>,
    #[serde(default)]
    pub unit_count: Option<i64>,
    #[serde(default)]
    pub cap_rate: Option<f64>,
    #[serde(flatten, default, skip_serializing_if = "BTreeMap::is_empty")]
    pub terms: BTreeMap<String, Value>,
}

impl PropertyRecord {
    /// Look up a field (canonical or extra term) as JSON. Missing values are `Null`.
    pub fn get(&self, field: &str) -> Value {
        match field {
            "name" => Value::from(self.name.clone()),
            "address" => Value::from(self.address.clone()),
            "city" => Value::from(self.city.clone()),
            "state" => Value::from(self.state.clone()),
            "zipcode" => Value::from(self.zipcode.clone()),
            "year_built" => Value::from(self.year_built.clone()),
            "sqft" => self.sqft.map(Value::from).unwrap_or(Value::Null),
            "unit_count" => self.unit_count.map(Value::from).unwrap_or(Value::Null),
            "cap_rate" => self.cap_rate.map(Value::from).unwrap_or(Value::Null),
            other => self.terms.get(other).cloned().unwrap_or(Value::Null),
        }
    }

    /// True if the field holds a non-empty value.
    pub fn has(&self, field: &str) -> bool {
        !is_blank(&self.get(field))
    }

    /// Copy each canonical field from `other` where ours is empty and theirs is not.
    pub fn fill_gaps(&mut self, other: &PropertyRecord) {
        fill_str(&mut self.name, &other.name);
        fill_str(&mut self.address, &other.address);
        fill_str(&mut self.city, &other.city);
        fill_str(&mut self.state, &other.state);
        fill_str(&mut self.zipcode, &other.zipcode);
        fill_str(&mut self.year_built, &other.year_built);
        fill_opt(&mut self.sqft, other.sqft);
        fill_opt(&mut self.unit_count, other.unit_count);
        fill_opt(&mut self.cap_rate, other.cap_rate);
    }
}

fn fill_str(ours: &mut String, theirs: &str) {
    if ours.trim().is_empty() && !theirs.trim().is_empty() {
        *ours = theirs.to_string();
    }
}

fn fill_opt<T: Copy>(ours: &mut Option<T>, theirs: Option<T>) {
    if ours.is_none() && theirs.is_some() {
        *ours = theirs;
    }
}

/// One row of a rent roll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitRecord {
    #[serde(default)]
    pub unit_number: String,
    #[serde(default)]
    pub unit_type: String,
    #[serde(default)]
    pub beds: String,
    #[serde(default)]
    pub baths: String,
    #[serde(default)]
    pub sqft: Option<i64>,
    #[serde(default)]
    pub rent: Option<f64>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub lease_start: String,
    #[serde(default)]
    pub lease_end: String,
}

impl UnitRecord {
    /// True when no field carries a value.
    pub fn is_blank(&self) -> bool {
        [
            &self.unit_number,
            &self.unit_type,
            &self.beds,
            &self.baths,
            &self.status,
            &self.lease_start,
            &self.lease_end,
        ]
        .iter()
        .all(|s| s.trim().is_empty())
            && self.sqft.is_none()
            && self.rent.is_none()
    }
}

/// A block of body text from the page layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub bbox: BBox,
}

impl Section {
    /// Lenient conversion from model output; returns `None` for non-objects.
    pub fn from_value(value: &Value) -> Option<Section> {
        let obj = value.as_object()?;
        let text_of = |key: &str| match obj.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let page = obj
            .get("page")
            .and_then(|p| p.as_u64().or_else(|| p.as_f64().map(|f| f.max(0.0) as u64)))
            .unwrap_or(0) as usize;
        let bbox = obj
            .get("bbox")
            .and_then(|b| b.as_array())
            .filter(|a| a.len() == 4)
            .map(|a| {
                let c: Vec<f64> = a.iter().map(|v| v.as_f64().unwrap_or(0.0)).collect();
                BBox::new(c[0], c[1], c[2], c[3])
            })
            .unwrap_or_default();
        Some(Section {
            title: text_of("title"),
            text: text_of("text"),
            page,
            bbox,
        })
    }
}

/// Provenance for one extracted field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCitation {
    pub field: String,
    pub page: usize,
    pub bbox: BBox,
    pub snippet: String,
}

/// The pipeline's sole output unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(default)]
    pub property: PropertyRecord,
    #[serde(default)]
    pub units: Vec<UnitRecord>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub citations: Vec<FieldCitation>,
    #[serde(default)]
    pub doc_type: Option<String>,
}

impl ExtractionResult {
    /// True when nothing at all was extracted.
    pub fn is_empty(&self) -> bool {
        PROPERTY_FIELDS.iter().all(|f| !self.property.has(f))
            && self.property.terms.is_empty()
            && self.units.is_empty()
            && self.sections.is_empty()
            && self.citations.is_empty()
            && self.doc_type.is_none()
    }
}

/// Empty means `null`, blank string, empty array, or empty object.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}
