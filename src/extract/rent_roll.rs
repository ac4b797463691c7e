//! Rent-roll mapping: table header cells to unit fields, one unit per row.

use serde_json::Value;
use tracing::{debug, info};

use crate::document::PdfDocument;
use crate::models::{ExtractionResult, Table, UnitRecord};
use crate::normalize::{to_float, to_int};
use crate::report::Diagnostics;
use crate::tables::TableExtractor;

/// Header substrings and the unit field each one maps to, in precedence order.
pub const HEADER_KEYS: [(&str, &str); 9] = [
    ("unit", "unit_number"),
    ("type", "unit_type"),
    ("beds", "beds"),
    ("baths", "baths"),
    ("sqft", "sqft"),
    ("rent", "rent"),
    ("status", "status"),
    ("lease start", "lease_start"),
    ("lease end", "lease_end"),
];

/// Column index for each mapped field, in column order.
///
/// Each header cell takes the first key it contains whose field is still
/// unmapped, so "Unit" then "Unit Type" yields unit_number and unit_type.
pub fn map_header(header: &[String]) -> Vec<(&'static str, usize)> {
    let mut mapping: Vec<(&'static str, usize)> = Vec::new();
    for (idx, cell) in header.iter().enumerate() {
        let cell = cell.trim().to_lowercase();
        let field = HEADER_KEYS
            .iter()
            .filter(|(key, _)| cell.contains(key))
            .map(|(_, field)| *field)
            .find(|field| mapping.iter().all(|(f, _)| f != field));
        if let Some(field) = field {
            mapping.push((field, idx));
        }
    }
    mapping
}

fn set_field(unit: &mut UnitRecord, field: &str, raw: &str) {
    let text = raw.to_string();
    match field {
        "unit_number" => unit.unit_number = text,
        "unit_type" => unit.unit_type = text,
        "beds" => unit.beds = text,
        "baths" => unit.baths = text,
        "sqft" => unit.sqft = to_int(&Value::from(raw)),
        "rent" => unit.rent = to_float(&Value::from(raw)),
        "status" => unit.status = text,
        "lease_start" => unit.lease_start = text,
        "lease_end" => unit.lease_end = text,
        _ => {}
    }
}

/// Units from one table. Rows whose mapped cells are all blank are dropped.
pub fn units_from_table(table: &Table) -> Vec<UnitRecord> {
    let Some(header) = table.header() else {
        return Vec::new();
    };
    let mapping = map_header(header);
    if mapping.is_empty() {
        debug!("table on page {} has no known headers", table.page);
        return Vec::new();
    }

    table
        .body()
        .iter()
        .filter_map(|row| {
            let cells: Vec<(&str, &str)> = mapping
                .iter()
                .map(|(field, idx)| (*field, row.get(*idx).map_or("", |c| c.trim())))
                .collect();
            if cells.iter().all(|(_, v)| v.is_empty()) {
                return None;
            }
            let mut unit = UnitRecord::default();
            for (field, value) in cells {
                set_field(&mut unit, field, value);
            }
            Some(unit)
        })
        .collect()
}

/// Run the rent-roll extractor over every table both strategies find.
pub fn extract_rent_roll(
    doc: &dyn PdfDocument,
    tables: &TableExtractor,
    diag: &mut Diagnostics,
) -> ExtractionResult {
    let found = tables.extract(doc, diag);
    let units: Vec<UnitRecord> = found.iter().flat_map(units_from_table).collect();
    info!("rent roll: {} tables, {} units", found.len(), units.len());
    ExtractionResult {
        units,
        ..Default::default()
    }
}
