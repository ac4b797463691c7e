//! Lease extraction: regular expressions over the document text, then a
//! search of each page for the phrase that anchors every captured field.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};

use crate::acquisition::page_words;
use crate::document::{search_for, PdfDocument};
use crate::models::{ExtractionResult, FieldCitation, PropertyRecord, Word};
use crate::normalize::to_int;
use crate::ocr::{words_to_text, PageOcr};
use crate::report::{Diagnostics, Stage};

/// How a capture is turned into a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Text,
    Number,
}

struct Pattern {
    field: &'static str,
    regex: Regex,
    capture: Capture,
}

fn pattern(field: &'static str, re: &str, capture: Capture) -> Pattern {
    Pattern {
        field,
        regex: Regex::new(&format!("(?i){}", re)).unwrap(),
        capture,
    }
}

static PATTERNS: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
    vec![
        pattern("name", r"Tenant:\s*([^\n]+)", Capture::Text),
        pattern("address", r#"located at\s*(.+?)\s*\("Premises"\)"#, Capture::Text),
        pattern("sqft", r"approximately\s*([\d,]+)\s*(?:rentable|RSF)", Capture::Number),
        pattern("lease_start", r"commence(?:s|) on\s*([0-9/.-]+)", Capture::Text),
        pattern("lease_end", r"expire(?:s|) on\s*([0-9/.-]+)", Capture::Text),
        pattern("base_rent_monthly", r"base monthly rent of\s*\$?([\d,\.]+)", Capture::Number),
        pattern("escalation", r"increase by\s*([\d\.%]+)\s*annually", Capture::Text),
        pattern("security_deposit", r"Security Deposit:\s*(.+)|deposit an amount.*", Capture::Text),
        pattern("use", r"used.*for\s*([^.]+)\.", Capture::Text),
        pattern("renewal", r"renew.*?(five.*?year.*?|additional.*?term.*?)\.", Capture::Text),
        pattern("landlord", r"Landlord:\s*([^\n]+)", Capture::Text),
        pattern("tenant", r"Tenant:\s*([^\n]+)", Capture::Text),
        pattern("date", r"Date:\s*([^\n]+)", Capture::Text),
    ]
});

/// Phrase searched on each page to cite a field.
pub const ANCHORS: [(&str, &str); 13] = [
    ("name", "Tenant:"),
    ("base_rent_monthly", "Base Rent"),
    ("lease_start", "commence"),
    ("lease_end", "expire"),
    ("use", "used"),
    ("renewal", "renew"),
    ("landlord", "Landlord:"),
    ("tenant", "Tenant:"),
    ("address", "located at"),
    ("sqft", "rentable square feet"),
    ("date", "Date:"),
    ("escalation", "increase by"),
    ("security_deposit", "deposit"),
];

/// Strip thousands separators and `$`, then parse; keep the cleaned text if that fails.
fn number(raw: &str) -> Value {
    let cleaned = raw.replace([',', '$'], "");
    let cleaned = cleaned.trim();
    match cleaned.parse::<f64>() {
        Ok(n) if n.is_finite() => Value::from(n),
        _ => Value::from(cleaned),
    }
}

/// Apply every pattern to `text`. Only fields that matched are returned.
pub fn capture_fields(text: &str) -> Vec<(&'static str, Value)> {
    PATTERNS
        .iter()
        .filter_map(|p| {
            let caps = p.regex.captures(text)?;
            let raw = caps
                .get(1)
                .or_else(|| caps.get(0))
                .map(|m| m.as_str().trim())?;
            let value = match p.capture {
                Capture::Text => Value::from(raw),
                Capture::Number => number(raw),
            };
            Some((p.field, value))
        })
        .collect()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Build the property record: canonical keys where they exist, everything
/// else under `terms`. Blank values are dropped.
fn property_from(fields: &[(&'static str, Value)]) -> PropertyRecord {
    let mut property = PropertyRecord::default();
    for (field, value) in fields {
        if value_text(value).trim().is_empty() {
            continue;
        }
        match *field {
            "name" => property.name = value_text(value),
            "address" => property.address = value_text(value),
            "sqft" => property.sqft = to_int(value),
            other => {
                property.terms.insert(other.to_string(), value.clone());
            }
        }
    }
    property
}

/// Cite every captured field on the first page whose text contains its
/// anchor. The box comes from the anchor, else from the value's first token.
fn cite(
    doc: &dyn PdfDocument,
    ocr: &PageOcr<'_>,
    property: &PropertyRecord,
    diag: &mut Diagnostics,
) -> Vec<FieldCitation> {
    let dpi = ocr.config().dpi;
    let mut pending: Vec<(&str, &str)> = ANCHORS
        .iter()
        .copied()
        .filter(|(field, _)| property.has(field))
        .collect();
    let mut citations = Vec::new();

    for page in 0..doc.page_count() {
        if pending.is_empty() {
            break;
        }

        let mut words: Option<Vec<Word>> = None;
        let text = match doc.page_text(page) {
            Ok(t) if !t.trim().is_empty() => t,
            _ => {
                let acquired = page_words(doc, page, ocr, dpi);
                acquired.note(diag, Stage::Ocr, Some(page));
                let w = acquired.into_value();
                let text = words_to_text(&w);
                words = Some(w);
                text
            }
        };
        let lower = text.to_lowercase();

        let (here, rest): (Vec<_>, Vec<_>) = pending
            .into_iter()
            .partition(|(_, anchor)| lower.contains(&anchor.to_lowercase()));
        pending = rest;

        for (field, anchor) in here {
            let words = words.get_or_insert_with(|| page_words(doc, page, ocr, dpi).into_value());
            let snippet = value_text(&property.get(field));
            let first_token = snippet.split_whitespace().next().unwrap_or_default();
            let bbox = search_for(words, anchor).or_else(|| search_for(words, first_token));
            match bbox {
                Some(bbox) => citations.push(FieldCitation {
                    field: field.to_string(),
                    page,
                    bbox,
                    snippet,
                }),
                None => debug!("no box for {} on page {}", field, page),
            }
        }
    }
    citations
}

/// Run the lease extractor over the assembled document text.
pub fn extract_lease(
    doc: &dyn PdfDocument,
    ocr: &PageOcr<'_>,
    text: &str,
    diag: &mut Diagnostics,
) -> ExtractionResult {
    let fields = capture_fields(text);
    let property = property_from(&fields);
    let citations = cite(doc, ocr, &property, diag);
    info!("lease: {} fields captured, {} cited", fields.len(), citations.len());

    ExtractionResult {
        property,
        citations,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{MemoryDocument, MemoryPage};
    use crate::models::BBox;
    use crate::ocr::{OcrConfig, OcrEngine, OcrError};
    use image::GrayImage;

    struct NoOcr;

    impl OcrEngine for NoOcr {
        fn name(&self) -> &'static str {
            "none"
        }
        fn is_available(&self) -> bool {
            false
        }
        fn detect_orientation(&self, _image: &GrayImage) -> Result<u32, OcrError> {
            Ok(0)
        }
        fn recognize(&self, _image: &GrayImage, _psm: u8) -> Result<Vec<Word>, OcrError> {
            Ok(Vec::new())
        }
    }

    /// One page whose words are laid out left to right, one line per text line.
    fn page_of(text: &str) -> MemoryDocument {
        let words = text
            .lines()
            .enumerate()
            .flat_map(|(line, l)| {
                let mut x = 40.0;
                l.split_whitespace()
                    .map(|t| {
                        let y = 50.0 + line as f64 * 20.0;
                        let w = Word::new(BBox::new(x, y, x + t.len() as f64 * 6.0, y + 10.0), t).at(0, line as u32, 0);
                        x = w.bbox.x1 + 4.0;
                        w
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        MemoryDocument::new(vec![MemoryPage::new().with_text(text).with_words(words)])
    }

    const LEASE: &str = "COMMERCIAL LEASE AGREEMENT\n\
Date: March 1, 2024\n\
Landlord: Harbor Point Holdings LLC\n\
Tenant: Blue Fern Cafe Inc.\n\
The Premises are located at 415 Harbor Blvd, Suite 2 (\"Premises\") and contain approximately 2,450 rentable square feet.\n\
The term commences on 04/01/2024 and expires on 03/31/2029 at noon.\n\
Tenant shall pay a base monthly rent of $6,125.00 per month. Base Rent shall increase by 3% annually.\n\
Security Deposit: $12,250.00\n\
The Premises shall be used solely for a restaurant and cafe.\n\
Tenant may renew for one additional five year term.\n";

    fn field<'a>(fields: &'a [(&str, Value)], name: &str) -> Option<&'a Value> {
        fields.iter().find(|(f, _)| *f == name).map(|(_, v)| v)
    }

    #[test]
    fn test_capture_fields() {
        let fields = capture_fields(LEASE);
        assert_eq!(field(&fields, "name"), Some(&Value::from("Blue Fern Cafe Inc.")));
        assert_eq!(field(&fields, "address"), Some(&Value::from("415 Harbor Blvd, Suite 2")));
        assert_eq!(field(&fields, "sqft"), Some(&Value::from(2450.0)));
        assert_eq!(field(&fields, "lease_start"), Some(&Value::from("04/01/2024")));
        assert_eq!(field(&fields, "lease_end"), Some(&Value::from("03/31/2029")));
        assert_eq!(field(&fields, "base_rent_monthly"), Some(&Value::from(6125.0)));
        assert_eq!(field(&fields, "escalation"), Some(&Value::from("3%")));
        assert_eq!(field(&fields, "security_deposit"), Some(&Value::from("$12,250.00")));
        assert_eq!(field(&fields, "use"), Some(&Value::from("a restaurant and cafe")));
        assert_eq!(field(&fields, "landlord"), Some(&Value::from("Harbor Point Holdings LLC")));
        assert_eq!(field(&fields, "date"), Some(&Value::from("March 1, 2024")));
        assert!(field(&fields, "renewal").is_some());
    }

    #[test]
    fn test_number_falls_back_to_text() {
        assert_eq!(number("$1,200"), Value::from(1200.0));
        assert_eq!(number("1,200.00."), Value::from("1200.00."));
    }

    #[test]
    fn test_deposit_without_label_uses_whole_match() {
        let fields = capture_fields("Tenant shall deposit an amount equal to one month of rent.");
        assert_eq!(
            field(&fields, "security_deposit"),
            Some(&Value::from("deposit an amount equal to one month of rent."))
        );
    }

    #[test]
    fn test_property_from_fields() {
        let property = property_from(&capture_fields(LEASE));
        assert_eq!(property.name, "Blue Fern Cafe Inc.");
        assert_eq!(property.sqft, Some(2450));
        assert_eq!(property.terms["tenant"], "Blue Fern Cafe Inc.");
        assert!(property.terms.contains_key("base_rent_monthly"));
        assert!(!property.terms.contains_key("sqft"));
        assert!(property.city.is_empty());
    }

    #[test]
    fn test_nothing_matches() {
        assert!(capture_fields("A flyer about a building.").is_empty());
        assert_eq!(property_from(&[]), PropertyRecord::default());
    }

    #[test]
    fn test_every_anchored_field_is_cited() {
        let doc = page_of(LEASE);
        let config = OcrConfig::default();
        let ocr = PageOcr::new(&NoOcr, &config);
        let mut diag = Diagnostics::new();

        let result = extract_lease(&doc, &ocr, LEASE, &mut diag);
        let lower = LEASE.to_lowercase();
        for (field, anchor) in ANCHORS {
            if result.property.has(field) && lower.contains(&anchor.to_lowercase()) {
                assert!(
                    result.citations.iter().any(|c| c.field == field),
                    "{} has a value but no citation",
                    field
                );
            }
        }
        for field in ["name", "escalation", "security_deposit"] {
            assert!(result.citations.iter().any(|c| c.field == field), "{} not cited", field);
        }
    }

    #[test]
    fn test_citation_falls_back_to_value_token() {
        // "Landlord" without its colon never matches the "Landlord:" anchor.
        let text = "Landlord Harbor Point LLC\nLandlord: Harbor Point LLC";
        let words = vec![
            Word::new(BBox::new(40.0, 50.0, 88.0, 60.0), "Landlord").at(0, 0, 0),
            Word::new(BBox::new(92.0, 50.0, 128.0, 60.0), "Harbor").at(0, 0, 1),
            Word::new(BBox::new(132.0, 50.0, 162.0, 60.0), "Point").at(0, 0, 2),
            Word::new(BBox::new(166.0, 50.0, 184.0, 60.0), "LLC").at(0, 0, 3),
        ];
        let doc = MemoryDocument::new(vec![MemoryPage::new().with_text(text).with_words(words)]);
        let config = OcrConfig::default();
        let ocr = PageOcr::new(&NoOcr, &config);
        let mut diag = Diagnostics::new();

        let result = extract_lease(&doc, &ocr, text, &mut diag);
        let landlord = result.citations.iter().find(|c| c.field == "landlord").unwrap();
        assert_eq!(landlord.page, 0);
        assert_eq!(landlord.snippet, "Harbor Point LLC");
        assert_eq!(landlord.bbox, BBox::new(92.0, 50.0, 128.0, 60.0));
    }
}
