//! Flyer extraction: label/value pairs found by position.
//!
//! A label is a run of words on one line matching a known caption. Its
//! value is the closest word to the right within the label's vertical band.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::sections::{sections_from_layout, SectionConfig};
use crate::acquisition::page_words;
use crate::document::PdfDocument;
use crate::models::{BBox, ExtractionResult, FieldCitation, PropertyRecord, Word};
use crate::normalize::{to_float, to_int};
use crate::ocr::PageOcr;
use crate::report::{Diagnostics, Stage};

/// Captions and the property field each one fills, in scan order.
pub const LABELS: [(&str, &str); 6] = [
    ("Property Name", "name"),
    ("Address", "address"),
    ("Units", "unit_count"),
    ("Year Built", "year_built"),
    ("SF", "sqft"),
    ("Cap Rate", "cap_rate"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlyerConfig {
    /// Leading pages scanned for labels.
    pub pages: usize,
    /// Farthest a value may start to the right of its label, in points.
    pub max_dx: f64,
    /// Vertical slack around the label band, in points.
    pub ypad: f64,
    /// Length of the full-text hint kept for display.
    pub hint_chars: usize,
}

impl Default for FlyerConfig {
    fn default() -> Self {
        Self {
            pages: 2,
            max_dx: 400.0,
            ypad: 12.0,
            hint_chars: 5000,
        }
    }
}

/// A value word found next to a label.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub value: String,
    pub bbox: BBox,
}

/// Flyer output plus the leading full text for display.
#[derive(Debug, Clone, Default)]
pub struct FlyerExtraction {
    pub result: ExtractionResult,
    pub fulltext_hint: String,
}

fn normalize_token(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Union boxes of every occurrence of `label` as consecutive words on one line.
fn label_hits(words: &[Word], label: &str) -> Vec<BBox> {
    let tokens: Vec<String> = label.split_whitespace().map(normalize_token).collect();
    if tokens.is_empty() || words.len() < tokens.len() {
        return Vec::new();
    }

    (0..=words.len() - tokens.len())
        .filter_map(|start| {
            let run = &words[start..start + tokens.len()];
            let line = (run[0].block_id, run[0].line_id);
            let matches = run.iter().zip(&tokens).enumerate().all(|(i, (word, token))| {
                let mut text = normalize_token(&word.text);
                if i == tokens.len() - 1 {
                    text = text.trim_end_matches(':').to_string();
                }
                text == *token && (word.block_id, word.line_id) == line
            });
            matches.then(|| run[1..].iter().fold(run[0].bbox, |acc, w| acc.union(&w.bbox)))
        })
        .collect()
}

/// Value for `label`: for the first label occurrence with any candidate, the
/// leftmost word that starts right of the label within `max_dx` and stays
/// inside the label's band widened by `ypad`.
pub fn find_value_near(words: &[Word], label: &str, config: &FlyerConfig) -> Option<Hit> {
    label_hits(words, label).into_iter().find_map(|lb| {
        words
            .iter()
            .filter(|w| {
                w.bbox.y0 >= lb.y0 - config.ypad
                    && w.bbox.y1 <= lb.y1 + config.ypad
                    && w.bbox.x0 >= lb.x1
                    && w.bbox.x0 <= lb.x1 + config.max_dx
            })
            .min_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0))
            .map(|w| Hit {
                value: w.text.trim().to_string(),
                bbox: w.bbox,
            })
    })
}

/// Store `value` into `field`; false when it does not coerce to the field's type.
fn assign(property: &mut PropertyRecord, field: &str, value: &str) -> bool {
    let raw = Value::from(value);
    match field {
        "name" => property.name = value.to_string(),
        "address" => property.address = value.to_string(),
        "year_built" => property.year_built = value.to_string(),
        "unit_count" => property.unit_count = to_int(&raw),
        "sqft" => property.sqft = to_int(&raw),
        "cap_rate" => property.cap_rate = to_float(&raw),
        _ => return false,
    }
    property.has(field)
}

/// Run the flyer extractor. `fulltext` is the document text already
/// assembled with OCR fallback; its head becomes the display hint.
pub fn extract_flyer(
    doc: &dyn PdfDocument,
    ocr: &PageOcr<'_>,
    fulltext: &str,
    flyer: &FlyerConfig,
    sections: &SectionConfig,
    diag: &mut Diagnostics,
) -> FlyerExtraction {
    let dpi = ocr.config().dpi;
    let fulltext_hint: String = fulltext.chars().take(flyer.hint_chars).collect();

    let mut result = ExtractionResult {
        sections: sections_from_layout(doc, sections, diag),
        ..Default::default()
    };

    for page in 0..doc.page_count().min(flyer.pages) {
        let acquired = page_words(doc, page, ocr, dpi);
        acquired.note(diag, Stage::Ocr, Some(page));
        let words = acquired.into_value();
        debug!("flyer page {}: {} words", page, words.len());

        for (label, field) in LABELS {
            if result.property.has(field) {
                continue;
            }
            let Some(hit) = find_value_near(&words, label, flyer) else {
                continue;
            };
            if assign(&mut result.property, field, &hit.value) {
                result.citations.push(FieldCitation {
                    field: field.to_string(),
                    page,
                    bbox: hit.bbox,
                    snippet: hit.value,
                });
            }
        }
    }

    info!(
        "flyer: {} fields, {} sections",
        result.citations.len(),
        result.sections.len()
    );
    FlyerExtraction {
        result,
        fulltext_hint,
    }
}
