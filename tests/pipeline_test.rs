//! End-to-end pipeline tests over in-memory documents.
//!
//! No poppler, tesseract, or network is needed: OCR and the completion
//! service are scripted.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{DynamicImage, GrayImage, Luma};
use serde_json::{json, Value};

use realty_extract::acquisition::{page_words, Acquired};
use realty_extract::document::{MemoryDocument, MemoryPage};
use realty_extract::extract::ANCHORS;
use realty_extract::llm::{CompletionClient, CompletionRequest, EnrichmentProvider, LlmError};
use realty_extract::models::{BBox, DocType, ExtractionResult, TextBlock, Word};
use realty_extract::normalize::{is_closed, normalize, to_float, to_int};
use realty_extract::ocr::{OcrConfig, OcrEngine, OcrError, PageOcr};
use realty_extract::report::{EnrichmentOutcome, Stage};
use realty_extract::{Pipeline, Settings};

/// OCR engine that returns a fixed word list and counts recognition passes.
#[derive(Default)]
struct ScriptedOcr {
    words: Vec<Word>,
    passes: Arc<AtomicUsize>,
}

impl OcrEngine for ScriptedOcr {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn detect_orientation(&self, _image: &GrayImage) -> Result<u32, OcrError> {
        Ok(0)
    }

    fn recognize(&self, _image: &GrayImage, _psm: u8) -> Result<Vec<Word>, OcrError> {
        self.passes.fetch_add(1, Ordering::SeqCst);
        Ok(self.words.clone())
    }
}

/// Completion client that replays one response and records requests.
struct ScriptedClient {
    reply: String,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.reply.clone())
    }
}

fn word(text: &str, x0: f64, y0: f64, line: u32) -> Word {
    let x1 = x0 + text.len() as f64 * 6.0;
    Word::new(BBox::new(x0, y0, x1, y0 + 10.0), text).at(0, line, 0)
}

fn blank_page() -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(40, 40, Luma([255])))
}

fn flyer_doc() -> MemoryDocument {
    let words = vec![
        word("Property", 50.0, 100.0, 0),
        word("Name", 104.0, 100.0, 0),
        word("Maple", 200.0, 100.0, 0),
        word("Units:", 50.0, 130.0, 1),
        word("24", 160.0, 130.0, 1),
        word("Year", 50.0, 160.0, 2),
        word("Built", 80.0, 160.0, 2),
        word("1987", 160.0, 160.0, 2),
        word("Cap", 50.0, 190.0, 3),
        word("Rate", 72.0, 190.0, 3),
        word("n/a", 160.0, 190.0, 3),
    ];
    let blocks = vec![TextBlock {
        bbox: BBox::new(50.0, 300.0, 500.0, 360.0),
        text: "Investment Highlights\nA fully renovated garden-style community close to downtown.".into(),
    }];
    MemoryDocument::new(vec![MemoryPage::new()
        .with_text("For Sale Flyer\nProperty Name Maple\nUnits: 24\nYear Built 1987")
        .with_words(words)
        .with_blocks(blocks)])
}

const LEASE_TEXT: &str = "LEASE AGREEMENT\n\
Date: March 1, 2024\n\
Landlord: Harbor Point Holdings LLC\n\
Tenant: Blue Fern Cafe Inc.\n\
The term commences on 04/01/2024 and expires on 03/31/2029 at noon.\n\
Tenant shall pay a base monthly rent of $6,125.00 per month.\n\
Base Rent shall increase by 3% annually.\n\
Security Deposit: $12,250.00";

fn lease_doc() -> MemoryDocument {
    let words: Vec<Word> = LEASE_TEXT
        .lines()
        .enumerate()
        .flat_map(|(line, text)| {
            let mut x = 40.0;
            text.split_whitespace()
                .map(|t| {
                    let w = word(t, x, 50.0 + line as f64 * 20.0, line as u32);
                    x = w.bbox.x1 + 4.0;
                    w
                })
                .collect::<Vec<_>>()
        })
        .collect();
    MemoryDocument::new(vec![MemoryPage::new().with_text(LEASE_TEXT).with_words(words)])
}

fn pipeline() -> Pipeline {
    Pipeline::new(Settings::default()).with_engine(Box::new(ScriptedOcr::default()))
}

fn assert_citations_backed(result: &ExtractionResult) {
    for c in &result.citations {
        assert!(
            result.property.has(&c.field),
            "citation for {} has no value in the property record",
            c.field
        );
    }
}

#[test]
fn normalize_is_idempotent() {
    let inputs = vec![
        json!({"property": {"name": "Acme", "sqft": "1,234", "owner": "x"}, "units": [{"rent": "$900", "floor": 2}, {}], "extra": 1}),
        json!("```json\n{\"property\": {\"cap_rate\": \"6.5%\"}, \"sections\": {\"bad\": true}}\n```"),
        json!("not json at all"),
        json!([1, 2, 3]),
        json!({"property": null, "units": null, "doc_type": "lease"}),
    ];
    for input in inputs {
        let once = normalize(&input).to_value();
        let twice = normalize(&once).to_value();
        assert_eq!(once, twice, "not idempotent for {}", input);
    }
}

#[test]
fn normalize_output_is_closed() {
    let messy = json!({
        "property": {"name": "A", "owner": "B", "tenant": "C", "sqft": 10},
        "units": [{"unit_number": "1", "tenant": "D"}, {"notes": "only extras"}]
    });
    let out = normalize(&messy).to_value();
    assert!(!is_closed(&messy));
    assert!(is_closed(&out));
    assert_eq!(out["property"].as_object().unwrap().len(), 9);
    assert_eq!(out["units"].as_array().unwrap().len(), 1);
}

#[test]
fn numeric_coercion() {
    assert_eq!(to_int(&json!("1,234")), Some(1234));
    assert_eq!(to_int(&json!("")), None);
    assert_eq!(to_float(&json!("$1,200.50")), Some(1200.50));
    assert_eq!(to_float(&json!("12%")), Some(12.0));
    assert_eq!(to_int(&Value::Null), None);
}

#[test]
fn ocr_trigger_threshold() {
    let passes = Arc::new(AtomicUsize::new(0));
    let engine = ScriptedOcr {
        words: (0..10).map(|i| word(&format!("ocr{}", i), i as f64 * 30.0, 0.0, 0)).collect(),
        passes: passes.clone(),
    };
    let config = OcrConfig::default();
    let ocr = PageOcr::new(&engine, &config);
    let native = |n: usize| (0..n).map(|i| word("w", i as f64 * 20.0, 0.0, 0)).collect::<Vec<_>>();

    let three = MemoryDocument::new(vec![MemoryPage::new().with_words(native(3)).with_image(blank_page())]);
    assert!(page_words(&three, 0, &ocr, 300).is_ocr());
    assert!(passes.load(Ordering::SeqCst) > 0);

    passes.store(0, Ordering::SeqCst);
    let four = MemoryDocument::new(vec![MemoryPage::new().with_words(native(4)).with_image(blank_page())]);
    assert!(matches!(page_words(&four, 0, &ocr, 300), Acquired::Native(ref w) if w.len() == 4));
    assert_eq!(passes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dispatch_heuristic() {
    let lease = MemoryDocument::new(vec![MemoryPage::new().with_text("Commercial LEASE AGREEMENT")]);
    let flyer = MemoryDocument::new(vec![MemoryPage::new().with_text("For Sale Flyer")]);

    let p = pipeline();
    assert_eq!(p.run_document(&lease, DocType::Auto).await.routed_to, DocType::Lease);
    assert_eq!(p.run_document(&flyer, DocType::Auto).await.routed_to, DocType::Flyer);
    assert_eq!(
        p.run_document(&lease, DocType::parse("brochure")).await.routed_to,
        DocType::Lease
    );
    assert_eq!(p.run_document(&lease, DocType::RentRoll).await.routed_to, DocType::RentRoll);
}

#[tokio::test]
async fn flyer_citations_match_fields() {
    let report = pipeline().run_document(&flyer_doc(), DocType::Auto).await;
    let result = &report.result;

    assert_eq!(result.property.name, "Maple");
    assert_eq!(result.property.unit_count, Some(24));
    assert_eq!(result.property.year_built, "1987");
    assert_eq!(result.property.cap_rate, None);
    assert_eq!(result.citations.len(), 3);
    assert_citations_backed(result);

    assert_eq!(result.sections.len(), 1);
    assert_eq!(result.sections[0].title, "Investment Highlights");
    assert!(report.fulltext_hint.unwrap().starts_with("For Sale Flyer"));
    assert_eq!(report.enrichment, EnrichmentOutcome::Skipped("no provider configured".into()));
}

#[tokio::test]
async fn flyer_first_page_wins_and_scan_stops() {
    let page = |name: &str, extra: (&str, &str)| {
        let words = vec![
            word("Property", 50.0, 100.0, 0),
            word("Name", 104.0, 100.0, 0),
            word(name, 200.0, 100.0, 0),
            word(extra.0, 50.0, 130.0, 1),
            word(extra.1, 160.0, 130.0, 1),
        ];
        MemoryPage::new()
            .with_text(format!("Property Name {}\n{} {}", name, extra.0, extra.1))
            .with_words(words)
    };
    let doc = MemoryDocument::new(vec![
        page("Alpha", ("SF", "12,000")),
        page("Beta", ("Address", "Elmwood")),
        page("Gamma", ("Units:", "30")),
    ]);

    let result = pipeline().run_document(&doc, DocType::Flyer).await.result;

    assert_eq!(result.property.name, "Alpha");
    assert_eq!(result.property.sqft, Some(12000));
    assert_eq!(result.property.address, "Elmwood");
    assert_eq!(result.property.unit_count, None);

    let name = result.citations.iter().find(|c| c.field == "name").unwrap();
    assert_eq!(name.page, 0);
    assert_eq!(result.citations.iter().filter(|c| c.field == "name").count(), 1);
    let address = result.citations.iter().find(|c| c.field == "address").unwrap();
    assert_eq!(address.page, 1);
    assert!(result.citations.iter().all(|c| c.page < 2));
    assert_citations_backed(&result);
}

#[tokio::test]
async fn lease_citations_match_fields() {
    let report = pipeline().run_document(&lease_doc(), DocType::Lease).await;
    let result = &report.result;

    assert_eq!(result.property.name, "Blue Fern Cafe Inc.");
    assert_eq!(result.property.terms["lease_end"], "03/31/2029");
    assert_eq!(result.property.terms["base_rent_monthly"], 6125.0);
    assert!(!result.citations.is_empty());
    assert_citations_backed(result);

    let landlord = result.citations.iter().find(|c| c.field == "landlord").unwrap();
    assert_eq!(landlord.page, 0);
    assert_eq!(landlord.snippet, "Harbor Point Holdings LLC");

    let page = LEASE_TEXT.to_lowercase();
    for (field, anchor) in ANCHORS {
        if result.property.has(field) && page.contains(&anchor.to_lowercase()) {
            assert!(
                result.citations.iter().any(|c| c.field == field),
                "{} has a value but no citation",
                field
            );
        }
    }
    assert_eq!(result.property.terms["escalation"], "3%");
    assert!(result.citations.iter().any(|c| c.field == "security_deposit"));
}

#[tokio::test]
async fn enrichment_fills_gaps_only() {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let client = ScriptedClient {
        reply: json!({
            "property": {"name": "Other", "city": "Austin", "state": "TX", "sqft": "18,500"},
            "units": [{"unit_number": "101", "rent": "$1,100"}],
            "sections": [],
            "doc_type": "flyer"
        })
        .to_string(),
        requests: requests.clone(),
    };
    let mut settings = Settings::default();
    settings.enrichment.provider = Some(EnrichmentProvider::Text);
    let p = Pipeline::new(settings)
        .with_engine(Box::new(ScriptedOcr::default()))
        .with_client(Box::new(client));

    let report = p.run_document(&flyer_doc(), DocType::Flyer).await;
    let result = &report.result;

    assert_eq!(report.enrichment, EnrichmentOutcome::Merged);
    assert_eq!(result.property.name, "Maple");
    assert_eq!(result.property.city, "Austin");
    assert_eq!(result.property.sqft, Some(18500));
    assert_eq!(result.units.len(), 1);
    assert_eq!(result.sections.len(), 1);
    assert_eq!(result.doc_type.as_deref(), Some("flyer"));
    assert_eq!(result.citations.len(), 3);
    assert!(result.citations.iter().all(|c| c.field != "city"));

    let sent = requests.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let body = serde_json::to_value(&sent[0]).unwrap();
    assert!(body["messages"][1]["content"].as_str().unwrap().contains("For Sale Flyer"));
}

#[tokio::test]
async fn enrichment_failure_keeps_deterministic_result() {
    let client = ScriptedClient {
        reply: "Sorry, I cannot help with that.".into(),
        requests: Arc::new(Mutex::new(Vec::new())),
    };
    let mut settings = Settings::default();
    settings.enrichment.provider = Some(EnrichmentProvider::Text);
    let p = Pipeline::new(settings)
        .with_engine(Box::new(ScriptedOcr::default()))
        .with_client(Box::new(client));

    let baseline = pipeline().run_document(&flyer_doc(), DocType::Flyer).await;
    let report = p.run_document(&flyer_doc(), DocType::Flyer).await;

    assert!(matches!(report.enrichment, EnrichmentOutcome::Failed(_)));
    assert!(report.diagnostics.has_stage(Stage::Enrichment));
    assert_eq!(report.result, baseline.result);
}

#[tokio::test]
async fn graceful_degradation() {
    let p = pipeline();

    let empty = p.run_document(&MemoryDocument::empty(), DocType::Auto).await;
    assert!(empty.result.is_empty());
    assert_eq!(empty.result.doc_type, None);

    let mut garbage = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
    garbage.write_all(b"this is not a pdf \x00\x01\x02").unwrap();

    let report = p.run(garbage.path(), DocType::Auto).await;
    assert!(report.result.is_empty());
    assert_eq!(report.result.doc_type, None);
    assert!(report.diagnostics.has_stage(Stage::Open));

    let result = p.extract(garbage.path(), DocType::Lease).await;
    assert_eq!(result, ExtractionResult::default());

    // With a provider configured, nothing is sent and nothing is invented.
    let requests = Arc::new(Mutex::new(Vec::new()));
    let client = ScriptedClient {
        reply: json!({
            "property": {"name": "Hallucinated Tower"},
            "units": [{"unit_number": "1"}],
            "sections": [],
            "doc_type": "flyer"
        })
        .to_string(),
        requests: requests.clone(),
    };
    let mut settings = Settings::default();
    settings.enrichment.provider = Some(EnrichmentProvider::Text);
    let enriched = Pipeline::new(settings)
        .with_engine(Box::new(ScriptedOcr::default()))
        .with_client(Box::new(client));

    let report = enriched.run(garbage.path(), DocType::Auto).await;
    assert_eq!(report.result, ExtractionResult::default());
    assert_eq!(report.result.doc_type, None);
    assert_eq!(report.enrichment, EnrichmentOutcome::Skipped("no document text".into()));
    assert!(requests.lock().unwrap().is_empty());
}
