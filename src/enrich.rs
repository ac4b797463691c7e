//! Best-effort enrichment: ask a completion service to fill what the
//! deterministic extractors left empty.
//!
//! The model's output always goes through [`normalize`] before it touches
//! the result. Merging is deterministic-first: a property field is taken
//! from the model only when ours is empty, and units, sections, and
//! doc_type only when ours are empty wholesale. Citations are never added.

use std::io::Cursor;
use std::time::Duration;

use base64::Engine;
use image::ImageFormat;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::document::PdfDocument;
use crate::llm::prompts::{structured_request, text_request, vision_request};
use crate::llm::{
    validate_structured, CompletionClient, CompletionRequest, EnrichmentConfig,
    EnrichmentProvider, LlmError,
};
use crate::models::{ExtractionResult, Section};
use crate::normalize::{doc_type_text, extract_json, normalize, NormalizedRecord};
use crate::report::EnrichmentOutcome;

const RAW_LOG_CHARS: usize = 5000;

/// Render the first `vision_max_pages` pages as PNG `data:` URLs.
fn page_images(doc: &dyn PdfDocument, config: &EnrichmentConfig) -> Result<Vec<String>, LlmError> {
    let pages = config.vision_max_pages.min(doc.page_count());
    let mut urls = Vec::with_capacity(pages);
    for page in 0..pages {
        let image = doc
            .render_page(page, config.vision_dpi)
            .map_err(|e| LlmError::Request(format!("render page {}: {}", page, e)))?;
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| LlmError::Request(format!("encode page {}: {}", page, e)))?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&png);
        urls.push(format!("data:image/png;base64,{}", encoded));
    }
    Ok(urls)
}

fn build_request(
    provider: EnrichmentProvider,
    config: &EnrichmentConfig,
    fulltext: &str,
    doc: Option<&dyn PdfDocument>,
) -> Result<CompletionRequest, LlmError> {
    match provider {
        EnrichmentProvider::Text => Ok(text_request(config, fulltext)),
        EnrichmentProvider::Structured => Ok(structured_request(config, fulltext)),
        EnrichmentProvider::Vision => {
            let doc = doc.ok_or_else(|| LlmError::Request("vision mode needs a document".into()))?;
            Ok(vision_request(config, page_images(doc, config)?))
        }
    }
}

fn head(text: &str) -> &str {
    crate::llm::prompts::truncate_content(text, RAW_LOG_CHARS)
}

/// Make one completion call and parse its JSON.
///
/// Unlike [`enrich`], this propagates every failure, including a response
/// that is not JSON after fence stripping. Structured mode also validates
/// the response against the output schema.
pub async fn request_completion(
    client: &dyn CompletionClient,
    config: &EnrichmentConfig,
    fulltext: &str,
    doc: Option<&dyn PdfDocument>,
) -> Result<Value, LlmError> {
    let provider = config.provider.ok_or(LlmError::Disabled)?;
    let request = build_request(provider, config, fulltext, doc)?;

    let timeout = Duration::from_secs(config.timeout_secs);
    let content = tokio::time::timeout(timeout, client.complete(&request))
        .await
        .map_err(|_| LlmError::Timeout(config.timeout_secs))??;
    info!("completion response ({}): {}", provider.as_str(), content);

    let value = extract_json(&content).map_err(|e| {
        warn!("failed to parse completion JSON: {}; raw content: {:?}", e, head(&content));
        LlmError::Parse(e.to_string())
    })?;

    if provider == EnrichmentProvider::Structured {
        validate_structured(&value)?;
    }
    Ok(value)
}

/// Fold normalized model output into `result`, deterministic values first.
pub fn merge(result: &mut ExtractionResult, llm: NormalizedRecord) {
    result.property.fill_gaps(&llm.property);

    if result.units.is_empty() && !llm.units.is_empty() {
        result.units = llm.units;
    }
    if result.sections.is_empty() && !llm.sections.is_empty() {
        result.sections = llm.sections.iter().filter_map(Section::from_value).collect();
    }
    if result.doc_type.is_none() {
        result.doc_type = doc_type_text(&llm.doc_type);
    }
}

/// Enrich `result` with the configured provider.
///
/// Never fails: on any error the input comes back unchanged with
/// [`EnrichmentOutcome::Failed`].
pub async fn enrich(
    mut result: ExtractionResult,
    fulltext: &str,
    doc: Option<&dyn PdfDocument>,
    config: &EnrichmentConfig,
    client: Option<&dyn CompletionClient>,
) -> (ExtractionResult, EnrichmentOutcome) {
    let Some(provider) = config.provider else {
        return (result, EnrichmentOutcome::Skipped("no provider configured".into()));
    };
    let Some(client) = client else {
        return (result, EnrichmentOutcome::Skipped("no completion client".into()));
    };
    let has_pages = doc.is_some_and(|d| d.page_count() > 0);
    if fulltext.trim().is_empty() && !has_pages {
        return (result, EnrichmentOutcome::Skipped("no document text".into()));
    }
    if provider == EnrichmentProvider::Vision && !has_pages {
        return (result, EnrichmentOutcome::Skipped("vision mode without a renderable document".into()));
    }

    debug!("enriching with provider {}", provider.as_str());
    match request_completion(client, config, fulltext, doc).await {
        Ok(raw) => {
            merge(&mut result, normalize(&raw));
            (result, EnrichmentOutcome::Merged)
        }
        Err(e) => {
            warn!("enrichment failed, keeping deterministic result: {}", e);
            (result, EnrichmentOutcome::Failed(e.to_string()))
        }
    }
}
