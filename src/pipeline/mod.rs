//! The extraction pipeline: dispatch, deterministic extraction, then
//! optional enrichment.
//!
//! One document is processed at a time and nothing is shared between runs.
//! No stage can fail the pipeline; degraded stages show up as
//! [`Diagnostics`] on the [`PipelineReport`].

mod dispatch;

use std::path::Path;

use tracing::{info, warn};

use crate::acquisition::document_text;
use crate::config::Settings;
use crate::document::{MemoryDocument, PdfDocument, PopplerDocument};
use crate::enrich::enrich;
use crate::extract::{extract_flyer, extract_lease, extract_rent_roll};
use crate::llm::{CompletionClient, OpenAiClient};
use crate::models::{DocType, ExtractionResult};
use crate::ocr::{OcrEngine, PageOcr, TesseractEngine};
use crate::report::{Diagnostics, EnrichmentOutcome, PipelineReport, Stage};
use crate::tables::TableExtractor;

pub use dispatch::route;

/// Runs documents through extraction and enrichment.
pub struct Pipeline {
    settings: Settings,
    engine: Box<dyn OcrEngine>,
    client: Option<Box<dyn CompletionClient>>,
    tables: TableExtractor,
}

impl Pipeline {
    /// Pipeline with the tesseract engine and, when a provider is
    /// configured, an OpenAI-compatible completion client.
    pub fn new(settings: Settings) -> Self {
        let engine = Box::new(TesseractEngine::new(settings.ocr.language.clone()));
        let tables = TableExtractor::from_config(&settings.tables);
        let client: Option<Box<dyn CompletionClient>> = if settings.enrichment.is_enabled() {
            match OpenAiClient::new(&settings.enrichment) {
                Ok(client) => Some(Box::new(client)),
                Err(e) => {
                    warn!("completion client unavailable, enrichment will be skipped: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self {
            settings,
            engine,
            client,
            tables,
        }
    }

    pub fn with_engine(mut self, engine: Box<dyn OcrEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_client(mut self, client: Box<dyn CompletionClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Extract a document from disk, returning only the result.
    pub async fn extract(&self, path: &Path, doc_type: DocType) -> ExtractionResult {
        self.run(path, doc_type).await.result
    }

    /// Extract a document from disk.
    ///
    /// A file that cannot be opened is processed as a document with no
    /// pages, so the report holds an empty result and an `Open` diagnostic.
    pub async fn run(&self, path: &Path, doc_type: DocType) -> PipelineReport {
        let mut diag = Diagnostics::new();
        match PopplerDocument::open(path) {
            Ok(doc) => self.run_with(&doc, doc_type, diag).await,
            Err(e) => {
                warn!("cannot open {}: {}", path.display(), e);
                diag.push(Stage::Open, None, e.to_string());
                self.run_with(&MemoryDocument::empty(), doc_type, diag).await
            }
        }
    }

    /// Extract an already-open document.
    pub async fn run_document(&self, doc: &dyn PdfDocument, doc_type: DocType) -> PipelineReport {
        self.run_with(doc, doc_type, Diagnostics::new()).await
    }

    async fn run_with(
        &self,
        doc: &dyn PdfDocument,
        doc_type: DocType,
        mut diag: Diagnostics,
    ) -> PipelineReport {
        let ocr = PageOcr::new(self.engine.as_ref(), &self.settings.ocr);
        let routed_to = route(doc, doc_type);
        info!("extracting {} page(s) as {}", doc.page_count(), routed_to);

        let fulltext = document_text(doc, &ocr, &mut diag);
        let mut fulltext_hint = None;
        let result = match routed_to {
            DocType::Lease => extract_lease(doc, &ocr, &fulltext, &mut diag),
            DocType::RentRoll => extract_rent_roll(doc, &self.tables, &mut diag),
            DocType::Flyer | DocType::Auto => {
                let flyer = extract_flyer(
                    doc,
                    &ocr,
                    &fulltext,
                    &self.settings.flyer,
                    &self.settings.sections,
                    &mut diag,
                );
                if !flyer.fulltext_hint.is_empty() {
                    fulltext_hint = Some(flyer.fulltext_hint);
                }
                flyer.result
            }
        };

        let renderable = (doc.page_count() > 0).then_some(doc);
        let (result, enrichment) = enrich(
            result,
            &fulltext,
            renderable,
            &self.settings.enrichment,
            self.client.as_deref(),
        )
        .await;

        if let EnrichmentOutcome::Failed(reason) = &enrichment {
            diag.push(Stage::Enrichment, None, reason.clone());
        }

        PipelineReport {
            result,
            routed_to,
            diagnostics: diag,
            enrichment,
            fulltext_hint,
        }
    }
}
