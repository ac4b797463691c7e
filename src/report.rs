//! Stage diagnostics: why a stage produced less than it could have.

use serde::Serialize;

use crate::models::{DocType, ExtractionResult};

/// Pipeline stage a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Open,
    NativeText,
    Ocr,
    Tables,
    Sections,
    Enrichment,
}

/// One degraded stage, with the page it happened on when page-scoped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    pub reason: String,
}

/// Collector passed through the extractors.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: Stage, page: Option<usize>, reason: impl Into<String>) {
        self.0.push(Diagnostic {
            stage,
            page,
            reason: reason.into(),
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if any diagnostic was recorded for `stage`.
    pub fn has_stage(&self, stage: Stage) -> bool {
        self.0.iter().any(|d| d.stage == stage)
    }
}

/// What happened in the enrichment step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum EnrichmentOutcome {
    /// No provider configured, or the mode could not run for this document.
    Skipped(String),
    /// Model output was normalized and merged.
    Merged,
    /// The call failed; the deterministic result was kept unchanged.
    Failed(String),
}

/// Full outcome of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub result: ExtractionResult,
    /// Extractor the document was routed to.
    pub routed_to: DocType,
    pub diagnostics: Diagnostics,
    pub enrichment: EnrichmentOutcome,
    /// Leading OCR-backed text of flyers, for display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fulltext_hint: Option<String>,
}
