//! Text and word acquisition with OCR fallback.
//!
//! Native text is preferred. Pages whose text layer is missing or too sparse
//! are OCR'd. Nothing here returns an error: a failed page comes back as
//! [`Acquired::Empty`] carrying the reason.

use tracing::{debug, info, warn};

use crate::document::PdfDocument;
use crate::models::Word;
use crate::ocr::{words_to_text, PageOcr};
use crate::report::{Diagnostics, Stage};

/// A value acquired from one of the text sources, or the reason there is none.
#[derive(Debug, Clone, PartialEq)]
pub enum Acquired<T> {
    Native(T),
    Ocr(T),
    Empty { reason: String },
}

impl<T: Default> Acquired<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Acquired::Native(v) | Acquired::Ocr(v) => Some(v),
            Acquired::Empty { .. } => None,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Acquired::Native(v) | Acquired::Ocr(v) => v,
            Acquired::Empty { .. } => T::default(),
        }
    }

    pub fn is_ocr(&self) -> bool {
        matches!(self, Acquired::Ocr(_))
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Acquired::Empty { reason } => Some(reason),
            _ => None,
        }
    }

    /// Record an empty acquisition in `diag`.
    pub fn note(&self, diag: &mut Diagnostics, stage: Stage, page: Option<usize>) {
        if let Some(reason) = self.reason() {
            diag.push(stage, page, reason);
        }
    }
}

/// Word boxes for a page, OCR'd when fewer than `min_native_words` are native.
pub fn page_words(doc: &dyn PdfDocument, page: usize, ocr: &PageOcr<'_>, dpi: u32) -> Acquired<Vec<Word>> {
    let native = match doc.page_words(page) {
        Ok(words) => words,
        Err(e) => {
            debug!("native words unavailable on page {}: {}", page, e);
            Vec::new()
        }
    };

    if native.len() >= ocr.config().min_native_words {
        return Acquired::Native(native);
    }

    debug!("page {} has {} native words, running OCR", page, native.len());
    match ocr.words_for_page(doc, page, dpi) {
        Ok(words) if !words.is_empty() => Acquired::Ocr(words),
        Ok(_) if !native.is_empty() => Acquired::Native(native),
        Ok(_) => Acquired::Empty {
            reason: "no native words and OCR recognized nothing".to_string(),
        },
        Err(e) if !native.is_empty() => {
            warn!("OCR failed on page {}, keeping {} native words: {}", page, native.len(), e);
            Acquired::Native(native)
        }
        Err(e) => Acquired::Empty {
            reason: format!("no native words and OCR failed: {}", e),
        },
    }
}

/// Text of a single page: trimmed native text, else lines rebuilt from OCR words.
pub fn page_text(doc: &dyn PdfDocument, page: usize, ocr: &PageOcr<'_>, dpi: u32) -> Acquired<String> {
    match doc.page_text(page) {
        Ok(text) if !text.trim().is_empty() => return Acquired::Native(text.trim().to_string()),
        Ok(_) => {}
        Err(e) => debug!("native text unavailable on page {}: {}", page, e),
    }

    match ocr.words_for_page(doc, page, dpi) {
        Ok(words) if !words.is_empty() => Acquired::Ocr(words_to_text(&words)),
        Ok(_) => Acquired::Empty {
            reason: "no native text and OCR recognized nothing".to_string(),
        },
        Err(e) => Acquired::Empty {
            reason: format!("no native text and OCR failed: {}", e),
        },
    }
}

/// Per-page text of a whole document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FullText {
    pub pages: Vec<Acquired<String>>,
}

impl FullText {
    /// Non-empty page texts joined by newlines.
    pub fn text(&self) -> String {
        self.pages
            .iter()
            .filter_map(|p| p.value())
            .filter(|t| !t.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn ocr_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.is_ocr()).count()
    }

    /// Record every empty page in `diag`.
    pub fn note(&self, diag: &mut Diagnostics) {
        for (page, acquired) in self.pages.iter().enumerate() {
            acquired.note(diag, Stage::Ocr, Some(page));
        }
    }
}

/// Full text with per-page OCR fallback.
pub fn fulltext_with_ocr_fallback(doc: &dyn PdfDocument, ocr: &PageOcr<'_>, dpi: u32) -> FullText {
    let pages = (0..doc.page_count())
        .map(|page| page_text(doc, page, ocr, dpi))
        .collect();
    FullText { pages }
}

/// Document text: the native text layer in one pass, and only if that fails
/// or comes back blank, the per-page OCR reconstruction.
pub fn document_text(doc: &dyn PdfDocument, ocr: &PageOcr<'_>, diag: &mut Diagnostics) -> String {
    match doc.full_text() {
        Ok(text) if !text.trim().is_empty() => return text,
        Ok(_) => debug!("document has no native text layer, reconstructing with OCR"),
        Err(e) => {
            warn!("native text layer failed, reconstructing with OCR: {}", e);
            diag.push(Stage::NativeText, None, e.to_string());
        }
    }
    let full = fulltext_with_ocr_fallback(doc, ocr, ocr.config().fulltext_dpi);
    full.note(diag);
    info!("reconstructed {} of {} page(s) with OCR", full.ocr_pages(), full.pages.len());
    full.text()
}
