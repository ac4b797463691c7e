//! Page access for PDF documents.
//!
//! The pipeline reads documents through the [`PdfDocument`] trait:
//! - [`PopplerDocument`] shells out to poppler-utils (pdfinfo, pdftotext, pdftoppm)
//! - [`MemoryDocument`] holds pages already in memory
//!
//! Page indices are zero-based everywhere in this crate.

mod bbox_layout;
mod memory;
mod poppler;

use image::DynamicImage;
use thiserror::Error;

use crate::models::{TextBlock, Word};

pub use bbox_layout::{parse_bbox_layout, PageLayout};
pub use memory::{MemoryDocument, MemoryPage};
pub use poppler::{check_tools, PopplerDocument};

/// Errors that can occur while reading a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },

    #[error("Page {0} has no raster image")]
    NoImage(usize),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read access to a paginated document.
pub trait PdfDocument: Send + Sync {
    /// Number of pages (zero for unreadable documents).
    fn page_count(&self) -> usize;

    /// Native text layer of one page.
    fn page_text(&self, page: usize) -> Result<String, DocumentError>;

    /// Native words with bounding boxes in page points.
    fn page_words(&self, page: usize) -> Result<Vec<Word>, DocumentError>;

    /// Native layout blocks with bounding boxes in page points.
    fn page_blocks(&self, page: usize) -> Result<Vec<TextBlock>, DocumentError>;

    /// Rasterize one page at the given resolution.
    fn render_page(&self, page: usize, dpi: u32) -> Result<DynamicImage, DocumentError>;

    /// Native text of the whole document, pages joined by newlines.
    fn full_text(&self) -> Result<String, DocumentError> {
        let mut pages = Vec::with_capacity(self.page_count());
        for page in 0..self.page_count() {
            pages.push(self.page_text(page)?);
        }
        Ok(pages.join("\n"))
    }
}

/// Locate `needle` on a page and return the union box of the matching word run.
///
/// Matching is case-insensitive over whitespace-separated tokens. A needle
/// token matches a word when the word starts with it, so "commence" finds
/// "commences" and "Landlord:" finds "Landlord:".
pub fn search_for(words: &[Word], needle: &str) -> Option<crate::models::BBox> {
    let tokens: Vec<String> = needle
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect();
    if tokens.is_empty() || words.len() < tokens.len() {
        return None;
    }

    let lowered: Vec<String> = words.iter().map(|w| w.text.to_lowercase()).collect();
    (0..=words.len() - tokens.len()).find_map(|start| {
        let hit = tokens
            .iter()
            .enumerate()
            .all(|(i, tok)| lowered[start + i].starts_with(tok.as_str()));
        if !hit {
            return None;
        }
        let first = words[start].bbox;
        Some(
            words[start + 1..start + tokens.len()]
                .iter()
                .fold(first, |acc, w| acc.union(&w.bbox)),
        )
    })
}
