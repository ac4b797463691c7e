//! In-memory document for callers that already hold page content.

use image::DynamicImage;

use super::{DocumentError, PdfDocument};
use crate::models::{TextBlock, Word};

/// One page held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryPage {
    pub text: String,
    pub words: Vec<Word>,
    pub blocks: Vec<TextBlock>,
    pub image: Option<DynamicImage>,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_words(mut self, words: Vec<Word>) -> Self {
        self.words = words;
        self
    }

    pub fn with_blocks(mut self, blocks: Vec<TextBlock>) -> Self {
        self.blocks = blocks;
        self
    }

    pub fn with_image(mut self, image: DynamicImage) -> Self {
        self.image = Some(image);
        self
    }
}

/// A document whose pages are already in memory.
///
/// `render_page` returns the stored image regardless of the requested
/// resolution, and fails for pages stored without one.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    pages: Vec<MemoryPage>,
}

impl MemoryDocument {
    pub fn new(pages: Vec<MemoryPage>) -> Self {
        Self { pages }
    }

    /// A document with no pages.
    pub fn empty() -> Self {
        Self::default()
    }

    fn page(&self, page: usize) -> Result<&MemoryPage, DocumentError> {
        self.pages.get(page).ok_or(DocumentError::PageOutOfRange {
            page,
            count: self.pages.len(),
        })
    }
}

impl PdfDocument for MemoryDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, page: usize) -> Result<String, DocumentError> {
        Ok(self.page(page)?.text.clone())
    }

    fn page_words(&self, page: usize) -> Result<Vec<Word>, DocumentError> {
        Ok(self.page(page)?.words.clone())
    }

    fn page_blocks(&self, page: usize) -> Result<Vec<TextBlock>, DocumentError> {
        Ok(self.page(page)?.blocks.clone())
    }

    fn render_page(&self, page: usize, _dpi: u32) -> Result<DynamicImage, DocumentError> {
        self.page(page)?
            .image
            .clone()
            .ok_or(DocumentError::NoImage(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_text_joins_pages() {
        let doc = MemoryDocument::new(vec![
            MemoryPage::new().with_text("first"),
            MemoryPage::new().with_text("second"),
        ]);
        assert_eq!(doc.full_text().unwrap(), "first\nsecond");
    }

    #[test]
    fn test_out_of_range_and_missing_image() {
        let doc = MemoryDocument::new(vec![MemoryPage::new()]);
        assert!(matches!(
            doc.page_text(3),
            Err(DocumentError::PageOutOfRange { page: 3, count: 1 })
        ));
        assert!(matches!(doc.render_page(0, 300), Err(DocumentError::NoImage(0))));
        assert_eq!(MemoryDocument::empty().page_count(), 0);
    }
}
