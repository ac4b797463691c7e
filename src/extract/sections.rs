//! Body-text sections from the native page layout.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::PdfDocument;
use crate::models::Section;
use crate::report::{Diagnostics, Stage};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionConfig {
    /// Blocks must be longer than this (trimmed, in chars) to count.
    pub min_chars: usize,
    /// Title is the first line cut to this many chars.
    pub title_chars: usize,
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self {
            min_chars: 40,
            title_chars: 80,
        }
    }
}

/// Every sufficiently long layout block on every page, in page order.
pub fn sections_from_layout(
    doc: &dyn PdfDocument,
    config: &SectionConfig,
    diag: &mut Diagnostics,
) -> Vec<Section> {
    let mut sections = Vec::new();
    for page in 0..doc.page_count() {
        let blocks = match doc.page_blocks(page) {
            Ok(blocks) => blocks,
            Err(e) => {
                diag.push(Stage::Sections, Some(page), e.to_string());
                continue;
            }
        };
        for block in blocks {
            let text = block.text.trim();
            if text.chars().count() <= config.min_chars {
                continue;
            }
            let title: String = text
                .lines()
                .next()
                .unwrap_or_default()
                .chars()
                .take(config.title_chars)
                .collect();
            sections.push(Section {
                title,
                text: text.to_string(),
                page,
                bbox: block.bbox,
            });
        }
    }
    debug!("{} sections from layout", sections.len());
    sections
}
