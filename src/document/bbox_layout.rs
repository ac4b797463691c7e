//! Parser for `pdftotext -bbox-layout` XHTML output.
//!
//! Poppler emits `page > flow > block > line > word` elements with
//! `xMin/yMin/xMax/yMax` attributes already in page points. The HTML parser
//! lowercases attribute names, so they are read as `xmin` etc.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::models::{BBox, TextBlock, Word};

static PAGE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("page").unwrap());
static BLOCK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("block").unwrap());
static LINE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("line").unwrap());
static WORD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("word").unwrap());

/// Words and blocks of one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub width: f64,
    pub height: f64,
    pub words: Vec<Word>,
    pub blocks: Vec<TextBlock>,
}

fn attr_f64(el: &ElementRef<'_>, name: &str) -> f64 {
    el.value()
        .attr(name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0.0)
}

fn element_bbox(el: &ElementRef<'_>) -> BBox {
    BBox::new(
        attr_f64(el, "xmin"),
        attr_f64(el, "ymin"),
        attr_f64(el, "xmax"),
        attr_f64(el, "ymax"),
    )
}

/// Parse every page in a bbox-layout document.
pub fn parse_bbox_layout(xhtml: &str) -> Vec<PageLayout> {
    let doc = Html::parse_document(xhtml);
    doc.select(&PAGE).map(|page| parse_page(&page)).collect()
}

fn parse_page(page: &ElementRef<'_>) -> PageLayout {
    let mut layout = PageLayout {
        width: attr_f64(page, "width"),
        height: attr_f64(page, "height"),
        ..Default::default()
    };

    // Block numbering runs across flows so (block, line) stays unique per page.
    for (block_id, block) in page.select(&BLOCK).enumerate() {
        let mut lines = Vec::new();
        for (line_id, line) in block.select(&LINE).enumerate() {
            let mut texts = Vec::new();
            for (word_id, word) in line.select(&WORD).enumerate() {
                let text: String = word.text().collect::<String>().trim().to_string();
                if text.is_empty() {
                    continue;
                }
                texts.push(text.clone());
                layout.words.push(
                    Word::new(element_bbox(&word), text).at(
                        block_id as u32,
                        line_id as u32,
                        word_id as u32,
                    ),
                );
            }
            if !texts.is_empty() {
                lines.push(texts.join(" "));
            }
        }
        if !lines.is_empty() {
            layout.blocks.push(TextBlock {
                bbox: element_bbox(&block),
                text: lines.join("\n"),
            });
        }
    }

    layout
}
