//! Page-level OCR: rasterize, orient, clean up, then recognize with
//! several page-segmentation modes.

use image::DynamicImage;
use tracing::{debug, warn};

use super::backend::{OcrConfig, OcrEngine, OcrError};
use super::preprocess::{binarize, deskew, rotate_quadrant};
use crate::document::PdfDocument;
use crate::models::Word;

/// Runs the OCR sub-pipeline for single pages.
pub struct PageOcr<'a> {
    engine: &'a dyn OcrEngine,
    config: &'a OcrConfig,
}

impl<'a> PageOcr<'a> {
    pub fn new(engine: &'a dyn OcrEngine, config: &'a OcrConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &OcrConfig {
        self.config
    }

    /// OCR one document page; word boxes come back in page points.
    pub fn words_for_page(
        &self,
        doc: &dyn PdfDocument,
        page: usize,
        dpi: u32,
    ) -> Result<Vec<Word>, OcrError> {
        if !self.engine.is_available() {
            return Err(OcrError::BackendNotAvailable(format!(
                "{} is not installed",
                self.engine.name()
            )));
        }
        let image = doc.render_page(page, dpi)?;
        debug!(
            "OCR page {} rendered at {} dpi ({}x{})",
            page,
            dpi,
            image.width(),
            image.height()
        );
        self.words_for_image(&image, dpi)
    }

    /// OCR an already-rasterized page.
    pub fn words_for_image(&self, image: &DynamicImage, dpi: u32) -> Result<Vec<Word>, OcrError> {
        let gray = image.to_luma8();

        let rotation = match self.engine.detect_orientation(&gray) {
            Ok(deg) => deg,
            Err(e) => {
                debug!("orientation detection skipped: {}", e);
                0
            }
        };
        let gray = rotate_quadrant(gray, rotation);

        let binary = binarize(&gray, self.config);
        let binary = deskew(&binary, self.config.min_deskew_pixels);

        let scale = 72.0 / dpi.max(1) as f64;
        let mut best: Option<Vec<Word>> = None;
        let mut last_error = None;

        for &psm in &self.config.psm_order {
            match self.engine.recognize(&binary, psm) {
                Ok(words) => {
                    debug!("{} psm {} produced {} words", self.engine.name(), psm, words.len());
                    let enough = words.len() > self.config.early_exit_words;
                    if best.as_ref().map_or(true, |b| words.len() > b.len()) {
                        best = Some(words);
                    }
                    if enough {
                        break;
                    }
                }
                Err(e) => {
                    warn!("{} psm {} failed: {}", self.engine.name(), psm, e);
                    last_error = Some(e);
                }
            }
        }

        match (best, last_error) {
            (Some(words), _) => Ok(words
                .into_iter()
                .map(|mut w| {
                    w.bbox = w.bbox.scale(scale);
                    w
                })
                .collect()),
            (None, Some(e)) => Err(e),
            (None, None) => Ok(Vec::new()),
        }
    }
}

/// Rebuild reading-order text from OCR words: one line per (block, line),
/// words ordered left to right.
pub fn words_to_text(words: &[Word]) -> String {
    let mut groups: Vec<((u32, u32), Vec<&Word>)> = Vec::new();
    for word in words {
        let key = (word.block_id, word.line_id);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, items)) => items.push(word),
            None => groups.push((key, vec![word])),
        }
    }

    groups
        .into_iter()
        .map(|(_, mut items)| {
            items.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
            items
                .iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BBox;
    use image::{GrayImage, Luma};
    use std::sync::Mutex;

    /// Returns scripted word counts per PSM and records the calls.
    struct ScriptedEngine {
        counts: Vec<(u8, Result<usize, ()>)>,
        calls: Mutex<Vec<u8>>,
    }

    impl OcrEngine for ScriptedEngine {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn detect_orientation(&self, _image: &GrayImage) -> Result<u32, OcrError> {
            Err(OcrError::OcrFailed("no osd data".into()))
        }

        fn recognize(&self, _image: &GrayImage, psm: u8) -> Result<Vec<Word>, OcrError> {
            self.calls.lock().unwrap().push(psm);
            match self.counts.iter().find(|(p, _)| *p == psm) {
                Some((_, Ok(n))) => Ok((0..*n)
                    .map(|i| Word::new(BBox::new(i as f64 * 100.0, 0.0, i as f64 * 100.0 + 50.0, 50.0), format!("w{}", i)))
                    .collect()),
                _ => Err(OcrError::OcrFailed("pass failed".into())),
            }
        }
    }

    fn page() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(30, 30, Luma([255])))
    }

    #[test]
    fn test_early_exit_after_rich_pass() {
        let engine = ScriptedEngine {
            counts: vec![(6, Ok(3)), (4, Ok(9)), (11, Ok(20)), (3, Ok(1))],
            calls: Mutex::new(Vec::new()),
        };
        let config = OcrConfig::default();
        let words = PageOcr::new(&engine, &config).words_for_image(&page(), 300).unwrap();
        assert_eq!(words.len(), 9);
        assert_eq!(*engine.calls.lock().unwrap(), vec![6, 4]);
        // 100px at 300 dpi is 24pt.
        assert!((words[1].bbox.x0 - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_is_configurable() {
        let engine = ScriptedEngine {
            counts: vec![(6, Ok(3)), (4, Ok(9))],
            calls: Mutex::new(Vec::new()),
        };
        let config = OcrConfig {
            early_exit_words: 2,
            ..Default::default()
        };
        let words = PageOcr::new(&engine, &config).words_for_image(&page(), 72).unwrap();
        assert_eq!(words.len(), 3);
        assert_eq!(*engine.calls.lock().unwrap(), vec![6]);
    }

    #[test]
    fn test_all_passes_failing_is_an_error() {
        let engine = ScriptedEngine {
            counts: vec![],
            calls: Mutex::new(Vec::new()),
        };
        let config = OcrConfig::default();
        assert!(PageOcr::new(&engine, &config).words_for_image(&page(), 300).is_err());
        assert_eq!(engine.calls.lock().unwrap().len(), 4);
    }

    #[test]
    fn test_keeps_best_pass_when_none_reach_threshold() {
        let engine = ScriptedEngine {
            counts: vec![(6, Ok(2)), (4, Err(())), (11, Ok(5)), (3, Ok(4))],
            calls: Mutex::new(Vec::new()),
        };
        let config = OcrConfig::default();
        let words = PageOcr::new(&engine, &config).words_for_image(&page(), 300).unwrap();
        assert_eq!(words.len(), 5);
    }

    #[test]
    fn test_words_to_text_groups_lines() {
        let words = vec![
            Word::new(BBox::new(50.0, 0.0, 80.0, 10.0), "Built").at(1, 0, 2),
            Word::new(BBox::new(10.0, 0.0, 40.0, 10.0), "Year").at(1, 0, 1),
            Word::new(BBox::new(10.0, 20.0, 40.0, 30.0), "1987").at(1, 1, 1),
        ];
        assert_eq!(words_to_text(&words), "Year Built\n1987");
        assert_eq!(words_to_text(&[]), "");
    }
}
