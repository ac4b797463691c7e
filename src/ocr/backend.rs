//! OCR engine abstraction and settings.

use image::GrayImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::DocumentError;
use crate::models::Word;

/// Errors from OCR engines.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("Page render failed: {0}")]
    Render(#[from] DocumentError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(String),
}

/// A text recognition engine.
///
/// Coordinates returned by `recognize` are in raster pixels; callers scale
/// them to page points.
pub trait OcrEngine: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &'static str;

    /// Check if this engine can run (binaries installed, models present).
    fn is_available(&self) -> bool;

    /// Clockwise rotation in degrees (0, 90, 180, 270) that makes the page upright.
    fn detect_orientation(&self, image: &GrayImage) -> Result<u32, OcrError>;

    /// Recognize words using the given page-segmentation mode.
    fn recognize(&self, image: &GrayImage, psm: u8) -> Result<Vec<Word>, OcrError>;
}

/// OCR settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Language for OCR (e.g., "eng", "spa").
    pub language: String,
    /// Raster resolution for per-page word OCR.
    pub dpi: u32,
    /// Raster resolution for full-text reconstruction.
    pub fulltext_dpi: u32,
    /// Pages with fewer native words than this are OCR'd.
    pub min_native_words: usize,
    /// A recognition pass yielding more words than this ends the PSM sequence.
    pub early_exit_words: usize,
    /// Page-segmentation modes in priority order: block, column, sparse, auto.
    pub psm_order: Vec<u8>,
    /// Below this many foreground pixels deskew is skipped.
    pub min_deskew_pixels: usize,
    /// Radius of the speckle-removing opening (0 disables it).
    pub speckle_radius: u8,
    /// Half-width of the local thresholding window, in pixels.
    pub threshold_block_radius: u32,
    /// Amount subtracted from the local mean before thresholding.
    pub threshold_offset: i32,
    /// Pages darker than this mean brightness are inverted first.
    pub dark_mean_threshold: f64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            dpi: 300,
            fulltext_dpi: 350,
            min_native_words: 4,
            early_exit_words: 8,
            psm_order: vec![6, 4, 11, 3],
            min_deskew_pixels: 60,
            speckle_radius: 1,
            threshold_block_radius: 15,
            threshold_offset: 8,
            dark_mean_threshold: 110.0,
        }
    }
}

impl OcrConfig {
    /// Apply environment variable overrides (`OCR_DPI`, `OCR_LANG`).
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(val) = lookup("OCR_DPI") {
            if let Ok(dpi) = val.parse() {
                self.dpi = dpi;
            }
        }
        if let Some(val) = lookup("OCR_LANG") {
            if !val.trim().is_empty() {
                self.language = val;
            }
        }
        self
    }
}
