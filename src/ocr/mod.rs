//! OCR for pages without a usable text layer.
//!
//! The engine is pluggable through [`OcrEngine`]; Tesseract (CLI) is the
//! default. Before recognition every page goes through the same cleanup:
//!
//! 1. orientation detection and quarter-turn correction
//! 2. grayscale, inversion of light-on-dark pages, median smoothing
//! 3. local-mean thresholding and a small opening against speckle
//! 4. deskew from the minimum-area rectangle of the ink
//!
//! Recognition then tries several page-segmentation modes in order and stops
//! early once a pass is rich enough.

mod backend;
mod page;
pub mod preprocess;
mod tesseract;

pub use backend::{OcrConfig, OcrEngine, OcrError};
pub use page::{words_to_text, PageOcr};
pub use tesseract::{parse_rotation, parse_tsv, TesseractEngine};
