//! Tesseract OCR backend implementation.
//!
//! Uses Tesseract via command-line: `--psm 0` for orientation detection and
//! the `tsv` config for word boxes.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

use image::GrayImage;
use regex::Regex;
use tempfile::TempDir;

use super::backend::{OcrEngine, OcrError};
use crate::models::{BBox, Word};

static ROTATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Rotate:\s*(\d+)").unwrap());

/// Tesseract OCR backend.
pub struct TesseractEngine {
    language: String,
}

impl TesseractEngine {
    /// Create a new Tesseract engine for the given language (e.g. "eng").
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }

    /// Write the image where tesseract can read it.
    fn stage_image(&self, image: &GrayImage, dir: &Path) -> Result<PathBuf, OcrError> {
        let path = dir.join("page.png");
        image
            .save(&path)
            .map_err(|e| OcrError::ImageError(format!("Failed to write page image: {}", e)))?;
        Ok(path)
    }

    /// Run tesseract with extra arguments, returning stdout.
    fn run_tesseract(&self, image_path: &Path, args: &[&str]) -> Result<String, OcrError> {
        let output = Command::new("tesseract")
            .arg(image_path)
            .arg("stdout")
            .args(args)
            .output();

        match output {
            Ok(output) => {
                if output.status.success() {
                    Ok(String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(OcrError::OcrFailed(format!("tesseract failed: {}", stderr.trim())))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(OcrError::BackendNotAvailable(
                    "tesseract not found (install tesseract-ocr)".to_string(),
                ))
            }
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("eng")
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        which::which("tesseract").is_ok()
    }

    fn detect_orientation(&self, image: &GrayImage) -> Result<u32, OcrError> {
        let temp_dir = TempDir::new()?;
        let path = self.stage_image(image, temp_dir.path())?;
        let osd = self.run_tesseract(&path, &["--psm", "0"])?;
        parse_rotation(&osd)
            .ok_or_else(|| OcrError::OcrFailed("no Rotate line in OSD output".to_string()))
    }

    fn recognize(&self, image: &GrayImage, psm: u8) -> Result<Vec<Word>, OcrError> {
        let temp_dir = TempDir::new()?;
        let path = self.stage_image(image, temp_dir.path())?;
        let psm = psm.to_string();
        let tsv = self.run_tesseract(
            &path,
            &["--oem", "3", "--psm", &psm, "-l", &self.language, "tsv"],
        )?;
        Ok(parse_tsv(&tsv))
    }
}

/// Parse the `Rotate:` value of tesseract OSD output.
pub fn parse_rotation(osd: &str) -> Option<u32> {
    ROTATE
        .captures(osd)
        .and_then(|c| c[1].parse::<u32>().ok())
        .map(|deg| deg % 360)
}

/// Parse tesseract TSV output into word boxes (pixel coordinates).
///
/// Columns: level, page_num, block_num, par_num, line_num, word_num, left,
/// top, width, height, conf, text. Only level-5 rows with text are words.
/// Line ids are renumbered per distinct (block, paragraph, line) so they stay
/// unique within a block.
pub fn parse_tsv(tsv: &str) -> Vec<Word> {
    let mut words = Vec::new();
    let mut last_line: Option<(u32, u32, u32)> = None;
    let mut line_id: u32 = 0;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.splitn(12, '\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let text = cols[11].trim();
        if text.is_empty() {
            continue;
        }
        let num = |i: usize| cols[i].trim().parse::<u32>().unwrap_or(0);
        let (block, par, line, word) = (num(2), num(3), num(4), num(5));
        let (left, top, width, height) = (num(6), num(7), num(8), num(9));

        let key = (block, par, line);
        match last_line {
            Some(prev) if prev == key => {}
            Some(_) => {
                line_id += 1;
                last_line = Some(key);
            }
            None => last_line = Some(key),
        }

        let bbox = BBox::new(
            left as f64,
            top as f64,
            (left + width) as f64,
            (top + height) as f64,
        );
        words.push(Word::new(bbox, text).at(block, line_id, word));
    }

    words
}

#[cfg(test)]
mod tests {
    use super::*;

    const TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t2550\t3300\t-1\t
4\t1\t1\t1\t1\t0\t100\t200\t400\t40\t-1\t
5\t1\t1\t1\t1\t1\t100\t200\t120\t40\t96.5\tYear
5\t1\t1\t1\t1\t2\t230\t200\t110\t40\t95.1\tBuilt
5\t1\t1\t1\t1\t3\t400\t200\t100\t40\t91.0\t1987
5\t1\t1\t1\t2\t1\t100\t260\t90\t40\t93.0\tUnits
5\t1\t1\t1\t2\t2\t400\t260\t50\t40\t12.0\t
";

    #[test]
    fn test_parse_tsv_words() {
        let words = parse_tsv(TSV);
        assert_eq!(words.len(), 4);
        assert_eq!(words[0].text, "Year");
        assert_eq!(words[0].bbox, BBox::new(100.0, 200.0, 220.0, 240.0));
        assert_eq!(words[2].word_id, 3);
        assert_eq!(words[0].line_id, 0);
        assert_eq!(words[3].line_id, 1);
        assert_eq!(words[3].block_id, 1);
    }

    #[test]
    fn test_parse_rotation() {
        let osd = "Page number: 0\nOrientation in degrees: 270\nRotate: 90\nOrientation confidence: 5.2\n";
        assert_eq!(parse_rotation(osd), Some(90));
        assert_eq!(parse_rotation("Rotate: 360"), Some(0));
        assert_eq!(parse_rotation("garbage"), None);
    }

    #[test]
    fn test_empty_tsv() {
        assert!(parse_tsv("").is_empty());
    }
}
