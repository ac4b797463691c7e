//! Poppler-backed document access using pdfinfo, pdftotext, and pdftoppm.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};

use image::DynamicImage;
use tempfile::TempDir;
use tracing::debug;

use super::bbox_layout::{parse_bbox_layout, PageLayout};
use super::{DocumentError, PdfDocument};
use crate::models::{TextBlock, Word};

/// Handle command output, extracting stdout on success or returning appropriate error.
fn handle_cmd_output(
    result: std::io::Result<std::process::Output>,
    tool_name: &str,
    error_prefix: &str,
) -> Result<String, DocumentError> {
    match result {
        Ok(output) => {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(DocumentError::ExtractionFailed(format!(
                    "{}: {}",
                    error_prefix,
                    stderr.trim()
                )))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(DocumentError::ToolNotFound(tool_name.to_string()))
        }
        Err(e) => Err(DocumentError::Io(e)),
    }
}

/// Check command status, returning appropriate error on failure.
fn check_cmd_status(
    result: std::io::Result<std::process::ExitStatus>,
    tool_name: &str,
    error_msg: &str,
) -> Result<(), DocumentError> {
    match result {
        Ok(s) if s.success() => Ok(()),
        Ok(_) => Err(DocumentError::ExtractionFailed(error_msg.to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(DocumentError::ToolNotFound(tool_name.to_string()))
        }
        Err(e) => Err(DocumentError::Io(e)),
    }
}

/// Parse the `Pages:` line of pdfinfo output.
fn parse_page_count(pdfinfo: &str) -> Option<usize> {
    pdfinfo
        .lines()
        .find(|line| line.starts_with("Pages:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|n| n.parse().ok())
}

/// Find the image file pdftoppm wrote for a 1-based page number.
fn find_page_image(temp_path: &Path, page_num: usize) -> Option<PathBuf> {
    // pdftoppm pads page numbers to the width of the page count: page-1.png, page-01.png, ...
    for digits in [1, 2, 3, 4] {
        let filename = format!("page-{:0width$}.png", page_num, width = digits);
        let path = temp_path.join(&filename);
        if path.exists() {
            return Some(path);
        }
    }
    None
}

/// A PDF on disk, read through poppler-utils.
///
/// Opening runs `pdfinfo` once; layouts from `pdftotext -bbox-layout` are
/// cached per page so words and blocks come from a single tool run.
pub struct PopplerDocument {
    path: PathBuf,
    page_count: usize,
    layouts: Mutex<HashMap<usize, Arc<PageLayout>>>,
}

impl PopplerDocument {
    /// Open a PDF, failing if pdfinfo cannot read it.
    pub fn open(path: &Path) -> Result<Self, DocumentError> {
        let output = Command::new("pdfinfo").arg(path).output();
        let info = handle_cmd_output(output, "pdfinfo (install poppler-utils)", "pdfinfo failed")?;
        let page_count = parse_page_count(&info).ok_or_else(|| {
            DocumentError::ExtractionFailed("pdfinfo reported no page count".to_string())
        })?;
        debug!("Opened {:?} with {} pages", path, page_count);

        Ok(Self {
            path: path.to_path_buf(),
            page_count,
            layouts: Mutex::new(HashMap::new()),
        })
    }

    fn check_page(&self, page: usize) -> Result<(), DocumentError> {
        if page >= self.page_count {
            return Err(DocumentError::PageOutOfRange {
                page,
                count: self.page_count,
            });
        }
        Ok(())
    }

    fn layout(&self, page: usize) -> Result<Arc<PageLayout>, DocumentError> {
        self.check_page(page)?;
        if let Some(cached) = self.layouts.lock().ok().and_then(|m| m.get(&page).cloned()) {
            return Ok(cached);
        }

        let page_str = (page + 1).to_string();
        let output = Command::new("pdftotext")
            .args(["-bbox-layout", "-enc", "UTF-8", "-f", &page_str, "-l", &page_str])
            .arg(&self.path)
            .arg("-")
            .output();
        let xhtml = handle_cmd_output(
            output,
            "pdftotext (install poppler-utils)",
            &format!("pdftotext -bbox-layout failed on page {}", page),
        )?;

        let layout = Arc::new(parse_bbox_layout(&xhtml).into_iter().next().unwrap_or_default());
        if let Ok(mut cache) = self.layouts.lock() {
            cache.insert(page, layout.clone());
        }
        Ok(layout)
    }
}

impl PdfDocument for PopplerDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_text(&self, page: usize) -> Result<String, DocumentError> {
        self.check_page(page)?;
        let page_str = (page + 1).to_string();
        let output = Command::new("pdftotext")
            .args(["-enc", "UTF-8", "-f", &page_str, "-l", &page_str])
            .arg(&self.path)
            .arg("-") // Output to stdout
            .output();

        handle_cmd_output(
            output,
            "pdftotext (install poppler-utils)",
            &format!("pdftotext failed on page {}", page),
        )
    }

    fn page_words(&self, page: usize) -> Result<Vec<Word>, DocumentError> {
        Ok(self.layout(page)?.words.clone())
    }

    fn page_blocks(&self, page: usize) -> Result<Vec<TextBlock>, DocumentError> {
        Ok(self.layout(page)?.blocks.clone())
    }

    fn render_page(&self, page: usize, dpi: u32) -> Result<DynamicImage, DocumentError> {
        self.check_page(page)?;

        // Dropped (and deleted) on every return path.
        let temp_dir = TempDir::new()?;
        let page_num = page + 1;
        let page_str = page_num.to_string();
        let status = Command::new("pdftoppm")
            .args(["-png", "-r", &dpi.to_string(), "-f", &page_str, "-l", &page_str])
            .arg(&self.path)
            .arg(temp_dir.path().join("page"))
            .status();

        check_cmd_status(
            status,
            "pdftoppm (install poppler-utils)",
            &format!("pdftoppm failed to convert page {}", page),
        )?;

        let image_path = find_page_image(temp_dir.path(), page_num).ok_or_else(|| {
            DocumentError::ExtractionFailed(format!("No image generated for page {}", page))
        })?;
        Ok(image::open(&image_path)?)
    }

    fn full_text(&self) -> Result<String, DocumentError> {
        let output = Command::new("pdftotext")
            .args(["-enc", "UTF-8"])
            .arg(&self.path)
            .arg("-")
            .output();

        handle_cmd_output(output, "pdftotext (install poppler-utils)", "pdftotext failed")
    }
}

/// Check if required tools are available.
pub fn check_tools() -> Vec<(String, bool)> {
    ["pdfinfo", "pdftotext", "pdftoppm", "tesseract"]
        .iter()
        .map(|tool| (tool.to_string(), which::which(tool).is_ok()))
        .collect()
}
