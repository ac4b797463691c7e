//! Table detection from ruling lines (lattice mode).
//!
//! The page is rendered and scanned for long horizontal and vertical runs of
//! dark pixels. The resulting grid is mapped back to page points and native
//! words are dropped into cells by their centers.

use image::GrayImage;
use tracing::debug;

use super::{TableError, TableStrategy};
use crate::document::PdfDocument;
use crate::models::{Table, TableFlavor, Word};

#[derive(Debug, Clone)]
pub struct LatticeDetector {
    /// Render resolution for line scanning.
    pub dpi: u32,
    /// Pixels darker than this count as ink.
    pub ink_threshold: u8,
    /// Shortest ruling line, in inches.
    pub min_line_inches: f64,
}

impl Default for LatticeDetector {
    fn default() -> Self {
        Self {
            dpi: 150,
            ink_threshold: 128,
            min_line_inches: 0.5,
        }
    }
}

impl LatticeDetector {
    /// Build a table from a rendered page and that page's words (in points).
    pub fn detect_image(&self, image: &GrayImage, words: &[Word], page: usize) -> Option<Table> {
        let min_len = ((self.dpi as f64 * self.min_line_inches) as u32).max(2);
        let rows_y = line_positions(image, min_len, self.ink_threshold, Axis::Horizontal);
        let cols_x = line_positions(image, min_len, self.ink_threshold, Axis::Vertical);
        debug!(
            "lattice page {}: {} horizontal, {} vertical rulings",
            page,
            rows_y.len(),
            cols_x.len()
        );
        if rows_y.len() < 2 || cols_x.len() < 2 {
            return None;
        }

        let scale = 72.0 / self.dpi.max(1) as f64;
        let ys: Vec<f64> = rows_y.iter().map(|y| y * scale).collect();
        let xs: Vec<f64> = cols_x.iter().map(|x| x * scale).collect();

        let mut grid: Vec<Vec<Vec<&str>>> = vec![vec![Vec::new(); xs.len() - 1]; ys.len() - 1];
        for word in words {
            let (cx, cy) = (word.bbox.center_x(), word.bbox.center_y());
            let row = ys.windows(2).position(|w| cy >= w[0] && cy < w[1]);
            let col = xs.windows(2).position(|w| cx >= w[0] && cx < w[1]);
            if let (Some(r), Some(c)) = (row, col) {
                grid[r][c].push(word.text.trim());
            }
        }

        let cells: Vec<Vec<String>> = grid
            .into_iter()
            .map(|row| row.into_iter().map(|parts| parts.join(" ")).collect())
            .collect();
        let rows = drop_empty(cells);
        if rows.is_empty() {
            return None;
        }

        Some(Table {
            page,
            flavor: TableFlavor::Lattice,
            rows,
        })
    }
}

impl TableStrategy for LatticeDetector {
    fn flavor(&self) -> TableFlavor {
        TableFlavor::Lattice
    }

    fn detect(&self, doc: &dyn PdfDocument, page: usize) -> Result<Vec<Table>, TableError> {
        let words = doc.page_words(page)?;
        if words.is_empty() {
            return Ok(Vec::new());
        }
        let image = doc.render_page(page, self.dpi)?.to_luma8();
        if image.width() == 0 || image.height() == 0 {
            return Err(TableError::Detection(format!("page {} rendered empty", page)));
        }
        Ok(self.detect_image(&image, &words, page).into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    Horizontal,
    Vertical,
}

/// Pixel positions of ruling lines along `axis`. Adjacent scanlines that
/// both carry a long run are merged into one line at their mean.
fn line_positions(image: &GrayImage, min_len: u32, threshold: u8, axis: Axis) -> Vec<f64> {
    let (outer, inner) = match axis {
        Axis::Horizontal => (image.height(), image.width()),
        Axis::Vertical => (image.width(), image.height()),
    };
    let is_ink = |o: u32, i: u32| {
        let px = match axis {
            Axis::Horizontal => image.get_pixel(i, o),
            Axis::Vertical => image.get_pixel(o, i),
        };
        px[0] < threshold
    };

    let hits: Vec<u32> = (0..outer)
        .filter(|&o| {
            let mut run = 0u32;
            for i in 0..inner {
                if is_ink(o, i) {
                    run += 1;
                    if run >= min_len {
                        return true;
                    }
                } else {
                    run = 0;
                }
            }
            false
        })
        .collect();

    let mut lines: Vec<Vec<u32>> = Vec::new();
    for o in hits {
        match lines.last_mut() {
            Some(group) if group.last().is_some_and(|&prev| o - prev <= 2) => group.push(o),
            _ => lines.push(vec![o]),
        }
    }
    lines
        .iter()
        .map(|g| g.iter().map(|&v| v as f64).sum::<f64>() / g.len() as f64)
        .collect()
}

/// Remove rows and columns with no text at all.
fn drop_empty(cells: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let width = cells.first().map_or(0, |r| r.len());
    let keep_cols: Vec<usize> = (0..width)
        .filter(|&c| cells.iter().any(|row| !row[c].is_empty()))
        .collect();
    cells
        .into_iter()
        .filter(|row| row.iter().any(|cell| !cell.is_empty()))
        .map(|row| keep_cols.iter().map(|&c| row[c].clone()).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{MemoryDocument, MemoryPage};
    use crate::models::BBox;
    use image::{DynamicImage, Luma};

    /// 300x200 page at 72 dpi with a 2x2 ruled grid.
    fn ruled_page() -> GrayImage {
        let mut img = GrayImage::from_pixel(300, 200, Luma([255]));
        for &y in &[20u32, 60, 100] {
            for x in 20..=280 {
                img.put_pixel(x, y, Luma([0]));
            }
        }
        for &x in &[20u32, 150, 280] {
            for y in 20..=100 {
                img.put_pixel(x, y, Luma([0]));
            }
        }
        img
    }

    fn word(text: &str, cx: f64, cy: f64) -> Word {
        Word::new(BBox::new(cx - 10.0, cy - 5.0, cx + 10.0, cy + 5.0), text)
    }

    fn detector() -> LatticeDetector {
        LatticeDetector {
            dpi: 72,
            ..Default::default()
        }
    }

    #[test]
    fn test_grid_cells_from_rulings() {
        let words = vec![
            word("Unit", 50.0, 40.0),
            word("Rent", 200.0, 40.0),
            word("101", 50.0, 80.0),
            word("$950", 200.0, 80.0),
            word("footer", 50.0, 180.0),
        ];
        let table = detector().detect_image(&ruled_page(), &words, 0).unwrap();
        assert_eq!(table.flavor, TableFlavor::Lattice);
        assert_eq!(table.rows, vec![vec!["Unit", "Rent"], vec!["101", "$950"]]);
    }

    #[test]
    fn test_no_rulings_no_table() {
        let blank = GrayImage::from_pixel(300, 200, Luma([255]));
        assert!(detector().detect_image(&blank, &[word("Unit", 50.0, 40.0)], 0).is_none());
    }

    #[test]
    fn test_strategy_skips_pages_without_words() {
        let doc = MemoryDocument::new(vec![MemoryPage::new()]);
        assert!(detector().detect(&doc, 0).unwrap().is_empty());
    }

    #[test]
    fn test_strategy_reports_render_failure() {
        let doc = MemoryDocument::new(vec![MemoryPage::new().with_words(vec![word("Unit", 50.0, 40.0)])]);
        assert!(matches!(detector().detect(&doc, 0), Err(TableError::Document(_))));

        let doc = MemoryDocument::new(vec![MemoryPage::new()
            .with_words(vec![word("Unit", 50.0, 40.0), word("Rent", 200.0, 40.0)])
            .with_image(DynamicImage::ImageLuma8(ruled_page()))]);
        let tables = detector().detect(&doc, 0).unwrap();
        assert_eq!(tables[0].rows, vec![vec!["Unit", "Rent"]]);
    }
}
