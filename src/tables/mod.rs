//! Table detection.
//!
//! Two independent strategies run over every page:
//! - [`LatticeDetector`] finds ruling lines in the rendered page and uses the
//!   grid they form as cell boundaries
//! - [`StreamDetector`] infers columns from left edges that line up across
//!   rows of words
//!
//! Results of both are concatenated without deduplication. A strategy that
//! fails on a page loses only that page.

mod lattice;
mod stream;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::document::{DocumentError, PdfDocument};
use crate::models::{Table, TableFlavor};
use crate::report::{Diagnostics, Stage};

pub use lattice::LatticeDetector;
pub use stream::{StreamConfig, StreamDetector};

/// Errors raised by a detection strategy on a single page.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Detection failed: {0}")]
    Detection(String),
}

/// One way of finding tables on a page.
pub trait TableStrategy: Send + Sync {
    fn flavor(&self) -> TableFlavor;

    /// Tables found on `page`, top to bottom.
    fn detect(&self, doc: &dyn PdfDocument, page: usize) -> Result<Vec<Table>, TableError>;
}

/// Runs every configured strategy over every page.
pub struct TableExtractor {
    strategies: Vec<Box<dyn TableStrategy>>,
}

impl TableExtractor {
    pub fn new(strategies: Vec<Box<dyn TableStrategy>>) -> Self {
        Self { strategies }
    }

    /// All tables, strategy by strategy in page order. Failures are recorded
    /// in `diag` and skipped.
    pub fn extract(&self, doc: &dyn PdfDocument, diag: &mut Diagnostics) -> Vec<Table> {
        let mut tables = Vec::new();
        for strategy in &self.strategies {
            let before = tables.len();
            for page in 0..doc.page_count() {
                match strategy.detect(doc, page) {
                    Ok(found) => {
                        debug!("{} found {} tables on page {}", strategy.flavor(), found.len(), page);
                        tables.extend(found);
                    }
                    Err(e) => {
                        warn!("{} table detection failed on page {}: {}", strategy.flavor(), page, e);
                        diag.push(Stage::Tables, Some(page), format!("{}: {}", strategy.flavor(), e));
                    }
                }
            }
            info!("{} detection produced {} tables", strategy.flavor(), tables.len() - before);
        }
        tables
    }
}

impl TableExtractor {
    /// Lattice detection plus stream detection tuned by `stream`.
    pub fn from_config(stream: &StreamConfig) -> Self {
        Self::new(vec![
            Box::new(LatticeDetector::default()),
            Box::new(StreamDetector::with_config(stream.clone())),
        ])
    }
}

impl Default for TableExtractor {
    fn default() -> Self {
        Self::from_config(&StreamConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{MemoryDocument, MemoryPage};

    struct Fixed(TableFlavor, bool);

    impl TableStrategy for Fixed {
        fn flavor(&self) -> TableFlavor {
            self.0
        }

        fn detect(&self, _doc: &dyn PdfDocument, page: usize) -> Result<Vec<Table>, TableError> {
            if self.1 {
                return Err(TableError::Detection("boom".into()));
            }
            Ok(vec![Table {
                page,
                flavor: self.0,
                rows: vec![vec!["Unit".into()], vec!["1".into()]],
            }])
        }
    }

    #[test]
    fn test_failing_strategy_does_not_suppress_other() {
        let doc = MemoryDocument::new(vec![MemoryPage::new(), MemoryPage::new()]);
        let extractor = TableExtractor::new(vec![
            Box::new(Fixed(TableFlavor::Lattice, true)),
            Box::new(Fixed(TableFlavor::Stream, false)),
        ]);
        let mut diag = Diagnostics::new();
        let tables = extractor.extract(&doc, &mut diag);
        assert_eq!(tables.len(), 2);
        assert!(tables.iter().all(|t| t.flavor == TableFlavor::Stream));
        assert_eq!(diag.len(), 2);
        assert!(diag.has_stage(Stage::Tables));
    }

    #[test]
    fn test_results_are_concatenated_without_dedup() {
        let doc = MemoryDocument::new(vec![MemoryPage::new()]);
        let extractor = TableExtractor::new(vec![
            Box::new(Fixed(TableFlavor::Lattice, false)),
            Box::new(Fixed(TableFlavor::Stream, false)),
        ]);
        let tables = extractor.extract(&doc, &mut Diagnostics::new());
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].rows, tables[1].rows);
        assert_eq!(tables[0].flavor, TableFlavor::Lattice);
    }
}
