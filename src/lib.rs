//! realty-extract - structured extraction from real-estate PDFs.
//!
//! Turns marketing flyers, rent rolls, and lease contracts into a canonical
//! record of property attributes, units, text sections, and field
//! citations, with OCR for scanned pages and optional model enrichment.

pub mod acquisition;
pub mod cli;
pub mod config;
pub mod document;
pub mod enrich;
pub mod extract;
pub mod llm;
pub mod models;
pub mod normalize;
pub mod ocr;
pub mod pipeline;
pub mod report;
pub mod tables;

pub use config::Settings;
pub use models::{DocType, ExtractionResult};
pub use pipeline::Pipeline;
pub use report::PipelineReport;
