//! Deterministic extractors, one per document type.
//!
//! - [`extract_flyer`]: label/value proximity on the first pages, plus
//!   layout sections
//! - [`extract_rent_roll`]: table detection and header mapping
//! - [`extract_lease`]: regular expressions over the document text, with
//!   per-field citations

mod flyer;
mod lease;
mod rent_roll;
mod sections;

pub use flyer::{extract_flyer, find_value_near, FlyerConfig, FlyerExtraction, Hit, LABELS};
pub use lease::{capture_fields, extract_lease, ANCHORS};
pub use rent_roll::{extract_rent_roll, map_header, units_from_table, HEADER_KEYS};
pub use sections::{sections_from_layout, SectionConfig};
