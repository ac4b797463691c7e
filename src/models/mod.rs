//! Data models for extraction output and page geometry.

mod record;
mod word;

pub use record::{
    is_blank, DocType, ExtractionResult, FieldCitation, PropertyRecord, Section, UnitRecord,
    PROPERTY_FIELDS, UNIT_FIELDS,
};
pub use word::{BBox, Table, TableFlavor, TextBlock, Word};
