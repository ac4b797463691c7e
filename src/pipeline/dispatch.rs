//! Document-type routing.

use tracing::debug;

use crate::document::PdfDocument;
use crate::models::DocType;

/// Pick the extractor for a document.
///
/// Explicit types route directly. `Auto` looks at the first page's native
/// text: "lease" anywhere (any case) routes to the lease extractor,
/// everything else to the flyer extractor. Rent rolls are never detected.
pub fn route(doc: &dyn PdfDocument, requested: DocType) -> DocType {
    if requested != DocType::Auto {
        return requested;
    }

    let head = match doc.page_text(0) {
        Ok(text) => text.to_lowercase(),
        Err(e) => {
            debug!("first page unreadable for routing: {}", e);
            String::new()
        }
    };
    if head.contains("lease") {
        DocType::Lease
    } else {
        DocType::Flyer
    }
}
