//! PDF processing module.

mod extractor;

pub use extractor::PdfExtractor;

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// A paged document with an embedded text layer.
pub trait PageSource {
    /// Get the number of pages in the document.
    fn page_count(&self) -> u32;

    /// Extract the embedded text of a specific page (1-indexed).
    fn extract_page_text(&self, page: u32) -> Result<String>;
}
