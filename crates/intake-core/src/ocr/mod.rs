//! Page recognition backends.
//!
//! A [`RecognitionEngine`] is created once at start-up, verified, and handed to
//! the text acquirer. Engines own page rasterization so the acquirer only
//! deals with page numbers.

mod process;
mod raster;
mod tesseract;

#[cfg(feature = "onnx")]
mod pure_engine;

pub use raster::Pdftoppm;
pub use tesseract::TesseractEngine;

#[cfg(feature = "onnx")]
pub use pure_engine::PureOcrEngine;

use std::path::Path;
use std::time::Instant;

use crate::error::OcrError;

/// What a verified engine reports about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInfo {
    /// Backend name.
    pub backend: &'static str,
    /// Languages the installation can recognize.
    pub available_languages: Vec<String>,
    /// Languages a recognition pass uses.
    pub active_languages: Vec<String>,
}

/// Turns one page of a PDF into text.
pub trait RecognitionEngine: Send + Sync {
    /// Backend name for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Verify the backend and its language data are installed.
    fn verify(&self) -> Result<EngineInfo, OcrError>;

    /// Rasterize a page at `dpi` and recognize its text.
    ///
    /// Child processes still running at `deadline` are killed and the page
    /// fails with [`OcrError::DeadlineExceeded`].
    fn recognize_page(
        &self,
        pdf_path: &Path,
        page: u32,
        dpi: u32,
        deadline: Option<Instant>,
    ) -> Result<String, OcrError>;
}
