//! Error types for the intake-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the intake library.
#[derive(Error, Debug)]
pub enum IntakeError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Text recognition error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Record store or history error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from a page.
    #[error("failed to extract text from page {page}: {reason}")]
    TextExtraction { page: u32, reason: String },

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors related to page rasterization and text recognition.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The recognition backend or the rasterizer is not installed.
    #[error("backend not available: {0}")]
    BackendUnavailable(String),

    /// One or more configured recognition languages have no installed data.
    #[error("missing language data for {}: {hint}", .missing.join(", "))]
    MissingLanguageData { missing: Vec<String>, hint: String },

    /// Failed to load recognition models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Rendering a page to an image failed.
    #[error("failed to render page {page}: {reason}")]
    Render { page: u32, reason: String },

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// The document deadline passed while a page was being processed.
    #[error("page {0} exceeded the document deadline")]
    DeadlineExceeded(u32),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OcrError {
    /// Whether the failure comes from the installation rather than the page.
    ///
    /// Systemic failures abort a run; everything else only skips the document.
    pub fn is_systemic(&self) -> bool {
        matches!(
            self,
            OcrError::BackendUnavailable(_)
                | OcrError::MissingLanguageData { .. }
                | OcrError::ModelLoad(_)
        )
    }
}

/// Errors related to loading rules, schemas and settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required configuration file does not exist.
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A configuration file could not be parsed.
    #[error("failed to parse {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    /// A field rule pattern is not a valid regular expression.
    #[error("invalid pattern for field '{field}': {reason}")]
    InvalidPattern { field: String, reason: String },

    /// No rules are configured for the document type.
    #[error("no field rules for document type '{0}'")]
    UnknownDocumentType(String),

    /// A setting has an unusable value.
    #[error("invalid setting {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to record stores, reports and the history corpus.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store file could not be read or written.
    #[error("failed to access {}: {source}", .path.display())]
    Access {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store file is not valid JSON of the expected shape.
    #[error("malformed store {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The history location could not be scanned.
    #[error("failed to scan history: {0}")]
    Scan(String),
}

/// Result type for the intake library.
pub type Result<T> = std::result::Result<T, IntakeError>;
