//! Core library for invoice intake.
//!
//! This crate provides:
//! - Text acquisition from PDFs (embedded text layer, page recognition fallback)
//! - Rule-driven field extraction configured per document type
//! - Record validation against required-field and type schemas
//! - Duplicate detection against a history corpus of accepted records
//! - Record stores and duplicate-error reports compatible with existing history files

pub mod acquire;
pub mod error;
pub mod history;
pub mod invoice;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod store;
pub mod timestamp;

pub use acquire::{AcquireError, AcquiredText, PageText, TextAcquirer};
pub use error::{ConfigError, IntakeError, OcrError, PdfError, Result, StoreError};
pub use history::{HistoryCorpus, HistoryIndex, HistoryRecord};
pub use invoice::{
    DuplicateDetector, DuplicateKeys, DuplicateReport, DuplicateVerdict, FieldExtractor,
    FieldMatch, RecordValidator, ValidationOutcome, VerdictKind,
};
pub use models::config::IntakeConfig;
pub use models::record::{ExtractedRecord, PageMethod, RecordMetadata, ValidationStatus};
pub use models::rules::RuleSet;
pub use models::schema::{FieldType, ValidationSchema};
pub use ocr::{EngineInfo, RecognitionEngine, TesseractEngine};
#[cfg(feature = "onnx")]
pub use ocr::PureOcrEngine;
pub use pipeline::{IntakePipeline, RunSummary};
pub use store::RecordStore;
pub use timestamp::Clock;
