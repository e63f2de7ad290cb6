//! Extracted records and their on-disk metadata block.
//!
//! Metadata keys and status values use the store vocabulary that existing
//! history files were written with, so older batches load unchanged. English
//! aliases are accepted on input.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key the metadata block is stored under inside a record.
pub const METADATA_KEY: &str = "_metadata";

/// How a page's text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageMethod {
    /// Text layer embedded in the PDF.
    Embedded,
    /// Rasterized and run through text recognition.
    Recognized,
}

/// Validation state of a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationStatus {
    /// Extracted, not yet validated.
    #[default]
    #[serde(rename = "読み取り完了", alias = "unvalidated")]
    Unvalidated,
    /// Passed every check.
    #[serde(rename = "良好", alias = "good")]
    Good,
    /// Failed at least one check; kept for human review.
    #[serde(rename = "要確認", alias = "needs-review")]
    NeedsReview,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Unvalidated => "unvalidated",
            ValidationStatus::Good => "good",
            ValidationStatus::NeedsReview => "needs-review",
        }
    }
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata attached to every extracted record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Source file name.
    #[serde(rename = "ファイル名", alias = "file_name", default)]
    pub file_name: String,

    /// Source file path as given to the pipeline.
    #[serde(rename = "ファイルパス", alias = "file_path", default)]
    pub file_path: String,

    /// Processing timestamp (`YYYY-MM-DD HH:MM`).
    #[serde(rename = "処理日時", alias = "processed_at", default)]
    pub processed_at: String,

    /// Validation state.
    #[serde(rename = "処理ステータス", alias = "status", default)]
    pub status: ValidationStatus,

    /// Reasons for every failed check, in check order.
    #[serde(
        rename = "バリデーションエラー",
        alias = "validation_errors",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub validation_errors: Vec<String>,

    /// Method used for each page, in page order.
    #[serde(
        rename = "ページ取得方法",
        alias = "page_methods",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub page_methods: Vec<PageMethod>,
}

/// A flat field→value record produced from one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// Field values in rule order.
    #[serde(flatten)]
    pub fields: Map<String, Value>,

    /// Source and validation metadata.
    #[serde(rename = "_metadata", default)]
    pub metadata: RecordMetadata,
}

impl ExtractedRecord {
    /// Create a record from extracted fields with fresh metadata.
    pub fn new(fields: Map<String, Value>, metadata: RecordMetadata) -> Self {
        Self { fields, metadata }
    }

    /// Text of a field; absent fields read as empty.
    pub fn field(&self, name: &str) -> String {
        field_text(&self.fields, name)
    }

    /// Set a field to a string value.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), Value::String(value.into()));
    }
}

/// Text of a field in a raw field map.
///
/// Strings are returned as-is, `null` and missing keys read as empty, and any
/// other JSON value reads as its JSON text.
pub fn field_text(fields: &Map<String, Value>, name: &str) -> String {
    match fields.get(name) {
        Some(value) => value_text(value),
        None => String::new(),
    }
}

/// Text form of a JSON value.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
