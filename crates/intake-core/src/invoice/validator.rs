//! Record validation against a required-field and type schema.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::debug;

use super::normalize::strip_currency;
use crate::models::record::{ExtractedRecord, METADATA_KEY, ValidationStatus, field_text};
use crate::models::schema::{FieldType, ValidationSchema};

/// Substrings that make a value look like a date.
const DATE_TOKENS: &[&str] = &["年", "月", "日", "/", "-", "Date"];

/// Every failed check for one record, in check order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub reasons: Vec<String>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.reasons.is_empty()
    }

    /// Write status and reasons into the record metadata, replacing older ones.
    pub fn apply(self, record: &mut ExtractedRecord) -> bool {
        let valid = self.is_valid();
        record.metadata.status = if valid {
            ValidationStatus::Good
        } else {
            ValidationStatus::NeedsReview
        };
        record.metadata.validation_errors = self.reasons;
        valid
    }
}

/// Checks records of one document type.
#[derive(Debug, Clone)]
pub struct RecordValidator {
    document_type: String,
    schema: Option<ValidationSchema>,
}

impl RecordValidator {
    pub fn new(document_type: impl Into<String>, schema: ValidationSchema) -> Self {
        Self {
            document_type: document_type.into(),
            schema: Some(schema),
        }
    }

    /// A validator for a type without a schema; every record needs review.
    pub fn missing_schema(document_type: impl Into<String>) -> Self {
        Self {
            document_type: document_type.into(),
            schema: None,
        }
    }

    pub fn document_type(&self) -> &str {
        &self.document_type
    }

    /// Check a field map.
    pub fn validate(&self, fields: &Map<String, Value>) -> ValidationOutcome {
        let Some(schema) = &self.schema else {
            return ValidationOutcome {
                reasons: vec![format!(
                    "no validation schema for document type '{}'",
                    self.document_type
                )],
            };
        };

        let mut reasons = Vec::new();

        for field in &schema.required_fields {
            if field == METADATA_KEY {
                continue;
            }
            if field_text(fields, field).trim().is_empty() {
                reasons.push(format!("required field '{}' is missing", field));
            }
        }

        for (field, field_type) in &schema.field_types {
            if field == METADATA_KEY {
                continue;
            }
            let Some(value) = fields.get(field) else {
                continue;
            };
            if matches!(value, Value::Number(_)) && *field_type == FieldType::Number {
                continue;
            }
            let text = field_text(fields, field);
            if text.trim().is_empty() {
                continue;
            }
            if !check_type(&text, field_type) {
                reasons.push(format!(
                    "field '{}' has invalid type (expected {}, got '{}')",
                    field,
                    field_type.name(),
                    text
                ));
            }
        }

        debug!("Validation found {} problems", reasons.len());
        ValidationOutcome { reasons }
    }

    /// Validate a record and store the outcome in its metadata.
    pub fn validate_record(&self, record: &mut ExtractedRecord) -> bool {
        self.validate(&record.fields).apply(record)
    }
}

/// Whether a non-blank value matches the expected type.
pub fn check_type(value: &str, field_type: &FieldType) -> bool {
    match field_type {
        FieldType::String => true,
        FieldType::Number => is_number(value),
        FieldType::Date => is_date_like(value),
        FieldType::Email => is_email(value),
        FieldType::Unknown(_) => true,
    }
}

/// Numeric after removing thousands separators and currency glyphs.
pub fn is_number(value: &str) -> bool {
    let cleaned = strip_currency(value);
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return false;
    }
    Decimal::from_str(cleaned).is_ok()
        || Decimal::from_scientific(cleaned).is_ok()
        || cleaned.parse::<f64>().is_ok()
}

/// Lenient: any era marker or date separator counts.
pub fn is_date_like(value: &str) -> bool {
    DATE_TOKENS.iter().any(|token| value.contains(token))
}

pub fn is_email(value: &str) -> bool {
    match value.rsplit_once('@') {
        Some((_, domain)) => domain.contains('.'),
        None => false,
    }
}
