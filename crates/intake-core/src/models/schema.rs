//! Validation schema configuration.

use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Expected value type of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Date,
    Email,
    /// Any other type name; always passes.
    Unknown(std::string::String),
}

impl FieldType {
    pub fn from_name(name: &str) -> Self {
        match name {
            "string" => FieldType::String,
            "number" => FieldType::Number,
            "date" => FieldType::Date,
            "email" => FieldType::Email,
            other => FieldType::Unknown(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Email => "email",
            FieldType::Unknown(name) => name,
        }
    }
}

#[derive(Deserialize)]
struct RawSchema {
    #[serde(default)]
    required_fields: Vec<String>,
    #[serde(default)]
    field_types: Map<String, Value>,
}

/// Required fields and expected types for one document type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawSchema")]
pub struct ValidationSchema {
    /// Fields that must be present and non-blank.
    pub required_fields: Vec<String>,
    /// Expected type per field, in file order.
    pub field_types: Vec<(String, FieldType)>,
}

impl From<RawSchema> for ValidationSchema {
    fn from(raw: RawSchema) -> Self {
        let field_types = raw
            .field_types
            .into_iter()
            .map(|(field, ty)| {
                let ty = match ty {
                    Value::String(name) => FieldType::from_name(&name),
                    other => FieldType::Unknown(other.to_string()),
                };
                (field, ty)
            })
            .collect();
        Self {
            required_fields: raw.required_fields,
            field_types,
        }
    }
}

impl ValidationSchema {
    /// Load a schema from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_schema_keeps_type_order() {
        let schema: ValidationSchema = serde_json::from_str(
            r#"{
                "required_fields": ["請求書番号", "請求日"],
                "field_types": {"請求金額": "number", "請求日": "date", "連絡先": "email", "memo": "blob"}
            }"#,
        )
        .unwrap();

        assert_eq!(schema.required_fields, vec!["請求書番号", "請求日"]);
        assert_eq!(
            schema.field_types,
            vec![
                ("請求金額".to_string(), FieldType::Number),
                ("請求日".to_string(), FieldType::Date),
                ("連絡先".to_string(), FieldType::Email),
                ("memo".to_string(), FieldType::Unknown("blob".to_string())),
            ]
        );
    }

    #[test]
    fn test_empty_schema() {
        let schema: ValidationSchema = serde_json::from_str("{}").unwrap();
        assert!(schema.required_fields.is_empty());
        assert!(schema.field_types.is_empty());
    }
}
