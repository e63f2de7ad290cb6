//! Field rule configuration.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A named pattern whose capture groups are the candidate values of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    /// Field name written to the record.
    pub name: String,
    /// Regular expression; capture groups in order of preference.
    pub pattern: String,
}

/// Where and how a batch of records is written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
    /// Store format; only `json` is supported.
    #[serde(default)]
    pub format: Option<String>,
    /// Store file name inside the output folder.
    #[serde(default)]
    pub filename: Option<String>,
}

/// Rules and output settings for one document type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRules {
    #[serde(default)]
    pub fields: Vec<FieldRule>,
    #[serde(default)]
    pub output: OutputSpec,
}

/// All configured document types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    pub types: BTreeMap<String, DocumentRules>,
}

impl RuleSet {
    /// Load rules from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|reason| ConfigError::Parse {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse rules from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, String> {
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    }

    /// Rules for a document type.
    pub fn for_type(&self, document_type: &str) -> Result<&DocumentRules, ConfigError> {
        self.types
            .get(document_type)
            .ok_or_else(|| ConfigError::UnknownDocumentType(document_type.to_string()))
    }
}

impl DocumentRules {
    /// Store file name, validated against the supported format.
    pub fn store_filename(&self, document_type: &str) -> Result<String, ConfigError> {
        match self.output.format.as_deref() {
            None | Some("json") => {}
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: format!("{}.output.format", document_type),
                    reason: format!("unsupported store format '{}', expected 'json'", other),
                });
            }
        }
        Ok(self
            .output
            .filename
            .clone()
            .unwrap_or_else(|| format!("{}_data.json", document_type)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: &str = r#"
invoice:
  fields:
    - name: 請求書番号
      pattern: '請求書番号[:：]?\s*([A-Z0-9-]+)'
    - name: 請求金額
      pattern: '(?:合計|請求金額)[:：]?\s*([¥￥]?[\d,]+円?)'
  output:
    format: json
    filename: invoice_data.json
"#;

    #[test]
    fn test_parse_rules() {
        let rules = RuleSet::from_yaml(RULES).unwrap();
        let invoice = rules.for_type("invoice").unwrap();
        assert_eq!(invoice.fields.len(), 2);
        assert_eq!(invoice.fields[0].name, "請求書番号");
        assert_eq!(invoice.store_filename("invoice").unwrap(), "invoice_data.json");
    }

    #[test]
    fn test_unknown_type() {
        let rules = RuleSet::from_yaml(RULES).unwrap();
        assert!(matches!(
            rules.for_type("quotation"),
            Err(ConfigError::UnknownDocumentType(_))
        ));
    }

    #[test]
    fn test_default_filename_and_format_check() {
        let rules = RuleSet::from_yaml("po:\n  fields: []\n").unwrap();
        let po = rules.for_type("po").unwrap();
        assert_eq!(po.store_filename("po").unwrap(), "po_data.json");

        let csv = RuleSet::from_yaml("po:\n  output:\n    format: csv\n").unwrap();
        assert!(csv.for_type("po").unwrap().store_filename("po").is_err());
    }
}
