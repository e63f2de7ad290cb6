//! Configuration structures for the intake pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Main configuration for the intake pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Folder layout and configuration file locations.
    pub paths: PathsConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// Recognition backend configuration.
    pub ocr: OcrConfig,

    /// Duplicate detection key fields.
    pub duplicates: DuplicateConfig,

    /// Output configuration.
    pub output: OutputConfig,
}

/// Folder layout and configuration file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Folder containing the invoice PDFs to process.
    pub pdf_dir: PathBuf,

    /// Folder scanned recursively for previously accepted record stores.
    pub history_dir: PathBuf,

    /// Folder receiving the record store and the duplicate report.
    pub output_dir: PathBuf,

    /// Folder holding `<type>_validation.json` schemas.
    pub config_dir: PathBuf,

    /// Field rule file.
    pub rules_file: PathBuf,

    /// Document type processed by a run.
    pub document_type: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            pdf_dir: PathBuf::from("pdf"),
            history_dir: PathBuf::from("history"),
            output_dir: PathBuf::from("output"),
            config_dir: PathBuf::from("config"),
            rules_file: PathBuf::from("config/fields.yaml"),
            document_type: "invoice".to_string(),
        }
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// DPI for rendering PDF pages to images.
    pub render_dpi: u32,

    /// Minimum non-whitespace characters for embedded text to be used.
    pub min_text_chars: usize,

    /// Per-document processing timeout in seconds (0 = unlimited).
    pub document_timeout_secs: u64,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            render_dpi: 300,
            min_text_chars: 50,
            document_timeout_secs: 300,
        }
    }
}

/// Recognition backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackendKind {
    /// Tesseract via command line.
    #[default]
    Tesseract,
    /// ONNX models via pure-onnx-ocr (requires the `onnx` feature).
    Onnx,
}

/// Recognition backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Which backend recognizes rasterized pages.
    pub backend: OcrBackendKind,

    /// Recognition languages, local language first.
    pub languages: Vec<String>,

    /// Tesseract language data directory (discovered when unset).
    pub tessdata_dir: Option<PathBuf>,

    /// Directory with `det.onnx`, `rec.onnx` and `dict.txt` for the ONNX backend.
    pub model_dir: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: OcrBackendKind::Tesseract,
            languages: vec!["jpn".to_string(), "eng".to_string()],
            tessdata_dir: None,
            model_dir: PathBuf::from("models"),
        }
    }
}

/// Names of the record fields compared by the duplicate detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateConfig {
    pub invoice_number_field: String,
    pub issuer_field: String,
    pub date_field: String,
    pub amount_field: String,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            invoice_number_field: "請求書番号".to_string(),
            issuer_field: "発行者名".to_string(),
            date_field: "請求日".to_string(),
            amount_field: "請求金額".to_string(),
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// UTC offset in hours used for timestamps.
    pub utc_offset_hours: i32,

    /// File name of the duplicate report inside the output folder.
    pub report_filename: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: 9,
            report_filename: "duplicate.errors.json".to_string(),
        }
    }
}

impl IntakeConfig {
    /// Load configuration from a JSON file.
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

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Path of the validation schema for the configured document type.
    pub fn schema_path(&self, document_type: &str) -> PathBuf {
        self.paths
            .config_dir
            .join(format!("{}_validation.json", document_type))
    }

    /// Path of the duplicate report.
    pub fn report_path(&self) -> PathBuf {
        self.paths.output_dir.join(&self.output.report_filename)
    }
}
