//! Subcommands and the setup they share.

pub mod check;
pub mod config;
pub mod languages;
pub mod process;
pub mod run;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};

use intake_core::invoice::{FieldExtractor, RecordValidator};
use intake_core::models::config::{IntakeConfig, OcrBackendKind};
use intake_core::pipeline;
use intake_core::ocr::{EngineInfo, RecognitionEngine, TesseractEngine};

/// Configuration file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "intake.json";

/// Per-user configuration file.
pub fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("intake")
        .join("config.json")
}

/// The configuration file in effect: `--config`, then `./intake.json`, then the user file.
pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }
    [PathBuf::from(LOCAL_CONFIG_FILE), user_config_path()]
        .into_iter()
        .find(|path| path.exists())
}

/// Load the effective configuration, falling back to defaults.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<IntakeConfig> {
    match resolve_config_path(explicit) {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            IntakeConfig::from_file(&path)
                .with_context(|| format!("failed to load configuration {}", path.display()))
        }
        None => {
            debug!("No configuration file found, using defaults");
            Ok(IntakeConfig::default())
        }
    }
}

/// Extractor and store file name for the configured document type.
pub fn load_extractor(config: &IntakeConfig) -> anyhow::Result<(FieldExtractor, String)> {
    pipeline::load_extractor(config).context("failed to load field rules")
}

/// Validator for a document type; the schema file must exist.
pub fn load_validator(config: &IntakeConfig, document_type: &str) -> anyhow::Result<RecordValidator> {
    pipeline::load_validator(config, document_type)
        .with_context(|| format!("failed to load validation schema for '{}'", document_type))
}

/// Validator for a document type; a missing schema marks every record for review.
pub fn load_validator_lenient(
    config: &IntakeConfig,
    document_type: &str,
) -> anyhow::Result<RecordValidator> {
    pipeline::load_validator_lenient(config, document_type)
        .with_context(|| format!("failed to load validation schema for '{}'", document_type))
}

/// Construct the configured recognition backend.
pub fn build_engine(config: &IntakeConfig) -> anyhow::Result<Arc<dyn RecognitionEngine>> {
    match config.ocr.backend {
        OcrBackendKind::Tesseract => Ok(Arc::new(TesseractEngine::from_config(&config.ocr))),
        OcrBackendKind::Onnx => build_onnx_engine(&config.ocr.model_dir, &config.ocr.languages),
    }
}

#[cfg(feature = "onnx")]
fn build_onnx_engine(
    model_dir: &Path,
    languages: &[String],
) -> anyhow::Result<Arc<dyn RecognitionEngine>> {
    let engine = intake_core::ocr::PureOcrEngine::from_dir(model_dir, languages.to_vec())?;
    Ok(Arc::new(engine))
}

#[cfg(not(feature = "onnx"))]
fn build_onnx_engine(
    _model_dir: &Path,
    _languages: &[String],
) -> anyhow::Result<Arc<dyn RecognitionEngine>> {
    anyhow::bail!("the onnx backend requires building with --features onnx")
}

/// Build and verify the recognition backend once.
pub fn start_engine(config: &IntakeConfig) -> anyhow::Result<(Arc<dyn RecognitionEngine>, EngineInfo)> {
    let engine = build_engine(config)?;
    let info = engine
        .verify()
        .with_context(|| format!("recognition backend '{}' is not usable", engine.name()))?;
    info!(
        "Recognition backend {} ready ({})",
        info.backend,
        info.active_languages.join("+")
    );
    Ok((engine, info))
}
