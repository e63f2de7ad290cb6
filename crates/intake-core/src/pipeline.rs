//! Document pipeline: acquire, extract, validate, detect duplicates.

use std::path::{Path, PathBuf};
use std::time::Instant;

use glob::{MatchOptions, Pattern, glob_with};
use tracing::{info, warn};

use crate::acquire::{AcquireError, AcquiredText, TextAcquirer};
use crate::error::{ConfigError, IntakeError, Result, StoreError};
use crate::invoice::{
    DuplicateDetector, DuplicateKeys, DuplicateReport, DuplicateVerdict, FieldExtractor,
    RecordValidator, VerdictKind,
};
use crate::history::HistoryCorpus;
use crate::models::config::IntakeConfig;
use crate::models::record::{ExtractedRecord, RecordMetadata, ValidationStatus};
use crate::models::rules::RuleSet;
use crate::models::schema::ValidationSchema;
use crate::timestamp::Clock;

/// Aggregate counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total_documents: usize,
    /// Documents that failed acquisition or timed out.
    pub unprocessed: usize,
    pub good: usize,
    pub needs_review: usize,
    pub clear: usize,
    pub exact: usize,
    pub similar: usize,
}

impl RunSummary {
    /// Documents that produced a record.
    pub fn processed(&self) -> usize {
        self.total_documents - self.unprocessed
    }

    pub fn record_validation(&mut self, records: &[ExtractedRecord]) {
        self.good = 0;
        self.needs_review = 0;
        for record in records {
            match record.metadata.status {
                ValidationStatus::Good => self.good += 1,
                ValidationStatus::NeedsReview => self.needs_review += 1,
                ValidationStatus::Unvalidated => {}
            }
        }
    }

    pub fn record_verdicts(&mut self, verdicts: &[DuplicateVerdict<'_>]) {
        self.clear = 0;
        self.exact = 0;
        self.similar = 0;
        for verdict in verdicts {
            match verdict.kind() {
                VerdictKind::Clear => self.clear += 1,
                VerdictKind::Exact => self.exact += 1,
                VerdictKind::Similar => self.similar += 1,
            }
        }
    }
}

/// PDF files directly inside `dir`, sorted by name.
pub fn list_documents(dir: &Path) -> std::result::Result<Vec<PathBuf>, StoreError> {
    if !dir.is_dir() {
        return Err(StoreError::Scan(format!(
            "input folder {} does not exist",
            dir.display()
        )));
    }
    let root = dir
        .to_str()
        .ok_or_else(|| StoreError::Scan(format!("non UTF-8 path {}", dir.display())))?;
    let pattern = format!("{}/*.pdf", Pattern::escape(root.trim_end_matches('/')));
    let options = MatchOptions {
        case_sensitive: false,
        ..Default::default()
    };

    let mut files: Vec<PathBuf> = glob_with(&pattern, options)
        .map_err(|e| StoreError::Scan(e.to_string()))?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    Ok(files)
}

/// Stateless per-document processing shared by every worker.
pub struct IntakePipeline {
    acquirer: TextAcquirer,
    extractor: FieldExtractor,
    clock: Clock,
}

impl IntakePipeline {
    pub fn new(acquirer: TextAcquirer, extractor: FieldExtractor, clock: Clock) -> Self {
        Self {
            acquirer,
            extractor,
            clock,
        }
    }

    pub fn document_type(&self) -> &str {
        self.extractor.document_type()
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Acquire and extract one document into an unvalidated record.
    ///
    /// Recognition stops once `deadline` passes.
    pub fn process_document(
        &self,
        path: &Path,
        deadline: Option<Instant>,
    ) -> std::result::Result<ExtractedRecord, AcquireError> {
        let acquired = self.acquirer.acquire(path, deadline)?;
        Ok(self.record_from_text(path, &acquired))
    }

    /// Build the record for already acquired text.
    pub fn record_from_text(&self, path: &Path, acquired: &AcquiredText) -> ExtractedRecord {
        let fields = self.extractor.extract(&acquired.text);
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        info!(
            "Extracted {} fields from {}",
            fields.values().filter(|v| v.as_str() != Some("")).count(),
            file_name
        );

        ExtractedRecord::new(
            fields,
            RecordMetadata {
                file_name,
                file_path: path.display().to_string(),
                processed_at: self.clock.now(),
                status: ValidationStatus::Unvalidated,
                validation_errors: Vec::new(),
                page_methods: acquired.methods(),
            },
        )
    }
}

/// Extractor and store file name for the configured document type.
pub fn load_extractor(config: &IntakeConfig) -> Result<(FieldExtractor, String)> {
    let document_type = &config.paths.document_type;
    let rules = RuleSet::from_file(&config.paths.rules_file)?;
    let document_rules = rules.for_type(document_type)?;
    let store_filename = document_rules.store_filename(document_type)?;
    let extractor = FieldExtractor::from_rules(document_type, document_rules)?;
    info!(
        "Loaded {} field rules for '{}'",
        extractor.rule_count(),
        document_type
    );
    Ok((extractor, store_filename))
}

/// Validator for a document type; the schema file must exist.
pub fn load_validator(config: &IntakeConfig, document_type: &str) -> Result<RecordValidator> {
    let schema = ValidationSchema::from_file(&config.schema_path(document_type))?;
    Ok(RecordValidator::new(document_type, schema))
}

/// Validator for a document type; a missing schema marks every record for review.
pub fn load_validator_lenient(
    config: &IntakeConfig,
    document_type: &str,
) -> Result<RecordValidator> {
    match load_validator(config, document_type) {
        Err(IntakeError::Config(ConfigError::NotFound(path))) => {
            warn!("No validation schema at {}", path.display());
            Ok(RecordValidator::missing_schema(document_type))
        }
        other => other,
    }
}

/// Validate every record in place, returning how many passed.
pub fn validate_all(validator: &RecordValidator, records: &mut [ExtractedRecord]) -> usize {
    let mut good = 0;
    for record in records.iter_mut() {
        if validator.validate_record(record) {
            good += 1;
        } else {
            warn!(
                "{} needs review: {}",
                record.metadata.file_name,
                record.metadata.validation_errors.join("; ")
            );
        }
    }
    good
}

/// Classify every record and build the report.
pub fn detect_duplicates<'a>(
    corpus: &'a HistoryCorpus,
    keys: DuplicateKeys,
    records: &[ExtractedRecord],
    clock: &Clock,
    source_file: &Path,
) -> (Vec<DuplicateVerdict<'a>>, DuplicateReport) {
    let detector = DuplicateDetector::new(corpus, keys);
    let verdicts: Vec<_> = records
        .iter()
        .map(|record| detector.classify(&record.fields))
        .collect();

    for (record, verdict) in records.iter().zip(&verdicts) {
        match verdict.kind() {
            VerdictKind::Clear => {}
            kind => warn!(
                "{}: {} duplicate of {} history records",
                record.metadata.file_name,
                kind,
                verdict.evidence().len()
            ),
        }
    }

    let report = DuplicateReport::build(
        clock.now(),
        source_file.display().to_string(),
        records,
        &verdicts,
        detector.keys(),
    );
    (verdicts, report)
}
