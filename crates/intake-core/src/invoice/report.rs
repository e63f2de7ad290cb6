//! Duplicate-error report written after every run.

use serde::Serialize;
use serde_json::{Map, Value};

use super::duplicates::{DuplicateKeys, DuplicateVerdict};
use crate::models::record::ExtractedRecord;

/// Written in place of missing candidate metadata.
pub const UNKNOWN: &str = "不明";

pub const EXACT_REASON: &str = "同一請求書番号が履歴に存在";
pub const SIMILAR_REASON: &str = "発行者名・請求日・請求金額が一致";

/// A matching history record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceEntry {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(rename = "履歴ファイル")]
    pub source: String,
}

/// History records backing a report entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Evidence {
    #[serde(rename = "重複詳細")]
    Exact(Vec<EvidenceEntry>),
    #[serde(rename = "類似詳細")]
    Similar(Vec<EvidenceEntry>),
}

/// One flagged candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    /// Position of the candidate in the record store.
    pub index: usize,
    #[serde(rename = "ファイル名")]
    pub file_name: String,
    #[serde(rename = "ファイルパス")]
    pub file_path: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(rename = "重複理由")]
    pub reason: String,
    #[serde(flatten)]
    pub evidence: Evidence,
}

/// Exact duplicates are errors, near duplicates are alerts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateReport {
    pub generated_at: String,
    pub source_file: String,
    pub total_documents: usize,
    pub error_count: usize,
    pub alert_count: usize,
    pub errors: Vec<ReportEntry>,
    pub alerts: Vec<ReportEntry>,
}

impl DuplicateReport {
    /// Build the report for `records` classified as `verdicts` (same order).
    pub fn build(
        generated_at: String,
        source_file: String,
        records: &[ExtractedRecord],
        verdicts: &[DuplicateVerdict<'_>],
        keys: &DuplicateKeys,
    ) -> Self {
        let mut errors = Vec::new();
        let mut alerts = Vec::new();

        for (index, (record, verdict)) in records.iter().zip(verdicts).enumerate() {
            match verdict {
                DuplicateVerdict::Clear => {}
                DuplicateVerdict::Exact(matches) => {
                    let shown = [&keys.invoice_number, &keys.date, &keys.amount];
                    let evidence = matches
                        .iter()
                        .map(|m| EvidenceEntry {
                            fields: pick(&m.fields, &shown),
                            source: m.source.display().to_string(),
                        })
                        .collect();
                    errors.push(entry(
                        index,
                        record,
                        &shown,
                        EXACT_REASON,
                        Evidence::Exact(evidence),
                    ));
                }
                DuplicateVerdict::Similar(matches) => {
                    let shown = [&keys.issuer, &keys.date, &keys.amount];
                    let evidence_keys = [&keys.issuer, &keys.date, &keys.amount, &keys.invoice_number];
                    let evidence = matches
                        .iter()
                        .map(|m| EvidenceEntry {
                            fields: pick(&m.fields, &evidence_keys),
                            source: m.source.display().to_string(),
                        })
                        .collect();
                    alerts.push(entry(
                        index,
                        record,
                        &shown,
                        SIMILAR_REASON,
                        Evidence::Similar(evidence),
                    ));
                }
            }
        }

        Self {
            generated_at,
            source_file,
            total_documents: records.len(),
            error_count: errors.len(),
            alert_count: alerts.len(),
            errors,
            alerts,
        }
    }
}

fn entry(
    index: usize,
    record: &ExtractedRecord,
    shown: &[&String],
    reason: &str,
    evidence: Evidence,
) -> ReportEntry {
    ReportEntry {
        index,
        file_name: or_unknown(&record.metadata.file_name),
        file_path: or_unknown(&record.metadata.file_path),
        fields: pick(&record.fields, shown),
        reason: reason.to_string(),
        evidence,
    }
}

/// Listed fields as stored, absent ones as empty strings.
fn pick(fields: &Map<String, Value>, names: &[&String]) -> Map<String, Value> {
    names
        .iter()
        .map(|name| {
            let value = fields
                .get(name.as_str())
                .cloned()
                .unwrap_or_else(|| Value::String(String::new()));
            (name.to_string(), value)
        })
        .collect()
}

fn or_unknown(value: &str) -> String {
    if value.is_empty() {
        UNKNOWN.to_string()
    } else {
        value.to_string()
    }
}
