//! Duplicate detection against the history corpus.
//!
//! Tier 1 compares invoice numbers. Tier 2 runs only when tier 1 finds
//! nothing and compares the (issuer, date, amount) tuple. Empty keys never
//! match.

use serde_json::{Map, Value};
use tracing::debug;

use super::normalize::normalize_key;
use crate::history::{HistoryCorpus, HistoryIndex, HistoryRecord};
use crate::models::config::DuplicateConfig;
use crate::models::record::field_text;

/// Names of the fields compared by the detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateKeys {
    pub invoice_number: String,
    pub issuer: String,
    pub date: String,
    pub amount: String,
}

impl From<&DuplicateConfig> for DuplicateKeys {
    fn from(config: &DuplicateConfig) -> Self {
        Self {
            invoice_number: config.invoice_number_field.clone(),
            issuer: config.issuer_field.clone(),
            date: config.date_field.clone(),
            amount: config.amount_field.clone(),
        }
    }
}

impl Default for DuplicateKeys {
    fn default() -> Self {
        Self::from(&DuplicateConfig::default())
    }
}

impl DuplicateKeys {
    /// Normalized invoice number, `None` when blank.
    pub fn invoice_number(&self, fields: &Map<String, Value>) -> Option<String> {
        non_empty(normalize_key(&field_text(fields, &self.invoice_number)))
    }

    /// Normalized (issuer, date, amount), `None` when any part is blank.
    pub fn similarity_tuple(&self, fields: &Map<String, Value>) -> Option<(String, String, String)> {
        let issuer = non_empty(normalize_key(&field_text(fields, &self.issuer)))?;
        let date = non_empty(normalize_key(&field_text(fields, &self.date)))?;
        let amount = non_empty(normalize_key(&field_text(fields, &self.amount)))?;
        Some((issuer, date, amount))
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// Classification of a verdict without its evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictKind {
    Clear,
    Exact,
    Similar,
}

impl VerdictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictKind::Clear => "clear",
            VerdictKind::Exact => "exact",
            VerdictKind::Similar => "similar",
        }
    }
}

impl std::fmt::Display for VerdictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome for one candidate, with matching history records as evidence.
#[derive(Debug, Clone, PartialEq)]
pub enum DuplicateVerdict<'a> {
    Clear,
    Exact(Vec<&'a HistoryRecord>),
    Similar(Vec<&'a HistoryRecord>),
}

impl DuplicateVerdict<'_> {
    pub fn kind(&self) -> VerdictKind {
        match self {
            DuplicateVerdict::Clear => VerdictKind::Clear,
            DuplicateVerdict::Exact(_) => VerdictKind::Exact,
            DuplicateVerdict::Similar(_) => VerdictKind::Similar,
        }
    }

    pub fn evidence(&self) -> &[&HistoryRecord] {
        match self {
            DuplicateVerdict::Clear => &[],
            DuplicateVerdict::Exact(records) | DuplicateVerdict::Similar(records) => records.as_slice(),
        }
    }
}

/// Classifies candidates against an immutable corpus.
pub struct DuplicateDetector<'a> {
    corpus: &'a HistoryCorpus,
    index: HistoryIndex,
    keys: DuplicateKeys,
}

impl<'a> DuplicateDetector<'a> {
    pub fn new(corpus: &'a HistoryCorpus, keys: DuplicateKeys) -> Self {
        let index = HistoryIndex::build(corpus, &keys);
        Self {
            corpus,
            index,
            keys,
        }
    }

    pub fn keys(&self) -> &DuplicateKeys {
        &self.keys
    }

    /// Classify one candidate field map.
    pub fn classify(&self, fields: &Map<String, Value>) -> DuplicateVerdict<'a> {
        if let Some(number) = self.keys.invoice_number(fields) {
            let hits = self.index.exact(&number);
            if !hits.is_empty() {
                debug!("Invoice number '{}' found {} times in history", number, hits.len());
                return DuplicateVerdict::Exact(self.records(hits));
            }
        }

        if let Some(tuple) = self.keys.similarity_tuple(fields) {
            let hits = self.index.similar(&tuple);
            if !hits.is_empty() {
                debug!("Issuer/date/amount {:?} found {} times in history", tuple, hits.len());
                return DuplicateVerdict::Similar(self.records(hits));
            }
        }

        DuplicateVerdict::Clear
    }

    fn records(&self, indices: &[usize]) -> Vec<&'a HistoryRecord> {
        let records = self.corpus.records();
        indices.iter().filter_map(|&i| records.get(i)).collect()
    }
}
