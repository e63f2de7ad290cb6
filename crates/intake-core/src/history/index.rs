//! Lookup index over a history corpus.

use std::collections::HashMap;

use super::HistoryCorpus;
use crate::invoice::DuplicateKeys;

/// Normalized invoice number and similarity tuple → record indices.
///
/// Lookups return exactly what [`scan_exact`] and [`scan_similar`] return,
/// in corpus order.
#[derive(Debug, Clone, Default)]
pub struct HistoryIndex {
    by_number: HashMap<String, Vec<usize>>,
    by_tuple: HashMap<(String, String, String), Vec<usize>>,
}

impl HistoryIndex {
    pub fn build(corpus: &HistoryCorpus, keys: &DuplicateKeys) -> Self {
        let mut index = Self::default();
        for (i, record) in corpus.records().iter().enumerate() {
            if let Some(number) = keys.invoice_number(&record.fields) {
                index.by_number.entry(number).or_default().push(i);
            }
            if let Some(tuple) = keys.similarity_tuple(&record.fields) {
                index.by_tuple.entry(tuple).or_default().push(i);
            }
        }
        index
    }

    /// Records whose normalized invoice number equals `number`.
    pub fn exact(&self, number: &str) -> &[usize] {
        self.by_number.get(number).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Records whose normalized (issuer, date, amount) equals `tuple`.
    pub fn similar(&self, tuple: &(String, String, String)) -> &[usize] {
        self.by_tuple.get(tuple).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Linear scan for records with the given normalized invoice number.
pub fn scan_exact(corpus: &HistoryCorpus, keys: &DuplicateKeys, number: &str) -> Vec<usize> {
    if number.is_empty() {
        return Vec::new();
    }
    corpus
        .records()
        .iter()
        .enumerate()
        .filter(|(_, record)| keys.invoice_number(&record.fields).as_deref() == Some(number))
        .map(|(i, _)| i)
        .collect()
}

/// Linear scan for records with the given normalized similarity tuple.
pub fn scan_similar(
    corpus: &HistoryCorpus,
    keys: &DuplicateKeys,
    tuple: &(String, String, String),
) -> Vec<usize> {
    corpus
        .records()
        .iter()
        .enumerate()
        .filter(|(_, record)| keys.similarity_tuple(&record.fields).as_ref() == Some(tuple))
        .map(|(i, _)| i)
        .collect()
}
