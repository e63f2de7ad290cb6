//! History corpus of previously accepted records.
//!
//! The corpus is rebuilt from a full rescan of the history directory on
//! every run. [`HistoryIndex`] is derived from that rescan.

mod index;

pub use index::{HistoryIndex, scan_exact, scan_similar};

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern, glob_with};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::store::DOCUMENT_TYPE_KEY;

/// A record loaded from a history store file.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    /// Raw field map as stored, metadata included.
    pub fields: Map<String, Value>,
    /// Store file the record was loaded from.
    pub source: PathBuf,
}

/// Every history record of one document type, in file order.
#[derive(Debug, Clone, Default)]
pub struct HistoryCorpus {
    records: Vec<HistoryRecord>,
    files_loaded: usize,
    files_skipped: usize,
}

impl HistoryCorpus {
    /// Build a corpus from records already in memory.
    pub fn from_records(records: Vec<HistoryRecord>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    /// Scan `dir` recursively for store files of `document_type`.
    ///
    /// A missing directory is an empty corpus. Unreadable files and files of
    /// other document types are skipped.
    pub fn load(dir: &Path, document_type: &str) -> Result<Self, StoreError> {
        if !dir.exists() {
            info!(
                "History directory {} not found, starting with an empty corpus",
                dir.display()
            );
            return Ok(Self::default());
        }

        let mut corpus = Self::default();
        for path in history_files(dir)? {
            match read_store_documents(&path, document_type) {
                Ok(Some(documents)) => {
                    debug!("{}: {} records", path.display(), documents.len());
                    corpus.files_loaded += 1;
                    corpus
                        .records
                        .extend(documents.into_iter().map(|fields| HistoryRecord {
                            fields,
                            source: path.clone(),
                        }));
                }
                Ok(None) => {
                    debug!("{}: other document type, skipped", path.display());
                    corpus.files_skipped += 1;
                }
                Err(e) => {
                    warn!("Skipping history file: {}", e);
                    corpus.files_skipped += 1;
                }
            }
        }

        info!(
            "Loaded {} history records from {} files ({} skipped)",
            corpus.records.len(),
            corpus.files_loaded,
            corpus.files_skipped
        );
        Ok(corpus)
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn files_loaded(&self) -> usize {
        self.files_loaded
    }

    pub fn files_skipped(&self) -> usize {
        self.files_skipped
    }
}

/// Every `*.json` below `dir`, sorted by path.
fn history_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let root = dir
        .to_str()
        .ok_or_else(|| StoreError::Scan(format!("non UTF-8 path {}", dir.display())))?;
    let pattern = format!("{}/**/*.json", Pattern::escape(root.trim_end_matches('/')));
    let options = MatchOptions {
        case_sensitive: false,
        ..Default::default()
    };

    let mut files: Vec<PathBuf> = glob_with(&pattern, options)
        .map_err(|e| StoreError::Scan(e.to_string()))?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Cannot read history entry: {}", e);
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    Ok(files)
}

/// Documents of a store file, or `None` when it holds another document type.
fn read_store_documents(
    path: &Path,
    document_type: &str,
) -> Result<Option<Vec<Map<String, Value>>>, StoreError> {
    let content = std::fs::read_to_string(path).map_err(|source| StoreError::Access {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|source| StoreError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;

    if value.get(DOCUMENT_TYPE_KEY).and_then(Value::as_str) != Some(document_type) {
        return Ok(None);
    }

    let documents = match value.get("documents") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_object().cloned())
            .collect(),
        _ => Vec::new(),
    };
    Ok(Some(documents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let corpus = HistoryCorpus::load(Path::new("/nonexistent/history"), "invoice").unwrap();
        assert!(corpus.is_empty());
    }

    #[test]
    fn test_recursive_load_skips_foreign_and_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let jan = write(
            dir.path(),
            "2024/01/invoice_data.json",
            r#"{"document_type": "invoice", "documents": [{"請求書番号": "INV-001"}, {"請求書番号": "INV-002"}]}"#,
        );
        let feb = write(
            dir.path(),
            "2024/02/invoice_data.json",
            r#"{"document_type": "invoice", "documents": [{"請求書番号": "INV-003"}]}"#,
        );
        write(
            dir.path(),
            "po_data.json",
            r#"{"document_type": "po", "documents": [{"請求書番号": "PO-1"}]}"#,
        );
        write(dir.path(), "broken.json", "{not json");
        write(dir.path(), "notes.txt", "ignored");

        let corpus = HistoryCorpus::load(dir.path(), "invoice").unwrap();

        let numbers: Vec<&Value> = corpus
            .records()
            .iter()
            .map(|r| &r.fields["請求書番号"])
            .collect();
        assert_eq!(numbers, vec!["INV-001", "INV-002", "INV-003"]);
        assert_eq!(corpus.records()[0].source, jan);
        assert_eq!(corpus.records()[2].source, feb);
        assert_eq!(corpus.files_loaded(), 2);
        assert_eq!(corpus.files_skipped(), 2);
    }
}
