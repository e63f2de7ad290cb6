//! Extracted-record store and report files.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::invoice::DuplicateReport;
use crate::models::record::ExtractedRecord;

/// Key holding the document type of a store file.
pub const DOCUMENT_TYPE_KEY: &str = "document_type";

/// One batch of extracted records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordStore {
    pub document_type: String,
    pub processed_at: String,
    pub total_documents: usize,
    pub documents: Vec<ExtractedRecord>,
}

impl RecordStore {
    pub fn new(
        document_type: impl Into<String>,
        processed_at: impl Into<String>,
        documents: Vec<ExtractedRecord>,
    ) -> Self {
        Self {
            document_type: document_type.into(),
            processed_at: processed_at.into(),
            total_documents: documents.len(),
            documents,
        }
    }

    /// Load a store file.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|source| StoreError::Access {
            path: path.to_path_buf(),
            source,
        })?;
        let store: Self = serde_json::from_str(&content).map_err(|source| StoreError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded {} records from {}", store.documents.len(), path.display());
        Ok(store)
    }

    /// Write the store as pretty-printed JSON, creating parent folders.
    pub fn save(&mut self, path: &Path) -> Result<(), StoreError> {
        self.total_documents = self.documents.len();
        write_json(path, self)?;
        info!("Wrote {} records to {}", self.documents.len(), path.display());
        Ok(())
    }
}

/// Replace the duplicate report at `path`.
pub fn write_report(path: &Path, report: &DuplicateReport) -> Result<(), StoreError> {
    remove_stale(path)?;
    write_json(path, report)?;
    info!(
        "Wrote duplicate report to {} ({} errors, {} alerts)",
        path.display(),
        report.error_count,
        report.alert_count
    );
    Ok(())
}

/// Delete a previous run's output file if present.
pub fn remove_stale(path: &Path) -> Result<(), StoreError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed stale {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => {
            warn!("Cannot remove {}: {}", path.display(), e);
            Err(StoreError::Access {
                path: path.to_path_buf(),
                source: e,
            })
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let access = |source| StoreError::Access {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(access)?;
    }
    let content = serde_json::to_string_pretty(value).map_err(|source| StoreError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, content).map_err(access)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::{RecordMetadata, ValidationStatus};
    use pretty_assertions::assert_eq;

    fn store() -> RecordStore {
        let mut record = ExtractedRecord::new(
            serde_json::Map::new(),
            RecordMetadata {
                file_name: "a.pdf".into(),
                file_path: "pdf/a.pdf".into(),
                processed_at: "2024-01-10 09:30".into(),
                ..Default::default()
            },
        );
        record.set_field("請求書番号", "INV-001");
        RecordStore::new("invoice", "2024-01-10 09:30", vec![record])
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output").join("invoice_data.json");

        let mut original = store();
        original.save(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"請求書番号\": \"INV-001\""));
        assert!(content.contains("\"処理ステータス\": \"読み取り完了\""));

        let loaded = RecordStore::load(&path).unwrap();
        assert_eq!(loaded, original);
        assert_eq!(loaded.documents[0].metadata.status, ValidationStatus::Unvalidated);
    }

    #[test]
    fn test_total_updated_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut s = store();
        s.documents.push(ExtractedRecord::default());
        s.save(&path).unwrap();
        assert_eq!(RecordStore::load(&path).unwrap().total_documents, 2);
    }

    #[test]
    fn test_malformed_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(
            RecordStore::load(&path),
            Err(StoreError::Malformed { .. })
        ));
    }

    #[test]
    fn test_remove_stale_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("duplicate.errors.json");
        remove_stale(&path).unwrap();
        std::fs::write(&path, "{}").unwrap();
        remove_stale(&path).unwrap();
        assert!(!path.exists());
    }
}
