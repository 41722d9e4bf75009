//! Document persistence errors and filesystem locations.
//!
//! Loading and saving live on [`Document`](crate::document::Document); this
//! module holds the shared error type and the default save location.

use crate::document::Document;
use std::path::Path;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Document not found: {0}")]
    NotFound(String),
    /// The file exists but is not a valid document. Distinct from [`Io`]:
    /// the caller may want to tell the user the file is corrupt rather than
    /// unreadable.
    ///
    /// [`Io`]: StorageError::Io
    #[error("Malformed document: {0}")]
    Malformed(String),
    #[error("IO error: {0}")]
    Io(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// External export writer.
///
/// Implementations flatten the document (backdrop plus annotations) into a
/// destination file, e.g. an annotated PDF. The writer owns the output
/// format; failures come back through the storage taxonomy.
pub trait DocumentExporter {
    fn export(&mut self, document: &Document, path: &Path) -> StorageResult<()>;
}

/// Default directory for annotated documents, created on demand.
#[cfg(not(target_arch = "wasm32"))]
pub fn default_document_dir() -> StorageResult<std::path::PathBuf> {
    let base = dirs::document_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| StorageError::Io("Could not determine documents directory".to_string()))?;
    let dir = base.join("coscribe");
    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::Io(format!("Failed to create {}: {}", dir.display(), e)))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::page::Page;
    use kurbo::Size;

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.coscribe");

        let mut doc = Document::new();
        doc.push_page(Page::new(Size::new(612.0, 792.0)));
        doc.save(&path).unwrap();
        assert_eq!(doc.path(), Some(path.as_path()));

        let loaded = Document::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.path(), Some(path.as_path()));
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = Document::load(dir.path().join("absent.coscribe")).unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    struct RecordingExporter {
        exported: Vec<(std::path::PathBuf, usize)>,
    }

    impl DocumentExporter for RecordingExporter {
        fn export(&mut self, document: &Document, path: &Path) -> StorageResult<()> {
            self.exported.push((path.to_path_buf(), document.len()));
            Ok(())
        }
    }

    struct BrokenExporter;

    impl DocumentExporter for BrokenExporter {
        fn export(&mut self, _document: &Document, path: &Path) -> StorageResult<()> {
            Err(StorageError::Io(format!(
                "Failed to write {}",
                path.display()
            )))
        }
    }

    #[test]
    fn test_export_hands_document_and_destination_to_writer() {
        let dir = tempfile::tempdir().unwrap();
        let save_path = dir.path().join("notes.coscribe");
        let export_path = dir.path().join("notes.pdf");

        let mut doc = Document::new();
        doc.push_page(Page::new(Size::new(612.0, 792.0)));
        doc.save(&save_path).unwrap();

        let mut exporter = RecordingExporter {
            exported: Vec::new(),
        };
        doc.export_to(&mut exporter, &export_path).unwrap();

        assert_eq!(exporter.exported, vec![(export_path, 1)]);
        // Exporting does not retarget the backing file.
        assert_eq!(doc.path(), Some(save_path.as_path()));
    }

    #[test]
    fn test_export_failure_propagates() {
        let doc = Document::new();
        let err = doc.export_to(&mut BrokenExporter, "/nope/out.pdf").unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
    }

    #[test]
    fn test_load_malformed_file_reports_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.coscribe");
        std::fs::write(&path, "not a document").unwrap();

        let err = Document::load(&path).unwrap_err();
        assert!(matches!(err, StorageError::Malformed(_)));
    }
}
