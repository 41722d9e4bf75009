//! Document root: the ordered page collection a view renders.

use crate::page::Page;
use crate::replication::StrokeEvent;
use crate::storage::{DocumentExporter, StorageError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of applying a remote [`StrokeEvent`].
///
/// Everything but `Applied` is a benign no-op: duplicates and misses arise
/// legitimately from races between concurrent edits and network delay, so
/// they are logged and ignored, never treated as failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteApply {
    /// The event changed the document.
    Applied,
    /// An add whose stroke id is already present (duplicate delivery).
    Duplicate,
    /// The page/layer index or stroke id did not resolve (racing delete).
    MissingTarget,
    /// The payload was not drawable (e.g. empty point list).
    Rejected,
}

/// An annotated document: ordered pages plus an optional backing file.
///
/// Root of the ownership tree Document → Page → Layer → Stroke. Renderer
/// state is kept outside, keyed by page id.
#[derive(Debug, Serialize, Deserialize)]
pub struct Document {
    pages: Vec<Page>,
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl Document {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            path: None,
        }
    }

    pub fn push_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn page_mut(&mut self, index: usize) -> Option<&mut Page> {
        self.pages.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Path this document was loaded from or last saved to.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Apply an event received from a peer.
    ///
    /// Idempotent and total: applying the same event twice, or an event whose
    /// target has since vanished, leaves the document unchanged. Within one
    /// page, events from a single peer must be applied in that peer's send
    /// order; the relay connection provides exactly that.
    pub fn apply_remote(&mut self, event: &StrokeEvent) -> RemoteApply {
        match event {
            StrokeEvent::Added {
                page,
                layer,
                stroke,
            } => {
                if !stroke.is_well_formed() {
                    log::debug!("rejecting malformed remote stroke {:?}", stroke.id());
                    return RemoteApply::Rejected;
                }
                let Some(target) = self.pages.get_mut(*page) else {
                    log::debug!("remote add for unknown page {page}");
                    return RemoteApply::MissingTarget;
                };
                match target.layer(*layer) {
                    Some(existing) if existing.contains(stroke.id()) => {
                        log::debug!("duplicate remote add of {:?}", stroke.id());
                        RemoteApply::Duplicate
                    }
                    Some(_) => {
                        target.commit_stroke(*layer, stroke.clone());
                        RemoteApply::Applied
                    }
                    None => {
                        log::debug!("remote add for unknown layer {layer}");
                        RemoteApply::MissingTarget
                    }
                }
            }
            StrokeEvent::Deleted { page, layer, id } => {
                let Some(target) = self.pages.get_mut(*page) else {
                    log::debug!("remote delete for unknown page {page}");
                    return RemoteApply::MissingTarget;
                };
                match target.delete_stroke(*layer, *id) {
                    Some(_) => RemoteApply::Applied,
                    None => {
                        log::debug!("remote delete of absent stroke {id:?}");
                        RemoteApply::MissingTarget
                    }
                }
            }
        }
    }

    /// Serialize the document to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a document from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a document from disk.
    ///
    /// A malformed file and an unreadable file are distinct errors; either
    /// way nothing is constructed, so the caller's current document stays
    /// installed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if !path.exists() {
            return Err(StorageError::NotFound(path.display().to_string()));
        }
        let json = fs::read_to_string(&path)
            .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        let mut document = Self::from_json(&json).map_err(|e| {
            StorageError::Malformed(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        document.path = Some(path);
        Ok(document)
    }

    /// Save the document, remembering the destination for later saves.
    pub fn save(&mut self, path: impl Into<PathBuf>) -> Result<(), StorageError> {
        let path = path.into();
        let json = self
            .to_json()
            .map_err(|e| StorageError::Malformed(e.to_string()))?;
        fs::write(&path, json)
            .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))?;
        self.path = Some(path);
        Ok(())
    }

    /// Export through an external writer (e.g. a flattened annotated PDF).
    ///
    /// Unlike `save`, the destination is not remembered; exporting never
    /// changes which file subsequent saves write to.
    pub fn export_to(
        &self,
        exporter: &mut dyn DocumentExporter,
        path: impl AsRef<Path>,
    ) -> Result<(), StorageError> {
        exporter.export(self, path.as_ref())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
