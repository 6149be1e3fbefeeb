use std::collections::HashMap;

use nova_core::{FileId, TextEdit};

use crate::change::{ChangeEvent, FileChange, FileChangeKind};
use crate::document::{ContentChange, Document, DocumentError};
use crate::file_id::FileIdRegistry;
use crate::path::VfsPath;

/// In-memory VFS: stable `FileId`s plus the current document for every file.
///
/// Every mutation returns the [`ChangeEvent`] describing it so callers can feed the
/// same event stream that a file watcher would produce.
#[derive(Debug, Default)]
pub struct Vfs {
    ids: FileIdRegistry,
    documents: HashMap<FileId, Document>,
}

impl Vfs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `path` with `text`, or replaces the content if it already exists.
    pub fn create(&mut self, path: VfsPath, text: impl Into<String>) -> ChangeEvent {
        let file_id = self.ids.file_id(path.clone());
        let kind = match self.documents.get_mut(&file_id) {
            Some(doc) => {
                doc.set_text(doc.version() + 1, text);
                FileChangeKind::Modified
            }
            None => {
                self.documents.insert(file_id, Document::new_string(text, 0));
                FileChangeKind::Created
            }
        };
        ChangeEvent::FileSystem(FileChange {
            file_id,
            path,
            kind,
        })
    }

    pub fn set_text(
        &mut self,
        file_id: FileId,
        text: impl Into<String>,
    ) -> Result<ChangeEvent, DocumentError> {
        let path = self.path(file_id).ok_or(DocumentError::DocumentNotOpen)?;
        let doc = self
            .documents
            .get_mut(&file_id)
            .ok_or(DocumentError::DocumentNotOpen)?;
        doc.set_text(doc.version() + 1, text);
        Ok(ChangeEvent::FileSystem(FileChange {
            file_id,
            path,
            kind: FileChangeKind::Modified,
        }))
    }

    /// Applies LSP-style editor changes.
    pub fn apply_changes(
        &mut self,
        file_id: FileId,
        version: i32,
        changes: &[ContentChange],
    ) -> Result<ChangeEvent, DocumentError> {
        let path = self.path(file_id).ok_or(DocumentError::DocumentNotOpen)?;
        let doc = self
            .documents
            .get_mut(&file_id)
            .ok_or(DocumentError::DocumentNotOpen)?;
        let edits = doc.apply_changes(version, changes)?;
        Ok(ChangeEvent::DocumentChanged {
            file_id,
            path,
            version,
            edits,
        })
    }

    /// Applies byte-range edits and returns the event plus the inverse edits.
    pub fn apply_edits(
        &mut self,
        file_id: FileId,
        edits: &[TextEdit],
    ) -> Result<(ChangeEvent, Vec<TextEdit>), DocumentError> {
        let path = self.path(file_id).ok_or(DocumentError::DocumentNotOpen)?;
        let doc = self
            .documents
            .get_mut(&file_id)
            .ok_or(DocumentError::DocumentNotOpen)?;
        let version = doc.version() + 1;
        let inverse = doc.apply_edits(version, edits)?;
        let event = ChangeEvent::DocumentChanged {
            file_id,
            path,
            version,
            edits: edits.to_vec(),
        };
        Ok((event, inverse))
    }

    pub fn remove(&mut self, file_id: FileId) -> Option<ChangeEvent> {
        self.documents.remove(&file_id)?;
        let path = self.ids.remove(file_id)?;
        Some(ChangeEvent::FileSystem(FileChange {
            file_id,
            path,
            kind: FileChangeKind::Deleted,
        }))
    }

    /// Moves a file, keeping its id. Returns `None` if the file is unknown or `to` is taken.
    pub fn rename(&mut self, file_id: FileId, to: VfsPath) -> Option<ChangeEvent> {
        let from = self.path(file_id)?;
        if !self.ids.rename(file_id, to.clone()) {
            return None;
        }
        Some(ChangeEvent::Moved { file_id, from, to })
    }

    pub fn document(&self, file_id: FileId) -> Option<&Document> {
        self.documents.get(&file_id)
    }

    pub fn path(&self, file_id: FileId) -> Option<VfsPath> {
        self.ids.get_path(file_id).cloned()
    }

    pub fn get_id(&self, path: &VfsPath) -> Option<FileId> {
        self.ids.get_id(path)
    }

    /// All live files in id order.
    pub fn files(&self) -> Vec<FileId> {
        let mut files: Vec<FileId> = self.documents.keys().copied().collect();
        files.sort();
        files
    }
}
