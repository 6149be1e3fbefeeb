use nova_core::{FileId, TextEdit};

use crate::path::VfsPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileChangeKind {
    Created,
    Modified,
    Deleted,
    Moved,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileChange {
    pub file_id: FileId,
    pub path: VfsPath,
    pub kind: FileChangeKind,
}

/// High-level change kinds produced by the VFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    FileSystem(FileChangeKind),
    Document,
}

/// A change event emitted by the VFS for every mutation it performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A file was created, replaced wholesale, or deleted.
    FileSystem(FileChange),
    /// A file kept its id but now lives at `to`.
    Moved {
        file_id: FileId,
        from: VfsPath,
        to: VfsPath,
    },
    /// An open document changed via editor edits (forward edits and undo alike).
    DocumentChanged {
        file_id: FileId,
        path: VfsPath,
        version: i32,
        edits: Vec<TextEdit>,
    },
}

impl ChangeEvent {
    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeEvent::FileSystem(change) => ChangeKind::FileSystem(change.kind),
            ChangeEvent::Moved { .. } => ChangeKind::FileSystem(FileChangeKind::Moved),
            ChangeEvent::DocumentChanged { .. } => ChangeKind::Document,
        }
    }

    pub fn file_id(&self) -> FileId {
        match self {
            ChangeEvent::FileSystem(change) => change.file_id,
            ChangeEvent::Moved { file_id, .. } | ChangeEvent::DocumentChanged { file_id, .. } => {
                *file_id
            }
        }
    }

    /// Whether the event can change the file's content.
    pub fn changes_text(&self) -> bool {
        matches!(
            self.kind(),
            ChangeKind::Document
                | ChangeKind::FileSystem(FileChangeKind::Created | FileChangeKind::Modified)
        )
    }
}
