use nova_core::FileId;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// Identifies one editor instance. Split and duplicate editors of the same file get
/// distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EditorId(u32);

impl EditorId {
    pub const fn to_raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Default)]
struct Inner {
    next: u32,
    editors: BTreeMap<EditorId, FileId>,
}

/// Tracks which editors are open and which file each one shows.
#[derive(Debug, Default)]
pub struct OpenDocuments {
    inner: Mutex<Inner>,
}

impl OpenDocuments {
    #[track_caller]
    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(err) => {
                let loc = std::panic::Location::caller();
                tracing::error!(
                    target: "nova.vfs",
                    file = loc.file(),
                    line = loc.line(),
                    column = loc.column(),
                    error = %err,
                    "mutex poisoned; continuing with recovered guard"
                );
                err.into_inner()
            }
        }
    }

    pub fn open(&self, file: FileId) -> EditorId {
        let mut inner = self.lock_inner();
        let editor = EditorId(inner.next);
        inner.next += 1;
        inner.editors.insert(editor, file);
        editor
    }

    /// Closes `editor` and returns its file plus whether it was the file's last editor.
    pub fn close(&self, editor: EditorId) -> Option<(FileId, bool)> {
        let mut inner = self.lock_inner();
        let file = inner.editors.remove(&editor)?;
        let last = !inner.editors.values().any(|&other| other == file);
        Some((file, last))
    }

    /// Closes every editor of `file`, e.g. because the file was deleted.
    pub fn close_all(&self, file: FileId) -> Vec<EditorId> {
        let mut inner = self.lock_inner();
        let closed: Vec<EditorId> = inner
            .editors
            .iter()
            .filter(|(_, &f)| f == file)
            .map(|(&editor, _)| editor)
            .collect();
        for editor in &closed {
            inner.editors.remove(editor);
        }
        closed
    }

    pub fn file_of(&self, editor: EditorId) -> Option<FileId> {
        self.lock_inner().editors.get(&editor).copied()
    }

    pub fn editors_of(&self, file: FileId) -> Vec<EditorId> {
        self.lock_inner()
            .editors
            .iter()
            .filter(|(_, &f)| f == file)
            .map(|(&editor, _)| editor)
            .collect()
    }

    pub fn is_open(&self, file: FileId) -> bool {
        self.lock_inner().editors.values().any(|&f| f == file)
    }

    pub fn snapshot(&self) -> HashSet<FileId> {
        self.lock_inner().editors.values().copied().collect()
    }
}
