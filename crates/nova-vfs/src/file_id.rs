use std::collections::HashMap;

use nova_core::FileId;

use crate::path::VfsPath;

/// Allocates stable `FileId`s for paths and supports reverse lookup.
///
/// Ids are never reused: a removed file keeps its id retired so stale handles
/// can't alias a newer file.
#[derive(Debug, Default)]
pub struct FileIdRegistry {
    path_to_id: HashMap<VfsPath, FileId>,
    id_to_path: Vec<Option<VfsPath>>,
}

impl FileIdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stable id for `path`, allocating a new one if necessary.
    pub fn file_id(&mut self, path: VfsPath) -> FileId {
        if let Some(&id) = self.path_to_id.get(&path) {
            return id;
        }

        let id = FileId::from_raw(self.id_to_path.len() as u32);
        self.id_to_path.push(Some(path.clone()));
        self.path_to_id.insert(path, id);
        id
    }

    pub fn get_id(&self, path: &VfsPath) -> Option<FileId> {
        self.path_to_id.get(path).copied()
    }

    pub fn get_path(&self, id: FileId) -> Option<&VfsPath> {
        self.id_to_path.get(id.to_raw() as usize)?.as_ref()
    }

    /// Moves `id` to `to`, keeping the id.
    ///
    /// Returns `false` when `id` is unknown or `to` already belongs to another file.
    pub fn rename(&mut self, id: FileId, to: VfsPath) -> bool {
        if self.path_to_id.get(&to).is_some_and(|&existing| existing != id) {
            return false;
        }
        let Some(slot) = self.id_to_path.get_mut(id.to_raw() as usize) else {
            return false;
        };
        let Some(from) = slot.replace(to.clone()) else {
            *slot = None;
            return false;
        };
        self.path_to_id.remove(&from);
        self.path_to_id.insert(to, id);
        true
    }

    /// Retires `id`; its path can later be interned again under a fresh id.
    pub fn remove(&mut self, id: FileId) -> Option<VfsPath> {
        let path = self.id_to_path.get_mut(id.to_raw() as usize)?.take()?;
        self.path_to_id.remove(&path);
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_id_is_stable_across_uri_and_path_representations() {
        let mut registry = FileIdRegistry::new();
        let id1 = registry.file_id(VfsPath::uri("file:///src/foo/A.java"));
        let id2 = registry.file_id(VfsPath::local("/src/foo/A.java"));

        assert_eq!(id1, id2);
        assert_eq!(
            registry.get_path(id1),
            Some(&VfsPath::local("/src/foo/A.java"))
        );
    }

    #[test]
    fn rename_keeps_the_id_and_frees_the_old_path() {
        let mut registry = FileIdRegistry::new();
        let from = VfsPath::local("/src/foo/A.java");
        let to = VfsPath::local("/src/bar/A.java");
        let id = registry.file_id(from.clone());

        assert!(registry.rename(id, to.clone()));
        assert_eq!(registry.get_id(&to), Some(id));
        assert_eq!(registry.get_id(&from), None);
        assert_ne!(registry.file_id(from), id);
    }

    #[test]
    fn rename_onto_another_file_is_refused() {
        let mut registry = FileIdRegistry::new();
        let a = registry.file_id(VfsPath::local("/a/A.java"));
        let b_path = VfsPath::local("/a/B.java");
        registry.file_id(b_path.clone());

        assert!(!registry.rename(a, b_path));
        assert_eq!(registry.get_path(a), Some(&VfsPath::local("/a/A.java")));
    }

    #[test]
    fn removed_ids_are_not_reused() {
        let mut registry = FileIdRegistry::new();
        let path = VfsPath::local("/a/A.java");
        let first = registry.file_id(path.clone());

        assert_eq!(registry.remove(first), Some(path.clone()));
        assert_eq!(registry.get_path(first), None);
        assert_ne!(registry.file_id(path), first);
    }
}
