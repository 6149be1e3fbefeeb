use std::collections::{BTreeMap, BTreeSet};

use nova_core::FileId;

/// Word index: identifier → files containing it.
///
/// Built from lexer identifiers, so words inside comments and string literals are not
/// indexed. Updated per file on every reparse.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WordIndex {
    words: BTreeMap<String, BTreeSet<FileId>>,
    files: BTreeMap<FileId, BTreeSet<String>>,
}

impl WordIndex {
    /// Replaces the indexed words of `file`.
    pub fn insert_file(&mut self, file: FileId, words: &BTreeSet<String>) {
        self.invalidate_file(file);
        for word in words {
            self.words.entry(word.clone()).or_default().insert(file);
        }
        self.files.insert(file, words.clone());
    }

    pub fn invalidate_file(&mut self, file: FileId) {
        let Some(words) = self.files.remove(&file) else {
            return;
        };
        for word in words {
            if let Some(files) = self.words.get_mut(&word) {
                files.remove(&file);
                if files.is_empty() {
                    self.words.remove(&word);
                }
            }
        }
    }

    pub fn files_containing(&self, word: &str) -> impl Iterator<Item = FileId> + '_ {
        self.words.get(word).into_iter().flatten().copied()
    }

    pub fn contains(&self, file: FileId, word: &str) -> bool {
        self.files
            .get(&file)
            .is_some_and(|words| words.contains(word))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
