//! Text edit primitives and utilities.

use crate::{FileId, TextRange, TextSize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TextEdit {
    pub range: TextRange,
    pub replacement: String,
}

impl TextEdit {
    pub fn new(range: TextRange, replacement: impl Into<String>) -> Self {
        Self {
            range,
            replacement: replacement.into(),
        }
    }

    pub fn insert(offset: TextSize, text: impl Into<String>) -> Self {
        Self::new(TextRange::empty(offset), text)
    }

    pub fn delete(range: TextRange) -> Self {
        Self::new(range, String::new())
    }
}

/// Edits spanning several files that must be applied as one change.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WorkspaceEdit {
    pub changes: BTreeMap<FileId, Vec<TextEdit>>,
}

impl WorkspaceEdit {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn add_edit(&mut self, file: FileId, edit: TextEdit) {
        self.changes.entry(file).or_default().push(edit);
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum EditError {
    RangeOutOfBounds {
        range: TextRange,
        text_len: TextSize,
    },
    InvalidUtf8Boundary {
        offset: TextSize,
    },
    OverlappingEdits {
        first: TextRange,
        second: TextRange,
    },
}

impl std::fmt::Display for EditError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditError::RangeOutOfBounds { range, text_len } => write!(
                f,
                "edit range {range:?} is out of bounds for text length {text_len:?}"
            ),
            EditError::InvalidUtf8Boundary { offset } => {
                write!(f, "offset {offset:?} is not a UTF-8 character boundary")
            }
            EditError::OverlappingEdits { first, second } => {
                write!(f, "overlapping edits: {first:?} overlaps {second:?}")
            }
        }
    }
}

impl std::error::Error for EditError {}

/// Apply a batch of edits expressed against the same text snapshot.
///
/// Edits are sorted by `(start, end)` and applied back to front, so the order of
/// `edits` does not matter.
pub fn apply_text_edits(text: &str, edits: &[TextEdit]) -> Result<String, EditError> {
    let mut edits = edits.to_vec();
    normalize_text_edits(text, &mut edits)?;

    let mut out = text.to_string();
    for edit in edits.into_iter().rev() {
        let start = u32::from(edit.range.start()) as usize;
        let end = u32::from(edit.range.end()) as usize;
        out.replace_range(start..end, &edit.replacement);
    }
    Ok(out)
}

/// Sort edits, reject overlaps and out-of-bounds ranges, and merge adjacent edits.
pub fn normalize_text_edits(text: &str, edits: &mut Vec<TextEdit>) -> Result<(), EditError> {
    edits.sort_by_key(|e| (e.range.start(), e.range.end()));

    let text_len = TextSize::of(text);
    for edit in edits.iter() {
        if edit.range.end() > text_len {
            return Err(EditError::RangeOutOfBounds {
                range: edit.range,
                text_len,
            });
        }
        for offset in [edit.range.start(), edit.range.end()] {
            if !text.is_char_boundary(u32::from(offset) as usize) {
                return Err(EditError::InvalidUtf8Boundary { offset });
            }
        }
    }

    for pair in edits.windows(2) {
        let (first, second) = (&pair[0], &pair[1]);
        let both_inserts_at_same_offset =
            first.range.is_empty() && second.range.is_empty() && first.range == second.range;
        if first.range.end() > second.range.start() || both_inserts_at_same_offset {
            return Err(EditError::OverlappingEdits {
                first: first.range,
                second: second.range,
            });
        }
    }

    let mut merged: Vec<TextEdit> = Vec::with_capacity(edits.len());
    for edit in edits.drain(..) {
        if let Some(last) = merged.last_mut() {
            if last.range.end() == edit.range.start() {
                last.range = TextRange::new(last.range.start(), edit.range.end());
                last.replacement.push_str(&edit.replacement);
                continue;
            }
        }
        merged.push(edit);
    }
    *edits = merged;

    Ok(())
}

/// The single contiguous region in which two snapshots of a text differ.
///
/// `old` is the changed range in the old text; it was replaced by `new_len`
/// bytes. Offsets outside `old` can be mapped to the new text exactly.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct TextDelta {
    pub old: TextRange,
    pub new_len: TextSize,
}

impl TextDelta {
    /// Computes the minimal delta by trimming the common prefix and suffix.
    ///
    /// Returns `None` when both texts are identical.
    pub fn between(old: &str, new: &str) -> Option<Self> {
        if old == new {
            return None;
        }

        let mut prefix = old
            .bytes()
            .zip(new.bytes())
            .take_while(|(a, b)| a == b)
            .count();
        while !old.is_char_boundary(prefix) || !new.is_char_boundary(prefix) {
            prefix -= 1;
        }

        let max_suffix = old.len().min(new.len()) - prefix;
        let mut suffix = old
            .bytes()
            .rev()
            .zip(new.bytes().rev())
            .take(max_suffix)
            .take_while(|(a, b)| a == b)
            .count();
        while !old.is_char_boundary(old.len() - suffix) || !new.is_char_boundary(new.len() - suffix)
        {
            suffix -= 1;
        }

        Some(Self {
            old: TextRange::new(
                TextSize::from(prefix as u32),
                TextSize::from((old.len() - suffix) as u32),
            ),
            new_len: TextSize::from((new.len() - suffix - prefix) as u32),
        })
    }

    /// Range the replacement occupies in the new text.
    pub fn new_range(&self) -> TextRange {
        TextRange::at(self.old.start(), self.new_len)
    }

    /// Maps an old offset into the new text.
    ///
    /// Offsets strictly inside the replaced region have no counterpart and map to `None`.
    pub fn map_offset(&self, offset: TextSize) -> Option<TextSize> {
        if offset <= self.old.start() {
            Some(offset)
        } else if offset >= self.old.end() {
            Some(offset - self.old.end() + self.new_range().end())
        } else {
            None
        }
    }

    /// Maps an old range, clamping endpoints that fall inside the replaced region to its
    /// new boundaries.
    pub fn map_range_clamped(&self, range: TextRange) -> TextRange {
        let new = self.new_range();
        let start = self.map_offset(range.start()).unwrap_or(new.start());
        let end = self.map_offset(range.end()).unwrap_or(new.end());
        TextRange::new(start, end.max(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(TextSize::from(start), TextSize::from(end))
    }

    #[test]
    fn edit_order_does_not_change_the_result() {
        let text = "int field = 1;";
        let mut edits = vec![
            TextEdit::new(range(4, 9), "f"),
            TextEdit::insert(TextSize::from(0), "static "),
            TextEdit::delete(range(13, 14)),
        ];

        let forward = apply_text_edits(text, &edits).unwrap();
        edits.reverse();
        let backward = apply_text_edits(text, &edits).unwrap();

        assert_eq!(forward, backward);
        assert_eq!(forward, "static int f = 1");
    }

    #[test]
    fn overlapping_edits_are_rejected() {
        let edits = vec![
            TextEdit::new(range(1, 4), "X"),
            TextEdit::new(range(3, 5), "Y"),
        ];
        assert!(matches!(
            apply_text_edits("abcdef", &edits),
            Err(EditError::OverlappingEdits { .. })
        ));
    }

    #[test]
    fn out_of_bounds_edits_are_rejected() {
        let edits = vec![TextEdit::new(range(2, 40), "X")];
        assert!(matches!(
            apply_text_edits("abc", &edits),
            Err(EditError::RangeOutOfBounds { .. })
        ));
    }

    #[test]
    fn delta_trims_common_prefix_and_suffix() {
        let delta = TextDelta::between("class A extends P {}", "class Bar extends P {}").unwrap();
        assert_eq!(delta.old, range(6, 7));
        assert_eq!(delta.new_len, TextSize::from(3));
        assert_eq!(delta.new_range(), range(6, 9));

        assert_eq!(TextDelta::between("same", "same"), None);
    }

    #[test]
    fn delta_maps_offsets_around_the_change() {
        let delta = TextDelta::between("class A extends P {}", "class Bar extends P {}").unwrap();

        assert_eq!(delta.map_offset(TextSize::from(0)), Some(TextSize::from(0)));
        assert_eq!(delta.map_offset(TextSize::from(6)), Some(TextSize::from(6)));
        assert_eq!(delta.map_offset(TextSize::from(8)), Some(TextSize::from(10)));
        assert_eq!(delta.map_range_clamped(range(0, 20)), range(0, 22));
    }

    #[test]
    fn delta_offsets_inside_the_change_are_unmapped() {
        let delta = TextDelta::between("int value;", "int v;").unwrap();
        assert_eq!(delta.old, range(5, 9));
        assert_eq!(delta.map_offset(TextSize::from(7)), None);
        assert_eq!(delta.map_range_clamped(range(7, 10)), range(5, 6));
    }

    #[test]
    fn delta_respects_char_boundaries() {
        let delta = TextDelta::between("aé", "aè").unwrap();
        assert_eq!(delta.old, range(1, 3));
        assert_eq!(delta.new_len, TextSize::from(2));
    }
}
