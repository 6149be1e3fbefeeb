use std::fmt;
use std::sync::Arc;

use nova_core::{
    apply_text_edits, normalize_text_edits, EditError, LineIndex, Position, Range, TextEdit,
    TextRange, TextSize,
};

/// An LSP-style content change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChange {
    /// The range of text to replace. If `None`, the entire document is replaced.
    pub range: Option<Range>,
    /// Replacement text.
    pub text: String,
}

impl ContentChange {
    pub fn full(text: impl Into<String>) -> Self {
        Self {
            range: None,
            text: text.into(),
        }
    }

    pub fn replace(range: Range, text: impl Into<String>) -> Self {
        Self {
            range: Some(range),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    DocumentNotOpen,
    InvalidRange,
    Edit(EditError),
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentError::DocumentNotOpen => write!(f, "document not open"),
            DocumentError::InvalidRange => write!(f, "invalid range"),
            DocumentError::Edit(err) => write!(f, "invalid edit: {err}"),
        }
    }
}

impl std::error::Error for DocumentError {}

impl From<EditError> for DocumentError {
    fn from(err: EditError) -> Self {
        DocumentError::Edit(err)
    }
}

/// An in-memory document with versioning and incremental edits.
///
/// The text is shared behind an `Arc` so parsed snapshots can hold on to the exact
/// text they were built from.
#[derive(Debug, Clone)]
pub struct Document {
    text: Arc<String>,
    version: i32,
    line_index: LineIndex,
}

impl Document {
    pub fn new(text: Arc<String>, version: i32) -> Self {
        let line_index = LineIndex::new(&text);
        Self {
            text,
            version,
            line_index,
        }
    }

    pub fn new_string(text: impl Into<String>, version: i32) -> Self {
        Self::new(Arc::new(text.into()), version)
    }

    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    pub fn text_arc(&self) -> Arc<String> {
        Arc::clone(&self.text)
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    /// Applies LSP changes in order and returns the equivalent byte-range edits.
    ///
    /// Each returned edit is expressed against the text produced by the previous one.
    pub fn apply_changes(
        &mut self,
        new_version: i32,
        changes: &[ContentChange],
    ) -> Result<Vec<TextEdit>, DocumentError> {
        let mut edits = Vec::with_capacity(changes.len());
        for change in changes {
            let range = match change.range {
                Some(range) => self.byte_range(range)?,
                None => TextRange::up_to(TextSize::of(self.text.as_str())),
            };
            let edit = TextEdit::new(range, change.text.clone());
            self.replace_text(apply_text_edits(&self.text, std::slice::from_ref(&edit))?);
            edits.push(edit);
        }

        self.version = new_version;
        Ok(edits)
    }

    /// Applies a batch of byte-range edits expressed against the current text.
    ///
    /// Returns the inverse batch: applying it to the new text restores the old text
    /// byte for byte. Undo managers replay it as an ordinary edit.
    pub fn apply_edits(
        &mut self,
        new_version: i32,
        edits: &[TextEdit],
    ) -> Result<Vec<TextEdit>, DocumentError> {
        let mut normalized = edits.to_vec();
        normalize_text_edits(&self.text, &mut normalized)?;

        let mut inverse = Vec::with_capacity(normalized.len());
        let mut shift: i64 = 0;
        for edit in &normalized {
            let start = i64::from(u32::from(edit.range.start())) + shift;
            let old = &self.text.as_str()[edit.range];
            let new_len = TextSize::of(edit.replacement.as_str());
            let start = TextSize::from(start as u32);
            inverse.push(TextEdit::new(TextRange::at(start, new_len), old));
            shift += i64::from(u32::from(new_len)) - i64::from(u32::from(edit.range.len()));
        }

        let text = apply_text_edits(&self.text, &normalized)?;
        self.replace_text(text);
        self.version = new_version;
        Ok(inverse)
    }

    /// Replaces the whole text, e.g. after a reload from disk.
    pub fn set_text(&mut self, new_version: i32, text: impl Into<String>) {
        self.replace_text(text.into());
        self.version = new_version;
    }

    fn replace_text(&mut self, text: String) {
        self.line_index = LineIndex::new(&text);
        self.text = Arc::new(text);
    }

    fn byte_range(&self, range: Range) -> Result<TextRange, DocumentError> {
        let start = self.clamped_offset(range.start);
        let end = self.clamped_offset(range.end);
        if start > end {
            return Err(DocumentError::InvalidRange);
        }
        Ok(TextRange::new(start, end))
    }

    /// Positions past the end of a line clamp to the line end; lines past the end of the
    /// text clamp to the end of the text.
    fn clamped_offset(&self, position: Position) -> TextSize {
        let text = self.text.as_str();
        if position.line >= self.line_index.line_count() {
            return TextSize::of(text);
        }
        let mut character = position.character;
        loop {
            let candidate = Position::new(position.line, character);
            if let Some(offset) = self.line_index.offset_of_position(text, candidate) {
                return offset;
            }
            if character == 0 {
                return TextSize::of(text);
            }
            character -= 1;
        }
    }
}
