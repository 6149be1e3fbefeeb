//! Text model primitives: sizes, ranges, positions, and conversions.

pub use text_size::{TextRange, TextSize};

/// Zero-based line and UTF-8 byte column.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

/// LSP-compatible position (UTF-16 code units).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    #[inline]
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// LSP-compatible range (UTF-16 code units).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[inline]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// Pre-computed line start offsets for a particular text snapshot.
///
/// `\n`, `\r\n` and lone `\r` all terminate a line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LineIndex {
    line_starts: Vec<TextSize>,
    line_ends: Vec<TextSize>,
    text_len: TextSize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut line_starts = vec![TextSize::from(0)];
        let mut line_ends = Vec::new();

        let mut i = 0;
        while i < bytes.len() {
            let terminator = match bytes[i] {
                b'\n' => 1,
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => 2,
                b'\r' => 1,
                _ => 0,
            };
            if terminator == 0 {
                i += 1;
                continue;
            }
            line_ends.push(TextSize::from(i as u32));
            i += terminator;
            line_starts.push(TextSize::from(i as u32));
        }
        line_ends.push(TextSize::from(text.len() as u32));

        Self {
            line_starts,
            line_ends,
            text_len: TextSize::from(text.len() as u32),
        }
    }

    #[inline]
    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }

    fn line_of(&self, offset: TextSize) -> usize {
        let offset = offset.min(self.text_len);
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(insert) => insert.saturating_sub(1),
        }
    }

    /// Convert a byte offset to a line and byte column.
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let line = self.line_of(offset);
        let col = offset.min(self.line_ends[line]) - self.line_starts[line];
        LineCol {
            line: line as u32,
            col: u32::from(col),
        }
    }

    /// Convert a byte offset to an LSP position.
    ///
    /// `text` must be the snapshot this index was built from.
    pub fn position(&self, text: &str, offset: TextSize) -> Position {
        debug_assert_eq!(TextSize::from(text.len() as u32), self.text_len);
        let line = self.line_of(offset);
        let start = u32::from(self.line_starts[line]) as usize;
        let end = u32::from(offset.min(self.line_ends[line])) as usize;
        let character = text
            .get(start..end)
            .map(|slice| slice.chars().map(|c| c.len_utf16() as u32).sum())
            .unwrap_or(0);
        Position::new(line as u32, character)
    }

    /// Convert an LSP position to a byte offset.
    ///
    /// Returns `None` when the line does not exist, the column is past the end of the
    /// line, or the column splits a surrogate pair.
    pub fn offset_of_position(&self, text: &str, position: Position) -> Option<TextSize> {
        let line_start = *self.line_starts.get(position.line as usize)?;
        let line_end = *self.line_ends.get(position.line as usize)?;
        let line_text = text.get(u32::from(line_start) as usize..u32::from(line_end) as usize)?;

        let mut utf16 = 0u32;
        for (byte_idx, ch) in line_text.char_indices() {
            if utf16 == position.character {
                return Some(line_start + TextSize::from(byte_idx as u32));
            }
            utf16 += ch.len_utf16() as u32;
            if utf16 > position.character {
                return None;
            }
        }
        (utf16 == position.character).then_some(line_end)
    }

    pub fn range(&self, text: &str, range: TextRange) -> Range {
        Range::new(
            self.position(text, range.start()),
            self.position(text, range.end()),
        )
    }
}
