//! Lightweight Java syntax layer.
//!
//! The parser accepts the subset of Java the impact engine reasons about and
//! never fails: malformed input yields a best-effort tree with
//! [`ast::Expr::Missing`] placeholders, plus the set of identifiers seen by the
//! lexer so callers can build word indexes without re-lexing.

use std::collections::BTreeSet;
use std::fmt;

use text_size::{TextRange, TextSize};

pub mod ast;
mod lexer;
mod parser;

pub use lexer::{lex, Token, TokenKind};

/// Byte range into a source text.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn contains_span(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Overlap test that also treats touching empty ranges as intersecting.
    pub fn intersects(&self, other: Span) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn to_text_range(self) -> TextRange {
        TextRange::new(to_text_size(self.start), to_text_size(self.end.max(self.start)))
    }
}

impl From<TextRange> for Span {
    fn from(range: TextRange) -> Self {
        Span::new(u32::from(range.start()) as usize, u32::from(range.end()) as usize)
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({}..{})", self.start, self.end)
    }
}

fn to_text_size(offset: usize) -> TextSize {
    TextSize::from(u32::try_from(offset).unwrap_or(u32::MAX))
}

/// Result of [`parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parse {
    unit: ast::CompilationUnit,
    identifiers: BTreeSet<String>,
}

impl Parse {
    pub fn compilation_unit(&self) -> &ast::CompilationUnit {
        &self.unit
    }

    pub fn into_compilation_unit(self) -> ast::CompilationUnit {
        self.unit
    }

    /// Every identifier token in the file, keywords included.
    pub fn identifiers(&self) -> &BTreeSet<String> {
        &self.identifiers
    }

    pub fn into_parts(self) -> (ast::CompilationUnit, BTreeSet<String>) {
        (self.unit, self.identifiers)
    }
}

pub fn parse(text: &str) -> Parse {
    let tokens = lex(text);
    let identifiers = tokens
        .iter()
        .filter(|token| token.kind == TokenKind::Ident)
        .map(|token| token.text.clone())
        .collect();
    let unit = parser::Parser::new(tokens, text.len()).parse_compilation_unit();
    tracing::trace!(
        target: "nova.syntax",
        types = unit.types.len(),
        imports = unit.imports.len(),
        "parsed compilation unit"
    );
    Parse { unit, identifiers }
}
