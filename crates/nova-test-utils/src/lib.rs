//! Utilities shared by Nova tests.
//!
//! Fixture-based tests describe small multi-file projects inline (see [`Fixture`]) and mark
//! the interesting offsets and selections directly in the source text.

mod fixtures;

pub use fixtures::{extract_range, trim_indent, Fixture, FixtureFile};
