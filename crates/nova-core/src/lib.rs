//! Core shared types for Nova.
//!
//! This crate is intentionally small: file ids, text primitives and edit
//! utilities shared by the VFS, the parser and the impact engine.

mod edit;
mod text;

pub use edit::{
    apply_text_edits, normalize_text_edits, EditError, TextDelta, TextEdit, WorkspaceEdit,
};
pub use text::{LineCol, LineIndex, Position, Range, TextRange, TextSize};

/// Stable identifier of a file known to the VFS.
///
/// Ids are allocated densely by `nova_vfs::FileIdRegistry` and survive renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(u32);

impl FileId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn to_raw(self) -> u32 {
        self.0
    }
}

/// Best-effort rendering of a panic payload for logs.
pub fn panic_payload_to_str(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}
