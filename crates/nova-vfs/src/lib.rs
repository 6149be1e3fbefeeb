//! Virtual file system layer for Nova.
//!
//! The VFS is responsible for:
//! - Stable `FileId` allocation and reverse mapping, preserved across moves.
//! - Holding versioned in-memory documents and applying editor edits to them.
//! - Tracking which editors (including split editors) show which file.
//! - Representing file change events consumed by the analysis engines.

mod change;
mod document;
mod file_id;
mod open_documents;
mod path;
mod vfs;

pub use change::{ChangeEvent, ChangeKind, FileChange, FileChangeKind};
pub use document::{ContentChange, Document, DocumentError};
pub use file_id::FileIdRegistry;
pub use nova_core::FileId;
pub use open_documents::{EditorId, OpenDocuments};
pub use path::VfsPath;
pub use vfs::Vfs;
