use nova_core::FileId;
use nova_vfs::{DocumentError, EditorId, VfsPath};
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("unknown file {}", .0.to_raw())]
    UnknownFile(FileId),
    #[error("unknown editor {0:?}")]
    UnknownEditor(EditorId),
    #[error("path already exists: {0}")]
    PathExists(VfsPath),
    #[error("invalid edit: {0}")]
    InvalidEdit(#[from] DocumentError),
}
