use thiserror::Error;

/// Errors raised by path construction and algebra.
///
/// This is deliberately narrower than the full `SmbError` taxonomy in
/// `smbfs-proto` (which also covers network and lifecycle failures this
/// crate never sees) but uses the same variant names so callers can map one
/// onto the other without surprise.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("invalid path: {0}")]
    InvalidArgument(String),

    #[error("path index out of range: {0}")]
    IndexOutOfRange(String),

    #[error("paths belong to different file systems")]
    DifferentFileSystem,

    #[error("operation requires a folder path")]
    NotAFolder,

    #[error("invalid state: {0}")]
    InvalidState(String),
}
