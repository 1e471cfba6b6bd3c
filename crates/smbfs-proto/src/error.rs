use thiserror::Error;

/// The full error taxonomy (§7). Every fallible operation in the provider,
/// from path algebra up through the watch service, returns `SmbError`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SmbError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("file system is closed")]
    ClosedFileSystem,

    #[error("channel is closed")]
    ClosedChannel,

    #[error("watch service is closed")]
    ClosedWatchService,

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<smbfs_path::PathError> for SmbError {
    fn from(e: smbfs_path::PathError) -> Self {
        use smbfs_path::PathError;
        match e {
            PathError::InvalidArgument(m) => SmbError::InvalidArgument(m),
            PathError::IndexOutOfRange(m) => SmbError::InvalidArgument(m),
            PathError::DifferentFileSystem => {
                SmbError::InvalidArgument("paths belong to different file systems".to_string())
            }
            PathError::NotAFolder => {
                SmbError::InvalidArgument("operation requires a folder path".to_string())
            }
            PathError::InvalidState(m) => SmbError::InvalidArgument(m),
        }
    }
}

/// Status codes a `SmbCollaborator` implementation may report, mapped onto
/// `SmbError` per §7's mapping guidance. Collaborators that have their own
/// richer status enum should translate into this one at the trait boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmbStatus {
    AccessDenied,
    ObjectNameNotFound,
    ObjectPathNotFound,
    ObjectNameCollision,
    Other,
}

impl SmbStatus {
    /// Map a collaborator status plus a human-readable detail into the
    /// taxonomy, per §7's mapping table.
    pub fn into_error(self, detail: impl Into<String>) -> SmbError {
        let detail = detail.into();
        match self {
            SmbStatus::AccessDenied => SmbError::AccessDenied(detail),
            SmbStatus::ObjectNameNotFound | SmbStatus::ObjectPathNotFound => SmbError::NotFound(detail),
            SmbStatus::ObjectNameCollision => SmbError::AlreadyExists(detail),
            SmbStatus::Other => SmbError::Io(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_denied_maps_to_access_denied() {
        assert_eq!(
            SmbStatus::AccessDenied.into_error("nope"),
            SmbError::AccessDenied("nope".to_string())
        );
    }

    #[test]
    fn not_found_variants_map_to_not_found() {
        assert_eq!(
            SmbStatus::ObjectNameNotFound.into_error("x"),
            SmbError::NotFound("x".to_string())
        );
        assert_eq!(
            SmbStatus::ObjectPathNotFound.into_error("x"),
            SmbError::NotFound("x".to_string())
        );
    }

    #[test]
    fn collision_maps_to_already_exists() {
        assert_eq!(
            SmbStatus::ObjectNameCollision.into_error("x"),
            SmbError::AlreadyExists("x".to_string())
        );
    }

    #[test]
    fn other_maps_to_io() {
        assert_eq!(SmbStatus::Other.into_error("boom"), SmbError::Io("boom".to_string()));
    }
}
