use std::sync::Arc;

use smbfs_proto::{RemoteEntry, SmbCollaborator, SmbError};

/// C7: an eager, filtered, one-shot iteration over a directory's children.
///
/// Construction enumerates the directory immediately (not lazily) per
/// §4.6; `into_entries` may only be called once.
pub struct DirectoryStream {
    entries: Vec<RemoteEntry>,
    consumed: bool,
    closed: bool,
}

impl DirectoryStream {
    /// Verify `path` is a directory, list it, and apply `predicate`.
    pub async fn open<F>(
        collaborator: &Arc<dyn SmbCollaborator>,
        path: &str,
        predicate: F,
    ) -> Result<Self, SmbError>
    where
        F: Fn(&RemoteEntry) -> bool,
    {
        if !collaborator.is_directory(path).await? {
            return Err(SmbError::NotADirectory(path.to_string()));
        }
        let all = collaborator.list_children_names(path).await?;
        let entries = all.into_iter().filter(predicate).collect();
        Ok(Self {
            entries,
            consumed: false,
            closed: false,
        })
    }

    /// Consume the stream, returning its (already filtered) entries.
    /// Fails if this is not the first call, or if the stream was closed.
    pub fn into_entries(mut self) -> Result<Vec<RemoteEntry>, SmbError> {
        if self.closed {
            return Err(SmbError::InvalidArgument(
                "directory stream is closed".to_string(),
            ));
        }
        if self.consumed {
            return Err(SmbError::InvalidArgument(
                "directory stream may only be iterated once".to_string(),
            ));
        }
        self.consumed = true;
        Ok(std::mem::take(&mut self.entries))
    }

    pub fn close(&mut self) {
        self.closed = true;
    }
}
