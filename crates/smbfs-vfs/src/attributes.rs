use std::sync::Arc;

use chrono::{DateTime, Utc};
use smbfs_proto::{BasicFileAttributes, SmbCollaborator, SmbError};

/// Optional timestamps for `set_times` (§4.5): a `None` field is left
/// untouched on the remote resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetTimes {
    pub last_modified: Option<DateTime<Utc>>,
    pub create_time: Option<DateTime<Utc>>,
}

/// C6: a view over one remote path's basic attributes.
pub struct AttributeView {
    collaborator: Arc<dyn SmbCollaborator>,
    path: String,
}

impl AttributeView {
    pub fn new(collaborator: Arc<dyn SmbCollaborator>, path: impl Into<String>) -> Self {
        Self {
            collaborator,
            path: path.into(),
        }
    }

    /// Read a full snapshot from the collaborator. `last_access_time` is
    /// always reported as the epoch (§4.5: the collaborator does not track
    /// it).
    pub async fn read(&self) -> Result<BasicFileAttributes, SmbError> {
        let creation_time = self.collaborator.create_time(&self.path).await?;
        let last_modified_time = self.collaborator.last_modified(&self.path).await?;
        let size = self.collaborator.length(&self.path).await?;
        let is_directory = self.collaborator.is_directory(&self.path).await?;
        let file_key = self.collaborator.file_key(&self.path).await?;
        Ok(BasicFileAttributes {
            creation_time,
            last_modified_time,
            last_access_time: DateTime::<Utc>::from_timestamp(0, 0).expect("epoch is representable"),
            size,
            is_directory,
            file_key,
        })
    }

    pub async fn set_times(&self, times: SetTimes) -> Result<(), SmbError> {
        set_times(&*self.collaborator, &self.path, times).await
    }
}

/// Free function form of `AttributeView::set_times`, usable without
/// constructing a view first.
pub async fn set_times(collaborator: &dyn SmbCollaborator, path: &str, times: SetTimes) -> Result<(), SmbError> {
    if let Some(at) = times.last_modified {
        collaborator.set_last_modified(path, at).await?;
    }
    if let Some(at) = times.create_time {
        collaborator.set_create_time(path, at).await?;
    }
    Ok(())
}
