use chrono::{DateTime, Utc};

/// §4.5 basic file attributes snapshot, as reported by the collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicFileAttributes {
    pub creation_time: DateTime<Utc>,
    pub last_modified_time: DateTime<Utc>,
    /// Reported as the epoch when the collaborator does not track it.
    pub last_access_time: DateTime<Utc>,
    pub size: u64,
    pub is_directory: bool,
    /// A stable handle identifier (e.g. a content hash); used by callers as
    /// a `file_key`.
    pub file_key: Option<String>,
}

impl BasicFileAttributes {
    /// Symbolic links are never reported by this provider (non-goal).
    pub fn is_symbolic_link(&self) -> bool {
        false
    }

    /// Nothing other than regular files and directories is ever reported.
    pub fn is_other(&self) -> bool {
        false
    }
}

/// One entry returned by `SmbCollaborator::list_children_names`, paired
/// with enough metadata for the poller to diff without a second round
/// trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub is_directory: bool,
}
