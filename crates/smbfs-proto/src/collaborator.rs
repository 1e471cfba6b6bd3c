use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SmbError;
use crate::metadata::RemoteEntry;

/// One flag requested when opening a byte channel. Covers both the
/// honored set (§4.4) and the explicitly unsupported set, so a single enum
/// at the API boundary can reject the latter uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenFlag {
    Read,
    Write,
    Create,
    CreateNew,
    Append,
    TruncateExisting,
    Sync,
    Dsync,
    Sparse,
    DeleteOnClose,
}

/// Validated open options for a `SeekableByteChannel` (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenOptions {
    pub read: bool,
    pub write: bool,
    pub create: bool,
    pub create_new: bool,
    pub append: bool,
    pub truncate_existing: bool,
}

impl OpenOptions {
    /// Build from a flag set, rejecting SYNC/DSYNC/SPARSE/DELETE_ON_CLOSE
    /// with `Unsupported` per §4.4.
    pub fn from_flags(flags: &[OpenFlag]) -> Result<Self, SmbError> {
        let mut out = OpenOptions::default();
        for flag in flags {
            match flag {
                OpenFlag::Read => out.read = true,
                OpenFlag::Write => out.write = true,
                OpenFlag::Create => out.create = true,
                OpenFlag::CreateNew => out.create_new = true,
                OpenFlag::Append => out.append = true,
                OpenFlag::TruncateExisting => out.truncate_existing = true,
                OpenFlag::Sync | OpenFlag::Dsync | OpenFlag::Sparse | OpenFlag::DeleteOnClose => {
                    return Err(SmbError::Unsupported(format!("open option {flag:?} is not supported")));
                }
            }
        }
        Ok(out)
    }
}

/// Copy options (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CopyOptions {
    pub replace_existing: bool,
    pub copy_attributes: bool,
}

/// An open remote random-access handle. Implementations are expected to be
/// driven from behind a mutex by the owning `SeekableByteChannel` (§4.7) --
/// this trait itself makes no concurrency claims.
#[async_trait]
pub trait RemoteHandle: Send + Sync {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, SmbError>;
    async fn write(&mut self, buf: &[u8]) -> Result<usize, SmbError>;
    async fn seek(&mut self, pos: u64) -> Result<(), SmbError>;
    async fn position(&self) -> Result<u64, SmbError>;
    async fn size(&self) -> Result<u64, SmbError>;
    async fn set_len(&mut self, len: u64) -> Result<(), SmbError>;
    async fn close(&mut self) -> Result<(), SmbError>;
}

/// The narrow interface the provider core consumes (§6). Everything about
/// actually speaking SMB -- authentication, framing, retries -- lives on
/// the other side of this trait.
#[async_trait]
pub trait SmbCollaborator: Send + Sync {
    async fn exists(&self, path: &str) -> Result<bool, SmbError>;
    async fn is_directory(&self, path: &str) -> Result<bool, SmbError>;
    async fn is_hidden(&self, path: &str) -> Result<bool, SmbError>;
    async fn can_read(&self, path: &str) -> Result<bool, SmbError>;
    async fn can_write(&self, path: &str) -> Result<bool, SmbError>;
    async fn length(&self, path: &str) -> Result<u64, SmbError>;
    async fn last_modified(&self, path: &str) -> Result<DateTime<Utc>, SmbError>;
    async fn create_time(&self, path: &str) -> Result<DateTime<Utc>, SmbError>;
    async fn attributes_bitfield(&self, path: &str) -> Result<u32, SmbError>;
    /// A stable per-file identifier (§4.5's `file_key`), e.g. a content
    /// hash or an inode-like handle id. Distinct files and directories must
    /// never share a key.
    async fn file_key(&self, path: &str) -> Result<Option<String>, SmbError>;
    async fn disk_free_space(&self, path: &str) -> Result<u64, SmbError>;
    async fn list_children_names(&self, path: &str) -> Result<Vec<RemoteEntry>, SmbError>;

    async fn mkdir(&self, path: &str) -> Result<(), SmbError>;
    async fn delete(&self, path: &str) -> Result<(), SmbError>;
    async fn copy_to(&self, source: &str, target: &str, options: CopyOptions) -> Result<(), SmbError>;
    async fn rename_to(&self, source: &str, target: &str, replace_existing: bool) -> Result<(), SmbError>;
    async fn create_new_file(&self, path: &str) -> Result<(), SmbError>;
    async fn set_last_modified(&self, path: &str, at: DateTime<Utc>) -> Result<(), SmbError>;
    async fn set_create_time(&self, path: &str, at: DateTime<Utc>) -> Result<(), SmbError>;

    async fn open(&self, path: &str, options: OpenOptions) -> Result<Box<dyn RemoteHandle>, SmbError>;
}
