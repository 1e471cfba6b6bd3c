use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use smbfs_path::{FileSystemIdentity, PathMatcher, SmbPath};
use smbfs_proto::{CopyOptions, OpenOptions, SmbCollaborator, SmbError};
use smbfs_vfs::{AttributeView, DirectoryStream, SeekableByteChannel};
use smbfs_watch::{StandardPoller, WatchService};
use tokio::runtime::Handle;

/// C5: a live handle onto one remote share, keyed by its canonical
/// authority in the `FileSystemRegistry`. `open` is simply "present in the
/// registry" -- this type has no separate open/closed flag of its own.
pub struct FileSystem {
    identifier: String,
    collaborator: Arc<dyn SmbCollaborator>,
    watchservice_enabled: bool,
    poll_interval: Duration,
    watch_service: Mutex<Option<Arc<WatchService>>>,
    runtime: Handle,
}

impl FileSystemIdentity for FileSystem {
    fn authority(&self) -> &str {
        &self.identifier
    }
}

impl FileSystem {
    pub(crate) fn new(
        identifier: String,
        collaborator: Arc<dyn SmbCollaborator>,
        watchservice_enabled: bool,
        poll_interval: Duration,
        runtime: Handle,
    ) -> Arc<Self> {
        Arc::new(Self {
            identifier,
            collaborator,
            watchservice_enabled,
            poll_interval,
            watch_service: Mutex::new(None),
            runtime,
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn collaborator(&self) -> &Arc<dyn SmbCollaborator> {
        &self.collaborator
    }

    /// Build a path on this file system (C2).
    pub fn path(self: &Arc<Self>, s: &str) -> Result<SmbPath, SmbError> {
        let identity: Arc<dyn FileSystemIdentity + Send + Sync> = self.clone();
        Ok(SmbPath::parse(identity, s)?)
    }

    /// Lazily start the poller's worker thread on first call. Fails with
    /// `Unsupported` if `smb.watchservice.enabled` was not set at
    /// construction (see SPEC_FULL.md's supplemented-features section).
    pub fn watch_service(self: &Arc<Self>) -> Result<Arc<WatchService>, SmbError> {
        if !self.watchservice_enabled {
            return Err(SmbError::Unsupported(
                "watch service was not enabled for this file system".to_string(),
            ));
        }
        let mut guard = self.watch_service.lock();
        if let Some(existing) = guard.as_ref() {
            return Ok(existing.clone());
        }
        tracing::info!(authority = %self.identifier, "starting watch poller");
        let poller = StandardPoller::spawn(self.collaborator.clone(), self.poll_interval, self.runtime.clone());
        let service = Arc::new(WatchService::new(poller));
        *guard = Some(service.clone());
        Ok(service)
    }

    pub async fn open_directory_stream<F>(&self, path: &str, predicate: F) -> Result<DirectoryStream, SmbError>
    where
        F: Fn(&smbfs_proto::RemoteEntry) -> bool,
    {
        DirectoryStream::open(&self.collaborator, path, predicate).await
    }

    /// Directory listing filtered by a C9 `PathMatcher` against each
    /// child's full path, rather than the raw-entry predicate
    /// `open_directory_stream` takes.
    pub async fn open_directory_stream_matching(
        self: &Arc<Self>,
        path: &str,
        matcher: &PathMatcher,
    ) -> Result<DirectoryStream, SmbError> {
        let base = path.trim_end_matches('/').to_string();
        DirectoryStream::open(&self.collaborator, path, |entry| {
            let child = format!("{base}/{}", entry.name);
            self.path(&child).map(|p| matcher.matches(&p)).unwrap_or(false)
        })
        .await
    }

    pub fn attribute_view(&self, path: &str) -> AttributeView {
        AttributeView::new(self.collaborator.clone(), path)
    }

    pub async fn open_channel(&self, path: &str, options: OpenOptions) -> Result<SeekableByteChannel, SmbError> {
        let handle = self.collaborator.open(path, options).await?;
        Ok(SeekableByteChannel::new(handle))
    }

    pub async fn mkdir(&self, path: &str) -> Result<(), SmbError> {
        self.collaborator.mkdir(path).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), SmbError> {
        self.collaborator.delete(path).await
    }

    pub async fn copy(&self, source: &str, target: &str, options: CopyOptions) -> Result<(), SmbError> {
        if !options.replace_existing && self.collaborator.exists(target).await? {
            return Err(SmbError::AlreadyExists(target.to_string()));
        }
        self.collaborator.copy_to(source, target, options).await
    }

    pub async fn rename(&self, source: &str, target: &str, replace_existing: bool) -> Result<(), SmbError> {
        if !replace_existing && self.collaborator.exists(target).await? {
            return Err(SmbError::AlreadyExists(target.to_string()));
        }
        self.collaborator.rename_to(source, target, replace_existing).await
    }

    pub async fn is_same_file(&self, a: &str, b: &str) -> Result<bool, SmbError> {
        if a == b {
            return Ok(true);
        }
        let view_a = self.attribute_view(a).read().await?;
        let view_b = self.attribute_view(b).read().await?;
        Ok(view_a.file_key.is_some() && view_a.file_key == view_b.file_key)
    }

    pub async fn is_hidden(&self, path: &str) -> Result<bool, SmbError> {
        self.collaborator.is_hidden(path).await
    }

    pub async fn check_access(&self, path: &str, need_read: bool, need_write: bool) -> Result<(), SmbError> {
        if need_read && !self.collaborator.can_read(path).await? {
            return Err(SmbError::AccessDenied(path.to_string()));
        }
        if need_write && !self.collaborator.can_write(path).await? {
            return Err(SmbError::AccessDenied(path.to_string()));
        }
        Ok(())
    }

    /// Per §4.4: generic attribute setters and file-store queries are not
    /// supported.
    pub fn get_file_store(&self) -> Result<(), SmbError> {
        Err(SmbError::Unsupported("file store queries are not supported".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smbfs_testkit::FakeCollaborator;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap()
    }

    fn fs(enabled: bool, rt: &tokio::runtime::Runtime) -> Arc<FileSystem> {
        FileSystem::new(
            "host".to_string(),
            Arc::new(FakeCollaborator::new()),
            enabled,
            Duration::from_millis(20),
            rt.handle().clone(),
        )
    }

    #[test]
    fn path_is_tied_to_this_file_system() {
        let rt = runtime();
        let a = fs(false, &rt);
        let b = fs(false, &rt);
        assert_ne!(a.path("/x").unwrap(), b.path("/x").unwrap());
        assert_eq!(a.path("/x").unwrap(), a.path("/x").unwrap());
    }

    #[test]
    fn watch_service_errors_when_not_enabled() {
        let rt = runtime();
        let handle = fs(false, &rt);
        assert!(matches!(handle.watch_service(), Err(SmbError::Unsupported(_))));
    }

    #[test]
    fn watch_service_is_lazily_started_once() {
        let rt = runtime();
        let handle = fs(true, &rt);
        let a = handle.watch_service().unwrap();
        let b = handle.watch_service().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        a.close().unwrap();
    }

    #[tokio::test]
    async fn mkdir_and_open_roundtrip() {
        let rt = tokio::runtime::Handle::current();
        let handle = FileSystem::new(
            "host".to_string(),
            Arc::new(FakeCollaborator::new()),
            false,
            Duration::from_secs(30),
            rt,
        );
        handle.mkdir("/dir").await.unwrap();
        let opts = OpenOptions::from_flags(&[
            smbfs_proto::OpenFlag::Read,
            smbfs_proto::OpenFlag::Write,
            smbfs_proto::OpenFlag::Create,
        ])
        .unwrap();
        let channel = handle.open_channel("/dir/a.txt", opts).await.unwrap();
        channel.write(b"hi").await.unwrap();
        assert_eq!(channel.size().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn is_same_file_trivially_true_for_identical_path() {
        let rt = tokio::runtime::Handle::current();
        let handle = FileSystem::new(
            "host".to_string(),
            Arc::new(FakeCollaborator::new()),
            false,
            Duration::from_secs(30),
            rt,
        );
        handle.collaborator().create_new_file("/a.txt").await.unwrap();
        assert!(handle.is_same_file("/a.txt", "/a.txt").await.unwrap());
    }

    #[tokio::test]
    async fn is_same_file_false_for_two_distinct_ordinary_files() {
        let rt = tokio::runtime::Handle::current();
        let handle = FileSystem::new(
            "host".to_string(),
            Arc::new(FakeCollaborator::new()),
            false,
            Duration::from_secs(30),
            rt,
        );
        handle.collaborator().create_new_file("/a.txt").await.unwrap();
        handle.collaborator().create_new_file("/b.txt").await.unwrap();
        assert!(!handle.is_same_file("/a.txt", "/b.txt").await.unwrap());
    }

    #[tokio::test]
    async fn is_same_file_false_for_two_distinct_directories() {
        let rt = tokio::runtime::Handle::current();
        let handle = FileSystem::new(
            "host".to_string(),
            Arc::new(FakeCollaborator::new()),
            false,
            Duration::from_secs(30),
            rt,
        );
        handle.mkdir("/dir_a").await.unwrap();
        handle.mkdir("/dir_b").await.unwrap();
        assert!(!handle.is_same_file("/dir_a", "/dir_b").await.unwrap());
    }

    #[tokio::test]
    async fn is_same_file_false_for_two_distinct_hidden_files() {
        let rt = tokio::runtime::Handle::current();
        let fake = Arc::new(FakeCollaborator::new());
        let handle = FileSystem::new("host".to_string(), fake.clone(), false, Duration::from_secs(30), rt);
        fake.create_new_file("/a.hidden").await.unwrap();
        fake.create_new_file("/b.hidden").await.unwrap();
        fake.set_hidden("/a.hidden", true).await.unwrap();
        fake.set_hidden("/b.hidden", true).await.unwrap();
        assert!(!handle.is_same_file("/a.hidden", "/b.hidden").await.unwrap());
    }

    #[tokio::test]
    async fn open_directory_stream_matching_filters_by_glob() {
        let rt = tokio::runtime::Handle::current();
        let handle = FileSystem::new(
            "host".to_string(),
            Arc::new(FakeCollaborator::new()),
            false,
            Duration::from_secs(30),
            rt,
        );
        handle.mkdir("/dir").await.unwrap();
        handle.collaborator().create_new_file("/dir/a.txt").await.unwrap();
        handle.collaborator().create_new_file("/dir/b.log").await.unwrap();
        let matcher = PathMatcher::new("glob:/dir/*.txt").unwrap();
        let stream = handle.open_directory_stream_matching("/dir", &matcher).await.unwrap();
        let entries = stream.into_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a.txt");
    }

    #[tokio::test]
    async fn copy_without_replace_existing_fails_on_collision() {
        let rt = tokio::runtime::Handle::current();
        let handle = FileSystem::new(
            "host".to_string(),
            Arc::new(FakeCollaborator::new()),
            false,
            Duration::from_secs(30),
            rt,
        );
        handle.collaborator().create_new_file("/a.txt").await.unwrap();
        handle.collaborator().create_new_file("/b.txt").await.unwrap();
        let result = handle.copy("/a.txt", "/b.txt", CopyOptions::default()).await;
        assert!(matches!(result, Err(SmbError::AlreadyExists(_))));
    }
}
