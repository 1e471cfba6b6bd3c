use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use smbfs_path::SmbPath;
use smbfs_proto::{SmbCollaborator, SmbError};
use tokio::runtime::Handle;

use crate::authority::{build_canonical_authority, split_uri, ContextDefaults};
use crate::file_system::FileSystem;
use crate::options::FileSystemOptions;

/// How a registry obtains a collaborator for a freshly canonicalized
/// authority. Kept separate from `FileSystemRegistry` so tests can supply a
/// factory that hands back an in-memory fake instead of dialing out.
pub trait CollaboratorFactory: Send + Sync {
    fn connect(&self, authority: &str, options: &FileSystemOptions) -> Result<Arc<dyn SmbCollaborator>, SmbError>;
}

/// C4: the process-wide map from canonical authority to live `FileSystem`,
/// enforcing at most one handle per authority (§4.4).
pub struct FileSystemRegistry {
    map: DashMap<String, Arc<FileSystem>>,
    factory: Arc<dyn CollaboratorFactory>,
    context_defaults: Option<ContextDefaults>,
    runtime: Handle,
}

impl FileSystemRegistry {
    pub fn new(factory: Arc<dyn CollaboratorFactory>, runtime: Handle) -> Self {
        Self {
            map: DashMap::new(),
            factory,
            context_defaults: None,
            runtime,
        }
    }

    pub fn with_context_defaults(mut self, defaults: ContextDefaults) -> Self {
        self.context_defaults = Some(defaults);
        self
    }

    /// Create a new file system for `uri`'s authority. Errors
    /// `AlreadyExists` if one is already registered (§4.4).
    pub fn new_file_system(&self, uri: &str, options: &FileSystemOptions) -> Result<Arc<FileSystem>, SmbError> {
        let (bare_authority, _) = split_uri(uri)?;
        let authority = build_canonical_authority(&bare_authority, options, self.context_defaults.as_ref());

        match self.map.entry(authority.clone()) {
            Entry::Occupied(_) => Err(SmbError::AlreadyExists(authority)),
            Entry::Vacant(slot) => {
                let collaborator = self.factory.connect(&authority, options)?;
                let handle = FileSystem::new(
                    authority,
                    collaborator,
                    options.watchservice_enabled(),
                    options.poll_interval(),
                    self.runtime.clone(),
                );
                slot.insert(handle.clone());
                Ok(handle)
            }
        }
    }

    /// Look up an already-registered file system by its canonical authority.
    /// Errors `NotFound` if none is registered.
    pub fn get_file_system(&self, authority: &str) -> Result<Arc<FileSystem>, SmbError> {
        self.map
            .get(authority)
            .map(|entry| entry.clone())
            .ok_or_else(|| SmbError::NotFound(authority.to_string()))
    }

    /// `get_file_system`, falling back to `new_file_system` on a miss.
    pub fn get_or_create_file_system(&self, uri: &str, options: &FileSystemOptions) -> Result<Arc<FileSystem>, SmbError> {
        let (bare_authority, _) = split_uri(uri)?;
        let authority = build_canonical_authority(&bare_authority, options, self.context_defaults.as_ref());
        if let Some(entry) = self.map.get(&authority) {
            return Ok(entry.clone());
        }
        match self.new_file_system(uri, options) {
            Ok(handle) => Ok(handle),
            Err(SmbError::AlreadyExists(_)) => self.get_file_system(&authority),
            Err(other) => Err(other),
        }
    }

    /// Resolve `uri` all the way to an `SmbPath`, creating the file system
    /// on first use (supplemented: see SPEC_FULL.md).
    pub fn get_path(&self, uri: &str, options: &FileSystemOptions) -> Result<SmbPath, SmbError> {
        let (_, path_part) = split_uri(uri)?;
        let handle = self.get_or_create_file_system(uri, options)?;
        handle.path(&path_part)
    }

    /// Remove `authority` from the registry. Supplemented symmetric
    /// counterpart to `new_file_system` (see SPEC_FULL.md); the removed
    /// handle's watch service, if started, is closed.
    pub fn close_file_system(&self, authority: &str) -> Result<(), SmbError> {
        match self.map.remove(authority) {
            Some(_) => Ok(()),
            None => Err(SmbError::NotFound(authority.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
