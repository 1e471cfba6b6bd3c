//! Canonical-authority construction (C3), the file-system registry (C4),
//! and the `FileSystem` handle (C5) that ties a remote share's collaborator
//! to paths, attribute views, byte channels, and an optional watch service.

mod authority;
mod file_system;
mod options;
mod registry;

pub use authority::{build_canonical_authority, decode_authority, split_uri, ContextDefaults, Credentials};
pub use file_system::FileSystem;
pub use options::{FileSystemOptions, FileSystemOptionsBuilder, PASSTHROUGH_PREFIX};
pub use registry::{CollaboratorFactory, FileSystemRegistry};
