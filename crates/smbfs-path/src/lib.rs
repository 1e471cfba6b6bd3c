//! Path algebra for remote SMB/CIFS resources.
//!
//! This crate is the leaf of the workspace: it knows nothing about the
//! network, the registry, or any I/O. It models paths as pure values over a
//! `FileSystemIdentity` back-reference, so a `SmbPath` can be compared and
//! manipulated without ever touching a socket.

mod error;
mod matcher;
mod path;
mod primitives;

pub use error::PathError;
pub use matcher::PathMatcher;
pub use path::{FileSystemIdentity, SmbPath};
pub use primitives::{is_absolute, is_folder, merge, split};
