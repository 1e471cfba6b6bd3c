//! Attribute views, directory streams, and byte channels over a remote SMB
//! share -- thin adapters over the `SmbCollaborator` trait from
//! `smbfs-proto` (C6, C7, C8).

mod attributes;
mod directory_stream;
mod seekable_channel;

pub use attributes::{set_times, AttributeView, SetTimes};
pub use directory_stream::DirectoryStream;
pub use seekable_channel::SeekableByteChannel;
