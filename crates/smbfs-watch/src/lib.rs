//! Polling-based watch service for a remote SMB share: per-key event
//! coalescing (C10), the background-thread diffing poller (C11), and the
//! signaled-key delivery queue (C12).

mod event;
mod key;
mod poller;
mod service;

pub use event::{EventKind, WatchEvent};
pub use key::{WatchKey, MAX_EVENT_LIST_SIZE};
pub use poller::{Poller, StandardPoller};
pub use service::WatchService;
