use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use smbfs_proto::SmbError;

use crate::event::EventKind;
use crate::key::WatchKey;
use crate::poller::Poller;

/// C12: the signaled-key delivery queue. Thin by design -- registration
/// delegates straight to the poller; the only state this type owns is the
/// open/closed flag and the channel keys arrive on.
pub struct WatchService {
    poller: Arc<dyn Poller>,
    tx: Sender<Arc<WatchKey>>,
    rx: Receiver<Arc<WatchKey>>,
    closed: AtomicBool,
}

impl WatchService {
    pub fn new(poller: Arc<dyn Poller>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            poller,
            tx,
            rx,
            closed: AtomicBool::new(false),
        }
    }

    pub fn register(&self, path: &str, kinds: &[EventKind]) -> Result<Arc<WatchKey>, SmbError> {
        self.check_open()?;
        self.poller.register(path, kinds, self.tx.clone())
    }

    pub fn cancel(&self, key: &Arc<WatchKey>) -> Result<(), SmbError> {
        self.check_open()?;
        self.poller.cancel(key)
    }

    /// Non-blocking dequeue of one signaled key.
    pub fn poll(&self) -> Result<Option<Arc<WatchKey>>, SmbError> {
        self.check_open()?;
        match self.rx.try_recv() {
            Ok(key) => self.handle_dequeued(key),
            Err(_) => Ok(None),
        }
    }

    /// Dequeue one signaled key, waiting up to `timeout`.
    pub fn poll_timeout(&self, timeout: Duration) -> Result<Option<Arc<WatchKey>>, SmbError> {
        self.check_open()?;
        match self.rx.recv_timeout(timeout) {
            Ok(key) => self.handle_dequeued(key),
            Err(_) => Ok(None),
        }
    }

    /// Blocking dequeue; waits until a key is signaled or the service closes.
    pub fn take(&self) -> Result<Arc<WatchKey>, SmbError> {
        loop {
            self.check_open()?;
            let key = self.rx.recv().map_err(|_| SmbError::ClosedWatchService)?;
            if let Some(key) = self.handle_dequeued(key)? {
                return Ok(key);
            }
        }
    }

    /// Idempotent. Closes the poller, drains pending keys, and injects a
    /// sentinel to wake any blocked `take`/`poll_timeout` callers.
    pub fn close(&self) -> Result<(), SmbError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.poller.close()?;
        while self.rx.try_recv().is_ok() {}
        let _ = self.tx.send(WatchKey::close_sentinel());
        Ok(())
    }

    fn check_open(&self) -> Result<(), SmbError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(SmbError::ClosedWatchService)
        } else {
            Ok(())
        }
    }

    fn handle_dequeued(&self, key: Arc<WatchKey>) -> Result<Option<Arc<WatchKey>>, SmbError> {
        if key.is_sentinel() {
            let _ = self.tx.send(key);
            if self.closed.load(Ordering::SeqCst) {
                return Err(SmbError::ClosedWatchService);
            }
            return Ok(None);
        }
        Ok(Some(key))
    }
}
