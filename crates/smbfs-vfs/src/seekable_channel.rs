use smbfs_proto::{RemoteHandle, SmbError};
use tokio::sync::Mutex;

/// C8: random-access read/write over a remote file.
///
/// The five mutating operations (read/write/seek/set_len/close) are
/// serialized behind a single mutex per §4.7 ("a mutex guarding the handle
/// suffices"); `tokio::sync::Mutex` is used rather than a plain one because
/// the guard is held across the collaborator's async calls.
pub struct SeekableByteChannel {
    inner: Mutex<Inner>,
}

struct Inner {
    handle: Box<dyn RemoteHandle>,
    open: bool,
}

impl SeekableByteChannel {
    pub fn new(handle: Box<dyn RemoteHandle>) -> Self {
        Self {
            inner: Mutex::new(Inner { handle, open: true }),
        }
    }

    pub async fn is_open(&self) -> bool {
        self.inner.lock().await.open
    }

    /// Reads into `buf`, returning the number of bytes read. `Ok(0)` marks
    /// EOF (the `std::io::Read` convention -- see DESIGN.md).
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize, SmbError> {
        let mut guard = self.inner.lock().await;
        if !guard.open {
            return Err(SmbError::ClosedChannel);
        }
        guard.handle.read(buf).await
    }

    /// Writes all of `buf`, retrying short writes until the buffer is
    /// drained. Returns the total number of bytes written.
    pub async fn write(&self, buf: &[u8]) -> Result<usize, SmbError> {
        let mut guard = self.inner.lock().await;
        if !guard.open {
            return Err(SmbError::ClosedChannel);
        }
        let mut written = 0;
        while written < buf.len() {
            let n = guard.handle.write(&buf[written..]).await?;
            if n == 0 {
                break;
            }
            written += n;
        }
        Ok(written)
    }

    pub async fn position(&self) -> Result<u64, SmbError> {
        let guard = self.inner.lock().await;
        if !guard.open {
            return Err(SmbError::ClosedChannel);
        }
        guard.handle.position().await
    }

    pub async fn seek(&self, pos: u64) -> Result<(), SmbError> {
        let mut guard = self.inner.lock().await;
        if !guard.open {
            return Err(SmbError::ClosedChannel);
        }
        guard.handle.seek(pos).await
    }

    pub async fn size(&self) -> Result<u64, SmbError> {
        let guard = self.inner.lock().await;
        if !guard.open {
            return Err(SmbError::ClosedChannel);
        }
        guard.handle.size().await
    }

    pub async fn truncate(&self, len: u64) -> Result<(), SmbError> {
        let mut guard = self.inner.lock().await;
        if !guard.open {
            return Err(SmbError::ClosedChannel);
        }
        guard.handle.set_len(len).await
    }

    pub async fn close(&self) -> Result<(), SmbError> {
        let mut guard = self.inner.lock().await;
        if !guard.open {
            return Ok(());
        }
        guard.handle.close().await?;
        guard.open = false;
        Ok(())
    }
}
