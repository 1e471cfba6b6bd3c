use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender};
use smbfs_proto::{SmbCollaborator, SmbError};
use tokio::runtime::Handle;

use crate::event::{sort_for_delivery, EventKind};
use crate::key::WatchKey;

/// The control-plane messages a `StandardPoller`'s worker thread drains in
/// FIFO order (§4.10). Each carries a one-shot reply channel the caller
/// blocks on.
enum Request {
    Register {
        path: String,
        kinds: Vec<EventKind>,
        signal_sender: Sender<Arc<WatchKey>>,
        reply: Sender<Result<Arc<WatchKey>, SmbError>>,
    },
    Cancel {
        path: String,
        reply: Sender<Result<(), SmbError>>,
    },
    Close {
        reply: Sender<()>,
    },
}

/// Abstract poller interface; `StandardPoller` is the only implementation
/// shipped, but the split mirrors §2's "Poller (abstract + standard)" and
/// lets tests substitute a poller that ticks on demand instead of a timer.
pub trait Poller: Send + Sync {
    fn register(
        &self,
        path: &str,
        kinds: &[EventKind],
        signal_sender: Sender<Arc<WatchKey>>,
    ) -> Result<Arc<WatchKey>, SmbError>;
    fn cancel(&self, key: &Arc<WatchKey>) -> Result<(), SmbError>;
    fn close(&self) -> Result<(), SmbError>;
}

fn join_child(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{name}")
    } else {
        format!("{parent}/{name}")
    }
}

struct WorkerState {
    registry: HashMap<String, Arc<WatchKey>>,
    last_modified: HashMap<String, DateTime<Utc>>,
    dir_children: HashMap<String, HashSet<String>>,
}

/// C11: the periodic-diffing poller. Owns a dedicated worker thread that
/// drains the request queue, then polls, then sleeps, in a loop.
pub struct StandardPoller {
    request_tx: Sender<Request>,
    shutdown: Arc<AtomicBool>,
    worker: StdMutex<Option<JoinHandle<()>>>,
}

impl StandardPoller {
    /// `runtime` is used to drive the async `SmbCollaborator` calls from
    /// the dedicated worker thread via `Handle::block_on`.
    pub fn spawn(collaborator: Arc<dyn SmbCollaborator>, poll_interval: Duration, runtime: Handle) -> Arc<Self> {
        let (request_tx, request_rx) = bounded::<Request>(256);
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker_shutdown = shutdown.clone();
        let handle = std::thread::Builder::new()
            .name("smbfs-poller".to_string())
            .spawn(move || {
                run_worker(collaborator, runtime, poll_interval, request_rx, worker_shutdown);
            })
            .expect("failed to spawn poller worker thread");

        Arc::new(Self {
            request_tx,
            shutdown,
            worker: StdMutex::new(Some(handle)),
        })
    }
}

impl Poller for StandardPoller {
    fn register(
        &self,
        path: &str,
        kinds: &[EventKind],
        signal_sender: Sender<Arc<WatchKey>>,
    ) -> Result<Arc<WatchKey>, SmbError> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(SmbError::ClosedWatchService);
        }
        if kinds.is_empty() {
            return Err(SmbError::Unsupported(
                "watch registration requires at least one event kind".to_string(),
            ));
        }
        let (reply_tx, reply_rx) = bounded(1);
        let req = Request::Register {
            path: path.to_string(),
            kinds: kinds.to_vec(),
            signal_sender,
            reply: reply_tx,
        };
        self.request_tx
            .send(req)
            .map_err(|_| SmbError::ClosedWatchService)?;
        reply_rx.recv().map_err(|_| SmbError::ClosedWatchService)?
    }

    fn cancel(&self, key: &Arc<WatchKey>) -> Result<(), SmbError> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(SmbError::ClosedWatchService);
        }
        let (reply_tx, reply_rx) = bounded(1);
        let req = Request::Cancel {
            path: key.path().to_string(),
            reply: reply_tx,
        };
        self.request_tx
            .send(req)
            .map_err(|_| SmbError::ClosedWatchService)?;
        reply_rx.recv().map_err(|_| SmbError::ClosedWatchService)?
    }

    fn close(&self) -> Result<(), SmbError> {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let (reply_tx, reply_rx) = bounded(1);
        if self.request_tx.send(Request::Close { reply: reply_tx }).is_ok() {
            let _ = reply_rx.recv();
        }
        if let Some(handle) = self.worker.lock().unwrap().take() {
            let _ = handle.join();
        }
        Ok(())
    }
}

impl Drop for StandardPoller {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn run_worker(
    collaborator: Arc<dyn SmbCollaborator>,
    runtime: Handle,
    poll_interval: Duration,
    request_rx: Receiver<Request>,
    shutdown: Arc<AtomicBool>,
) {
    let mut state = WorkerState {
        registry: HashMap::new(),
        last_modified: HashMap::new(),
        dir_children: HashMap::new(),
    };

    loop {
        let mut closing = false;
        while let Ok(req) = request_rx.try_recv() {
            match req {
                Request::Register {
                    path,
                    kinds,
                    signal_sender,
                    reply,
                } => {
                    let result = handle_register(&collaborator, &runtime, &mut state, path, kinds, signal_sender);
                    let _ = reply.send(result);
                }
                Request::Cancel { path, reply } => {
                    if let Some(key) = state.registry.remove(&path) {
                        key.invalidate();
                    }
                    state.last_modified.remove(&path);
                    state.dir_children.remove(&path);
                    let _ = reply.send(Ok(()));
                }
                Request::Close { reply } => {
                    closing = true;
                    for key in state.registry.values() {
                        key.invalidate();
                    }
                    state.registry.clear();
                    state.last_modified.clear();
                    state.dir_children.clear();
                    let _ = reply.send(());
                }
            }
        }

        if closing || shutdown.load(Ordering::SeqCst) {
            return;
        }

        poll_once(&collaborator, &runtime, &mut state);

        // Sleep in small slices so a Close request is noticed promptly
        // rather than only after a full poll_interval.
        let step = Duration::from_millis(50).min(poll_interval);
        let mut slept = Duration::ZERO;
        while slept < poll_interval {
            if shutdown.load(Ordering::SeqCst) || !request_rx.is_empty() {
                break;
            }
            std::thread::sleep(step);
            slept += step;
        }
    }
}

fn handle_register(
    collaborator: &Arc<dyn SmbCollaborator>,
    runtime: &Handle,
    state: &mut WorkerState,
    path: String,
    kinds: Vec<EventKind>,
    signal_sender: Sender<Arc<WatchKey>>,
) -> Result<Arc<WatchKey>, SmbError> {
    let exists = runtime.block_on(collaborator.exists(&path))?;
    if !exists {
        return Err(SmbError::NotFound(path));
    }
    let modified = runtime.block_on(collaborator.last_modified(&path))?;
    let is_dir = runtime.block_on(collaborator.is_directory(&path))?;

    if is_dir {
        let children = runtime.block_on(collaborator.list_children_names(&path))?;
        let names: HashSet<String> = children.iter().map(|c| join_child(&path, &c.name)).collect();
        state.dir_children.insert(path.clone(), names);
    }

    let key = WatchKey::new(path.clone(), kinds, signal_sender);
    state.last_modified.insert(path.clone(), modified);
    state.registry.insert(path, key.clone());
    Ok(key)
}

fn poll_once(collaborator: &Arc<dyn SmbCollaborator>, runtime: &Handle, state: &mut WorkerState) {
    let paths: Vec<String> = state.registry.keys().cloned().collect();
    for path in paths {
        let Some(key) = state.registry.get(&path).cloned() else {
            continue;
        };
        if !key.is_valid() {
            continue;
        }

        let exists = match runtime.block_on(collaborator.exists(&path)) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(%path, error = %e, "poller: exists check failed, skipping this pass");
                continue;
            }
        };
        if !exists {
            key.signal_event(EventKind::Delete, Some(path.clone()));
            state.registry.remove(&path);
            state.last_modified.remove(&path);
            state.dir_children.remove(&path);
            continue;
        }

        let modified = match runtime.block_on(collaborator.last_modified(&path)) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(%path, error = %e, "poller: last_modified failed, skipping this pass");
                continue;
            }
        };
        let cached = state.last_modified.get(&path).copied();
        if cached.map(|c| modified <= c).unwrap_or(false) {
            continue;
        }
        state.last_modified.insert(path.clone(), modified);

        let is_dir = match runtime.block_on(collaborator.is_directory(&path)) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(%path, error = %e, "poller: is_directory failed, skipping this pass");
                continue;
            }
        };

        if is_dir {
            diff_directory(collaborator, runtime, state, &path, &key);
        } else {
            key.signal_event(EventKind::Modify, Some(path.clone()));
        }
    }
}

fn diff_directory(
    collaborator: &Arc<dyn SmbCollaborator>,
    runtime: &Handle,
    state: &mut WorkerState,
    path: &str,
    key: &Arc<WatchKey>,
) {
    let children = match runtime.block_on(collaborator.list_children_names(path)) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(path, error = %e, "poller: list_children_names failed, skipping this pass");
            return;
        }
    };
    let current: HashSet<String> = children.iter().map(|c| join_child(path, &c.name)).collect();
    let previous = state.dir_children.entry(path.to_string()).or_default();

    let removed: Vec<String> = previous.difference(&current).cloned().collect();
    let added: Vec<String> = current.difference(previous).cloned().collect();

    let mut batch: Vec<(EventKind, String)> = Vec::new();
    for child in &removed {
        let suppressed = state.registry.contains_key(child);
        previous.remove(child);
        if !suppressed {
            batch.push((EventKind::Delete, child.clone()));
        }
    }
    for child in &added {
        previous.insert(child.clone());
        batch.push((EventKind::Create, child.clone()));
    }

    let mut ranked: Vec<WatchBatchEntry> = batch
        .into_iter()
        .map(|(kind, context)| WatchBatchEntry { kind, context })
        .collect();
    sort_batch(&mut ranked);
    for entry in ranked {
        key.signal_event(entry.kind, Some(entry.context));
    }
}

struct WatchBatchEntry {
    kind: EventKind,
    context: String,
}

fn sort_batch(batch: &mut [WatchBatchEntry]) {
    let mut as_events: Vec<_> = batch
        .iter()
        .map(|e| crate::event::WatchEvent::new(e.kind, Some(e.context.clone())))
        .collect();
    sort_for_delivery(&mut as_events);
    for (slot, sorted) in batch.iter_mut().zip(as_events.iter()) {
        slot.kind = sorted.kind;
        slot.context = sorted.context.clone().unwrap_or_default();
    }
}
