use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use parking_lot::Mutex;

use crate::event::{EventKind, WatchEvent};

/// §4.9: the bound on a key's pending event buffer. The 513th event to a
/// key whose buffer is already full collapses the buffer to a single
/// OVERFLOW event.
pub const MAX_EVENT_LIST_SIZE: usize = 512;

struct KeyState {
    signalled: bool,
    events: Vec<WatchEvent>,
    last_modify: HashMap<String, usize>,
}

/// C10: a per-registration event queue with coalescing and overflow.
pub struct WatchKey {
    path: String,
    kinds: Vec<EventKind>,
    sentinel: bool,
    valid: AtomicBool,
    state: Mutex<KeyState>,
    signal_sender: Option<Sender<Arc<WatchKey>>>,
}

impl WatchKey {
    pub(crate) fn new(path: String, kinds: Vec<EventKind>, signal_sender: Sender<Arc<WatchKey>>) -> Arc<Self> {
        Arc::new(Self {
            path,
            kinds,
            sentinel: false,
            valid: AtomicBool::new(true),
            state: Mutex::new(KeyState {
                signalled: false,
                events: Vec::new(),
                last_modify: HashMap::new(),
            }),
            signal_sender: Some(signal_sender),
        })
    }

    /// A distinguished key used to wake blocked `WatchService` consumers on
    /// close (§4.11). Consumers must re-enqueue it once observed.
    pub(crate) fn close_sentinel() -> Arc<Self> {
        Arc::new(Self {
            path: String::new(),
            kinds: Vec::new(),
            sentinel: true,
            valid: AtomicBool::new(false),
            state: Mutex::new(KeyState {
                signalled: false,
                events: Vec::new(),
                last_modify: HashMap::new(),
            }),
            signal_sender: None,
        })
    }

    pub fn is_sentinel(&self) -> bool {
        self.sentinel
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kinds(&self) -> &[EventKind] {
        &self.kinds
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    pub(crate) fn invalidate(&self) {
        self.valid.store(false, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub(crate) fn event_count(&self) -> usize {
        self.state.lock().events.len()
    }

    /// Queue `kind` against `context` under the coalescing rules of §4.9.
    /// Kinds the key was not registered for are dropped silently, except
    /// OVERFLOW which always applies.
    pub(crate) fn signal_event(self: &Arc<Self>, kind: EventKind, context: Option<String>) {
        if self.sentinel {
            return;
        }
        if kind != EventKind::Overflow && !self.kinds.contains(&kind) {
            return;
        }

        let mut state = self.state.lock();
        let mut handled = false;

        if let Some(tail) = state.events.last_mut() {
            if tail.kind == EventKind::Overflow {
                tail.count += 1;
                handled = true;
            } else if tail.kind == kind && tail.context == context {
                tail.count += 1;
                handled = true;
            }
        }

        if !handled && kind == EventKind::Modify {
            if let Some(ctx) = &context {
                if let Some(&idx) = state.last_modify.get(ctx) {
                    state.events[idx].count += 1;
                    handled = true;
                }
            }
        }

        if !handled && kind != EventKind::Modify {
            if let Some(ctx) = &context {
                state.last_modify.remove(ctx);
            }
        }

        if !handled {
            if state.events.len() >= MAX_EVENT_LIST_SIZE {
                state.events.clear();
                state.last_modify.clear();
                state.events.push(WatchEvent::new(EventKind::Overflow, None));
            } else {
                let idx = state.events.len();
                state.events.push(WatchEvent::new(kind, context.clone()));
                if kind == EventKind::Modify {
                    if let Some(ctx) = context {
                        state.last_modify.insert(ctx, idx);
                    }
                }
            }
        }

        let became_signalled = !state.signalled;
        state.signalled = true;
        drop(state);

        if became_signalled {
            self.enqueue_signal();
        }
    }

    /// Swap the event buffer out, returning the snapshot (§4.9 `poll_events`).
    pub fn poll_events(&self) -> Vec<WatchEvent> {
        let mut state = self.state.lock();
        state.last_modify.clear();
        std::mem::take(&mut state.events)
    }

    /// Transition SIGNALLED -> READY if the buffer is empty; otherwise
    /// re-enqueue the key so it is delivered again. Returns `true` iff the
    /// key went back to READY.
    pub fn reset(self: &Arc<Self>) -> bool {
        let went_ready = {
            let mut state = self.state.lock();
            if state.events.is_empty() {
                state.signalled = false;
                true
            } else {
                false
            }
        };
        if !went_ready {
            self.enqueue_signal();
        }
        went_ready
    }

    fn enqueue_signal(self: &Arc<Self>) {
        if let Some(sender) = &self.signal_sender {
            let _ = sender.send(self.clone());
        }
    }
}
