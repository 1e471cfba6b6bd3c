/// Event kinds a `WatchKey` may be registered for (§4.10 REGISTER).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Create,
    Modify,
    Delete,
    Overflow,
}

impl EventKind {
    /// Sort rank used to order events collected in a single poll pass:
    /// DELETE < CREATE < MODIFY (§4.10, §9). OVERFLOW never competes for
    /// this ordering since it always replaces the whole buffer.
    pub(crate) fn sort_rank(self) -> u8 {
        match self {
            EventKind::Delete => 0,
            EventKind::Create => 1,
            EventKind::Modify => 2,
            EventKind::Overflow => 3,
        }
    }
}

/// One queued event: a kind, the path it concerns (`None` for OVERFLOW),
/// and a coalesced repeat count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: EventKind,
    pub context: Option<String>,
    pub count: u32,
}

impl WatchEvent {
    pub fn new(kind: EventKind, context: Option<String>) -> Self {
        Self { kind, context, count: 1 }
    }
}

/// Sort a batch of events from one poll pass into delivery order.
pub fn sort_for_delivery(events: &mut [WatchEvent]) {
    events.sort_by_key(|e| e.kind.sort_rank());
}
