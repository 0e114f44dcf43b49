use std::fmt;
use std::sync::Arc;

use super::event::Event;

/// A process-local identifier for a registered listener, unique for the
/// lifetime of the [`EventManager`](crate::EventManager) that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn from_raw(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Selects which executor a listener's invocation is routed through when the
/// event manager uses the pool strategy. Under the inline strategy this has
/// no effect: every listener runs on the dispatch thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallType {
    /// Routed to executor 0, reserved for this call type.
    MainThread,
    /// Routed to any executor other than 0 (or executor 0 itself, if the
    /// pool has exactly one executor).
    AnyThreads,
}

/// A listener callback: a read-only view of the event, never retained past
/// the call.
pub type ListenerFn = dyn Fn(&Event) + Send + Sync;

#[derive(Clone)]
pub(crate) struct ListenerEntry {
    pub(crate) listener: Arc<ListenerFn>,
    pub(crate) call_type: CallType,
}
