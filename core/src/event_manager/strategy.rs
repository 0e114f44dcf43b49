use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::event::Event;
use super::listener::{CallType, ListenerFn};

/// Runs `listener(event)`, catching a panic just long enough to log it
/// before letting it continue unwinding into whichever thread is hosting
/// this call (the dispatch thread for the inline strategy, an executor
/// thread for the pool strategy). The library never swallows a faulting
/// listener's panic.
fn invoke_listener(listener: &Arc<ListenerFn>, event: &Arc<Event>) {
    let result = panic::catch_unwind(AssertUnwindSafe(|| listener(event)));
    if let Err(panic) = result {
        tracing::warn!("listener panicked during dispatch");
        panic::resume_unwind(panic);
    }
}

/// A single dispatch: a listener paired with the event it is being invoked
/// with. Cloning is cheap (both fields are `Arc`s); equality is pointer
/// identity on both fields, since two calls built from equal-looking
/// listeners and events are still distinct occurrences.
#[derive(Clone)]
pub(crate) struct Call {
    pub(crate) listener: Arc<ListenerFn>,
    pub(crate) event: Arc<Event>,
}

impl Call {
    pub(crate) fn invoke(&self) {
        invoke_listener(&self.listener, &self.event);
    }
}

impl PartialEq for Call {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.listener, &other.listener) && Arc::ptr_eq(&self.event, &other.event)
    }
}

/// How the event manager hands a matched `(listener, event)` pair off for
/// execution. Chosen once at construction based on
/// [`crate::config::EventManagerConfig::extra_threads_count`]: zero selects
/// [`InlineStrategy`], anything else selects [`PoolStrategy`].
pub(crate) trait ExecutionStrategy: Send + Sync {
    /// Runs every matched listener for `event`, or queues them for the pool
    /// to run. Invoked only from the dispatch thread.
    fn dispatch(&self, event: &Arc<Event>, listeners: Vec<(Arc<ListenerFn>, CallType)>);

    /// Blocks until every call handed to `dispatch` so far has completed.
    fn flush(&self);

    fn shutdown(&self);
}

/// Runs every listener synchronously on the dispatch thread, in registration
/// order. No executor threads are spawned.
pub(crate) struct InlineStrategy;

impl ExecutionStrategy for InlineStrategy {
    fn dispatch(&self, event: &Arc<Event>, listeners: Vec<(Arc<ListenerFn>, CallType)>) {
        for (listener, _call_type) in listeners {
            invoke_listener(&listener, event);
        }
    }

    fn flush(&self) {}

    fn shutdown(&self) {}
}
