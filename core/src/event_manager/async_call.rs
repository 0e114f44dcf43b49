use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use super::listener::CallType;
use super::manager::EventManager;

/// Runs `f` asynchronously, through the manager's execution strategy, and
/// discards its result. The simplest of the four asynchronous-call forms:
/// fire and forget.
pub fn call(manager: &EventManager, f: impl FnOnce() + Send + 'static) {
    manager.spawn_call(CallType::AnyThreads, f);
}

/// A handle to a value produced by [`call_with_result`]. Dropping it without
/// calling [`CallHandle::wait`] is safe; the value is simply discarded once
/// the call completes.
pub struct CallHandle<R> {
    slot: Arc<(Mutex<Option<R>>, Condvar)>,
}

impl<R> CallHandle<R> {
    /// Blocks the calling thread until `f` has finished running and returns
    /// its result.
    pub fn wait(self) -> R {
        let (lock, condvar) = &*self.slot;
        let mut guard = lock.lock();
        loop {
            if let Some(value) = guard.take() {
                return value;
            }
            condvar.wait(&mut guard);
        }
    }
}

/// Runs `f` asynchronously and returns a handle that can be waited on for
/// its result.
pub fn call_with_result<R: Send + 'static>(
    manager: &EventManager,
    f: impl FnOnce() -> R + Send + 'static,
) -> CallHandle<R> {
    let slot = Arc::new((Mutex::new(None), Condvar::new()));
    let handle = CallHandle { slot: slot.clone() };
    manager.spawn_call(CallType::AnyThreads, move || {
        let value = f();
        let (lock, condvar) = &*slot;
        *lock.lock() = Some(value);
        condvar.notify_all();
    });
    handle
}

/// Runs `f` asynchronously, then runs `callback` with its result, also
/// asynchronously. `f` is dispatched with [`CallType::AnyThreads`] and
/// `callback` with [`CallType::MainThread`].
pub fn call_with_callback<R: Send + 'static>(
    manager: &Arc<EventManager>,
    f: impl FnOnce() -> R + Send + 'static,
    callback: impl FnOnce(R) + Send + 'static,
) {
    call_with_callback_types(manager, f, callback, CallType::AnyThreads, CallType::MainThread);
}

/// Like [`call_with_callback`], but with explicit call types for both the
/// function and the callback stage.
///
/// When `fn_call_type == callback_call_type`, `callback` runs inline in the
/// same dispatch as `f` rather than being scheduled as a second async call,
/// since it would land on an equivalent executor anyway.
pub fn call_with_callback_types<R: Send + 'static>(
    manager: &Arc<EventManager>,
    f: impl FnOnce() -> R + Send + 'static,
    callback: impl FnOnce(R) + Send + 'static,
    fn_call_type: CallType,
    callback_call_type: CallType,
) {
    let manager_for_callback = manager.clone();
    manager.spawn_call(fn_call_type, move || {
        let value = f();
        if fn_call_type == callback_call_type {
            callback(value);
        } else {
            manager_for_callback.spawn_call(callback_call_type, move || callback(value));
        }
    });
}
