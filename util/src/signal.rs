use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// A binary, edge-triggered signal used to wake a sleeping worker thread.
///
/// `wait(true)` blocks until some other thread calls [`Signal::set`], then
/// atomically resets the signal to `false` before returning, so the same
/// `Signal` can be waited on again for the next wakeup: a single bit of
/// "something happened, go look" rather than a counting semaphore.
#[derive(Debug, Default)]
pub struct Signal {
    state: Mutex<bool>,
    condvar: Condvar,
}

impl Signal {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Sets the signal and wakes every thread waiting on it.
    pub fn set(&self) {
        let mut state = self.state.lock();
        *state = true;
        self.condvar.notify_all();
    }

    /// Blocks until the signal's value equals `value`. If `value` is `true`,
    /// consumes the signal (resets it to `false`) before returning, so a
    /// subsequent `wait(true)` blocks until the next `set`.
    pub fn wait(&self, value: bool) {
        let mut state = self.state.lock();
        while *state != value {
            self.condvar.wait(&mut state);
        }
        if value {
            *state = false;
        }
    }

    /// Like [`Signal::wait`], but gives up after `timeout` and returns
    /// whether the signal was actually observed. Used only by tests; no
    /// production caller needs a bounded wait.
    pub fn wait_timeout(&self, value: bool, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        let deadline = std::time::Instant::now() + timeout;
        while *state != value {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let result = self.condvar.wait_for(&mut state, remaining);
            if result.timed_out() && *state != value {
                return false;
            }
        }
        if value {
            *state = false;
        }
        true
    }
}
