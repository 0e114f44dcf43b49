//! A joinable worker thread with an `init`/`run`/`do_stop` lifecycle.
//!
//! A [`Worker`] provides `init` (run once before the loop starts), `run`
//! (owns the thread's entire loop until it observes a stop request), and
//! `do_stop` (called from whichever thread calls [`JoinableWorker::stop`],
//! responsible for waking `run` out of whatever it's blocked on).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::SpawnError;

/// The behavior a [`JoinableWorker`] drives. Implementors hold their own
/// shared state (signals, mutexes, atomics) reachable from both the worker
/// thread (via `run`) and any caller thread (via `do_stop`).
pub trait Worker: Send + Sync + 'static {
    /// Runs once on the worker thread before the first `run` iteration.
    fn init(&self) {}

    /// Owns the worker's loop. Must return once a stop has been requested
    /// and observed, normally by checking a flag set from `do_stop`.
    fn run(&self);

    /// Invoked on the caller's thread from [`JoinableWorker::stop`]. Must
    /// unblock a `run` that is sleeping on a signal or condition variable.
    fn do_stop(&self) {}
}

/// Owns the `JoinHandle` and running-state bookkeeping for a [`Worker`].
pub struct JoinableWorker<W: Worker> {
    worker: Arc<W>,
    name: String,
    handle: Mutex<Option<JoinHandle<()>>>,
    running: AtomicBool,
}

impl<W: Worker> JoinableWorker<W> {
    pub fn new(name: impl Into<String>, worker: Arc<W>) -> Self {
        Self {
            worker,
            name: name.into(),
            handle: Mutex::new(None),
            running: AtomicBool::new(false),
        }
    }

    pub fn worker(&self) -> &Arc<W> {
        &self.worker
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Spawns the worker thread. A no-op if already running.
    pub fn start(&self) -> Result<(), SpawnError> {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            return Ok(());
        }

        let worker = self.worker.clone();
        let spawned = std::thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                worker.init();
                worker.run();
            })
            .map_err(|source| SpawnError::Os {
                name: self.name.clone(),
                source,
            })?;

        *handle = Some(spawned);
        self.running.store(true, Ordering::Release);
        Ok(())
    }

    /// Requests the worker stop and joins its thread. A no-op if the worker
    /// was never started or has already been stopped.
    pub fn stop(&self) {
        let taken = {
            let mut handle = self.handle.lock();
            handle.take()
        };

        let Some(handle) = taken else {
            return;
        };

        self.worker.do_stop();
        if let Err(panic) = handle.join() {
            debug!(worker = %self.name, "worker thread panicked during join");
            std::panic::resume_unwind(panic);
        }
        self.running.store(false, Ordering::Release);
    }
}
