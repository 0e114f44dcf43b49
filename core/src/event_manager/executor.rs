use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use concur_util::{AtomicCell, JoinableWorker, Signal, SpawnError, Worker};

use super::event::Event;
use super::listener::{CallType, ListenerFn};
use super::strategy::{Call, ExecutionStrategy};

/// The state backing one executor thread: a single-slot mailbox, CAS-placed
/// by any dispatching thread and drained only by the executor's own thread.
struct ExecutorWorker {
    mailbox: AtomicCell<Option<Call>>,
    busy: AtomicBool,
    wake: Signal,
    stop_requested: AtomicBool,
}

impl ExecutorWorker {
    fn new() -> Self {
        Self {
            mailbox: AtomicCell::new(None),
            busy: AtomicBool::new(false),
            wake: Signal::new(),
            stop_requested: AtomicBool::new(false),
        }
    }

    /// Attempts to claim the mailbox for `call`. Fails (returning the call
    /// back to the caller) if another call is already pending.
    fn try_place(&self, call: Call) -> Result<(), Call> {
        if self.mailbox.compare_set_value(&None, Some(call.clone())) {
            self.busy.store(true, Ordering::Release);
            self.wake.set();
            Ok(())
        } else {
            Err(call)
        }
    }

    fn is_idle(&self) -> bool {
        !self.busy.load(Ordering::Acquire) && self.mailbox.value().is_none()
    }
}

impl Worker for ExecutorWorker {
    fn run(&self) {
        loop {
            self.wake.wait(true);
            while let Some(call) = self.mailbox.value() {
                call.invoke();
                self.mailbox.compare_set_value(&Some(call), None);
            }
            self.busy.store(false, Ordering::Release);
            if self.stop_requested.load(Ordering::Acquire) {
                return;
            }
        }
    }

    fn do_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.wake.set();
    }
}

/// One executor thread in a [`super::strategy::PoolStrategy`].
struct Executor {
    worker: JoinableWorker<ExecutorWorker>,
}

impl Executor {
    fn new(index: usize) -> Self {
        Self {
            worker: JoinableWorker::new(format!("event-executor-{index}"), Arc::new(ExecutorWorker::new())),
        }
    }

    fn start(&self) -> Result<(), SpawnError> {
        self.worker.start()
    }

    fn stop(&self) {
        self.worker.stop();
    }

    fn try_place(&self, call: Call) -> Result<(), Call> {
        self.worker.worker().try_place(call)
    }

    fn is_idle(&self) -> bool {
        self.worker.worker().is_idle()
    }
}

/// Runs listeners off the dispatch thread on a fixed pool of executors.
///
/// Each executor holds a single-slot mailbox; a dispatched call is placed
/// with a CAS starting from a preferred executor (executor 0 for
/// [`CallType::MainThread`], round-robin over the rest for
/// [`CallType::AnyThreads`]) and, if that slot is taken, tried against the
/// next executor in ring order. [`PoolStrategy::flush`] busy-spins until
/// every executor reports idle, since completion has no other signal to
/// wait on.
pub(crate) struct PoolStrategy {
    executors: Vec<Executor>,
    next_any: AtomicUsize,
}

impl PoolStrategy {
    pub(crate) fn new(count: usize) -> Result<Self, SpawnError> {
        debug_assert!(count > 0);
        let executors: Vec<Executor> = (0..count).map(Executor::new).collect();
        for executor in &executors {
            executor.start()?;
        }
        Ok(Self {
            executors,
            next_any: AtomicUsize::new(0),
        })
    }

    fn preferred_index(&self, call_type: CallType) -> usize {
        match call_type {
            CallType::MainThread => 0,
            CallType::AnyThreads => {
                if self.executors.len() > 1 {
                    1 + self.next_any.fetch_add(1, Ordering::Relaxed) % (self.executors.len() - 1)
                } else {
                    0
                }
            }
        }
    }

    fn place(&self, mut call: Call, call_type: CallType) {
        let start = self.preferred_index(call_type);
        loop {
            for offset in 0..self.executors.len() {
                let idx = (start + offset) % self.executors.len();
                match self.executors[idx].try_place(call) {
                    Ok(()) => return,
                    Err(returned) => call = returned,
                }
            }
            std::hint::spin_loop();
        }
    }
}

impl ExecutionStrategy for PoolStrategy {
    fn dispatch(&self, event: &Arc<Event>, listeners: Vec<(Arc<ListenerFn>, CallType)>) {
        for (listener, call_type) in listeners {
            let call = Call {
                listener,
                event: event.clone(),
            };
            self.place(call, call_type);
        }
    }

    fn flush(&self) {
        while !self.executors.iter().all(Executor::is_idle) {
            std::hint::spin_loop();
        }
    }

    fn shutdown(&self) {
        for executor in &self.executors {
            executor.stop();
        }
    }
}
