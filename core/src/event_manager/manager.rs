use std::any::Any;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use concur_util::{JoinableWorker, Signal, SpawnError, Worker};

use crate::config::EventManagerConfig;

use super::event::{Event, Target};
use super::executor::PoolStrategy;
use super::listener::{CallType, ListenerFn, ListenerId};
use super::registry::{PendingAdd, Registry};
use super::strategy::{ExecutionStrategy, InlineStrategy};

#[derive(Default)]
struct ListenersState {
    registry: Registry,
    pending_adds: Vec<PendingAdd>,
    pending_removals: Vec<ListenerId>,
}

impl ListenersState {
    /// Allocates an id that collides with neither an already-registered
    /// listener nor one still waiting to be applied.
    fn alloc_id(&mut self) -> ListenerId {
        loop {
            let candidate = self.registry.alloc_id();
            if !self.pending_adds.iter().any(|add| add.id == candidate) {
                return candidate;
            }
        }
    }
}

struct Shared {
    listeners: Mutex<ListenersState>,
    events: Mutex<VecDeque<Arc<Event>>>,
    in_flight: AtomicUsize,
    wake: Signal,
    stop_requested: AtomicBool,
    strategy: Box<dyn ExecutionStrategy>,
}

impl Shared {
    fn apply_pending_listeners(&self) {
        let mut state = self.listeners.lock();
        let adds = std::mem::take(&mut state.pending_adds);
        let removals = std::mem::take(&mut state.pending_removals);
        state.registry.apply_additions(adds);
        state.registry.apply_removals(removals);
    }

    fn listeners_for(&self, event: &Arc<Event>) -> Vec<(Arc<ListenerFn>, CallType)> {
        let state = self.listeners.lock();
        let entries = match &event.target {
            Target::Type(event_type) => state.registry.listeners_for_type(event_type),
            Target::Listener(id) => state.registry.listener_for_id(*id).into_iter().collect(),
        };
        entries.into_iter().map(|entry| (entry.listener, entry.call_type)).collect()
    }

    fn drain_events(&self) {
        loop {
            let event = self.events.lock().pop_front();
            let Some(event) = event else { break };
            self.in_flight.fetch_add(1, Ordering::AcqRel);
            let listeners = self.listeners_for(&event);
            self.strategy.dispatch(&event, listeners);
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
        }
        // Mirrors the source's `send_events`, which calls
        // `events_post_processing()` once after the whole spliced batch has
        // been handed to the strategy, not after each event.
        self.strategy.flush();
    }

    /// Hands a listener straight to the execution strategy, bypassing the
    /// registry and pending-event queue entirely. Used by the asynchronous
    /// call facade, which has no event type to subscribe against.
    fn dispatch_once(&self, call_type: CallType, listener: Arc<ListenerFn>) {
        let event = Arc::new(Event::with_type("__async_call", ()));
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        self.strategy.dispatch(&event, vec![(listener, call_type)]);
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Worker for Shared {
    fn run(&self) {
        loop {
            self.wake.wait(true);
            if self.stop_requested.load(Ordering::Acquire) {
                return;
            }
            self.apply_pending_listeners();
            self.drain_events();
        }
    }

    fn do_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.wake.set();
    }
}

/// The event manager: a pub/sub bus with an optional targeted-delivery mode,
/// backed by a dedicated dispatch thread and a pluggable execution strategy
/// for running matched listeners.
///
/// Registering and removing listeners, and firing events, are all safe to
/// call from any thread; the dispatch thread is the only thread that ever
/// touches the registry directly, applying queued additions/removals and
/// draining queued events each time it wakes.
pub struct EventManager {
    shared: Arc<Shared>,
    dispatch: JoinableWorker<Shared>,
}

impl EventManager {
    /// Builds and starts an event manager. `config.extra_threads_count == 0`
    /// selects the inline strategy (listeners run on the dispatch thread);
    /// any other value spins up that many executor threads.
    pub fn new(config: EventManagerConfig) -> Result<Arc<Self>, SpawnError> {
        let strategy: Box<dyn ExecutionStrategy> = if config.extra_threads_count == 0 {
            Box::new(InlineStrategy)
        } else {
            Box::new(PoolStrategy::new(config.extra_threads_count)?)
        };

        let shared = Arc::new(Shared {
            listeners: Mutex::new(ListenersState::default()),
            events: Mutex::new(VecDeque::new()),
            in_flight: AtomicUsize::new(0),
            wake: Signal::new(),
            stop_requested: AtomicBool::new(false),
            strategy,
        });

        let dispatch = JoinableWorker::new("event-manager-dispatch", shared.clone());
        dispatch.start()?;
        Ok(Arc::new(Self { shared, dispatch }))
    }

    /// Subscribes `listener` to every event fired with `event_type`.
    pub fn add_listener(
        &self,
        event_type: impl Into<String>,
        call_type: CallType,
        listener: impl Fn(&Event) + Send + Sync + 'static,
    ) -> ListenerId {
        self.register(Some(event_type.into()), call_type, Arc::new(listener))
    }

    /// Registers `listener` for targeted delivery only: it receives events
    /// fired with [`EventManager::fire_targeted`] against its id, and
    /// nothing fired by type.
    pub fn add_targeted_listener(
        &self,
        call_type: CallType,
        listener: impl Fn(&Event) + Send + Sync + 'static,
    ) -> ListenerId {
        self.register(None, call_type, Arc::new(listener))
    }

    /// Like [`EventManager::add_listener`], but returns a guard that removes
    /// the listener automatically when dropped.
    pub fn add_listener_guarded(
        self: &Arc<Self>,
        event_type: impl Into<String>,
        call_type: CallType,
        listener: impl Fn(&Event) + Send + Sync + 'static,
    ) -> ListenerGuard {
        let id = self.add_listener(event_type, call_type, listener);
        ListenerGuard {
            manager: self.clone(),
            id,
        }
    }

    fn register(&self, event_type: Option<String>, call_type: CallType, listener: Arc<ListenerFn>) -> ListenerId {
        let mut state = self.shared.listeners.lock();
        let id = state.alloc_id();
        state.pending_adds.push(PendingAdd {
            id,
            listener,
            call_type,
            event_type,
        });
        drop(state);
        self.shared.wake.set();
        id
    }

    /// Queues `id` for removal. A no-op (applied and then ignored) if `id`
    /// was never registered or was already removed.
    pub fn remove_listener(&self, id: ListenerId) {
        self.shared.listeners.lock().pending_removals.push(id);
        self.shared.wake.set();
    }

    /// Fires `payload` to every listener subscribed to `event_type`. Returns
    /// `false` without taking ownership of `payload` if a stop has already
    /// been requested; the dispatch thread will never drain it otherwise.
    pub fn fire_event(&self, event_type: impl Into<String>, payload: impl Any + Send + Sync) -> bool {
        self.push_event(Event::with_type(event_type, payload))
    }

    /// Fires `payload` only to the listener registered under `id`, if it is
    /// still registered (or soon will be, if its registration is still
    /// pending). Returns `false` without taking ownership if a stop has
    /// already been requested.
    pub fn fire_targeted(&self, id: ListenerId, payload: impl Any + Send + Sync) -> bool {
        self.push_event(Event::targeted(id, payload))
    }

    fn push_event(&self, event: Event) -> bool {
        if self.shared.stop_requested.load(Ordering::Acquire) {
            return false;
        }
        self.shared.events.lock().push_back(Arc::new(event));
        self.shared.wake.set();
        true
    }

    /// Blocks until every event fired before this call, and every listener
    /// registration/removal requested before this call, has been applied
    /// and run to completion.
    pub fn flush(&self) {
        loop {
            let events_empty = self.shared.events.lock().is_empty();
            let nothing_in_flight = self.shared.in_flight.load(Ordering::Acquire) == 0;
            let listeners_settled = {
                let state = self.shared.listeners.lock();
                state.pending_adds.is_empty() && state.pending_removals.is_empty()
            };
            if events_empty && nothing_in_flight && listeners_settled {
                break;
            }
            std::hint::spin_loop();
        }
        self.shared.strategy.flush();
    }

    /// Stops the dispatch thread and any executor threads, joining them.
    /// Safe to call more than once.
    pub fn stop(&self) {
        self.dispatch.stop();
        self.shared.strategy.shutdown();
    }

    pub(crate) fn spawn_call(&self, call_type: CallType, f: impl FnOnce() + Send + 'static) {
        let cell = Mutex::new(Some(f));
        let listener: Arc<ListenerFn> = Arc::new(move |_event: &Event| {
            if let Some(f) = cell.lock().take() {
                f();
            }
        });
        self.shared.dispatch_once(call_type, listener);
    }
}

impl Drop for EventManager {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Removes its listener from the owning [`EventManager`] when dropped.
pub struct ListenerGuard {
    manager: Arc<EventManager>,
    id: ListenerId,
}

impl ListenerGuard {
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.manager.remove_listener(self.id);
    }
}
