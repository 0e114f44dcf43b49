//! Pub/sub event bus with a pluggable inline-or-pool execution strategy, plus
//! an asynchronous-call facade built on the same dispatch machinery.

mod async_call;
mod event;
mod executor;
mod listener;
mod manager;
mod registry;
mod strategy;

pub use async_call::{call, call_with_callback, call_with_callback_types, call_with_result, CallHandle};
pub use event::Event;
pub use listener::{CallType, ListenerId};
pub use manager::{EventManager, ListenerGuard};
