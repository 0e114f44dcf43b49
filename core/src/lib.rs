//! An in-process concurrency toolkit: a publish/subscribe event manager with
//! pluggable execution strategies, a single-consumer multi-producer ring
//! queue, and a concurrent hash map with online resizing.
//!
//! The three subsystems ([`event_manager`], [`ring_queue`], [`concurrent_map`])
//! have no dependencies on one another; each is independently usable. They
//! share only the thread/signal/atomic-cell collaborators from
//! `concur_util`.

pub mod concurrent_map;
pub mod config;
pub mod event_manager;
pub mod ring_queue;

pub use concurrent_map::ConcurrentMap;
pub use event_manager::{CallType, Event, EventManager, ListenerId};
pub use ring_queue::RingQueue;
