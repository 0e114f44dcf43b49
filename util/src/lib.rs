//! Thread, signal and atomic-cell collaborators shared by the `concur_core`
//! subsystems.
//!
//! These are deliberately small and unopinionated: the event manager, ring
//! queue and concurrent map each build their own concurrency story on top,
//! but all three need *some* way to park a thread until woken (`Signal`),
//! swap a single cell under contention (`AtomicCell`), and run a background
//! loop with a clean shutdown handshake (`thread::JoinableWorker`).

pub mod atomic_cell;
pub mod error;
pub mod signal;
pub mod thread;

pub use atomic_cell::AtomicCell;
pub use error::SpawnError;
pub use signal::Signal;
pub use thread::{JoinableWorker, Worker};
