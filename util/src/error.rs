use thiserror::Error;

/// Environmental failures from the worker-thread collaborator.
///
/// Logic-level failures (closed manager, unknown id, ...) are never modeled as
/// `Result` in this toolkit — only failures that originate outside the
/// program's control (the OS refusing to hand out a thread) are.
#[derive(Error, Debug)]
pub enum SpawnError {
    #[error("failed to spawn worker thread {name:?}")]
    Os {
        name: String,
        #[source]
        source: std::io::Error,
    },
}
