//! Tuning knobs for the three subsystems, bundled so an embedding
//! application can describe them in a single TOML/JSON document.
//!
//! None of this is required: every subsystem also exposes a plain
//! constructor taking its one or two tuning integers directly. `ToolkitConfig`
//! just saves call sites that already have a `serde`-deserialized settings
//! blob from wiring the numbers through by hand.

use serde::{Deserialize, Serialize};

/// Tuning for [`crate::EventManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventManagerConfig {
    /// Number of executor threads in the pool strategy. `0` selects the
    /// inline strategy (listeners run on the dispatch thread).
    pub extra_threads_count: usize,
}

impl Default for EventManagerConfig {
    fn default() -> Self {
        Self {
            extra_threads_count: 0,
        }
    }
}

/// Tuning for [`crate::RingQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingQueueConfig {
    /// Fixed ring capacity. Must be non-zero.
    pub capacity: usize,
}

impl Default for RingQueueConfig {
    fn default() -> Self {
        Self { capacity: 16 }
    }
}

/// Tuning for [`crate::ConcurrentMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrentMapConfig {
    /// Initial bucket count. Grows on each online resize.
    pub initial_bucket_count: usize,
}

impl Default for ConcurrentMapConfig {
    fn default() -> Self {
        Self {
            initial_bucket_count: 16,
        }
    }
}

/// Aggregate configuration for all three subsystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ToolkitConfig {
    pub event_manager: EventManagerConfig,
    pub ring_queue: RingQueueConfig,
    pub concurrent_map: ConcurrentMapConfig,
}
