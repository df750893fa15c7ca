//! Bridge configuration.

use serde::{Deserialize, Serialize};

/// Default name of the release worker thread.
pub const DEFAULT_WORKER_THREAD_NAME: &str = "graphlink-release";

/// Configuration of a [`Bridge`](crate::Bridge).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Capacity of the release queue (None for unbounded).
    ///
    /// With a bounded queue, a `release()` blocks while the queue is full.
    pub release_queue_capacity: Option<usize>,

    /// Name of the release worker thread.
    pub worker_thread_name: String,

    /// Whether `release()` waits until the worker has run the destroy call.
    pub wait_for_release: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            release_queue_capacity: None,
            worker_thread_name: DEFAULT_WORKER_THREAD_NAME.to_string(),
            wait_for_release: false,
        }
    }
}

impl BridgeConfig {
    /// Bounds the release queue.
    #[must_use]
    pub fn with_release_queue_capacity(mut self, capacity: usize) -> Self {
        self.release_queue_capacity = Some(capacity);
        self
    }

    /// Sets the release worker thread name.
    #[must_use]
    pub fn with_worker_thread_name(mut self, name: impl Into<String>) -> Self {
        self.worker_thread_name = name.into();
        self
    }

    /// Makes every release wait for the worker's acknowledgement.
    #[must_use]
    pub fn with_wait_for_release(mut self, wait: bool) -> Self {
        self.wait_for_release = wait;
        self
    }
}
