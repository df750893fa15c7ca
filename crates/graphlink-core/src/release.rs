//! The release queue.
//!
//! Every native destroy call in the process goes through one background
//! worker thread. Handles submit [`Resource`]s from whatever thread drops
//! them; the worker runs the destroys one at a time, in submission order.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

use graphlink_common::utils::error::{Error, Result};
use graphlink_native::{
    NativeApi, RawFlatTuple, RawLogicalType, RawQueryResult, RawString, RawValue,
};

use crate::config::BridgeConfig;

/// A native allocation waiting to be destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// A caller-owned value.
    Value(RawValue),
    /// A logical type.
    LogicalType(RawLogicalType),
    /// An engine string buffer.
    String(RawString),
    /// A caller-owned query result.
    QueryResult(RawQueryResult),
    /// A row descriptor.
    FlatTuple(RawFlatTuple),
}

/// What kind of native object a handle wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// See [`Resource::Value`].
    Value,
    /// See [`Resource::LogicalType`].
    LogicalType,
    /// See [`Resource::String`].
    String,
    /// See [`Resource::QueryResult`].
    QueryResult,
    /// See [`Resource::FlatTuple`].
    FlatTuple,
}

impl ResourceKind {
    /// Returns a short name for error messages.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Value => "native value",
            Self::LogicalType => "logical type",
            Self::String => "native string",
            Self::QueryResult => "query result",
            Self::FlatTuple => "result row",
        }
    }
}

impl Resource {
    /// Returns the kind of this resource.
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Value(_) => ResourceKind::Value,
            Self::LogicalType(_) => ResourceKind::LogicalType,
            Self::String(_) => ResourceKind::String,
            Self::QueryResult(_) => ResourceKind::QueryResult,
            Self::FlatTuple(_) => ResourceKind::FlatTuple,
        }
    }

    /// Runs the matching native destroy call.
    fn destroy(self, api: &dyn NativeApi) {
        match self {
            Self::Value(raw) => api.value_destroy(raw),
            Self::LogicalType(raw) => api.data_type_destroy(raw),
            Self::String(raw) => api.destroy_string(raw),
            Self::QueryResult(raw) => api.query_result_destroy(raw),
            Self::FlatTuple(raw) => api.flat_tuple_destroy(raw),
        }
    }
}

enum Message {
    Release(Resource),
    ReleaseAndAck(Resource, Sender<()>),
    Flush(Sender<()>),
}

#[derive(Debug, Default)]
struct QueueStats {
    released: AtomicU64,
    panicked: AtomicU64,
}

/// A single-consumer queue of pending native destroys.
pub struct ReleaseQueue {
    api: Arc<dyn NativeApi>,
    sender: Option<Sender<Message>>,
    worker: Option<JoinHandle<()>>,
    stats: Arc<QueueStats>,
    wait_for_release: bool,
    /// Serializes destroys run on the caller's thread once the worker is gone.
    fallback: Mutex<()>,
}

impl ReleaseQueue {
    /// Starts the worker thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn start(api: Arc<dyn NativeApi>, config: &BridgeConfig) -> Result<Self> {
        let (sender, receiver) = match config.release_queue_capacity {
            Some(capacity) => channel::bounded(capacity),
            None => channel::unbounded(),
        };
        let stats = Arc::new(QueueStats::default());

        let worker = thread::Builder::new()
            .name(config.worker_thread_name.clone())
            .spawn({
                let api = Arc::clone(&api);
                let stats = Arc::clone(&stats);
                move || run_worker(api.as_ref(), &receiver, &stats)
            })
            .map_err(|e| Error::ReleaseWorker(format!("failed to spawn worker thread: {e}")))?;

        debug!(
            thread = %config.worker_thread_name,
            capacity = ?config.release_queue_capacity,
            "release worker started"
        );

        Ok(Self {
            api,
            sender: Some(sender),
            worker: Some(worker),
            stats,
            wait_for_release: config.wait_for_release,
            fallback: Mutex::new(()),
        })
    }

    /// Queues `resource` for destruction.
    ///
    /// Waits for the destroy to finish if the queue was configured to.
    pub fn submit(&self, resource: Resource) {
        let Some(sender) = &self.sender else {
            self.destroy_inline(resource);
            return;
        };

        if self.wait_for_release {
            let (ack, done) = channel::bounded(1);
            if sender.send(Message::ReleaseAndAck(resource, ack)).is_err() {
                self.destroy_inline(resource);
                return;
            }
            if done.recv().is_err() {
                warn!(?resource, "release worker exited before acknowledging");
            }
        } else if sender.send(Message::Release(resource)).is_err() {
            self.destroy_inline(resource);
        }
    }

    /// Blocks until every resource submitted before this call is destroyed.
    pub fn flush(&self) {
        let Some(sender) = &self.sender else {
            return;
        };
        let (ack, done) = channel::bounded(1);
        if sender.send(Message::Flush(ack)).is_ok() {
            // a dropped ack means the worker is gone, nothing left to wait for
            let _ = done.recv();
        }
    }

    /// Returns how many resources the worker has destroyed.
    pub fn released(&self) -> u64 {
        self.stats.released.load(Ordering::Relaxed)
    }

    fn destroy_inline(&self, resource: Resource) {
        warn!(?resource, "release worker unavailable, destroying on caller thread");
        let _serialized = self.fallback.lock();
        resource.destroy(self.api.as_ref());
        self.stats.released.fetch_add(1, Ordering::Relaxed);
    }
}

impl Drop for ReleaseQueue {
    fn drop(&mut self) {
        // closing the channel lets the worker drain and exit
        self.sender = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("release worker panicked");
            }
        }
        debug!(
            released = self.released(),
            panicked = self.stats.panicked.load(Ordering::Relaxed),
            "release worker stopped"
        );
    }
}

fn run_worker(api: &dyn NativeApi, receiver: &Receiver<Message>, stats: &QueueStats) {
    for message in receiver {
        match message {
            Message::Release(resource) => destroy_logged(api, resource, stats),
            Message::ReleaseAndAck(resource, ack) => {
                destroy_logged(api, resource, stats);
                let _ = ack.send(());
            }
            Message::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

fn destroy_logged(api: &dyn NativeApi, resource: Resource, stats: &QueueStats) {
    trace!(?resource, "releasing");
    match panic::catch_unwind(AssertUnwindSafe(|| resource.destroy(api))) {
        Ok(()) => {
            stats.released.fetch_add(1, Ordering::Relaxed);
        }
        Err(_) => {
            stats.panicked.fetch_add(1, Ordering::Relaxed);
            error!(?resource, "native destroy panicked");
        }
    }
}
