//! Call accounting for [`MemoryEngine`](super::MemoryEngine).

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

use hashbrown::HashSet;
use parking_lot::Mutex;

/// Live counters updated by every native call.
#[derive(Debug, Default)]
pub struct CallStats {
    value_destroys: AtomicU64,
    type_destroys: AtomicU64,
    string_destroys: AtomicU64,
    result_destroys: AtomicU64,
    tuple_destroys: AtomicU64,
    invalid_frees: AtomicU64,
    borrowed_destroys: AtomicU64,
    overlapping_destroys: AtomicU64,
    dangling_accesses: AtomicU64,
    list_size_reads: AtomicU64,
    list_element_reads: AtomicU64,
    destroys_in_flight: AtomicUsize,
    destroy_threads: Mutex<HashSet<ThreadId>>,
}

/// Which family of destroy call ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum DestroyKind {
    Value,
    LogicalType,
    String,
    QueryResult,
    FlatTuple,
}

impl CallStats {
    /// Marks the start of a destroy call.
    ///
    /// Any other destroy still running at this point is counted as an
    /// overlap. The guard yields once so that racing callers actually meet.
    pub(super) fn enter_destroy(&self, kind: DestroyKind) -> DestroyGuard<'_> {
        if self.destroys_in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlapping_destroys.fetch_add(1, Ordering::Relaxed);
        }
        self.destroy_threads.lock().insert(thread::current().id());
        let counter = match kind {
            DestroyKind::Value => &self.value_destroys,
            DestroyKind::LogicalType => &self.type_destroys,
            DestroyKind::String => &self.string_destroys,
            DestroyKind::QueryResult => &self.result_destroys,
            DestroyKind::FlatTuple => &self.tuple_destroys,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        thread::yield_now();
        DestroyGuard { stats: self }
    }

    pub(super) fn invalid_free(&self) {
        self.invalid_frees.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn borrowed_destroy(&self) {
        self.borrowed_destroys.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn dangling_access(&self) {
        self.dangling_accesses.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn list_size_read(&self) {
        self.list_size_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn list_element_read(&self) {
        self.list_element_reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the current counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            value_destroys: self.value_destroys.load(Ordering::Relaxed),
            type_destroys: self.type_destroys.load(Ordering::Relaxed),
            string_destroys: self.string_destroys.load(Ordering::Relaxed),
            result_destroys: self.result_destroys.load(Ordering::Relaxed),
            tuple_destroys: self.tuple_destroys.load(Ordering::Relaxed),
            invalid_frees: self.invalid_frees.load(Ordering::Relaxed),
            borrowed_destroys: self.borrowed_destroys.load(Ordering::Relaxed),
            overlapping_destroys: self.overlapping_destroys.load(Ordering::Relaxed),
            dangling_accesses: self.dangling_accesses.load(Ordering::Relaxed),
            list_size_reads: self.list_size_reads.load(Ordering::Relaxed),
            list_element_reads: self.list_element_reads.load(Ordering::Relaxed),
            destroy_threads: self.destroy_threads.lock().len(),
        }
    }
}

/// Ends a destroy call on drop.
pub(super) struct DestroyGuard<'a> {
    stats: &'a CallStats,
}

impl Drop for DestroyGuard<'_> {
    fn drop(&mut self) {
        self.stats.destroys_in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A point-in-time copy of [`CallStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// `value_destroy` calls.
    pub value_destroys: u64,
    /// `data_type_destroy` calls.
    pub type_destroys: u64,
    /// `destroy_string` calls.
    pub string_destroys: u64,
    /// `query_result_destroy` calls.
    pub result_destroys: u64,
    /// `flat_tuple_destroy` calls.
    pub tuple_destroys: u64,
    /// Destroys of an address that was never allocated, already freed, or of
    /// the wrong kind.
    pub invalid_frees: u64,
    /// `value_destroy` calls on an engine-owned value.
    pub borrowed_destroys: u64,
    /// Destroy calls that started while another was still running.
    pub overlapping_destroys: u64,
    /// Non-destroy calls that named a freed or unknown address.
    pub dangling_accesses: u64,
    /// `value_get_list_size` calls.
    pub list_size_reads: u64,
    /// `value_get_list_element` calls.
    pub list_element_reads: u64,
    /// Distinct threads that have issued a destroy call.
    pub destroy_threads: usize,
}

impl StatsSnapshot {
    /// Total destroy calls of any kind.
    pub fn total_destroys(&self) -> u64 {
        self.value_destroys
            + self.type_destroys
            + self.string_destroys
            + self.result_destroys
            + self.tuple_destroys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_destroys_do_not_overlap() {
        let stats = CallStats::default();
        drop(stats.enter_destroy(DestroyKind::Value));
        drop(stats.enter_destroy(DestroyKind::String));
        let snap = stats.snapshot();
        assert_eq!(snap.overlapping_destroys, 0);
        assert_eq!(snap.total_destroys(), 2);
        assert_eq!(snap.destroy_threads, 1);
    }

    #[test]
    fn test_nested_destroy_is_an_overlap() {
        let stats = CallStats::default();
        let outer = stats.enter_destroy(DestroyKind::QueryResult);
        let inner = stats.enter_destroy(DestroyKind::FlatTuple);
        drop(inner);
        drop(outer);
        assert_eq!(stats.snapshot().overlapping_destroys, 1);
    }
}
