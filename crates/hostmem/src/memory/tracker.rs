//! Accounting for pageable host allocations.
//!
//! The tracker keeps a process-wide running total of pageable bytes handed
//! out, a per-thread breakdown, and a peak value. Counters are
//! allocation-only: nothing is decremented on free, so totals are monotonic
//! and answer "how much has this process asked for", not "how much is live".
//!
//! Crossing a whole threshold step (1 GiB by default) of the global total
//! emits one diagnostic line. The rate limit is a compare-and-swap on the
//! last-logged step count: single-threaded, each boundary logs at most once;
//! under concurrent allocation at least one line per boundary is emitted and
//! near-simultaneous duplicates are tolerated.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use super::stats::{AllocStats, ThreadAlloc, gib};

/// Default threshold step for diagnostic logging: 1 GiB.
pub const DEFAULT_LOG_STEP_BYTES: u64 = 1 << 30;

/// Tracks pageable host-memory allocations globally and per thread.
pub struct AllocationTracker {
    /// Total pageable bytes handed out since process start.
    total_bytes: AtomicU64,
    /// Highest value `total_bytes` has reached.
    peak_bytes: AtomicU64,
    /// Last whole threshold step that was logged.
    logged_steps: AtomicU64,
    /// Threshold step in bytes; 0 disables threshold logging.
    step_bytes: u64,
    /// Per-thread totals, keyed by OS thread ID. Entries are created lazily
    /// on a thread's first allocation and live for the process lifetime.
    by_thread: RwLock<HashMap<u64, AtomicU64>>,
}

impl AllocationTracker {
    /// Create a tracker that logs every `step_bytes` of cumulative
    /// allocation. Pass 0 to disable threshold logging.
    #[must_use]
    pub fn new(step_bytes: u64) -> Self {
        Self {
            total_bytes: AtomicU64::new(0),
            peak_bytes: AtomicU64::new(0),
            logged_steps: AtomicU64::new(0),
            step_bytes,
            by_thread: RwLock::new(HashMap::new()),
        }
    }

    /// Record `bytes` allocated by thread `tid`.
    ///
    /// The global total is a single fetch-and-add, so concurrent recordings
    /// from any number of threads sum exactly. The per-thread entry is
    /// created on first use with insert-if-absent semantics.
    pub fn record(&self, tid: u64, bytes: u64) {
        let new_total = self.total_bytes.fetch_add(bytes, Ordering::Relaxed) + bytes;

        let mut peak = self.peak_bytes.load(Ordering::Relaxed);
        while new_total > peak {
            match self.peak_bytes.compare_exchange_weak(
                peak,
                new_total,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => peak = current,
            }
        }

        if self.step_bytes > 0 {
            self.log_threshold(new_total);
        }

        {
            let counters = self.by_thread.read();
            if let Some(counter) = counters.get(&tid) {
                counter.fetch_add(bytes, Ordering::Relaxed);
                return;
            }
        }
        self.by_thread
            .write()
            .entry(tid)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(bytes, Ordering::Relaxed);
    }

    fn log_threshold(&self, new_total: u64) {
        let steps = new_total / self.step_bytes;
        let mut logged = self.logged_steps.load(Ordering::Relaxed);
        while steps > logged {
            match self.logged_steps.compare_exchange_weak(
                logged,
                steps,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    tracing::warn!(
                        "pageable host allocations reached {:.2} GiB",
                        gib(new_total)
                    );
                    break;
                }
                Err(current) => logged = current,
            }
        }
    }

    /// Total pageable bytes handed out.
    #[must_use]
    pub fn total_allocated(&self) -> u64 {
        self.total_bytes.load(Ordering::Relaxed)
    }

    /// Highest value the total has reached.
    #[must_use]
    pub fn peak_allocated(&self) -> u64 {
        self.peak_bytes.load(Ordering::Relaxed)
    }

    /// Last whole threshold step that was logged (0 if none yet).
    #[must_use]
    pub fn last_logged_step(&self) -> u64 {
        self.logged_steps.load(Ordering::Relaxed)
    }

    /// Bytes allocated by thread `tid`, or 0 if it never allocated.
    #[must_use]
    pub fn allocated_by_thread(&self, tid: u64) -> u64 {
        self.by_thread
            .read()
            .get(&tid)
            .map_or(0, |counter| counter.load(Ordering::Relaxed))
    }

    /// Number of threads that have allocated through this tracker.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.by_thread.read().len()
    }

    /// Point-in-time view of all counters, per-thread entries sorted by
    /// thread ID.
    #[must_use]
    pub fn snapshot(&self) -> AllocStats {
        let mut by_thread: Vec<ThreadAlloc> = self
            .by_thread
            .read()
            .iter()
            .map(|(&tid, counter)| ThreadAlloc {
                tid,
                bytes: counter.load(Ordering::Relaxed),
            })
            .collect();
        by_thread.sort_by_key(|entry| entry.tid);

        AllocStats {
            total_pageable_bytes: self.total_allocated(),
            peak_pageable_bytes: self.peak_allocated(),
            last_logged_step: self.last_logged_step(),
            by_thread,
        }
    }
}

impl Default for AllocationTracker {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_STEP_BYTES)
    }
}

impl std::fmt::Debug for AllocationTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllocationTracker")
            .field("total_bytes", &self.total_allocated())
            .field("peak_bytes", &self.peak_allocated())
            .field("step_bytes", &self.step_bytes)
            .field("threads", &self.thread_count())
            .finish()
    }
}
