use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crossbeam_utils::CachePadded;

use crate::shared_types::ByteCount;

const MB_TO_BYTES: u64 = 1024 * 1024;

/// Read-volume and timing collector, only created when measurements are
/// requested and handed to every worker explicitly.
#[derive(Debug)]
pub(crate) struct ReadMetrics {
    started: Instant,
    // one cache line per worker so counters don't false-share
    per_worker: Vec<CachePadded<AtomicU64>>,
}

impl ReadMetrics {
    pub(crate) fn new(worker_count: usize) -> Self {
        Self {
            started: Instant::now(),
            per_worker: (0..worker_count)
                .map(|_| CachePadded::new(AtomicU64::new(0)))
                .collect(),
        }
    }

    /// Records `bytes` read from *each* of the two files by `worker`.
    pub(crate) fn register_read(&self, worker: usize, bytes: ByteCount) {
        if let Some(count) = self.per_worker.get(worker) {
            count.fetch_add(bytes, Ordering::Relaxed);
        }
    }

    /// Total bytes read from both files.
    pub(crate) fn total_read(&self) -> ByteCount {
        self.per_worker
            .iter()
            .map(|count| count.load(Ordering::Relaxed) * 2)
            .sum()
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub(crate) fn report(&self) {
        let total_read = self.total_read();
        info!("Time: {} ms", self.elapsed().as_millis());
        info!(
            "Total read: {} bytes, {} MB",
            total_read,
            total_read / MB_TO_BYTES
        );
    }
}
