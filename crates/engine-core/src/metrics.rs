use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    pages_fetched: AtomicU64,
    rows_fetched: AtomicU64,
    bytes_fetched: AtomicU64,
    fetch_failures: AtomicU64,
}

/// Counters for one query execution, shared between the cursor and its
/// fetch worker.
#[derive(Debug, Clone, Default)]
pub struct FetchMetrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchMetricsSnapshot {
    pub pages_fetched: u64,
    pub rows_fetched: u64,
    pub bytes_fetched: u64,
    pub fetch_failures: u64,
}

impl FetchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_page(&self, rows: u64, bytes: u64) {
        self.inner.pages_fetched.fetch_add(1, Ordering::Relaxed);
        self.inner.rows_fetched.fetch_add(rows, Ordering::Relaxed);
        self.inner.bytes_fetched.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.inner.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FetchMetricsSnapshot {
        FetchMetricsSnapshot {
            pages_fetched: self.inner.pages_fetched.load(Ordering::Relaxed),
            rows_fetched: self.inner.rows_fetched.load(Ordering::Relaxed),
            bytes_fetched: self.inner.bytes_fetched.load(Ordering::Relaxed),
            fetch_failures: self.inner.fetch_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_counters() {
        let metrics = FetchMetrics::new();
        let worker_side = metrics.clone();
        worker_side.record_page(10, 160);
        worker_side.record_page(3, 48);
        worker_side.record_failure();

        assert_eq!(
            metrics.snapshot(),
            FetchMetricsSnapshot {
                pages_fetched: 2,
                rows_fetched: 13,
                bytes_fetched: 208,
                fetch_failures: 1,
            }
        );
    }
}
