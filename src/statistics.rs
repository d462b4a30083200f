// Statistics: operation counters and EWMA latency tracking, exposed as a
// serializable snapshot for `/admin/stats`. Counters follow the teacher's
// atomic-counter convention from observability.rs; EWMA latency extends
// that same pattern to floating-point averages behind a small mutex since
// atomics don't support f64 arithmetic directly.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

const EWMA_ALPHA: f64 = 0.1;

#[derive(Default)]
struct Ewma {
    value: Mutex<Option<f64>>,
}

impl Ewma {
    fn observe(&self, sample_ms: f64) {
        let mut guard = self.value.lock();
        *guard = Some(match *guard {
            None => sample_ms,
            Some(prev) => EWMA_ALPHA * sample_ms + (1.0 - EWMA_ALPHA) * prev,
        });
    }

    fn get(&self) -> Option<f64> {
        *self.value.lock()
    }
}

#[derive(Default)]
pub struct Stats {
    get_count: AtomicU64,
    set_count: AtomicU64,
    delete_count: AtomicU64,
    search_count: AtomicU64,
    expired_count: AtomicU64,
    data_size: AtomicU64,
    entry_count: AtomicU64,
    file_size: AtomicU64,
    last_sync: Mutex<Option<SystemTime>>,
    last_gc: Mutex<Option<SystemTime>>,
    get_latency_ms: Ewma,
    set_latency_ms: Ewma,
    search_latency_ms: Ewma,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_get(&self, elapsed: Duration) {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        self.get_latency_ms.observe(elapsed.as_secs_f64() * 1000.0);
    }

    pub fn record_set(&self, elapsed: Duration) {
        self.set_count.fetch_add(1, Ordering::Relaxed);
        self.set_latency_ms.observe(elapsed.as_secs_f64() * 1000.0);
    }

    pub fn record_delete(&self) {
        self.delete_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_search(&self, elapsed: Duration) {
        self.search_count.fetch_add(1, Ordering::Relaxed);
        self.search_latency_ms
            .observe(elapsed.as_secs_f64() * 1000.0);
    }

    pub fn record_expired(&self, count: u64) {
        self.expired_count.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_sync(&self, data_size: u64, entry_count: u64, file_size: u64) {
        self.data_size.store(data_size, Ordering::Relaxed);
        self.entry_count.store(entry_count, Ordering::Relaxed);
        self.file_size.store(file_size, Ordering::Relaxed);
        *self.last_sync.lock() = Some(SystemTime::now());
    }

    pub fn record_gc(&self) {
        *self.last_gc.lock() = Some(SystemTime::now());
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            get_count: self.get_count.load(Ordering::Relaxed),
            set_count: self.set_count.load(Ordering::Relaxed),
            delete_count: self.delete_count.load(Ordering::Relaxed),
            search_count: self.search_count.load(Ordering::Relaxed),
            expired_count: self.expired_count.load(Ordering::Relaxed),
            data_size: self.data_size.load(Ordering::Relaxed),
            entry_count: self.entry_count.load(Ordering::Relaxed),
            file_size: self.file_size.load(Ordering::Relaxed),
            last_sync: system_time_to_secs(*self.last_sync.lock()),
            last_gc: system_time_to_secs(*self.last_gc.lock()),
            get_latency_ewma_ms: self.get_latency_ms.get(),
            set_latency_ewma_ms: self.set_latency_ms.get(),
            search_latency_ewma_ms: self.search_latency_ms.get(),
        }
    }
}

fn system_time_to_secs(t: Option<SystemTime>) -> Option<u64> {
    t.and_then(|t| {
        t.duration_since(std::time::UNIX_EPOCH)
            .ok()
            .map(|d| d.as_secs())
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub get_count: u64,
    pub set_count: u64,
    pub delete_count: u64,
    pub search_count: u64,
    pub expired_count: u64,
    pub data_size: u64,
    pub entry_count: u64,
    pub file_size: u64,
    pub last_sync: Option<u64>,
    pub last_gc: Option<u64>,
    pub get_latency_ewma_ms: Option<f64>,
    pub set_latency_ewma_ms: Option<f64>,
    pub search_latency_ewma_ms: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = Stats::new();
        stats.record_get(Duration::from_millis(1));
        stats.record_get(Duration::from_millis(1));
        stats.record_set(Duration::from_millis(1));
        let snap = stats.snapshot();
        assert_eq!(snap.get_count, 2);
        assert_eq!(snap.set_count, 1);
    }

    #[test]
    fn ewma_seeds_from_first_sample_then_smooths() {
        let ewma = Ewma::default();
        ewma.observe(100.0);
        assert_eq!(ewma.get(), Some(100.0));
        ewma.observe(0.0);
        // 0.1 * 0 + 0.9 * 100 = 90
        assert!((ewma.get().unwrap() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn snapshot_is_none_before_any_sample() {
        let stats = Stats::new();
        let snap = stats.snapshot();
        assert!(snap.get_latency_ewma_ms.is_none());
    }

    #[test]
    fn record_sync_updates_sizes_and_timestamp() {
        let stats = Stats::new();
        stats.record_sync(10, 1, 4096);
        let snap = stats.snapshot();
        assert_eq!(snap.data_size, 10);
        assert_eq!(snap.entry_count, 1);
        assert_eq!(snap.file_size, 4096);
        assert!(snap.last_sync.is_some());
    }
}
