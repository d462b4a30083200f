// Structured logging and lightweight in-process metrics.
//
// Trimmed from the teacher's observability module: the per-span trace/span
// ID bookkeeping it built on top of `uuid` is dropped in favor of tracing's
// own span correlation (`#[instrument]` gives every call a span ID already),
// but the tracing-subscriber init conventions, the atomic operation
// counters, and the `Operation`/`MetricType`/`PerfTimer` shapes are kept.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static OPERATION_COUNTER: AtomicU64 = AtomicU64::new(0);
static ERROR_COUNTER: AtomicU64 = AtomicU64::new(0);
static SEARCH_COUNTER: AtomicU64 = AtomicU64::new(0);
static INDEX_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Initialize tracing-subscriber once at process startup.
pub fn init_logging() -> anyhow::Result<()> {
    init_logging_with_level(false, false)
}

/// Initialize logging with the given verbosity. `quiet` forces error-only
/// output regardless of `RUST_LOG`; otherwise `RUST_LOG` overrides the
/// flag-derived default.
pub fn init_logging_with_level(verbose: bool, quiet: bool) -> anyhow::Result<()> {
    let filter_level = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("indexedkv=debug,info")
    } else {
        EnvFilter::new("indexedkv=warn,error")
    };

    let env_filter = if quiet {
        EnvFilter::new("error")
    } else if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::try_from_default_env().unwrap_or(filter_level)
    } else {
        filter_level
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(!quiet)
        .with_thread_ids(!quiet)
        .with_line_number(!quiet)
        .with_file(!quiet)
        .with_ansi(true);

    match tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
    {
        Ok(()) => {
            if !quiet {
                info!("indexedkv observability initialized");
            }
            Ok(())
        }
        Err(_) => Ok(()), // already initialized; fine in tests
    }
}

/// Store-level operations worth a structured log line.
#[derive(Debug, Clone)]
pub enum Operation {
    Get { key: String, found: bool },
    Set { key: String, size_bytes: usize },
    Delete { key: String, existed: bool },
    Search { result_count: usize },
    CreateIndex { field: String, index_type: String },
    RemoveIndex { field: String, index_type: String },
    Sync { entry_count: usize },
    Gc { expired_count: usize },
    Startup { db_path: String },
    Shutdown,
}

/// Metric types for ad hoc performance monitoring.
#[derive(Debug, Clone)]
pub enum MetricType {
    Counter { name: &'static str, value: u64 },
    Gauge { name: &'static str, value: f64 },
    Timer { name: &'static str, duration: Duration },
}

/// Log `op` at the appropriate level and bump the matching counter.
pub fn log_operation(op: &Operation, result: &anyhow::Result<()>) {
    match result {
        Ok(()) => {
            info!(?op, "operation completed");
            OPERATION_COUNTER.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            tracing::error!(?op, error = %e, "operation failed");
            ERROR_COUNTER.fetch_add(1, Ordering::Relaxed);
        }
    }

    match op {
        Operation::Search { .. } => {
            SEARCH_COUNTER.fetch_add(1, Ordering::Relaxed);
        }
        Operation::CreateIndex { .. } | Operation::RemoveIndex { .. } => {
            INDEX_COUNTER.fetch_add(1, Ordering::Relaxed);
        }
        _ => {}
    }
}

pub fn record_metric(metric: MetricType) {
    match metric {
        MetricType::Counter { name, value } => debug!("metric.counter {} = {}", name, value),
        MetricType::Gauge { name, value } => debug!("metric.gauge {} = {}", name, value),
        MetricType::Timer { name, duration } => debug!("metric.timer {} = {:?}", name, duration),
    }
}

/// A process-wide metrics snapshot, as served by `GET /admin/stats`'s
/// ambient-metrics companion (distinct from the store's own `StatsSnapshot`).
pub fn get_metrics() -> serde_json::Value {
    serde_json::json!({
        "operations": {
            "total": OPERATION_COUNTER.load(Ordering::Relaxed),
            "errors": ERROR_COUNTER.load(Ordering::Relaxed),
            "searches": SEARCH_COUNTER.load(Ordering::Relaxed),
            "index_ops": INDEX_COUNTER.load(Ordering::Relaxed),
        },
        "timestamp": Utc::now().to_rfc3339(),
    })
}

/// Scoped timer that logs its own duration on drop.
pub struct PerfTimer {
    name: String,
    start: Instant,
}

impl PerfTimer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for PerfTimer {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        info!(name = %self.name, elapsed_ms = elapsed.as_millis(), "timer completed");
        record_metric(MetricType::Timer {
            name: "perf.timer",
            duration: elapsed,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_operation_counts_success_and_failure() {
        log_operation(&Operation::Get { key: "a".into(), found: true }, &Ok(()));
        log_operation(
            &Operation::Get { key: "b".into(), found: false },
            &Err(anyhow::anyhow!("boom")),
        );
        let metrics = get_metrics();
        assert!(metrics["operations"]["total"].as_u64().unwrap() >= 1);
        assert!(metrics["operations"]["errors"].as_u64().unwrap() >= 1);
    }

    #[test]
    fn perf_timer_logs_on_drop() {
        let _timer = PerfTimer::new("test_timer");
        std::thread::sleep(Duration::from_millis(5));
    }

    #[test]
    fn filter_strings_parse() {
        assert!(EnvFilter::try_new("indexedkv=warn,error").is_ok());
        assert!(EnvFilter::try_new("indexedkv=debug,info").is_ok());
        assert!(EnvFilter::try_new("error").is_ok());
    }
}
