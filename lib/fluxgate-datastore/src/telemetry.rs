use std::time::Duration;

use metrics::{counter, histogram, Counter, Histogram};

/// A sink for write statistics.
pub trait WriteStatistics: Send + Sync {
    /// Records a successful write, and how long it took from the start of processing.
    fn record_write(&self, elapsed: Duration);

    /// Records a failed write.
    fn record_failure(&self) {}
}

/// Write statistics reported through the `metrics` facade.
///
/// Emits:
///
/// - `fluxgate_influxdbv2_write_duration_seconds` (histogram)
/// - `fluxgate_influxdbv2_writes_total` (counter)
/// - `fluxgate_influxdbv2_write_failures_total` (counter)
///
/// Handles are registered against whichever recorder is installed at construction time.
#[derive(Clone)]
pub struct MetricsWriteStatistics {
    write_duration: Histogram,
    writes: Counter,
    write_failures: Counter,
}

impl MetricsWriteStatistics {
    /// Creates a new `MetricsWriteStatistics`, registering its metrics.
    pub fn new() -> Self {
        Self {
            write_duration: histogram!(Self::write_duration_name()),
            writes: counter!(Self::writes_name()),
            write_failures: counter!(Self::write_failures_name()),
        }
    }

    /// Name of the write duration histogram.
    pub const fn write_duration_name() -> &'static str {
        "fluxgate_influxdbv2_write_duration_seconds"
    }

    /// Name of the successful writes counter.
    pub const fn writes_name() -> &'static str {
        "fluxgate_influxdbv2_writes_total"
    }

    /// Name of the failed writes counter.
    pub const fn write_failures_name() -> &'static str {
        "fluxgate_influxdbv2_write_failures_total"
    }
}

impl WriteStatistics for MetricsWriteStatistics {
    fn record_write(&self, elapsed: Duration) {
        self.write_duration.record(elapsed);
        self.writes.increment(1);
    }

    fn record_failure(&self) {
        self.write_failures.increment(1);
    }
}
