use std::time::Duration;

/// Running min/max/sum/count over recorded values.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Histogram {
    pub count: u64,
    pub sum: u64,
    pub min: u64,
    pub max: u64,
}

impl Histogram {
    pub fn record(&mut self, value: u64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum = self.sum.saturating_add(value);
    }

    pub fn mean(&self) -> Option<u64> {
        (self.count > 0).then(|| self.sum / self.count)
    }
}

/// Counters for one scheduler's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TickMetrics {
    pub ticks: u64,
    /// Ticks skipped because `max_in_flight` fetches were still running.
    pub coalesced_ticks: u64,
    pub fetches_ok: u64,
    pub fetches_failed: u64,
    pub fetches_cancelled: u64,
    /// Times a slow fetch made the loader visible.
    pub loader_shown: u64,
    pub peak_in_flight: usize,
    /// Settle latency in milliseconds, cancelled fetches excluded.
    pub fetch_latency_ms: Histogram,
}

impl TickMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetches_started(&self) -> u64 {
        self.ticks - self.coalesced_ticks
    }

    pub fn record_in_flight(&mut self, in_flight: usize) {
        self.peak_in_flight = self.peak_in_flight.max(in_flight);
    }

    pub fn record_latency(&mut self, elapsed: Duration) {
        self.fetch_latency_ms.record(duration_millis(elapsed));
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
pub fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
