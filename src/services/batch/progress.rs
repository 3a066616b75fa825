//! Progress reporting primitives for batch runs.

use crate::models::ProgressSnapshot;
use std::time::{Duration, Instant};

const MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Time-based throttler governing progress event emission.
#[derive(Debug)]
pub struct ProgressThrottler {
    interval: Duration,
    last_emit: Option<Instant>,
    last_emit_bytes: u64,
}

impl Default for ProgressThrottler {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters sampled at one point of a batch run
#[derive(Debug, Clone, Copy)]
pub struct ProgressCounters {
    pub processed_mailboxes: u64,
    pub processed_bytes: u64,
    pub total_mailboxes: u64,
    pub timestamp_ms: u64,
}

impl ProgressThrottler {
    /// Construct a throttler using the default interval of two seconds.
    #[must_use]
    pub fn new() -> Self {
        Self::with_interval(Duration::from_secs(2))
    }

    /// Construct a throttler with the supplied minimum interval.
    #[must_use]
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            last_emit: None,
            last_emit_bytes: 0,
        }
    }

    /// Consider emitting a snapshot for the current counters.
    ///
    /// The first call only starts the clock.
    pub fn consider(&mut self, now: Instant, counters: ProgressCounters) -> Option<ProgressSnapshot> {
        let Some(last_emit) = self.last_emit else {
            self.last_emit = Some(now);
            self.last_emit_bytes = counters.processed_bytes;
            return None;
        };

        let elapsed = now.saturating_duration_since(last_emit);
        if elapsed < self.interval {
            return None;
        }

        let bytes_delta = counters.processed_bytes.saturating_sub(self.last_emit_bytes);
        self.last_emit = Some(now);
        self.last_emit_bytes = counters.processed_bytes;
        Some(snapshot(counters, compute_throughput(bytes_delta, elapsed)))
    }

    /// Emit a final snapshot regardless of the interval.
    pub fn force_emit(&mut self, now: Instant, counters: ProgressCounters) -> ProgressSnapshot {
        let throughput = self.last_emit.and_then(|last_emit| {
            let elapsed = now.saturating_duration_since(last_emit);
            let bytes_delta = counters.processed_bytes.saturating_sub(self.last_emit_bytes);
            compute_throughput(bytes_delta, elapsed)
        });

        self.last_emit = Some(now);
        self.last_emit_bytes = counters.processed_bytes;
        snapshot(counters, throughput)
    }
}

fn snapshot(counters: ProgressCounters, throughput: Option<u64>) -> ProgressSnapshot {
    ProgressSnapshot {
        timestamp_ms: counters.timestamp_ms,
        processed_mailboxes: counters.processed_mailboxes,
        processed_bytes: counters.processed_bytes,
        total_mailboxes: counters.total_mailboxes,
        recent_throughput_bytes_per_sec: throughput,
    }
}

fn compute_throughput(bytes_delta: u64, elapsed: Duration) -> Option<u64> {
    let nanos = elapsed.as_nanos();
    if nanos == 0 {
        return None;
    }

    let numerator = u128::from(bytes_delta) * 1_000_000_000u128;
    let rate = numerator / nanos;
    u64::try_from(rate.min(u128::from(u64::MAX))).ok()
}
