//! Human-readable sizes and ages for reports and expiry records
//!
//! Sizes use decimal units (1K = 1000 bytes), matching what mail quota
//! tooling reports.

use crate::models::{DAY_SECONDS, Timestamp};

/// Whole days elapsed between `timestamp` and `now` (negative if in the future).
#[must_use]
pub fn age_days(now: Timestamp, timestamp: Timestamp) -> i64 {
    (now - timestamp) / DAY_SECONDS
}

/// Right-aligned age column, e.g. ` 3d`.
#[must_use]
pub fn format_age_days(now: Timestamp, timestamp: Timestamp) -> String {
    format!("{:>2}d", age_days(now, timestamp))
}

/// Bytes below 1000, two decimals below 10K, whole kilobytes above.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_kilo(size: u64) -> String {
    if size < 1000 {
        format!("{size:>6}")
    } else if size < 10_000 {
        format!("{:.2}K", size as f64 / 1000.0)
    } else {
        format!("{:>5}K", size / 1000)
    }
}

/// Whole megabytes, e.g. `   12M`.
#[must_use]
pub fn format_mega(size: u64) -> String {
    format!("{:>5}M", size / 1_000_000)
}

/// Pick K, M or G depending on magnitude.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(size: u64) -> String {
    if size < 1_000_000 {
        format_kilo(size)
    } else if size < 1_000_000_000 {
        format_mega(size)
    } else {
        format!("{:.2}G", size as f64 / 1_000_000_000.0)
    }
}

/// `part` as a percentage of `whole`; zero when `whole` is zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
