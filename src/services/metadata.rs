//! Size and modification time extraction with platform-specific implementations

use crate::models::Timestamp;
use std::fs::Metadata;
use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

/// Logical file size in bytes
#[must_use]
pub fn logical_size(metadata: &Metadata) -> u64 {
    metadata.len()
}

/// Modification time in whole seconds (Unix platform)
#[cfg(unix)]
#[must_use]
pub fn mtime(metadata: &Metadata) -> Timestamp {
    metadata.mtime()
}

/// Modification time in whole seconds (portable fallback)
#[cfg(not(unix))]
#[must_use]
pub fn mtime(metadata: &Metadata) -> Timestamp {
    metadata.modified().map_or(0, timestamp_of)
}

/// Convert a `SystemTime` to seconds since the epoch, negative before it.
#[must_use]
pub fn timestamp_of(time: SystemTime) -> Timestamp {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_secs()).unwrap_or(i64::MAX),
        Err(before) => i64::try_from(before.duration().as_secs()).map_or(i64::MIN, |s| -s),
    }
}
