//! Wall-clock helpers.
//!
//! All timestamps in the engine are milliseconds since the Unix epoch. The
//! server clock is the sole authority for completion times; clients never
//! supply timestamps.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time in milliseconds since the Unix epoch.
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
