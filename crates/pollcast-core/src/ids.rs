//! Identifier and timestamp helpers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Atomic counter keeping ids unique within the same millisecond.
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Current Unix time in milliseconds.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Generate a process-unique id such as `poll_18c2f0a1b3e_2a`.
#[must_use]
pub fn generate_id(prefix: &str) -> String {
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}_{:x}_{:x}", prefix, now_millis(), counter)
}
