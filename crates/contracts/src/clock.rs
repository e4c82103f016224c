//! Pipeline clock

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in seconds since the UNIX epoch.
///
/// Publishers stamp messages with this and downstream consumers subtract,
/// so every node must use the same clock source.
pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
