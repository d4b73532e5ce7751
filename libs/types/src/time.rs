//! Wall-clock helper.
//!
//! Wall-clock times are metadata only; ordering inside a book is decided
//! by the per-book admission sequence.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as Unix nanoseconds.
pub fn unix_nanos() -> i64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    (now.as_secs() as i64)
        .saturating_mul(1_000_000_000)
        .saturating_add(now.subsec_nanos() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nanos_are_positive_and_plausible() {
        let ts = unix_nanos();
        // After 2020-01-01 in nanoseconds.
        assert!(ts > 1_577_836_800_000_000_000);
    }
}
