use std::sync::OnceLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

static ANCHOR: OnceLock<(Instant, u64)> = OnceLock::new();

/// Current time in nanoseconds since the Unix epoch.
///
/// The epoch offset is sampled once per process; after that the value advances
/// with the monotonic clock, so successive calls never go backwards even if
/// the wall clock is stepped mid-run.
pub fn now_ns() -> u64 {
    let (start, epoch_ns) = ANCHOR.get_or_init(|| {
        let epoch_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        (Instant::now(), epoch_ns)
    });
    epoch_ns + start.elapsed().as_nanos() as u64
}
