//! Monotonic timestamps consumed by the control loop.

use tokio::time::Instant;

/// Nanoseconds on a monotonic clock.
///
/// The algorithm only ever compares and subtracts timestamps, so the origin
/// is arbitrary. Callers supplying their own clock must keep it
/// non-decreasing across calls against the same queue.
pub type Timestamp = u64;

/// A monotonic clock reporting nanoseconds since its creation.
///
/// Backed by [tokio::time::Instant], so paused test runtimes can drive it
/// deterministically.
#[derive(Clone, Copy, Debug)]
pub struct Clock {
    anchor: Instant,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    pub fn new() -> Self {
        Self {
            anchor: Instant::now(),
        }
    }

    pub fn now(&self) -> Timestamp {
        // u64 nanoseconds covers roughly 584 years of uptime.
        u64::try_from(self.anchor.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}
