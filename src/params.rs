//! Configuration of the Controlled Delay algorithm.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("The control interval must be non-zero")]
    ZeroInterval,

    #[error("Target {target:?} exceeds the control interval {interval:?}")]
    TargetExceedsInterval { target: Duration, interval: Duration },
}

/// Parameters to customize the Controlled Delay algorithm.
///
/// These are immutable once a queue has been created, and may be shared by
/// any number of queues using the same configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Parameters {
    /// The sojourn time considered acceptable for an item in a healthy queue.
    pub target: Duration,

    /// A window in which a healthy "target" duration should be reached.
    ///
    /// This is the time constant of the control loop, and is typically much
    /// larger than [Self::target].
    pub interval: Duration,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            target: Duration::from_millis(5),
            interval: Duration::from_millis(100),
        }
    }
}

impl Parameters {
    /// Creates a validated set of parameters.
    pub fn new(target: Duration, interval: Duration) -> Result<Self, Error> {
        if interval.is_zero() {
            return Err(Error::ZeroInterval);
        }
        if target > interval {
            return Err(Error::TargetExceedsInterval { target, interval });
        }
        Ok(Self { target, interval })
    }

    /// The target, in nanoseconds.
    pub fn target_ns(&self) -> u64 {
        saturating_nanos(self.target)
    }

    /// The interval, in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        saturating_nanos(self.interval)
    }
}

fn saturating_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}
