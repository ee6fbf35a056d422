//! Per-queue state of the control loop.

use crate::rec_inv_sqrt::RecInvSqrt;
use crate::time::Timestamp;

/// Mutable state persisted across dequeue calls against a single queue.
///
/// A `Vars` is owned by exactly one queue and is mutated only by
/// [crate::codel::dequeue]. It carries no internal locking: callers must
/// serialize dequeues against a queue with whatever already protects that
/// queue's storage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Vars {
    // Drops performed since the dropping state was last (re-)entered.
    pub(crate) count: u32,

    // True while the control loop is actively dropping.
    pub(crate) dropping: bool,

    // Approximation of 1/sqrt(count).
    pub(crate) rec_inv_sqrt: RecInvSqrt,

    // The instant at which the queue will have been continuously above
    // target for a full interval, or zero if not above target.
    pub(crate) first_above_time: Timestamp,

    // Next scheduled drop while dropping, or the last drop otherwise.
    pub(crate) drop_next: Timestamp,

    // Items dropped by the most recent dequeue call.
    pub(crate) drop_count: u32,

    // Items marked by the most recent dequeue call.
    pub(crate) ecn_mark: u32,
}

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the control loop to its initial, idle state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn dropping(&self) -> bool {
        self.dropping
    }

    pub fn rec_inv_sqrt(&self) -> RecInvSqrt {
        self.rec_inv_sqrt
    }

    /// The end of the grace period of the current above-target excursion,
    /// if there is one.
    pub fn first_above_time(&self) -> Option<Timestamp> {
        (self.first_above_time != 0).then_some(self.first_above_time)
    }

    pub fn drop_next(&self) -> Timestamp {
        self.drop_next
    }

    /// Items dropped during the most recent dequeue call.
    pub fn drop_count(&self) -> u32 {
        self.drop_count
    }

    /// Items congestion-marked during the most recent dequeue call.
    pub fn ecn_mark(&self) -> u32 {
        self.ecn_mark
    }

    // Bumps the drop count, keeping the estimate in lockstep with it.
    pub(crate) fn increment_count(&mut self) {
        self.count = self.count.saturating_add(1);
        self.rec_inv_sqrt = self.rec_inv_sqrt.newton_step(self.count);
    }
}
