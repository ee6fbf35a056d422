//! Counters describing what a managed queue did with its items.

/// Cumulative statistics for a CoDel-managed queue.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stats {
    /// Items handed back to callers.
    pub delivered: u64,

    /// Items dropped by the control loop.
    pub dropped: u64,

    /// Bytes of the items dropped by the control loop.
    pub dropped_bytes: u64,

    /// Items congestion-marked instead of dropped.
    pub marked: u64,

    /// Items refused at enqueue because the queue was full.
    pub drop_overlimit: u64,

    /// The largest item seen, in bytes.
    pub maxpacket: u32,

    /// Sojourn time of the last delivered item, in nanoseconds.
    pub ldelay: u64,
}

impl std::ops::Add for Stats {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            delivered: self.delivered + other.delivered,
            dropped: self.dropped + other.dropped,
            dropped_bytes: self.dropped_bytes + other.dropped_bytes,
            marked: self.marked + other.marked,
            drop_overlimit: self.drop_overlimit + other.drop_overlimit,
            maxpacket: self.maxpacket.max(other.maxpacket),
            ldelay: self.ldelay.max(other.ldelay),
        }
    }
}

impl Stats {
    /// Returns the total number of items which never reached a caller.
    pub fn all_drops(&self) -> u64 {
        self.dropped + self.drop_overlimit
    }
}
