//! The interface between the control loop and the storage it manages.

use crate::time::Timestamp;

/// Describes the item store underneath a CoDel-managed queue.
///
/// The control loop never stores items itself: it pops them through this
/// interface, and either hands them back to the caller or releases them.
/// Implementations decide how backlog is accounted (bytes or items) and
/// how a congestion mark is encoded.
pub trait Queue {
    type Item;

    /// The time at which `item` entered the queue.
    fn enqueue_time(&self, item: &Self::Item) -> Timestamp;

    /// Removes and returns the head of the queue.
    ///
    /// Backlog accounting must already reflect the removal once this
    /// returns.
    fn pop_next(&mut self) -> Option<Self::Item>;

    /// Disposes of an item the control loop decided to drop.
    fn release(&mut self, item: Self::Item);

    /// Attempts to mark `item` as having experienced congestion.
    ///
    /// Returns false if the item cannot carry a mark, in which case it is
    /// dropped instead.
    fn try_mark_ecn(&mut self, item: &mut Self::Item) -> bool;

    /// The outstanding backlog, in whatever units the queue accounts in.
    fn backlog(&self) -> u64;
}
