//! codel is an implementation of Controlled Delay active queue management.
//!
//! CoDel decides, every time an item is taken from a queue, whether that
//! item should be delivered, congestion-marked, or dropped. The decision is
//! based solely on how long items have been waiting in the queue, not on
//! how many of them there are.
//!
//! # Usage
//!
//! * The core of this crate is [codel::dequeue]. It is generic over a
//!   [queue::Queue], which describes the storage underneath the control
//!   loop, and mutates a [vars::Vars] owned by that queue.
//! * [params::Parameters] configure the control loop, and may be shared
//!   by any number of queues.
//! * [fifo::Fifo] is a ready-made bounded queue built on the core.
//!
//! Nothing in this crate locks. Callers serialize dequeues against a queue
//! with whatever already protects that queue's storage.
//!
//! # DTrace probes
//!
//! codel contains a number of DTrace USDT probes, which fire as the control
//! loop acts on a queue. The full list of probes is:
//!
//! - `dropping-start`: Fires when the control loop enters the dropping state.
//! - `dropping-done`: Fires when the control loop leaves the dropping state.
//! - `item-dropped`: Fires when the control loop drops an item.
//! - `item-marked`: Fires when the control loop marks an item instead of
//!   dropping it.
//! - `tail-dropped`: Fires when a [fifo::Fifo] refuses a packet because it
//!   is full.
//!
//! The existence of the probes is behind the `"probes"` feature, which is
//! enabled by default. Probes are zero-cost unless they are explicitly enabled,
//! by tracing the program with the `dtrace(1)` command-line tool. On most
//! systems they must first be registered with [register_probes].

// Public API
pub mod codel;
pub mod fifo;
pub mod params;
pub mod queue;
pub mod rec_inv_sqrt;
pub mod stats;
pub mod time;
pub mod vars;

#[cfg(test)]
mod test_utils;

/// Registers this crate's USDT probes with the DTrace kernel module.
///
/// This is technically fallible, although extremely unlikely to fail in
/// practice. Whether a failure matters is up to the application.
#[cfg(feature = "probes")]
pub fn register_probes() -> Result<(), usdt::Error> {
    usdt::register_probes()
}

/// USDT probes for tracing how codel manages queues.
#[cfg(feature = "probes")]
#[usdt::provider(provider = "codel")]
mod probes {
    /// Fires when a queue has been above target for a full interval, and the
    /// control loop starts dropping.
    ///
    /// Includes the drop count it resumes from, and the time of the next
    /// scheduled drop.
    fn dropping__start(count: u32, drop_next: u64) {}

    /// Fires when the control loop stops dropping, either because the
    /// sojourn time recovered or the queue emptied.
    fn dropping__done(count: u32) {}

    /// Fires when an item is dropped, with its sojourn time in nanoseconds.
    fn item__dropped(sojourn: u64, count: u32) {}

    /// Fires when an item is marked instead of dropped, with its sojourn time
    /// in nanoseconds.
    fn item__marked(sojourn: u64, count: u32) {}

    /// Fires when a full queue refuses a packet, with its size in bytes.
    fn tail__dropped(size: u32) {}
}
