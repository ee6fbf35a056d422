//! A first-in, first-out packet queue managed by Controlled Delay.
//!
//! This is the classic "codel" queueing discipline: a tail-drop FIFO with a
//! hard length limit, whose dequeue path runs [codel::dequeue].

use crate::codel;
use crate::params::Parameters;
#[cfg(feature = "probes")]
use crate::probes;
use crate::queue::Queue;
use crate::stats::Stats;
use crate::time::{Clock, Timestamp};
use crate::vars::Vars;

use debug_ignore::DebugIgnore;
use derive_where::derive_where;
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{event, instrument, Level};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Queue is at its limit of {limit} packets")]
    Overlimit { limit: usize },
}

/// Interface for items stored in a [Fifo].
pub trait Packet {
    /// Size of the packet, in bytes.
    fn size(&self) -> u32;

    /// Sets the "congestion experienced" mark.
    ///
    /// Returns false if the packet's transport cannot carry the mark.
    ///
    /// By default, packets refuse to be marked.
    fn set_ce(&mut self) -> bool {
        false
    }
}

/// Units in which the backlog is measured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Accounting {
    #[default]
    Bytes,
    Packets,
}

/// Configuration of a [Fifo], beyond the control loop parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// The maximum number of packets held by the queue.
    pub limit: usize,

    /// How the backlog is measured.
    pub accounting: Accounting,

    /// Backlog, in units of [Self::accounting], at or below which nothing
    /// is dropped regardless of delay.
    ///
    /// Typically one MTU in byte mode, so that the last packet in the queue
    /// is never dropped.
    pub backlog_threshold: u64,

    /// Whether congestion may be signalled by marking packets instead of
    /// dropping them.
    pub ecn: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limit: 1000,
            accounting: Accounting::Bytes,
            backlog_threshold: 1514,
            ecn: false,
        }
    }
}

struct Entry<P> {
    packet: P,
    enqueued: Timestamp,
}

// The storage underneath the control loop.
#[derive_where(Debug)]
struct Backlog<P> {
    entries: DebugIgnore<VecDeque<Entry<P>>>,
    bytes: u64,
    accounting: Accounting,
    ecn: bool,

    // Bytes released by the control loop, not yet folded into stats.
    released_bytes: u64,
}

impl<P: Packet> Backlog<P> {
    fn new(config: &Config) -> Self {
        Self {
            entries: DebugIgnore(VecDeque::new()),
            bytes: 0,
            accounting: config.accounting,
            ecn: config.ecn,
            released_bytes: 0,
        }
    }

    fn push(&mut self, entry: Entry<P>) {
        self.bytes += u64::from(entry.packet.size());
        self.entries.push_back(entry);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<P: Packet> Queue for Backlog<P> {
    type Item = Entry<P>;

    fn enqueue_time(&self, entry: &Entry<P>) -> Timestamp {
        entry.enqueued
    }

    fn pop_next(&mut self) -> Option<Entry<P>> {
        let entry = self.entries.pop_front()?;
        self.bytes -= u64::from(entry.packet.size());
        Some(entry)
    }

    fn release(&mut self, entry: Entry<P>) {
        self.released_bytes += u64::from(entry.packet.size());
    }

    fn try_mark_ecn(&mut self, entry: &mut Entry<P>) -> bool {
        self.ecn && entry.packet.set_ce()
    }

    fn backlog(&self) -> u64 {
        match self.accounting {
            Accounting::Bytes => self.bytes,
            Accounting::Packets => self.entries.len() as u64,
        }
    }
}

/// A bounded FIFO whose standing delay is controlled by CoDel.
///
/// Like [Vars], a `Fifo` has no internal locking; wrap it in whatever
/// serializes access to it.
#[derive_where(Debug)]
pub struct Fifo<P> {
    config: Config,
    params: Parameters,
    vars: Vars,
    stats: Stats,
    clock: Clock,
    backlog: Backlog<P>,
}

impl<P: Packet> Fifo<P> {
    pub fn new(config: Config, params: Parameters) -> Self {
        Self {
            backlog: Backlog::new(&config),
            config,
            params,
            vars: Vars::new(),
            stats: Stats::default(),
            clock: Clock::new(),
        }
    }

    /// Appends a packet, timestamped with the queue's own clock.
    pub fn enqueue(&mut self, packet: P) -> Result<(), Error> {
        let now = self.clock.now();
        self.enqueue_at(packet, now)
    }

    /// Appends a packet which arrived at `now`.
    ///
    /// If the queue is full, the packet is discarded.
    pub fn enqueue_at(&mut self, packet: P, now: Timestamp) -> Result<(), Error> {
        let size = packet.size();
        if self.backlog.len() >= self.config.limit {
            self.stats.drop_overlimit += 1;
            event!(
                Level::DEBUG,
                limit = self.config.limit,
                size,
                "Queue full, dropping packet"
            );
            #[cfg(feature = "probes")]
            probes::tail__dropped!(|| size);
            return Err(Error::Overlimit {
                limit: self.config.limit,
            });
        }

        self.stats.maxpacket = self.stats.maxpacket.max(size);
        self.backlog.push(Entry {
            packet,
            enqueued: now,
        });
        Ok(())
    }

    /// Takes the next packet to send, if any.
    ///
    /// The queue considers itself overloaded, and stops marking in favor of
    /// dropping, while it is at its limit.
    pub fn dequeue(&mut self) -> Option<P> {
        let now = self.clock.now();
        let overloaded = self.backlog.len() >= self.config.limit;
        self.dequeue_at(now, overloaded)
    }

    /// Takes the next packet to send at `now`.
    pub fn dequeue_at(&mut self, now: Timestamp, overloaded: bool) -> Option<P> {
        let entry = codel::dequeue(
            &mut self.backlog,
            self.config.backlog_threshold,
            &mut self.vars,
            &self.params,
            now,
            overloaded,
        );

        self.stats.dropped += u64::from(self.vars.drop_count());
        self.stats.marked += u64::from(self.vars.ecn_mark());
        self.stats.dropped_bytes += std::mem::take(&mut self.backlog.released_bytes);

        let entry = entry?;
        self.stats.delivered += 1;
        self.stats.ldelay = now.saturating_sub(entry.enqueued);
        Some(entry.packet)
    }

    /// Replaces the queue configuration.
    ///
    /// If the new limit is below the current length, packets are dropped
    /// from the head until the queue fits.
    #[instrument(level = "debug", skip(self), name = "Fifo::set_config")]
    pub fn set_config(&mut self, config: Config) {
        self.backlog.accounting = config.accounting;
        self.backlog.ecn = config.ecn;
        self.config = config;

        let mut trimmed = 0;
        while self.backlog.len() > self.config.limit {
            let Some(entry) = self.backlog.pop_next() else {
                break;
            };
            self.stats.dropped += 1;
            self.stats.dropped_bytes += u64::from(entry.packet.size());
            trimmed += 1;
        }
        if trimmed > 0 {
            event!(Level::DEBUG, trimmed, "Dropped packets above the new limit");
        }
    }

    /// Replaces the control loop parameters.
    ///
    /// The control loop state carries over, and adapts to the new
    /// parameters from the next dequeue.
    #[instrument(level = "debug", skip(self), name = "Fifo::set_parameters")]
    pub fn set_parameters(&mut self, params: Parameters) {
        self.params = params;
    }

    /// Discards every queued packet and returns the control loop to idle.
    pub fn reset(&mut self) {
        self.backlog.entries.clear();
        self.backlog.bytes = 0;
        self.backlog.released_bytes = 0;
        self.vars.reset();
    }

    pub fn len(&self) -> usize {
        self.backlog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backlog.len() == 0
    }

    /// The current backlog, in units of [Config::accounting].
    pub fn backlog(&self) -> u64 {
        Queue::backlog(&self.backlog)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn vars(&self) -> &Vars {
        &self.vars
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }
}
