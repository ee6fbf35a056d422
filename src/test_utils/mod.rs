//! Utilities to help with testing the control loop

use crate::codel;
use crate::params::Parameters;
use crate::queue::Queue;
use crate::time::Timestamp;
use crate::vars::Vars;
use std::collections::VecDeque;

pub const MS: u64 = 1_000_000;

#[derive(Debug)]
pub struct TestItem {
    pub id: usize,
    pub enqueued: Timestamp,
    pub ecn_capable: bool,
    pub marked: bool,
}

/// An item store with scripted enqueue times.
///
/// Backlog is accounted in items, plus `extra_backlog` to stand in for
/// work queued elsewhere. Released items are remembered by id.
#[derive(Debug, Default)]
pub struct TestQueue {
    items: VecDeque<TestItem>,
    next_id: usize,
    pub extra_backlog: u64,
    pub released: Vec<usize>,
}

impl TestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, enqueued: Timestamp, ecn_capable: bool) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.items.push_back(TestItem {
            id,
            enqueued,
            ecn_capable,
            marked: false,
        });
        id
    }
}

impl Queue for TestQueue {
    type Item = TestItem;

    fn enqueue_time(&self, item: &TestItem) -> Timestamp {
        item.enqueued
    }

    fn pop_next(&mut self) -> Option<TestItem> {
        self.items.pop_front()
    }

    fn release(&mut self, item: TestItem) {
        self.released.push(item.id);
    }

    fn try_mark_ecn(&mut self, item: &mut TestItem) -> bool {
        if item.ecn_capable {
            item.marked = true;
        }
        item.ecn_capable
    }

    fn backlog(&self) -> u64 {
        self.items.len() as u64 + self.extra_backlog
    }
}

/// An endless queue whose head has always waited exactly `sojourn`.
#[derive(Debug)]
pub struct SyntheticQueue {
    pub now: Timestamp,
    pub sojourn: u64,
    pub ecn_capable: bool,
    pub popped: usize,
    pub released: usize,
}

impl SyntheticQueue {
    pub fn new(sojourn: u64) -> Self {
        Self {
            now: 0,
            sojourn,
            ecn_capable: false,
            popped: 0,
            released: 0,
        }
    }
}

impl Queue for SyntheticQueue {
    type Item = TestItem;

    fn enqueue_time(&self, item: &TestItem) -> Timestamp {
        item.enqueued
    }

    fn pop_next(&mut self) -> Option<TestItem> {
        let id = self.popped;
        self.popped += 1;
        Some(TestItem {
            id,
            enqueued: self.now.saturating_sub(self.sojourn),
            ecn_capable: self.ecn_capable,
            marked: false,
        })
    }

    fn release(&mut self, _item: TestItem) {
        self.released += 1;
    }

    fn try_mark_ecn(&mut self, item: &mut TestItem) -> bool {
        if item.ecn_capable {
            item.marked = true;
        }
        item.ecn_capable
    }

    fn backlog(&self) -> u64 {
        u64::MAX
    }
}

/// Drives [codel::dequeue] against a [TestQueue] on a scripted clock.
pub struct TestHarness {
    pub queue: TestQueue,
    pub vars: Vars,
    pub params: Parameters,
    pub now: Timestamp,
    pub backlog_threshold: u64,
    pub overloaded: bool,
}

impl TestHarness {
    pub fn new(params: Parameters) -> Self {
        Self {
            queue: TestQueue::new(),
            vars: Vars::new(),
            params,
            now: 0,
            backlog_threshold: 0,
            overloaded: false,
        }
    }

    // Add a plain item to the queue at "now"
    pub fn push(&mut self) -> &mut Self {
        self.queue.push(self.now, false);
        self
    }

    // Add `n` plain items to the queue at "now"
    pub fn push_n(&mut self, n: usize) -> &mut Self {
        for _ in 0..n {
            self.push();
        }
        self
    }

    // Add an ECN-capable item to the queue at "now"
    pub fn push_ecn(&mut self) -> &mut Self {
        self.queue.push(self.now, true);
        self
    }

    // Wait for a certain length of time
    pub fn wait(&mut self, ns: u64) -> &mut Self {
        self.now += ns;
        self
    }

    pub fn dequeue(&mut self) -> Option<TestItem> {
        codel::dequeue(
            &mut self.queue,
            self.backlog_threshold,
            &mut self.vars,
            &self.params,
            self.now,
            self.overloaded,
        )
    }

    // Dequeue, and assert that item `id` was delivered without any drops.
    pub fn expect_dequeue(&mut self, id: usize) -> &mut Self {
        self.expect_drops(0, Some(id))
    }

    // Dequeue, and assert that `drops` items were dropped before `delivered`
    // came out of the queue.
    pub fn expect_drops(&mut self, drops: u32, delivered: Option<usize>) -> &mut Self {
        let item = self.dequeue();
        assert_eq!(
            item.as_ref().map(|item| item.id),
            delivered,
            "Unexpected delivery at {now} ms\n{vars:?}",
            now = self.now / MS,
            vars = self.vars,
        );
        assert_eq!(
            self.vars.drop_count(),
            drops,
            "Unexpected drops at {now} ms\n{vars:?}",
            now = self.now / MS,
            vars = self.vars,
        );
        self
    }
}
