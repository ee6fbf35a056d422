//! An implementation of the Controlled Delay algorithm.
//!
//! Refer to https://queue.acm.org/appendices/codel.html for
//! additional context.
//!
//! Controlled Delay (or "CoDel") manages a queue by watching how long items
//! sit in it (their "sojourn time"), rather than how many items it holds.
//!
//! While observing a queue for an interval:
//! - If any item moves through the queue faster than the target, the queue
//!   is working as expected.
//! - If no item beats the target for a full interval, the queue holds a
//!   standing backlog. CoDel starts dropping (or marking) items, and drops
//!   them at a rate proportional to the square root of the number of drops
//!   since dropping began, until the sojourn time recovers.

#[cfg(feature = "probes")]
use crate::probes;
use crate::params::Parameters;
use crate::queue::Queue;
use crate::rec_inv_sqrt::{control_law, RecInvSqrt};
use crate::time::Timestamp;
use crate::vars::Vars;

use tracing::{event, Level};

/// Re-entering the dropping state within this many intervals of the last
/// drop resumes from the previous drop rate.
const RECENT_DROP_INTERVALS: u64 = 8;

/// Decides whether the queue has been above target for a full interval.
///
/// `enqueued` is the enqueue time of the item just taken from the head of
/// the queue, or `None` if the queue was empty, and `backlog` is what
/// remains queued behind it. Dropping is suppressed entirely while the
/// backlog is at or below `backlog_threshold`.
///
/// The only state this touches is the start of the current above-target
/// excursion.
pub fn should_drop(
    enqueued: Option<Timestamp>,
    backlog: u64,
    backlog_threshold: u64,
    vars: &mut Vars,
    params: &Parameters,
    now: Timestamp,
) -> bool {
    let Some(enqueued) = enqueued else {
        vars.first_above_time = 0;
        return false;
    };

    let sojourn = now.saturating_sub(enqueued);

    // If the queue is moving quickly enough, or there's barely anything left
    // in it, we shouldn't drop anything.
    //
    // This also clears the tracking that we need to hit the target.
    if sojourn < params.target_ns() || backlog <= backlog_threshold {
        vars.first_above_time = 0;
        return false;
    }

    if vars.first_above_time == 0 {
        // If we haven't started an interval yet, do so now.
        vars.first_above_time = now.saturating_add(params.interval_ns());
        return false;
    }

    now > vars.first_above_time
}

/// Takes the next item to deliver from `queue`, dropping or marking items
/// as the control loop demands.
///
/// Returns `None` once the queue is empty, which also returns the control
/// loop to its idle state. After the call, [Vars::drop_count] and
/// [Vars::ecn_mark] report what happened to items along the way.
///
/// When `overloaded` is set, items are never marked; congestion is always
/// signalled by dropping.
///
/// `vars` must belong to `queue`, and calls against the pair must be
/// serialized by the caller.
pub fn dequeue<Q: Queue>(
    queue: &mut Q,
    backlog_threshold: u64,
    vars: &mut Vars,
    params: &Parameters,
    now: Timestamp,
    overloaded: bool,
) -> Option<Q::Item> {
    Dequeue {
        queue,
        backlog_threshold,
        vars,
        params,
        now,
        overloaded,
    }
    .run()
}

// What happened to an item once congestion was signalled on it.
enum Signal<T> {
    // The item carries a mark, and should be delivered.
    Marked(T),
    // The item was dropped; this is what came out of the queue next.
    Dropped(Option<T>),
}

// A single call to [dequeue].
struct Dequeue<'a, Q: Queue> {
    queue: &'a mut Q,
    backlog_threshold: u64,
    vars: &'a mut Vars,
    params: &'a Parameters,
    now: Timestamp,
    overloaded: bool,
}

impl<Q: Queue> Dequeue<'_, Q> {
    fn run(mut self) -> Option<Q::Item> {
        self.vars.drop_count = 0;
        self.vars.ecn_mark = 0;

        let Some(mut item) = self.queue.pop_next() else {
            self.vars.first_above_time = 0;
            self.leave_dropping();
            return None;
        };
        let above_target = self.should_drop(&item);

        if self.vars.dropping {
            if !above_target {
                // The sojourn time has recovered.
                self.leave_dropping();
                return Some(item);
            }
        } else if above_target {
            self.enter_dropping();
            match self.signal(item) {
                Signal::Marked(item) => return Some(item),
                Signal::Dropped(next) => item = next?,
            }
        } else {
            return Some(item);
        }

        // It's time for the next drop, possibly several of them: a large
        // backlog can leave the schedule far enough behind that the next drop
        // is already due.
        while self.vars.dropping && self.now >= self.vars.drop_next {
            self.vars.increment_count();
            self.vars.drop_next = control_law(
                self.vars.drop_next,
                self.params.interval_ns(),
                self.vars.rec_inv_sqrt,
            );
            match self.signal(item) {
                Signal::Marked(item) => return Some(item),
                Signal::Dropped(next) => item = next?,
            }
        }

        // The item which ends a run of drops is marked on its way out, even
        // if the queue has recovered.
        if self.vars.drop_count > 0 && !self.overloaded && self.queue.try_mark_ecn(&mut item) {
            self.vars.ecn_mark = self.vars.ecn_mark.saturating_add(1);
            event!(Level::TRACE, count = self.vars.count, "Marked item ending a drop run");
        }
        Some(item)
    }

    fn should_drop(&mut self, item: &Q::Item) -> bool {
        should_drop(
            Some(self.queue.enqueue_time(item)),
            self.queue.backlog(),
            self.backlog_threshold,
            self.vars,
            self.params,
            self.now,
        )
    }

    fn sojourn(&self, item: &Q::Item) -> u64 {
        self.now.saturating_sub(self.queue.enqueue_time(item))
    }

    fn enter_dropping(&mut self) {
        let interval = self.params.interval_ns();
        let vars = &mut *self.vars;
        vars.dropping = true;

        // If we went above target soon after we last dropped, assume the
        // drop rate that controlled the queue last time is a good starting
        // point now.
        let since_last_drop = self.now.saturating_sub(vars.drop_next);
        if vars.count > 2 && since_last_drop < interval.saturating_mul(RECENT_DROP_INTERVALS) {
            vars.count -= 2;
            vars.rec_inv_sqrt = vars.rec_inv_sqrt.newton_step(vars.count);
        } else {
            vars.count = 1;
            vars.rec_inv_sqrt = RecInvSqrt::MAX;
        }
        vars.drop_next = control_law(self.now, interval, vars.rec_inv_sqrt);

        event!(
            Level::TRACE,
            count = vars.count,
            drop_next = vars.drop_next,
            "Enter dropping state"
        );
        #[cfg(feature = "probes")]
        probes::dropping__start!(|| (vars.count, vars.drop_next));
    }

    fn leave_dropping(&mut self) {
        if !self.vars.dropping {
            return;
        }
        self.vars.dropping = false;

        event!(Level::TRACE, count = self.vars.count, "Exit dropping state");
        #[cfg(feature = "probes")]
        probes::dropping__done!(|| self.vars.count);
    }

    // Marks the item if possible, otherwise drops it and takes the next one.
    fn signal(&mut self, mut item: Q::Item) -> Signal<Q::Item> {
        let sojourn = self.sojourn(&item);

        if !self.overloaded && self.queue.try_mark_ecn(&mut item) {
            self.vars.ecn_mark = self.vars.ecn_mark.saturating_add(1);
            event!(Level::TRACE, sojourn, count = self.vars.count, "Marked item");
            #[cfg(feature = "probes")]
            probes::item__marked!(|| (sojourn, self.vars.count));
            return Signal::Marked(item);
        }

        self.queue.release(item);
        self.vars.drop_count = self.vars.drop_count.saturating_add(1);
        event!(Level::TRACE, sojourn, count = self.vars.count, "Dropped item");
        #[cfg(feature = "probes")]
        probes::item__dropped!(|| (sojourn, self.vars.count));

        let Some(next) = self.queue.pop_next() else {
            self.vars.first_above_time = 0;
            self.leave_dropping();
            return Signal::Dropped(None);
        };
        if !self.should_drop(&next) {
            self.leave_dropping();
        }
        Signal::Dropped(Some(next))
    }
}
