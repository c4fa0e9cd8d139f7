#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Cancellable timers driven by simulated time.
//!
//! Systems advance a [`Scheduler`] with the `dt` carried by the world's
//! `TimeAdvanced` events. Every timer is bound to a [`CancellationToken`]; once
//! the token is cancelled the timer never fires, so a callback scheduled for a
//! turn that has already ended cannot touch the grid.

use std::{cell::Cell, collections::BTreeMap, rc::Rc, time::Duration};

use tracing::trace;

/// Shared flag that disarms every timer it was handed to.
///
/// Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Rc<Cell<bool>>,
}

impl CancellationToken {
    /// Creates a fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the token and every clone of it.
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    /// Reports whether the token was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

/// Identifier returned when a timer is scheduled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
struct Scheduled<T> {
    payload: T,
    token: CancellationToken,
}

/// Pending timers ordered by deadline, then by scheduling order.
#[derive(Debug)]
pub struct Scheduler<T> {
    now: Duration,
    next_id: u64,
    pending: BTreeMap<(Duration, TimerId), Scheduled<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            pending: BTreeMap::new(),
        }
    }
}

impl<T> Scheduler<T> {
    /// Creates an empty scheduler at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated time observed so far.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Number of timers that have neither fired nor been cancelled by id.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Reports whether no timers are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Schedules `payload` to fire once `delay` of simulated time has passed.
    pub fn schedule_after(
        &mut self,
        delay: Duration,
        payload: T,
        token: CancellationToken,
    ) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        let deadline = self.now.saturating_add(delay);
        let _ = self
            .pending
            .insert((deadline, id), Scheduled { payload, token });
        id
    }

    /// Removes the timer with the provided identifier.
    ///
    /// Returns `false` when the timer already fired or never existed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let key = self.pending.keys().find(|(_, timer)| *timer == id).copied();
        key.and_then(|key| self.pending.remove(&key)).is_some()
    }

    /// Drops every pending timer and cancels their tokens.
    pub fn cancel_all(&mut self) {
        for scheduled in self.pending.values() {
            scheduled.token.cancel();
        }
        self.pending.clear();
    }

    /// Advances the clock and returns the payloads whose deadline passed.
    ///
    /// Payloads come back in deadline order. Timers whose token was cancelled
    /// are discarded without firing.
    pub fn advance(&mut self, dt: Duration) -> Vec<T> {
        self.now = self.now.saturating_add(dt);

        let mut fired = Vec::new();
        while let Some(entry) = self.pending.first_entry() {
            if entry.key().0 > self.now {
                break;
            }
            let ((_, id), scheduled) = entry.remove_entry();
            if scheduled.token.is_cancelled() {
                trace!(timer = id.get(), "dropping cancelled timer");
                continue;
            }
            fired.push(scheduled.payload);
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timers_fire_in_deadline_order() {
        let mut scheduler = Scheduler::new();
        let token = CancellationToken::new();
        let _ = scheduler.schedule_after(Duration::from_millis(300), "late", token.clone());
        let _ = scheduler.schedule_after(Duration::from_millis(100), "early", token.clone());
        let _ = scheduler.schedule_after(Duration::from_millis(100), "early-second", token);

        assert!(scheduler.advance(Duration::from_millis(50)).is_empty());
        assert_eq!(
            scheduler.advance(Duration::from_millis(50)),
            vec!["early", "early-second"]
        );
        assert_eq!(scheduler.advance(Duration::from_secs(1)), vec!["late"]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn cancelled_token_suppresses_firing() {
        let mut scheduler = Scheduler::new();
        let token = CancellationToken::new();
        let _ = scheduler.schedule_after(Duration::from_millis(10), 1, token.clone());
        let _ = scheduler.schedule_after(Duration::from_millis(10), 2, CancellationToken::new());

        token.cancel();

        assert_eq!(scheduler.advance(Duration::from_millis(10)), vec![2]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn cancel_by_id_removes_only_that_timer() {
        let mut scheduler = Scheduler::new();
        let first =
            scheduler.schedule_after(Duration::from_millis(5), 'a', CancellationToken::new());
        let _ = scheduler.schedule_after(Duration::from_millis(5), 'b', CancellationToken::new());

        assert!(scheduler.cancel(first));
        assert!(!scheduler.cancel(first));
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.advance(Duration::from_millis(5)), vec!['b']);
    }

    #[test]
    fn cancel_all_disarms_tokens() {
        let mut scheduler = Scheduler::new();
        let token = CancellationToken::new();
        let _ = scheduler.schedule_after(Duration::ZERO, (), token.clone());

        scheduler.cancel_all();

        assert!(token.is_cancelled());
        assert!(scheduler.advance(Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn delays_are_relative_to_current_time() {
        let mut scheduler = Scheduler::new();
        let _ = scheduler.advance(Duration::from_secs(2));
        let _ = scheduler.schedule_after(Duration::from_secs(1), "later", CancellationToken::new());

        assert!(scheduler.advance(Duration::from_millis(999)).is_empty());
        assert_eq!(scheduler.advance(Duration::from_millis(1)), vec!["later"]);
        assert_eq!(scheduler.now(), Duration::from_secs(3));
    }
}
