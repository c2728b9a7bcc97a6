//! Global simulated time and the two sets of signals with pending work.
//!
//! [`EventScheduler`] keeps real time, the delta index within the current
//! instant, the stop time, and two registration sets: signals holding delayed
//! changes (checked once per real-time step) and signals holding a zero-delay
//! change (checked once per delta round). Both sets preserve registration
//! order so every run over the same circuit visits signals identically.
//!
//! A batch taken with [`take_delta_batch`](EventScheduler::take_delta_batch)
//! or [`take_timed_batch`](EventScheduler::take_timed_batch) stays registered
//! until each member is handed back through `finish_*`; a member written again
//! while its batch is in flight is therefore never queued twice.

use std::collections::HashSet;

use crate::ids::SignalId;
use crate::time::SimTime;

/// Lifecycle of a simulation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum SchedulerState {
    /// Built but not started; time and delta are zero.
    #[default]
    Idle,
    /// Stepping towards the stop time.
    Running,
    /// The stop time was reached or the run was cancelled.
    Stopped,
}

#[derive(Debug, Default)]
struct RegistrationSet {
    queue: Vec<SignalId>,
    members: HashSet<SignalId>,
}

impl RegistrationSet {
    fn register(&mut self, id: SignalId) -> bool {
        if self.members.insert(id) {
            self.queue.push(id);
            true
        } else {
            false
        }
    }

    fn take_batch(&mut self) -> Vec<SignalId> {
        std::mem::take(&mut self.queue)
    }

    fn finish(&mut self, id: SignalId, exhausted: bool) {
        if exhausted {
            self.members.remove(&id);
        } else {
            self.queue.push(id);
        }
    }

    fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Owner of simulated time and of the pending-work registrations.
#[derive(Debug, Default)]
pub struct EventScheduler {
    now: SimTime,
    stop_time: u64,
    state: SchedulerState,
    timed: RegistrationSet,
    delta: RegistrationSet,
}

impl EventScheduler {
    /// Creates an idle scheduler at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current real time and delta.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Returns the current real time.
    pub fn time(&self) -> u64 {
        self.now.time
    }

    /// Returns the current delta index within the instant.
    pub fn delta(&self) -> u64 {
        self.now.delta
    }

    /// Returns the configured stop time.
    pub fn stop_time(&self) -> u64 {
        self.stop_time
    }

    /// Sets the real time at which the run stops.
    pub fn set_stop_time(&mut self, stop_time: u64) {
        self.stop_time = stop_time;
    }

    /// Returns `true` once real time has reached the stop time.
    pub fn reached_stop(&self) -> bool {
        self.now.time >= self.stop_time
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: SchedulerState) {
        self.state = state;
    }

    /// Registers a signal for real-time notification. Returns `false` if it already was.
    pub fn register_timed(&mut self, id: SignalId) -> bool {
        self.timed.register(id)
    }

    /// Registers a signal for delta notification. Returns `false` if it already was.
    pub fn register_delta(&mut self, id: SignalId) -> bool {
        self.delta.register(id)
    }

    /// Returns `true` if any signal still holds zero-delay work.
    pub fn has_delta_work(&self) -> bool {
        !self.delta.is_empty()
    }

    /// Returns `true` if any signal still holds delayed work.
    pub fn has_timed_work(&self) -> bool {
        !self.timed.is_empty()
    }

    /// Returns the signals currently registered for delta notification.
    pub fn delta_registrations(&self) -> impl Iterator<Item = SignalId> + '_ {
        self.delta.queue.iter().copied()
    }

    /// Returns the signals currently registered for real-time notification.
    pub fn timed_registrations(&self) -> impl Iterator<Item = SignalId> + '_ {
        self.timed.queue.iter().copied()
    }

    /// Advances to the next delta and hands out the signals to apply in it.
    pub fn take_delta_batch(&mut self) -> (u64, Vec<SignalId>) {
        self.now = self.now.next_delta();
        (self.now.delta, self.delta.take_batch())
    }

    /// Hands a signal back after a delta apply; exhausted signals de-register.
    pub fn finish_delta(&mut self, id: SignalId, exhausted: bool) {
        self.delta.finish(id, exhausted);
    }

    /// Advances real time by one unit, resetting the delta index.
    pub fn advance_time(&mut self) -> u64 {
        self.now = self.now.next_instant();
        self.now.time
    }

    /// Hands out the signals registered for real-time notification.
    pub fn take_timed_batch(&mut self) -> Vec<SignalId> {
        self.timed.take_batch()
    }

    /// Hands a signal back after a real-time apply; exhausted signals de-register.
    pub fn finish_timed(&mut self, id: SignalId, exhausted: bool) {
        self.timed.finish(id, exhausted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(i: u32) -> SignalId {
        SignalId::from_raw(i)
    }

    #[test]
    fn starts_idle_at_zero() {
        let s = EventScheduler::new();
        assert_eq!(s.state(), SchedulerState::Idle);
        assert_eq!(s.now(), SimTime::zero());
        assert!(!s.has_delta_work());
        assert!(!s.has_timed_work());
    }

    #[test]
    fn registration_is_deduplicated() {
        let mut s = EventScheduler::new();
        assert!(s.register_delta(sig(1)));
        assert!(!s.register_delta(sig(1)));
        let (_, batch) = s.take_delta_batch();
        assert_eq!(batch, vec![sig(1)]);
    }

    #[test]
    fn in_flight_member_is_not_requeued_by_register() {
        let mut s = EventScheduler::new();
        s.register_delta(sig(1));
        let (_, batch) = s.take_delta_batch();
        assert_eq!(batch.len(), 1);
        assert!(!s.register_delta(sig(1)));
        s.finish_delta(sig(1), false);
        let (_, again) = s.take_delta_batch();
        assert_eq!(again, vec![sig(1)]);
    }

    #[test]
    fn exhausted_member_deregisters() {
        let mut s = EventScheduler::new();
        s.register_delta(sig(2));
        let (delta, batch) = s.take_delta_batch();
        assert_eq!(delta, 1);
        for id in batch {
            s.finish_delta(id, true);
        }
        assert!(!s.has_delta_work());
        assert!(s.register_delta(sig(2)));
    }

    #[test]
    fn batches_keep_registration_order() {
        let mut s = EventScheduler::new();
        for i in [5, 1, 3] {
            s.register_timed(sig(i));
        }
        assert_eq!(s.take_timed_batch(), vec![sig(5), sig(1), sig(3)]);
    }

    #[test]
    fn advance_time_resets_delta() {
        let mut s = EventScheduler::new();
        s.take_delta_batch();
        s.take_delta_batch();
        assert_eq!(s.delta(), 2);
        assert_eq!(s.advance_time(), 1);
        assert_eq!(s.delta(), 0);
    }

    #[test]
    fn stop_time() {
        let mut s = EventScheduler::new();
        s.set_stop_time(2);
        assert!(!s.reached_stop());
        s.advance_time();
        s.advance_time();
        assert!(s.reached_stop());
    }
}
