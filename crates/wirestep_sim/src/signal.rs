//! Signal line state: committed value, pending-change schedule, subscribers.
//!
//! A [`SignalState`] never changes its observable value inside a write.
//! Writes only enqueue; the kernel's apply step commits due changes and the
//! circuit then notifies subscribers of the resulting [`Transition`].
//!
//! Lines with a non-zero propagation delay keep an ascending queue of
//! `(target time, value)` entries. Lines with zero delay keep a single pending
//! slot stamped with the delta cycle at which it becomes due, and merge
//! repeated writes within an instant so an even number of flips is a no-op.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use wirestep_common::LogicValue;

use crate::ids::{ModuleId, PortId};
use crate::time::SimTime;

/// The kind of transition a module subscribes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalEvent {
    /// Any change of the committed value.
    StateChange,
    /// A change classified as a rising edge.
    RisingEdge,
    /// A change classified as a falling edge.
    FallingEdge,
}

/// A `(module, port)` pair registered on a signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription {
    /// The module to notify.
    pub module: ModuleId,
    /// The port tag handed back to the module.
    pub port: PortId,
}

/// Edge classification of a committed change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Edge {
    /// Low or Unknown to High.
    Rising,
    /// Every other actual change.
    Falling,
}

/// A committed value change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    /// Value before the commit.
    pub from: LogicValue,
    /// Value after the commit.
    pub to: LogicValue,
}

impl Transition {
    /// Classifies the change for edge dispatch.
    ///
    /// Low→High and Unknown→High are rising. Every other change, including
    /// HighZ→High, Unknown→Low and High→HighZ, dispatches to falling-edge
    /// subscribers.
    pub fn edge(&self) -> Edge {
        if self.to == LogicValue::High
            && matches!(self.from, LogicValue::Low | LogicValue::Unknown)
        {
            Edge::Rising
        } else {
            Edge::Falling
        }
    }

    /// The subscriber list that receives this change after state-change subscribers.
    pub fn edge_event(&self) -> SignalEvent {
        match self.edge() {
            Edge::Rising => SignalEvent::RisingEdge,
            Edge::Falling => SignalEvent::FallingEdge,
        }
    }
}

/// What a write did to the signal's schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Queued on the delayed schedule for the given real time.
    Delayed {
        /// Real time at which the value commits.
        at: u64,
    },
    /// Stored in the zero-delay slot, due at the given delta.
    DeltaPending {
        /// Delta cycle at which the value commits.
        delta: u64,
    },
    /// Matched the value already pending; nothing changed.
    Coalesced,
    /// Reverted to the committed value; the pending change was dropped.
    Cancelled,
    /// Matched the committed value with nothing pending; nothing scheduled.
    Unchanged,
}

impl WriteOutcome {
    /// Returns `true` if the signal now needs real-time notification.
    pub fn needs_timed(&self) -> bool {
        matches!(self, WriteOutcome::Delayed { .. })
    }

    /// Returns `true` if the signal now needs delta notification.
    pub fn needs_delta(&self) -> bool {
        matches!(self, WriteOutcome::DeltaPending { .. })
    }
}

/// Result of one apply step on a signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ApplyOutcome {
    /// The committed change, if the value actually moved.
    pub committed: Option<Transition>,
    /// `true` once no work of this kind is left, so the signal can de-register.
    pub exhausted: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PendingChange {
    delta: u64,
    value: LogicValue,
}

/// The full runtime state of one signal line.
#[derive(Clone, Debug)]
pub struct SignalState {
    /// Name used for lookup, diagnostics and traces.
    pub name: String,
    value: LogicValue,
    delay: u64,
    timed: VecDeque<(u64, LogicValue)>,
    pending: Option<PendingChange>,
    on_change: Vec<Subscription>,
    on_rising: Vec<Subscription>,
    on_falling: Vec<Subscription>,
}

impl SignalState {
    /// Creates a zero-delay line holding `init`.
    pub fn new(name: impl Into<String>, init: LogicValue) -> Self {
        Self {
            name: name.into(),
            value: init,
            delay: 0,
            timed: VecDeque::new(),
            pending: None,
            on_change: Vec::new(),
            on_rising: Vec::new(),
            on_falling: Vec::new(),
        }
    }

    /// Returns the committed value.
    pub fn read(&self) -> LogicValue {
        self.value
    }

    /// Returns the propagation delay applied to subsequent writes.
    pub fn delay(&self) -> u64 {
        self.delay
    }

    /// Sets the propagation delay for subsequent writes.
    ///
    /// Dropping to zero from a non-zero delay purges the delayed schedule.
    pub fn set_delay(&mut self, delay: u64) {
        if delay == 0 && self.delay != 0 {
            self.timed.clear();
        }
        self.delay = delay;
    }

    /// Returns the value waiting in the zero-delay slot, if any.
    pub fn pending_value(&self) -> Option<LogicValue> {
        self.pending.map(|p| p.value)
    }

    /// Returns the delayed schedule in ascending target-time order.
    pub fn scheduled(&self) -> impl Iterator<Item = (u64, LogicValue)> + '_ {
        self.timed.iter().copied()
    }

    /// Requests that the line take `value` after its current delay.
    pub fn write(&mut self, value: LogicValue, now: SimTime) -> WriteOutcome {
        if self.delay > 0 {
            // Targets past the end of time stay pinned there.
            let at = now.time.saturating_add(self.delay);
            // Entries at or after the new target are superseded.
            while self.timed.back().is_some_and(|&(t, _)| t >= at) {
                self.timed.pop_back();
            }
            self.timed.push_back((at, value));
            return WriteOutcome::Delayed { at };
        }
        self.merge_zero_delay(value, now.delta)
    }

    fn merge_zero_delay(&mut self, value: LogicValue, delta: u64) -> WriteOutcome {
        match self.pending {
            None if value == self.value => WriteOutcome::Unchanged,
            Some(p) if p.value == value => WriteOutcome::Coalesced,
            Some(_) if value == self.value => {
                self.pending = None;
                WriteOutcome::Cancelled
            }
            _ => {
                let due = delta + 1;
                self.pending = Some(PendingChange { delta: due, value });
                WriteOutcome::DeltaPending { delta: due }
            }
        }
    }

    /// Commits the earliest delayed entry if its target time has arrived.
    pub fn apply_if_due(&mut self, time: u64) -> ApplyOutcome {
        let committed = match self.timed.front() {
            Some(&(at, value)) if at <= time => {
                self.timed.pop_front();
                self.commit(value)
            }
            _ => None,
        };
        ApplyOutcome {
            committed,
            exhausted: self.timed.is_empty(),
        }
    }

    /// Commits the zero-delay slot if its delta stamp has arrived.
    pub fn apply_if_due_delta(&mut self, delta: u64) -> ApplyOutcome {
        let committed = match self.pending {
            Some(p) if p.delta <= delta => {
                self.pending = None;
                self.commit(p.value)
            }
            _ => None,
        };
        ApplyOutcome {
            committed,
            exhausted: self.pending.is_none(),
        }
    }

    fn commit(&mut self, value: LogicValue) -> Option<Transition> {
        if value == self.value {
            return None;
        }
        let from = std::mem::replace(&mut self.value, value);
        Some(Transition { from, to: value })
    }

    /// Returns the subscriber list for an event kind, in registration order.
    pub fn subscribers(&self, event: SignalEvent) -> &[Subscription] {
        match event {
            SignalEvent::StateChange => &self.on_change,
            SignalEvent::RisingEdge => &self.on_rising,
            SignalEvent::FallingEdge => &self.on_falling,
        }
    }

    fn list_mut(&mut self, event: SignalEvent) -> &mut Vec<Subscription> {
        match event {
            SignalEvent::StateChange => &mut self.on_change,
            SignalEvent::RisingEdge => &mut self.on_rising,
            SignalEvent::FallingEdge => &mut self.on_falling,
        }
    }

    /// Registers a subscriber.
    ///
    /// State-change registration keeps at most one entry per module (the
    /// first port wins); edge registration always appends. Returns `false`
    /// if nothing was added.
    pub fn subscribe(&mut self, event: SignalEvent, sub: Subscription) -> bool {
        let list = self.list_mut(event);
        if event == SignalEvent::StateChange && list.iter().any(|s| s.module == sub.module) {
            return false;
        }
        list.push(sub);
        true
    }

    /// Removes the first matching subscriber. Returns `false` if none matched.
    pub fn unsubscribe(&mut self, event: SignalEvent, sub: Subscription) -> bool {
        let list = self.list_mut(event);
        match list.iter().position(|s| *s == sub) {
            Some(pos) => {
                list.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Drops every subscription held by `module` and returns how many were removed.
    pub fn release_module(&mut self, module: ModuleId) -> usize {
        let mut removed = 0;
        for list in [&mut self.on_change, &mut self.on_rising, &mut self.on_falling] {
            let before = list.len();
            list.retain(|s| s.module != module);
            removed += before - list.len();
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wirestep_common::LogicValue::*;
    use wirestep_common::SlotId;

    fn at(time: u64, delta: u64) -> SimTime {
        SimTime { time, delta }
    }

    fn sub(index: u32, port: u32) -> Subscription {
        Subscription {
            module: ModuleId::from_parts(index, 0),
            port: PortId(port),
        }
    }

    #[test]
    fn write_never_commits_directly() {
        let mut s = SignalState::new("a", Low);
        s.write(High, at(0, 0));
        assert_eq!(s.read(), Low);
        assert_eq!(s.pending_value(), Some(High));
    }

    #[test]
    fn zero_delay_same_as_committed_is_noop() {
        let mut s = SignalState::new("a", High);
        assert_eq!(s.write(High, at(0, 0)), WriteOutcome::Unchanged);
        assert_eq!(s.pending_value(), None);
    }

    #[test]
    fn zero_delay_stamped_next_delta() {
        let mut s = SignalState::new("a", Low);
        assert_eq!(
            s.write(High, at(3, 4)),
            WriteOutcome::DeltaPending { delta: 5 }
        );
        assert!(!s.apply_if_due_delta(4).exhausted);
        let out = s.apply_if_due_delta(5);
        assert_eq!(
            out.committed,
            Some(Transition {
                from: Low,
                to: High
            })
        );
        assert!(out.exhausted);
        assert_eq!(s.read(), High);
    }

    #[test]
    fn zero_delay_coalesces_equal_pending() {
        let mut s = SignalState::new("a", Low);
        s.write(High, at(0, 0));
        assert_eq!(s.write(High, at(0, 0)), WriteOutcome::Coalesced);
    }

    #[test]
    fn zero_delay_revert_cancels() {
        let mut s = SignalState::new("a", Low);
        s.write(High, at(0, 0));
        assert_eq!(s.write(Low, at(0, 0)), WriteOutcome::Cancelled);
        assert_eq!(s.pending_value(), None);
        let out = s.apply_if_due_delta(1);
        assert_eq!(out.committed, None);
        assert!(out.exhausted);
    }

    #[test]
    fn zero_delay_replaces_with_third_value() {
        let mut s = SignalState::new("a", Low);
        s.write(High, at(0, 0));
        assert_eq!(
            s.write(Unknown, at(0, 2)),
            WriteOutcome::DeltaPending { delta: 3 }
        );
        assert_eq!(s.pending_value(), Some(Unknown));
        assert_eq!(s.apply_if_due_delta(1).committed, None);
        assert_eq!(s.apply_if_due_delta(3).committed.map(|t| t.to), Some(Unknown));
    }

    #[test]
    fn toggle_parity() {
        for flips in 1..8usize {
            let mut s = SignalState::new("a", Low);
            for i in 0..flips {
                let v = if i % 2 == 0 { High } else { Low };
                s.write(v, at(0, 0));
            }
            s.apply_if_due_delta(1);
            let expected = if flips % 2 == 1 { High } else { Low };
            assert_eq!(s.read(), expected, "after {flips} flips");
        }
    }

    #[test]
    fn delayed_write_queues_at_target() {
        let mut s = SignalState::new("a", Low);
        s.set_delay(5);
        assert_eq!(s.write(High, at(10, 0)), WriteOutcome::Delayed { at: 15 });
        assert_eq!(s.apply_if_due(14).committed, None);
        assert_eq!(s.read(), Low);
        let out = s.apply_if_due(15);
        assert_eq!(out.committed.map(|t| t.to), Some(High));
        assert!(out.exhausted);
    }

    #[test]
    fn delayed_earlier_write_prunes_later_entries() {
        let mut s = SignalState::new("a", Low);
        s.set_delay(10);
        s.write(High, at(0, 0)); // due 10
        s.set_delay(3);
        s.write(Unknown, at(2, 0)); // due 5, supersedes 10
        assert_eq!(s.scheduled().collect::<Vec<_>>(), vec![(5, Unknown)]);
    }

    #[test]
    fn delayed_equal_target_replaces() {
        let mut s = SignalState::new("a", Low);
        s.set_delay(4);
        s.write(High, at(1, 0));
        s.write(Unknown, at(1, 0));
        assert_eq!(s.scheduled().collect::<Vec<_>>(), vec![(5, Unknown)]);
    }

    #[test]
    fn delayed_target_saturates_at_end_of_time() {
        let mut s = SignalState::new("a", Low);
        s.set_delay(u64::MAX);
        assert_eq!(
            s.write(High, at(7, 0)),
            WriteOutcome::Delayed { at: u64::MAX }
        );
        assert_eq!(s.apply_if_due(8).committed, None);
        assert_eq!(s.read(), Low);
        assert_eq!(s.scheduled().collect::<Vec<_>>(), vec![(u64::MAX, High)]);
    }

    #[test]
    fn delayed_later_write_keeps_earlier_entries() {
        let mut s = SignalState::new("a", Low);
        s.set_delay(2);
        s.write(High, at(0, 0));
        s.write(Low, at(1, 0));
        assert_eq!(s.scheduled().collect::<Vec<_>>(), vec![(2, High), (3, Low)]);
        assert!(!s.apply_if_due(2).exhausted);
        assert!(s.apply_if_due(3).exhausted);
        assert_eq!(s.read(), Low);
    }

    #[test]
    fn delayed_commit_of_held_value_reports_no_change() {
        let mut s = SignalState::new("a", High);
        s.set_delay(1);
        s.write(High, at(0, 0));
        let out = s.apply_if_due(1);
        assert_eq!(out.committed, None);
        assert!(out.exhausted);
    }

    #[test]
    fn clearing_delay_purges_schedule() {
        let mut s = SignalState::new("a", Low);
        s.set_delay(5);
        s.write(High, at(0, 0));
        s.set_delay(0);
        assert_eq!(s.scheduled().count(), 0);
        assert!(s.apply_if_due(5).exhausted);
        assert_eq!(s.read(), Low);
    }

    #[test]
    fn edge_classification() {
        let t = |from, to| Transition { from, to }.edge();
        assert_eq!(t(Low, High), Edge::Rising);
        assert_eq!(t(Unknown, High), Edge::Rising);
        assert_eq!(t(HighZ, High), Edge::Falling);
        assert_eq!(t(High, Low), Edge::Falling);
        assert_eq!(t(Unknown, Low), Edge::Falling);
        assert_eq!(t(Low, HighZ), Edge::Falling);
    }

    #[test]
    fn state_change_subscription_is_idempotent() {
        let mut s = SignalState::new("a", Low);
        assert!(s.subscribe(SignalEvent::StateChange, sub(0, 1)));
        assert!(!s.subscribe(SignalEvent::StateChange, sub(0, 1)));
        assert!(!s.subscribe(SignalEvent::StateChange, sub(0, 2)));
        assert!(s.subscribe(SignalEvent::StateChange, sub(1, 2)));
        assert_eq!(s.subscribers(SignalEvent::StateChange).len(), 2);
        assert_eq!(s.subscribers(SignalEvent::StateChange)[0].port, PortId(1));
    }

    #[test]
    fn edge_subscription_appends() {
        let mut s = SignalState::new("a", Low);
        s.subscribe(SignalEvent::RisingEdge, sub(0, 0));
        s.subscribe(SignalEvent::RisingEdge, sub(0, 0));
        assert_eq!(s.subscribers(SignalEvent::RisingEdge).len(), 2);
        assert!(s.unsubscribe(SignalEvent::RisingEdge, sub(0, 0)));
        assert_eq!(s.subscribers(SignalEvent::RisingEdge).len(), 1);
    }

    #[test]
    fn unsubscribe_absent_is_noop() {
        let mut s = SignalState::new("a", Low);
        assert!(!s.unsubscribe(SignalEvent::FallingEdge, sub(4, 0)));
    }

    #[test]
    fn release_module_clears_all_lists() {
        let mut s = SignalState::new("a", Low);
        s.subscribe(SignalEvent::StateChange, sub(1, 0));
        s.subscribe(SignalEvent::RisingEdge, sub(1, 0));
        s.subscribe(SignalEvent::FallingEdge, sub(2, 0));
        assert_eq!(s.release_module(ModuleId::from_parts(1, 0)), 2);
        assert!(s.subscribers(SignalEvent::StateChange).is_empty());
        assert_eq!(s.subscribers(SignalEvent::FallingEdge).len(), 1);
    }
}
