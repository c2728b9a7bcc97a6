//! The simulation context handed to every module and tick listener.
//!
//! [`Circuit`] owns the signal arena, the module slots and the
//! [`EventScheduler`]. Writes register the written line with the scheduler;
//! apply steps commit due changes and dispatch them to subscribers.
//!
//! Modules are lent out of their slot for the duration of a callback, so a
//! callback receives `&mut Circuit` while the module itself is held by value.
//! A module removed from inside a callback (including its own) is dropped when
//! the callback returns.

use tracing::{debug, trace};
use wirestep_common::{Arena, LogicValue, SlotArena};

use crate::bus::Bus;
use crate::error::SimError;
use crate::ids::{ModuleId, PortId, SignalId};
use crate::module::Module;
use crate::scheduler::EventScheduler;
use crate::signal::{SignalEvent, SignalState, Subscription, Transition, WriteOutcome};
use crate::time::SimTime;

/// Signals, modules and the scheduler of one simulation.
///
/// Signal operations take a [`SignalId`] issued by this circuit; passing an ID
/// from another circuit panics if it is out of bounds.
#[derive(Default)]
pub struct Circuit {
    signals: Arena<SignalId, SignalState>,
    modules: SlotArena<ModuleId, Box<dyn Module>>,
    scheduler: EventScheduler,
    commits: u64,
}

impl Circuit {
    /// Creates an empty circuit at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------------
    // Signals
    // ---------------------------------------------------------------------

    /// Creates a zero-delay line initialized to `Unknown`.
    pub fn add_signal(&mut self, name: impl Into<String>) -> SignalId {
        self.add_signal_with(name, LogicValue::Unknown)
    }

    /// Creates a zero-delay line with an explicit initial value.
    pub fn add_signal_with(&mut self, name: impl Into<String>, init: LogicValue) -> SignalId {
        self.signals.alloc(SignalState::new(name, init))
    }

    /// Creates `width` lines named `name[i]`, initialized to `Unknown`.
    pub fn add_bus(&mut self, name: &str, width: usize) -> Bus {
        self.add_bus_with(name, width, LogicValue::Unknown)
    }

    /// Creates `width` lines named `name[i]` with an explicit initial value.
    pub fn add_bus_with(&mut self, name: &str, width: usize, init: LogicValue) -> Bus {
        (0..width)
            .map(|i| self.add_signal_with(format!("{name}[{i}]"), init))
            .collect()
    }

    /// Returns the full state of a line.
    pub fn signal(&self, id: SignalId) -> &SignalState {
        self.signals.get(id)
    }

    /// Returns the name of a line.
    pub fn signal_name(&self, id: SignalId) -> &str {
        &self.signals.get(id).name
    }

    /// Finds a line by name.
    pub fn find_signal(&self, name: &str) -> Option<SignalId> {
        self.signals
            .iter()
            .find(|(_, s)| s.name == name)
            .map(|(id, _)| id)
    }

    /// Finds a line by name, failing with [`SimError::UnknownSignal`].
    pub fn require_signal(&self, name: &str) -> Result<SignalId, SimError> {
        self.find_signal(name)
            .ok_or_else(|| SimError::UnknownSignal(name.to_string()))
    }

    /// Returns the number of lines.
    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    /// Returns the committed value of a line.
    pub fn read(&self, id: SignalId) -> LogicValue {
        self.signals.get(id).read()
    }

    /// Requests that a line take `value` after its current delay.
    pub fn write(&mut self, id: SignalId, value: LogicValue) -> WriteOutcome {
        let now = self.scheduler.now();
        let outcome = self.signals.get_mut(id).write(value, now);
        if outcome.needs_timed() {
            self.scheduler.register_timed(id);
        } else if outcome.needs_delta() {
            self.scheduler.register_delta(id);
        }
        outcome
    }

    /// Sets the line's delay, then writes; the delay sticks for later writes.
    pub fn write_after(&mut self, id: SignalId, delay: u64, value: LogicValue) -> WriteOutcome {
        self.set_delay(id, delay);
        self.write(id, value)
    }

    /// Returns the propagation delay of a line.
    pub fn delay(&self, id: SignalId) -> u64 {
        self.signals.get(id).delay()
    }

    /// Sets the propagation delay of a line.
    pub fn set_delay(&mut self, id: SignalId, delay: u64) {
        self.signals.get_mut(id).set_delay(delay);
    }

    // ---------------------------------------------------------------------
    // Buses
    // ---------------------------------------------------------------------

    /// Returns the committed values of a bus, least-significant first.
    pub fn read_bus(&self, bus: &Bus) -> Vec<LogicValue> {
        bus.iter().map(|id| self.read(id)).collect()
    }

    /// Writes `values` to the bus, least-significant first.
    ///
    /// Only the narrower of the two widths is written; excess lines are left
    /// untouched.
    pub fn write_bus(&mut self, bus: &Bus, values: &[LogicValue]) {
        for (id, &value) in bus.iter().zip(values) {
            self.write(id, value);
        }
    }

    /// Writes the binary representation of `value`, bit 0 to line 0.
    ///
    /// Lines above bit 63 are driven `Low`.
    pub fn write_bus_u64(&mut self, bus: &Bus, value: u64) {
        for (i, id) in bus.iter().enumerate() {
            let bit = i < 64 && (value >> i) & 1 == 1;
            self.write(id, LogicValue::from_bool(bit));
        }
    }

    /// Writes the same value to every line of the bus.
    pub fn fill_bus(&mut self, bus: &Bus, value: LogicValue) {
        for id in bus.iter() {
            self.write(id, value);
        }
    }

    /// Sets the same propagation delay on every line of the bus.
    pub fn set_bus_delay(&mut self, bus: &Bus, delay: u64) {
        for id in bus.iter() {
            self.set_delay(id, delay);
        }
    }

    /// Returns the bus value as '0'/'1'/'x'/'z' characters, most-significant first.
    pub fn bus_string(&self, bus: &Bus) -> String {
        bus.lines()
            .iter()
            .rev()
            .map(|&id| self.read(id).to_char())
            .collect()
    }

    /// Returns the bus value as an integer, or `None` if any line is not 0/1
    /// or the bus is wider than 64 lines.
    pub fn bus_u64(&self, bus: &Bus) -> Option<u64> {
        if bus.width() > 64 {
            return None;
        }
        bus.iter().enumerate().try_fold(0u64, |acc, (i, id)| {
            self.read(id).to_bool().map(|b| acc | (u64::from(b) << i))
        })
    }

    // ---------------------------------------------------------------------
    // Modules and subscriptions
    // ---------------------------------------------------------------------

    /// Registers a module built by `build`.
    ///
    /// The builder receives the module's ID and the circuit, so it can
    /// subscribe to its inputs and drive initial outputs before the module
    /// is stored.
    pub fn add_module<M, F>(&mut self, build: F) -> ModuleId
    where
        M: Module + 'static,
        F: FnOnce(ModuleId, &mut Circuit) -> M,
    {
        let id = self.modules.reserve();
        let module = build(id, self);
        if self.modules.restore(id, Box::new(module)).is_err() {
            debug!(module = %id, "module removed during its own construction");
        }
        id
    }

    /// Removes a module and releases every subscription it holds.
    ///
    /// Returns the module unless the ID is stale or the module is currently
    /// inside one of its own callbacks.
    pub fn remove_module(&mut self, id: ModuleId) -> Option<Box<dyn Module>> {
        if !self.modules.contains(id) {
            debug!(module = %id, "ignoring removal of stale module");
            return None;
        }
        let released: usize = self
            .signals
            .values_mut()
            .map(|s| s.release_module(id))
            .sum();
        trace!(module = %id, released, "module removed");
        self.modules.remove(id)
    }

    /// Returns `true` if the module ID is live.
    pub fn contains_module(&self, id: ModuleId) -> bool {
        self.modules.contains(id)
    }

    /// Returns the number of live modules.
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Subscribes a module port to an event on a line.
    ///
    /// Stale module IDs are ignored.
    pub fn subscribe(&mut self, id: SignalId, module: ModuleId, port: PortId, event: SignalEvent) {
        if !self.modules.contains(module) {
            debug!(
                module = %module,
                signal = %self.signal_name(id),
                "ignoring subscription from stale module"
            );
            return;
        }
        self.signals
            .get_mut(id)
            .subscribe(event, Subscription { module, port });
    }

    /// Removes the first matching subscription, if any.
    pub fn unsubscribe(
        &mut self,
        id: SignalId,
        module: ModuleId,
        port: PortId,
        event: SignalEvent,
    ) {
        self.signals
            .get_mut(id)
            .unsubscribe(event, Subscription { module, port });
    }

    /// Subscribes a module port to an event on every line of a bus.
    pub fn subscribe_bus(&mut self, bus: &Bus, module: ModuleId, port: PortId, event: SignalEvent) {
        for id in bus.iter() {
            self.subscribe(id, module, port, event);
        }
    }

    /// Removes a module port's subscription from every line of a bus.
    pub fn unsubscribe_bus(
        &mut self,
        bus: &Bus,
        module: ModuleId,
        port: PortId,
        event: SignalEvent,
    ) {
        for id in bus.iter() {
            self.unsubscribe(id, module, port, event);
        }
    }

    // ---------------------------------------------------------------------
    // Time and kernel hooks
    // ---------------------------------------------------------------------

    /// Returns the current real time.
    pub fn time(&self) -> u64 {
        self.scheduler.time()
    }

    /// Returns the current real time and delta.
    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    /// Returns the scheduler.
    pub fn scheduler(&self) -> &EventScheduler {
        &self.scheduler
    }

    pub(crate) fn scheduler_mut(&mut self) -> &mut EventScheduler {
        &mut self.scheduler
    }

    /// Returns the number of value-changing commits so far.
    pub fn commit_count(&self) -> u64 {
        self.commits
    }

    /// Names of the lines still holding zero-delay work.
    pub fn pending_delta_signals(&self) -> Vec<String> {
        self.scheduler
            .delta_registrations()
            .map(|id| self.signal_name(id).to_string())
            .collect()
    }

    /// Runs one delta round: advance the delta index, apply every
    /// delta-registered line, dispatch committed changes.
    pub(crate) fn run_delta_round(&mut self) -> u64 {
        let (delta, batch) = self.scheduler.take_delta_batch();
        trace!(
            time = self.scheduler.time(),
            delta,
            signals = batch.len(),
            "delta round"
        );
        for id in batch {
            let outcome = self.signals.get_mut(id).apply_if_due_delta(delta);
            self.scheduler.finish_delta(id, outcome.exhausted);
            if let Some(transition) = outcome.committed {
                self.dispatch(id, transition);
            }
        }
        delta
    }

    /// Applies every real-time-registered line whose change is due now.
    pub(crate) fn apply_timed(&mut self) {
        let time = self.scheduler.time();
        for id in self.scheduler.take_timed_batch() {
            let outcome = self.signals.get_mut(id).apply_if_due(time);
            self.scheduler.finish_timed(id, outcome.exhausted);
            if let Some(transition) = outcome.committed {
                self.dispatch(id, transition);
            }
        }
    }

    /// Notifies state-change subscribers, then the matching edge subscribers.
    fn dispatch(&mut self, id: SignalId, transition: Transition) {
        self.commits += 1;
        let signal = self.signals.get(id);
        trace!(
            signal = %signal.name,
            from = %transition.from,
            to = %transition.to,
            "commit"
        );
        let on_change = signal.subscribers(SignalEvent::StateChange).to_vec();
        let edge_event = transition.edge_event();
        let on_edge = signal.subscribers(edge_event).to_vec();

        for sub in on_change {
            self.notify(sub, SignalEvent::StateChange);
        }
        for sub in on_edge {
            self.notify(sub, edge_event);
        }
    }

    fn notify(&mut self, sub: Subscription, event: SignalEvent) {
        let Some(mut module) = self.modules.take(sub.module) else {
            debug!(module = %sub.module, "skipping notification to unavailable module");
            return;
        };
        match event {
            SignalEvent::StateChange => module.on_state_change(sub.port, self),
            SignalEvent::RisingEdge => module.on_rising_edge(sub.port, self),
            SignalEvent::FallingEdge => module.on_falling_edge(sub.port, self),
        }
        if self.modules.restore(sub.module, module).is_err() {
            trace!(module = %sub.module, "module removed during its own callback");
        }
    }
}
