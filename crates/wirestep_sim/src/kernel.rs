//! Simulation driver with the per-instant step loop.
//!
//! [`SimKernel`] owns a [`Circuit`], the clocks and the tick listeners, and
//! moves the run through `Idle → Running → Stopped`. Each step drains
//! zero-delay work, advances real time by one unit, applies due delayed
//! changes, toggles clocks, drains again and finally notifies tick listeners.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};
use wirestep_common::{LogicValue, SlotArena};
use wirestep_config::{SimConfig, TimeUnit, DEFAULT_MAX_DELTA_CYCLES, DEFAULT_PULSE_WIDTH};

use crate::circuit::Circuit;
use crate::clock::Clock;
use crate::error::SimError;
use crate::ids::{ModuleId, SignalId, TickListenerId};
use crate::module::{Module, TickListener};
use crate::scheduler::SchedulerState;

/// A shared flag that stops a run at the next step boundary.
///
/// Clones share the same flag, so a token can be handed to a module or
/// another thread before the run starts.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates an unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Statistics of a run so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimSummary {
    /// Real time when the summary was taken.
    pub final_time: u64,
    /// Real-time instants stepped.
    pub instants: u64,
    /// Delta rounds executed across all instants.
    pub delta_rounds: u64,
    /// Value-changing commits across all signals.
    pub commits: u64,
    /// Whether the run was stopped through its [`CancelToken`].
    pub cancelled: bool,
}

/// The result of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// The run can continue.
    Continued,
    /// The run is stopped (stop time reached or cancelled).
    Done,
}

/// The simulation driver.
///
/// Build the circuit through [`circuit_mut`](SimKernel::circuit_mut) and
/// [`add_module`](SimKernel::add_module), set a stop time, then call
/// [`start`](SimKernel::start) or drive it with [`step`](SimKernel::step).
/// Once stopped, a kernel does not resume.
pub struct SimKernel {
    circuit: Circuit,
    listeners: SlotArena<TickListenerId, Box<dyn TickListener>>,
    clocks: Vec<Clock>,
    /// Maximum delta rounds per instant (default 10,000).
    max_delta_cycles: u32,
    /// Pulse width used by [`add_default_clock`](SimKernel::add_default_clock).
    pulse_width: u64,
    time_unit: TimeUnit,
    cancel: CancelToken,
    instants: u64,
    delta_rounds: u64,
    /// Delta rounds spent at the current time, across all of its drains.
    instant_rounds: u32,
    cancelled: bool,
}

impl Default for SimKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl SimKernel {
    /// Creates an idle kernel with an empty circuit and default limits.
    pub fn new() -> Self {
        Self {
            circuit: Circuit::new(),
            listeners: SlotArena::new(),
            clocks: Vec::new(),
            max_delta_cycles: DEFAULT_MAX_DELTA_CYCLES,
            pulse_width: DEFAULT_PULSE_WIDTH,
            time_unit: TimeUnit::default(),
            cancel: CancelToken::new(),
            instants: 0,
            delta_rounds: 0,
            instant_rounds: 0,
            cancelled: false,
        }
    }

    /// Creates an idle kernel with the stop time, delta budget, time unit and
    /// default pulse width taken from `config`.
    pub fn from_config(config: &SimConfig) -> Self {
        let mut kernel = Self::new();
        kernel.set_stop_time(config.simulation.stop_time);
        kernel.set_max_delta(config.simulation.max_delta_cycles);
        kernel.time_unit = config.simulation.time_unit;
        kernel.pulse_width = config.clock.pulse_width;
        kernel
    }

    /// Returns the circuit.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Returns the circuit mutably, for building and for stimulus.
    pub fn circuit_mut(&mut self) -> &mut Circuit {
        &mut self.circuit
    }

    /// Registers a module; see [`Circuit::add_module`].
    pub fn add_module<M, F>(&mut self, build: F) -> ModuleId
    where
        M: Module + 'static,
        F: FnOnce(ModuleId, &mut Circuit) -> M,
    {
        self.circuit.add_module(build)
    }

    /// Creates a clock line starting `Low` that toggles every `pulse_width` units.
    pub fn add_clock(&mut self, name: &str, pulse_width: u64) -> Result<SignalId, SimError> {
        if pulse_width == 0 {
            return Err(SimError::InvalidPulseWidth {
                name: name.to_string(),
            });
        }
        let line = self.circuit.add_signal_with(name, LogicValue::Low);
        self.clocks.push(Clock::new(line, pulse_width));
        Ok(line)
    }

    /// Creates a clock with the configured default pulse width.
    pub fn add_default_clock(&mut self, name: &str) -> Result<SignalId, SimError> {
        self.add_clock(name, self.pulse_width)
    }

    /// Returns the clocks in creation order.
    pub fn clocks(&self) -> &[Clock] {
        &self.clocks
    }

    /// Sets the real time at which the run stops.
    pub fn set_stop_time(&mut self, stop_time: u64) {
        self.circuit.scheduler_mut().set_stop_time(stop_time);
    }

    /// Returns the stop time.
    pub fn stop_time(&self) -> u64 {
        self.circuit.scheduler().stop_time()
    }

    /// Sets the maximum number of delta rounds per instant.
    pub fn set_max_delta(&mut self, max: u32) {
        self.max_delta_cycles = max;
    }

    /// Returns the maximum number of delta rounds per instant.
    pub fn max_delta(&self) -> u32 {
        self.max_delta_cycles
    }

    /// Returns the unit of one time step.
    pub fn time_unit(&self) -> TimeUnit {
        self.time_unit
    }

    /// Returns the current real time.
    pub fn time(&self) -> u64 {
        self.circuit.time()
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> SchedulerState {
        self.circuit.scheduler().state()
    }

    /// Returns a token that cancels this run.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Registers a listener notified once per instant.
    pub fn register_tick_listener<L>(&mut self, listener: L) -> TickListenerId
    where
        L: TickListener + 'static,
    {
        self.listeners.insert(Box::new(listener))
    }

    /// Removes a tick listener. Returns `None` for a stale ID.
    pub fn unregister_tick_listener(
        &mut self,
        id: TickListenerId,
    ) -> Option<Box<dyn TickListener>> {
        let removed = self.listeners.remove(id);
        if removed.is_none() {
            debug!(listener = %id, "ignoring removal of stale tick listener");
        }
        removed
    }

    /// Returns the number of registered tick listeners.
    pub fn tick_listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Returns statistics of the run so far.
    pub fn summary(&self) -> SimSummary {
        SimSummary {
            final_time: self.circuit.time(),
            instants: self.instants,
            delta_rounds: self.delta_rounds,
            commits: self.circuit.commit_count(),
            cancelled: self.cancelled,
        }
    }

    /// Runs until the stop time is reached or the run is cancelled.
    pub fn start(&mut self) -> Result<SimSummary, SimError> {
        while self.step()? == StepResult::Continued {}
        Ok(self.summary())
    }

    /// Runs until real time reaches `time`, the stop time, or cancellation.
    pub fn run_until(&mut self, time: u64) -> Result<StepResult, SimError> {
        self.ensure_started()?;
        while self.circuit.time() < time {
            if self.step()? == StepResult::Done {
                return Ok(StepResult::Done);
            }
        }
        if self.state() == SchedulerState::Stopped {
            Ok(StepResult::Done)
        } else {
            Ok(StepResult::Continued)
        }
    }

    /// Runs exactly one real-time instant.
    ///
    /// The first call settles the circuit at time zero and notifies tick
    /// listeners once before stepping.
    pub fn step(&mut self) -> Result<StepResult, SimError> {
        self.ensure_started()?;
        if self.state() == SchedulerState::Stopped {
            return Ok(StepResult::Done);
        }
        if self.cancel.is_cancelled() {
            self.cancelled = true;
            self.stop()?;
            return Ok(StepResult::Done);
        }
        if self.circuit.scheduler().reached_stop() {
            self.stop()?;
            return Ok(StepResult::Done);
        }

        self.settle()?;
        self.circuit.scheduler_mut().advance_time();
        self.instants += 1;
        self.instant_rounds = 0;
        self.circuit.apply_timed();
        for clock in &self.clocks {
            clock.tick(&mut self.circuit);
        }
        self.settle()?;
        self.notify_listeners()?;

        if self.circuit.scheduler().reached_stop() {
            self.stop()?;
            return Ok(StepResult::Done);
        }
        Ok(StepResult::Continued)
    }

    fn ensure_started(&mut self) -> Result<(), SimError> {
        if self.state() != SchedulerState::Idle {
            return Ok(());
        }
        debug!(
            stop_time = self.stop_time(),
            signals = self.circuit.signal_count(),
            modules = self.circuit.module_count(),
            clocks = self.clocks.len(),
            "simulation starting"
        );
        self.circuit
            .scheduler_mut()
            .set_state(SchedulerState::Running);
        self.settle()?;
        self.notify_listeners()
    }

    /// Drains zero-delay work at the current instant.
    ///
    /// The round budget is shared by every drain of the same instant.
    fn settle(&mut self) -> Result<(), SimError> {
        while self.circuit.scheduler().has_delta_work() {
            if self.instant_rounds >= self.max_delta_cycles {
                let signals = self.circuit.pending_delta_signals();
                let time = self.circuit.time();
                warn!(
                    time,
                    max_deltas = self.max_delta_cycles,
                    pending = ?signals,
                    "delta cycle limit exceeded"
                );
                return Err(SimError::DeltaCycleLimit {
                    time,
                    max_deltas: self.max_delta_cycles,
                    signals,
                });
            }
            self.circuit.run_delta_round();
            self.instant_rounds += 1;
            self.delta_rounds += 1;
        }
        Ok(())
    }

    fn notify_listeners(&mut self) -> Result<(), SimError> {
        for id in self.listeners.ids() {
            let Some(mut listener) = self.listeners.take(id) else {
                continue;
            };
            let result = listener.on_tick(&mut self.circuit);
            if self.listeners.restore(id, listener).is_err() {
                debug!(listener = %id, "tick listener removed during notification");
            }
            result?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SimError> {
        self.circuit
            .scheduler_mut()
            .set_state(SchedulerState::Stopped);
        debug!(
            time = self.circuit.time(),
            instants = self.instants,
            delta_rounds = self.delta_rounds,
            commits = self.circuit.commit_count(),
            pending_timed = self.circuit.scheduler().timed_registrations().count(),
            cancelled = self.cancelled,
            "simulation stopped"
        );
        for id in self.listeners.ids() {
            if let Some(listener) = self.listeners.get_mut(id) {
                listener.finish(&self.circuit)?;
            }
        }
        Ok(())
    }
}
