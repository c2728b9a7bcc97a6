//! Discrete-event 4-state logic simulator for the wirestep toolkit.
//!
//! This crate implements a delta-cycle simulation kernel: signal lines carry
//! [`LogicValue`]s, circuit elements implement [`Module`] and react to the
//! changes they subscribed to, and [`SimKernel`] advances integer real time
//! while draining zero-delay activity in ordered delta rounds.
//!
//! # Architecture
//!
//! Signals live in an arena inside a [`Circuit`] and are addressed by
//! [`SignalId`]; a [`Bus`] is an ordered list of IDs. Modules are stored in a
//! generation-checked slot arena and lent out for each callback, so a
//! callback gets `&mut Circuit` and can read and write any line. Writes only
//! enqueue work with the [`EventScheduler`](scheduler::EventScheduler); the
//! kernel commits it in delta rounds and real-time steps.
//!
//! # Usage
//!
//! ```ignore
//! use wirestep_sim::{simulate, SimConfig, SignalEvent, PortId};
//!
//! let mut config = SimConfig::default();
//! config.simulation.stop_time = 1_000;
//! let summary = simulate(&config, |kernel| {
//!     let clk = kernel.add_default_clock("clk")?;
//!     Ok(vec![("clk".to_string(), clk.into())])
//! })?;
//! println!("stopped at {}", summary.final_time);
//! ```
//!
//! # Modules
//!
//! - `error`: Simulation error types
//! - `time`: Real time with delta cycles
//! - `signal`: Per-line state, merge rule and subscriber lists
//! - `bus`: Ordered line groups
//! - `circuit`: Signal and module storage, dispatch
//! - `scheduler`: Pending-work registrations and run state
//! - `kernel`: Step loop, clocks, tick listeners, cancellation
//! - `monitor`: Bus change monitors
//! - `waveform`: VCD output

#![warn(missing_docs)]

pub mod bus;
pub mod circuit;
pub mod clock;
pub mod error;
pub mod ids;
pub mod kernel;
pub mod module;
pub mod monitor;
pub mod scheduler;
pub mod signal;
pub mod time;
pub mod waveform;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub use bus::Bus;
pub use circuit::Circuit;
pub use clock::Clock;
pub use error::SimError;
pub use ids::{ModuleId, PortId, SignalId, TickListenerId};
pub use kernel::{CancelToken, SimKernel, SimSummary, StepResult};
pub use module::{Module, TickListener};
pub use monitor::{ChangeLog, ChangeMonitor, ChangeRecord};
pub use scheduler::{EventScheduler, SchedulerState};
pub use signal::{Edge, SignalEvent, SignalState, Transition, WriteOutcome};
pub use time::SimTime;
pub use waveform::VcdTracer;
pub use wirestep_common::LogicValue;
pub use wirestep_config::{SimConfig, TimeUnit};

/// High-level entry point: builds a kernel from `config` and runs it.
///
/// `build` populates the kernel and returns the buses to trace. If
/// `config.trace.path` is set, they are written there as VCD.
pub fn simulate<F>(config: &SimConfig, build: F) -> Result<SimSummary, SimError>
where
    F: FnOnce(&mut SimKernel) -> Result<Vec<(String, Bus)>, SimError>,
{
    let mut kernel = SimKernel::from_config(config);
    let traced = build(&mut kernel)?;

    if let Some(path) = &config.trace.path {
        let file = File::create(path)?;
        let tracer = traced.into_iter().fold(
            VcdTracer::new(BufWriter::new(file), kernel.time_unit()),
            |tracer, (name, bus)| tracer.trace(name, bus),
        );
        kernel.register_tick_listener(tracer);
    }

    kernel.start()
}

/// Like [`simulate`], but reads `wirestep.toml` from `project_dir` first.
///
/// A missing file means default settings. A relative `trace.path` is taken
/// relative to `project_dir`.
pub fn simulate_project<F>(project_dir: &Path, build: F) -> Result<SimSummary, SimError>
where
    F: FnOnce(&mut SimKernel) -> Result<Vec<(String, Bus)>, SimError>,
{
    let mut config = wirestep_config::load_config_or_default(project_dir)?;
    if let Some(path) = config.trace.path.as_mut() {
        if path.is_relative() {
            *path = project_dir.join(&*path);
        }
    }
    simulate(&config, build)
}
