//! Tick listeners that report bus value changes.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::info;

use crate::bus::Bus;
use crate::circuit::Circuit;
use crate::error::SimError;
use crate::module::TickListener;

/// One observed bus value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    /// Real time of the sample.
    pub time: u64,
    /// Bus value, most-significant line first.
    pub value: String,
}

/// Shared handle to the records collected by a [`ChangeMonitor`].
pub type ChangeLog = Rc<RefCell<Vec<ChangeRecord>>>;

/// Samples a bus once per instant and records each change of its value.
///
/// The first sample (at start-up) is always recorded.
pub struct ChangeMonitor {
    name: String,
    bus: Bus,
    last: Option<String>,
    log: ChangeLog,
}

impl ChangeMonitor {
    /// Creates a monitor labeled `name` over `bus`.
    pub fn new(name: impl Into<String>, bus: Bus) -> Self {
        Self {
            name: name.into(),
            bus,
            last: None,
            log: ChangeLog::default(),
        }
    }

    /// Returns a handle to the collected records; it stays valid after the
    /// monitor is registered.
    pub fn log(&self) -> ChangeLog {
        Rc::clone(&self.log)
    }
}

impl TickListener for ChangeMonitor {
    fn on_tick(&mut self, circuit: &mut Circuit) -> Result<(), SimError> {
        let value = circuit.bus_string(&self.bus);
        if self.last.as_deref() == Some(value.as_str()) {
            return Ok(());
        }
        let time = circuit.time();
        info!(monitor = %self.name, time, value = %value, "bus changed");
        self.log.borrow_mut().push(ChangeRecord {
            time,
            value: value.clone(),
        });
        self.last = Some(value);
        Ok(())
    }
}
