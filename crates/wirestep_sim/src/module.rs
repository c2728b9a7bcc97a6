//! Reactive circuit elements and per-instant tick listeners.
//!
//! A [`Module`] is notified synchronously each time a signal it subscribed to
//! commits a change. It reacts by reading and writing lines through the
//! [`Circuit`] it is handed; writes only enqueue, so a callback never observes
//! its own effects until the kernel applies them.
//!
//! A [`TickListener`] is notified once per real-time instant, after every
//! commit for that instant has settled. Trace writers and stimulus drivers
//! are tick listeners.

use crate::circuit::Circuit;
use crate::error::SimError;
use crate::ids::PortId;

/// A circuit element driven by signal notifications.
///
/// Every callback defaults to a no-op; implement the ones the element needs.
/// Subscriptions are made while the module is built (see
/// [`Circuit::add_module`]) and released when it is removed.
pub trait Module {
    /// Called when a subscribed line commits any change.
    fn on_state_change(&mut self, _port: PortId, _circuit: &mut Circuit) {}

    /// Called when a subscribed line commits a rising edge.
    fn on_rising_edge(&mut self, _port: PortId, _circuit: &mut Circuit) {}

    /// Called when a subscribed line commits a falling edge.
    fn on_falling_edge(&mut self, _port: PortId, _circuit: &mut Circuit) {}
}

/// Receives one notification per real-time instant.
///
/// Zero-delay writes issued from `on_tick` at time `t` still commit at `t`,
/// in the settle that opens the next step. Listeners only see that commit on
/// the tick for `t + 1`, so monitors and VCD traces stamp it one unit late.
pub trait TickListener {
    /// Called after all commits for the current instant.
    fn on_tick(&mut self, circuit: &mut Circuit) -> Result<(), SimError>;

    /// Called once when the run stops.
    fn finish(&mut self, _circuit: &Circuit) -> Result<(), SimError> {
        Ok(())
    }
}
