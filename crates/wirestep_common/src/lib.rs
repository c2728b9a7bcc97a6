//! Shared foundational types for the wirestep logic simulator.
//!
//! This crate provides the four-state [`LogicValue`] carried by every line and
//! the arenas the kernel uses to own signals, modules and tick listeners.

#![warn(missing_docs)]

pub mod arena;
pub mod logic;

pub use arena::{Arena, ArenaId, SlotArena, SlotId};
pub use logic::LogicValue;
