//! Opaque handle types for kernel entities.
//!
//! [`SignalId`] indexes the append-only signal arena, so copying it is how a
//! line gets aliased. [`ModuleId`] and [`TickListenerId`] carry a generation
//! and stop resolving once their entity is removed.

use serde::{Deserialize, Serialize};
use std::fmt;
use wirestep_common::{ArenaId, SlotId};

/// Opaque, copyable handle to a signal line.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct SignalId(u32);

impl SignalId {
    /// Creates a `SignalId` from a raw index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

impl ArenaId for SignalId {
    fn from_raw(index: u32) -> Self {
        Self(index)
    }

    fn as_raw(self) -> u32 {
        self.0
    }
}

macro_rules! define_slot_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        pub struct $name {
            index: u32,
            generation: u32,
        }

        impl SlotId for $name {
            fn from_parts(index: u32, generation: u32) -> Self {
                Self { index, generation }
            }

            fn index(self) -> u32 {
                self.index
            }

            fn generation(self) -> u32 {
                self.generation
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}v{}", self.index, self.generation)
            }
        }
    };
}

define_slot_id!(
    /// Generation-checked handle to a module registered with a circuit.
    ModuleId
);

define_slot_id!(
    /// Generation-checked handle to a registered tick listener.
    TickListenerId
);

/// Port identifier passed back to a module with every notification.
///
/// Modules pick their own port numbering; the kernel only carries it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct PortId(pub u32);

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port{}", self.0)
    }
}
