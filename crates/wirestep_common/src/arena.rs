//! ID-indexed storage for simulation entities.
//!
//! [`Arena`] is dense and append-only: IDs stay valid for the arena's lifetime.
//! It backs the signal table, where aliasing a line simply means copying its ID.
//!
//! [`SlotArena`] supports removal. Its IDs carry a generation counter so a
//! handle to a removed entry is detected instead of silently resolving to a
//! newer occupant of the same slot. Entries can also be *lent* out (taken
//! without freeing the slot) so a caller can hold the value by ownership while
//! the arena itself stays borrowed mutably elsewhere.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// Trait for opaque ID types used as [`Arena`] keys.
pub trait ArenaId: Copy {
    /// Creates an ID from a raw `u32` index.
    fn from_raw(index: u32) -> Self;

    /// Returns the raw `u32` index.
    fn as_raw(self) -> u32;
}

/// A dense, ID-indexed, append-only container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arena<I: ArenaId, T> {
    items: Vec<T>,
    #[serde(skip)]
    _marker: PhantomData<I>,
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaId, T> Arena<I, T> {
    /// Creates a new, empty arena.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Allocates a new item in the arena and returns its ID.
    pub fn alloc(&mut self, item: T) -> I {
        let id = I::from_raw(self.items.len() as u32);
        self.items.push(item);
        id
    }

    /// Returns a reference to the item with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID is out of bounds.
    pub fn get(&self, id: I) -> &T {
        &self.items[id.as_raw() as usize]
    }

    /// Returns a mutable reference to the item with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID is out of bounds.
    pub fn get_mut(&mut self, id: I) -> &mut T {
        &mut self.items[id.as_raw() as usize]
    }

    /// Returns the number of items in the arena.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the arena contains no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over `(ID, &T)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (I::from_raw(i as u32), item))
    }

    /// Iterates over mutable references to items in allocation order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }
}

/// Trait for generation-tagged ID types used as [`SlotArena`] keys.
pub trait SlotId: Copy {
    /// Builds an ID from a slot index and the slot's generation.
    fn from_parts(index: u32, generation: u32) -> Self;

    /// Returns the slot index.
    fn index(self) -> u32;

    /// Returns the generation the ID was issued under.
    fn generation(self) -> u32;
}

#[derive(Debug)]
enum SlotState<T> {
    Occupied(T),
    Lent,
    Vacant,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    state: SlotState<T>,
}

/// A removable, generation-checked container.
///
/// A slot is live while it is occupied or lent. Removing a slot bumps its
/// generation, so every ID issued before the removal stops resolving.
#[derive(Debug)]
pub struct SlotArena<I: SlotId, T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
    _marker: PhantomData<I>,
}

impl<I: SlotId, T> Default for SlotArena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: SlotId, T> SlotArena<I, T> {
    /// Creates a new, empty slot arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            _marker: PhantomData,
        }
    }

    /// Inserts a value and returns its ID.
    pub fn insert(&mut self, value: T) -> I {
        let id = self.reserve();
        let slot = &mut self.slots[id.index() as usize];
        slot.state = SlotState::Occupied(value);
        id
    }

    /// Allocates a live slot with no value yet, as if it were lent out.
    ///
    /// Fill it with [`restore`](Self::restore). This lets a value be built
    /// with knowledge of its own ID.
    pub fn reserve(&mut self) -> I {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.state = SlotState::Lent;
            return I::from_parts(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            state: SlotState::Lent,
        });
        I::from_parts(index, 0)
    }

    fn slot(&self, id: I) -> Option<&Slot<T>> {
        self.slots
            .get(id.index() as usize)
            .filter(|s| s.generation == id.generation())
    }

    fn slot_mut(&mut self, id: I) -> Option<&mut Slot<T>> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|s| s.generation == id.generation())
    }

    /// Returns `true` if the ID refers to a live (occupied or lent) slot.
    pub fn contains(&self, id: I) -> bool {
        self.slot(id)
            .is_some_and(|s| !matches!(s.state, SlotState::Vacant))
    }

    /// Returns the value if the slot is live and not lent out.
    pub fn get(&self, id: I) -> Option<&T> {
        match &self.slot(id)?.state {
            SlotState::Occupied(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the value mutably if the slot is live and not lent out.
    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        match &mut self.slot_mut(id)?.state {
            SlotState::Occupied(v) => Some(v),
            _ => None,
        }
    }

    /// Lends the value out, leaving the slot live but empty.
    pub fn take(&mut self, id: I) -> Option<T> {
        let slot = self.slot_mut(id)?;
        match std::mem::replace(&mut slot.state, SlotState::Lent) {
            SlotState::Occupied(v) => Some(v),
            other => {
                slot.state = other;
                None
            }
        }
    }

    /// Returns a lent value to its slot.
    ///
    /// Fails, handing the value back, if the slot was removed in the meantime.
    pub fn restore(&mut self, id: I, value: T) -> Result<(), T> {
        match self.slot_mut(id) {
            Some(slot) if matches!(slot.state, SlotState::Lent) => {
                slot.state = SlotState::Occupied(value);
                Ok(())
            }
            _ => Err(value),
        }
    }

    /// Removes a live slot and returns its value (`None` if it was lent out).
    ///
    /// Returns `None` without effect if the ID is stale.
    pub fn remove(&mut self, id: I) -> Option<T> {
        if !self.contains(id) {
            return None;
        }
        let index = id.index();
        let slot = &mut self.slots[index as usize];
        let old = std::mem::replace(&mut slot.state, SlotState::Vacant);
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        self.live -= 1;
        match old {
            SlotState::Occupied(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the number of live slots.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if no slot is live.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Returns the IDs of all live slots in index order.
    pub fn ids(&self) -> Vec<I> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| !matches!(s.state, SlotState::Vacant))
            .map(|(i, s)| I::from_parts(i as u32, s.generation))
            .collect()
    }
}
