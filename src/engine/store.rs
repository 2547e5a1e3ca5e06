//! Fixed-capacity component storage with stable slots.
//!
//! This module implements [`ComponentBuffer<T>`], the storage engine behind
//! every registered component kind: a fixed-length slot array of `T`, a
//! parallel array mapping each slot to its owning [`Entity`] (or the free
//! sentinel), a FIFO queue of free slot indices, and an entity→slot map for
//! constant-time lookup.
//!
//! # Storage model
//!
//! ```text
//! values:      [ v0, v1, v2, v3 ]           one T per slot, always initialized
//! assignments: [ e7,  0, e2,  0 ]           slot -> owner, 0 = free
//! free:        [ 1, 3 ]                     FIFO of free slot indices
//! slots:       { e7 -> 0, e2 -> 2 }         entity -> slot
//! ```
//!
//! Capacity is fixed when the buffer is created and never resized; running
//! out of slots is a reported [`BufferFullError`], not a reallocation. Slot
//! addresses therefore stay stable for the buffer's whole lifetime, which the
//! incremental query engine and in-place mutable access depend on.
//!
//! # Invariants
//!
//! - Every slot is either free (`assignments[slot] == Entity::NONE` and the
//!   index is queued in `free`) or owned by exactly one entity
//!   (`assignments[slot]` names it and `slots` agrees).
//! - `slots.len() + free.len() == capacity` at all times.
//! - Freed slot values are not wiped; the next assignment of the slot
//!   overwrites them fully.
//!
//! # Structural mutation and notifications
//!
//! [`ComponentBuffer::set`] and [`ComponentBuffer::remove`] are the only
//! paths that change membership, and they are crate-private: user code
//! mutates through the world, which forwards the resulting [`StoreEvent`] to
//! the query cache. That routing is what keeps the incrementally maintained
//! query sets exact — membership never changes without the cache hearing
//! about it.
//!
//! # Snapshots
//!
//! [`ComponentBuffer::snapshot`] copies the value and assignment arrays as a
//! [`BufferState`]; [`ComponentBuffer::restore`] copies them back and
//! rebuilds the free queue and entity map from the assignment array in one
//! pass. The arrays are the entire source of truth, so every participant in
//! a rollback reconstructs identical bookkeeping.

use std::any::{type_name, Any};
use std::collections::{HashMap, VecDeque};

use crate::engine::error::{BufferFullError, StateShapeError};
use crate::engine::types::{Entity, SlotIndex};


/// Marker bound for component value types.
///
/// Components are plain data records: `Default` lets the fixed slot array
/// stay fully initialized (and backs the default-value assignment overload),
/// `Clone` backs snapshots.
pub trait Component: Clone + Default + 'static {}

impl<T: Clone + Default + 'static> Component for T {}

/// Structural outcome of an assignment, forwarded to the query cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StoreEvent {
    /// The entity claimed a new slot.
    Added,

    /// The entity already owned a slot; only the value changed.
    Overwritten,
}

/// A point-in-time copy of a buffer's complete state.
///
/// Holds one value and one assignment per slot, including freed slots.
/// Produced by [`ComponentBuffer::snapshot`], consumed by the world's
/// restore path; the pair round-trips exactly.
#[derive(Clone, Debug)]
pub struct BufferState<T> {
    /// One value per slot, in slot order.
    pub values: Vec<T>,

    /// One owner per slot, in slot order; [`Entity::NONE`] marks free slots.
    pub assignments: Vec<Entity>,
}

/// Fixed-capacity slot storage for one component kind.
pub struct ComponentBuffer<T> {
    values: Box<[T]>,
    assignments: Box<[Entity]>,
    free: VecDeque<SlotIndex>,
    slots: HashMap<Entity, SlotIndex>,
}

impl<T: Component> ComponentBuffer<T> {
    /// Creates a buffer with `capacity` slots, all free.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        debug_assert!(capacity >= 1, "buffer capacity must be at least 1");
        debug_assert!(capacity <= SlotIndex::MAX as usize, "capacity exceeds slot index range");

        Self {
            values: (0..capacity).map(|_| T::default()).collect(),
            assignments: vec![Entity::NONE; capacity].into_boxed_slice(),
            free: (0..capacity as SlotIndex).collect(),
            slots: HashMap::with_capacity(capacity),
        }
    }

    /// Returns the fixed slot capacity.
    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    /// Returns the number of currently assigned slots.
    pub fn live_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the entity owns a slot in this buffer.
    pub fn contains(&self, entity: Entity) -> bool {
        self.slots.contains_key(&entity)
    }

    /// Returns the entity's value, or `None` if it owns no slot.
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.slots.get(&entity).map(|&slot| &self.values[slot as usize])
    }

    /// Returns a mutable reference to the entity's value, or `None` if it
    /// owns no slot.
    ///
    /// The reference stays valid until the next structural mutation of this
    /// entity's assignment; value mutation through it is never a structural
    /// change and fires no notification.
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.slots.get(&entity).map(|&slot| &mut self.values[slot as usize])
    }

    /// Iterates `(entity, value)` pairs over all currently assigned slots,
    /// in slot order, skipping free slots.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> + '_ {
        self.assignments
            .iter()
            .zip(self.values.iter())
            .filter(|(owner, _)| owner.is_some())
            .map(|(owner, value)| (*owner, value))
    }

    /// Iterates `(entity, value)` pairs with mutable value access, in slot
    /// order, skipping free slots.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> + '_ {
        self.assignments
            .iter()
            .zip(self.values.iter_mut())
            .filter(|(owner, _)| owner.is_some())
            .map(|(owner, value)| (*owner, value))
    }

    /// Iterates the owners of all currently assigned slots, in slot order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.assignments.iter().copied().filter(|owner| owner.is_some())
    }

    /// Assigns `value` to `entity`.
    ///
    /// If the entity already owns a slot, the slot's value is overwritten in
    /// place with no structural change. Otherwise a free slot is popped from
    /// the FIFO queue and claimed. Fails with [`BufferFullError`] — before
    /// any state changes — when no free slot exists.
    pub(crate) fn set(&mut self, entity: Entity, value: T) -> Result<StoreEvent, BufferFullError> {
        debug_assert!(entity.is_some(), "the null entity cannot own a component");

        if let Some(&slot) = self.slots.get(&entity) {
            self.values[slot as usize] = value;
            return Ok(StoreEvent::Overwritten);
        }

        let Some(slot) = self.free.pop_front() else {
            return Err(BufferFullError {
                component: type_name::<T>(),
                capacity: self.values.len(),
            });
        };

        self.values[slot as usize] = value;
        self.assignments[slot as usize] = entity;
        self.slots.insert(entity, slot);
        Ok(StoreEvent::Added)
    }

    /// Releases the entity's slot, if it owns one.
    ///
    /// Returns `false` as a no-op when the entity owns no slot. The freed
    /// slot index is pushed onto the back of the free queue; the slot's
    /// value is left as-is until the next assignment overwrites it.
    pub(crate) fn remove(&mut self, entity: Entity) -> bool {
        let Some(slot) = self.slots.remove(&entity) else {
            return false;
        };
        self.assignments[slot as usize] = Entity::NONE;
        self.free.push_back(slot);
        true
    }

    /// Copies the complete buffer state, including freed slots.
    pub fn snapshot(&self) -> BufferState<T> {
        BufferState {
            values: self.values.to_vec(),
            assignments: self.assignments.to_vec(),
        }
    }

    /// Overwrites the buffer from a snapshot, rebuilding the free queue and
    /// entity map from the assignment array in one pass.
    ///
    /// The free queue is reconstructed in ascending slot order — the
    /// assignment array is the whole source of truth, so every buffer
    /// restored from the same snapshot ends up bit-identical.
    pub(crate) fn restore(&mut self, state: &BufferState<T>) -> Result<(), StateShapeError> {
        let capacity = self.values.len();
        if state.values.len() != capacity || state.assignments.len() != capacity {
            return Err(StateShapeError {
                component: type_name::<T>(),
                expected: capacity,
                values: state.values.len(),
                assignments: state.assignments.len(),
            });
        }

        self.values.clone_from_slice(&state.values);
        self.assignments.copy_from_slice(&state.assignments);

        self.slots.clear();
        self.free.clear();
        for (slot, &owner) in state.assignments.iter().enumerate() {
            if owner.is_some() {
                self.slots.insert(owner, slot as SlotIndex);
            } else {
                self.free.push_back(slot as SlotIndex);
            }
        }
        Ok(())
    }

    /// Returns the owner recorded for `slot`, or [`Entity::NONE`] if free.
    pub(crate) fn slot_owner(&self, slot: SlotIndex) -> Entity {
        self.assignments[slot as usize]
    }

    /// Returns the value stored at `slot` if the slot is assigned.
    pub(crate) fn slot_value(&self, slot: SlotIndex) -> Option<&T> {
        if self.assignments[slot as usize].is_some() {
            Some(&self.values[slot as usize])
        } else {
            None
        }
    }

    /// Returns the value stored at `slot` mutably if the slot is assigned.
    pub(crate) fn slot_value_mut(&mut self, slot: SlotIndex) -> Option<&mut T> {
        if self.assignments[slot as usize].is_some() {
            Some(&mut self.values[slot as usize])
        } else {
            None
        }
    }
}

/// Type-erased interface over a [`ComponentBuffer<T>`].
///
/// Lets the world own heterogeneous buffers behind trait objects and lets
/// the query cache probe membership without knowing `T`. Downcasting back to
/// the concrete buffer goes through `as_any` / `as_any_mut`.
pub(crate) trait TypeErasedStore: Any {
    /// Returns an immutable reference for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns a mutable reference for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Returns `true` if the entity owns a slot in this buffer.
    fn contains_entity(&self, entity: Entity) -> bool;

    /// Returns the owners of all assigned slots, in slot order.
    fn assigned_entities(&self) -> Vec<Entity>;
}

impl<T: Component> TypeErasedStore for ComponentBuffer<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn contains_entity(&self, entity: Entity) -> bool {
        self.contains(entity)
    }

    fn assigned_entities(&self) -> Vec<Entity> {
        self.entities().collect()
    }
}
