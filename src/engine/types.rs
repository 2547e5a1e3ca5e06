//! Core simulation types and identifiers.
//!
//! This module defines the numeric identifier types shared across the engine:
//! entity identities, compact component-kind IDs, slot indices into
//! fixed-capacity stores, and the simulation tick counter. These definitions
//! form the semantic backbone of the system and are shared by storage,
//! queries, events, and the orchestrator.
//!
//! ## Entity identity
//!
//! Entities carry no data of their own. An [`Entity`] is a strictly positive
//! 64-bit identity allocated by an ever-incrementing counter owned by the
//! world; identifiers are never reused within a run, so two different objects
//! can never be confused after deletion. The reserved value `0`
//! ([`Entity::NONE`]) means "no entity" and marks free storage slots.

use std::fmt;


/// Raw integer representation of an entity identity.
pub type EntityId = u64;

/// Compact runtime identifier for a registered component kind.
pub type KindId = u16;

/// Index of a storage slot inside a component buffer.
pub type SlotIndex = u32;

/// Simulation tick counter.
pub type Tick = u64;

/// Maximum number of component kinds a world may register.
pub const KIND_CAP: usize = 4096;

/// An opaque entity identity.
///
/// Meaning comes only from which component buffers reference it; the value
/// itself is just a monotonically allocated positive integer.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Entity(pub EntityId);

impl Entity {
    /// The reserved "no entity" sentinel marking free slots.
    pub const NONE: Entity = Entity(0);

    /// Returns `true` if this is a real entity rather than the sentinel.
    #[inline]
    pub fn is_some(self) -> bool {
        self != Entity::NONE
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity {}", self.0)
    }
}
