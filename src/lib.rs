//! # Lockstep Framework
//!
//! Deterministic, rollback-capable Entity-Component-System (ECS) simulation
//! core for lockstep game logic.
//!
//! ## Design Goals
//! - Bit-identical results across machines
//! - Fixed-capacity, stable-address component storage
//! - Incrementally maintained multi-component intersection queries
//! - Exact whole-state snapshot/restore, randomness included
//!
//! The simulation advances in synchronous ticks: systems run strictly in
//! registration order, system events fan out immediately on the same call
//! stack, and queued external events are delivered only once the tick's
//! systems have all finished. Every piece of mutable simulation state — the
//! deterministic random generator included — lives inside component buffers
//! that snapshot and restore exactly, so a host can rewind to a checkpoint
//! and replay forward to identical results.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_inception)]
#![deny(dead_code)]

pub mod engine;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

// Core simulation types

pub use engine::world::World;

pub use engine::types::{
    Entity,
    EntityId,
    KindId,
    SlotIndex,
    Tick,
};

pub use engine::store::{
    BufferState,
    Component,
    ComponentBuffer,
};

pub use engine::query::Query;

pub use engine::systems::{
    EventListener,
    System,
};

pub use engine::events::SubscriptionId;

pub use engine::random::{
    RngState,
    XorShift128,
};

pub use engine::error::{
    BufferFullError,
    ComponentNotFoundError,
    NoListenerError,
    SimResult,
    SimulationError,
    StateShapeError,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude (Optional but recommended)
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used simulation types.
///
/// Import with:
/// ```rust
/// use lockstep_framework::prelude::*;
/// ```
pub mod prelude {
    pub use crate::engine::error::{SimResult, SimulationError};
    pub use crate::engine::random::XorShift128;
    pub use crate::engine::store::{BufferState, Component};
    pub use crate::engine::systems::{EventListener, System};
    pub use crate::engine::types::{Entity, Tick};
    pub use crate::engine::world::World;
}
