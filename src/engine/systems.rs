//! System and event-listener contracts.
//!
//! A **system** is an ordered unit of per-tick logic. Systems are added to
//! the world before initialization and run strictly in registration order,
//! once per tick, on a single logical thread; within its turn a system may
//! freely read and write component buffers, raise system events (delivered
//! synchronously to other systems), or queue external events (delivered
//! after the tick).
//!
//! ## Lifecycle hooks
//!
//! - [`System::init`] runs exactly once, in registration order, when the
//!   world initializes. The default is a no-op.
//! - [`System::process`] runs every tick, in registration order.
//!
//! ## Typed event listeners
//!
//! A system that should receive system events of type `E` implements
//! [`EventListener<E>`] and is wired up with
//! [`World::add_listener`](crate::engine::world::World::add_listener).
//! Delivery is immediate and synchronous on the raising call stack; raising
//! an event nobody listens to is an error, because system events are a
//! closed contract between known systems.
//!
//! ## Downcasting
//!
//! Listener dispatch recovers the concrete system type from a trait object,
//! so the trait carries an `as_any_mut` hook; implementations return `self`.

use std::any::Any;

use crate::engine::error::SimResult;
use crate::engine::world::World;


/// A unit of per-tick simulation logic.
pub trait System: Any {
    /// Returns a human-readable name, used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// One-time setup hook, invoked by `World::initialize` in registration
    /// order.
    fn init(&mut self, _world: &mut World) -> SimResult<()> {
        Ok(())
    }

    /// Per-tick logic hook, invoked by `World::tick` in registration order.
    fn process(&mut self, world: &mut World) -> SimResult<()>;

    /// Returns a mutable type-erased reference for listener downcasting.
    ///
    /// Implementations return `self`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Typed listener contract for synchronous system events.
///
/// Implemented by systems that react to events of type `E` raised by other
/// systems during the same tick.
pub trait EventListener<E: 'static>: System {
    /// Handles one event, synchronously, on the raising call stack.
    fn on_event(&mut self, world: &mut World, event: &E) -> SimResult<()>;
}
