//! Error types for simulation lifecycle, storage, and event dispatch.
//!
//! This module declares focused, composable error types used across the
//! component storage and orchestration layers. Each error carries enough
//! context to make failures actionable while remaining small and cheap to
//! pass around or convert into the aggregate [`SimulationError`].
//!
//! ## Goals
//! * **Specificity:** Each error type models a single failure mode (e.g. a
//!   full buffer, a missing component assignment, a malformed snapshot).
//! * **Ergonomics:** All errors implement [`std::error::Error`] and
//!   [`fmt::Display`], and provide `From<T>` conversions into
//!   [`SimulationError`] so call sites can use `?`.
//! * **Actionability:** Structured fields (offending entity, component name,
//!   configured capacity) make logs useful without reproducing the issue.
//!
//! ## Failure classes
//! * Configuration errors — duplicate or missing registrations, invalid
//!   capacities, lifecycle methods called out of order. These indicate
//!   programmer error and always fail loudly.
//! * Capacity errors — a buffer with no free slot. Recoverable by the
//!   caller; never silently dropped, and never mutating state on failure.
//! * Lookup errors — requesting a component an entity does not own.
//! * Protocol errors — raising a system event nobody listens to, or
//!   re-entering a system through an event it raised itself.

use std::fmt;

use crate::engine::types::Entity;


/// Returned when a component buffer has no free slot left.
///
/// The buffer's capacity is fixed at registration time; running out of slots
/// is a hard ceiling, not a growth point. The failed operation leaves the
/// buffer untouched, so the caller may recover by removing an assignment or
/// by treating the failure as "cannot spawn more of this kind right now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferFullError {
    /// Component type whose buffer is exhausted.
    pub component: &'static str,

    /// Configured slot capacity of the buffer.
    pub capacity: usize,
}

impl fmt::Display for BufferFullError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "component buffer for {} is full (capacity {})",
            self.component, self.capacity
        )
    }
}

impl std::error::Error for BufferFullError {}

/// Returned when an entity owns no slot in the requested component buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentNotFoundError {
    /// Entity that was looked up.
    pub entity: Entity,

    /// Component type that was requested.
    pub component: &'static str,
}

impl fmt::Display for ComponentNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} holds no {} component", self.entity, self.component)
    }
}

impl std::error::Error for ComponentNotFoundError {}

/// Returned when snapshot arrays passed to a restore do not match the
/// buffer's fixed capacity.
///
/// Both the value array and the assignment array must have exactly one
/// element per slot; anything else indicates the snapshot came from a buffer
/// with a different configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateShapeError {
    /// Component type whose buffer rejected the snapshot.
    pub component: &'static str,

    /// Slot capacity the buffer expects.
    pub expected: usize,

    /// Length of the provided value array.
    pub values: usize,

    /// Length of the provided assignment array.
    pub assignments: usize,
}

impl fmt::Display for StateShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "snapshot shape mismatch for {}: expected {} slots, got {} values and {} assignments",
            self.component, self.expected, self.values, self.assignments
        )
    }
}

impl std::error::Error for StateShapeError {}

/// Returned when a system event is raised and no system listens for it.
///
/// System events are a closed contract between known systems, so a missing
/// handler is a configuration bug worth surfacing immediately rather than a
/// notification to silently drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoListenerError {
    /// Event type that had no registered listener.
    pub event: &'static str,
}

impl fmt::Display for NoListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no system listens for event {}", self.event)
    }
}

impl std::error::Error for NoListenerError {}

/// Aggregate error for all fallible simulation operations.
///
/// Call sites use `?` against [`SimResult`]; conversions from the leaf error
/// types preserve the underlying structure for matching and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationError {
    /// A lifecycle method required the world to be uninitialized.
    AlreadyInitialized,

    /// A lifecycle method required the world to be initialized first.
    NotInitialized,

    /// A component kind or system type was registered twice.
    DuplicateRegistration {
        /// Type name of the duplicated registration.
        name: &'static str,
    },

    /// A component buffer was registered with a capacity below one.
    InvalidCapacity {
        /// The rejected capacity value.
        requested: usize,
    },

    /// A listener registration referenced a system that was never added.
    UnknownSystem {
        /// Type name of the missing system.
        system: &'static str,
    },

    /// An operation referenced a component kind that was never registered.
    UnregisteredComponent {
        /// Type name of the missing component kind.
        component: &'static str,
    },

    /// A component buffer ran out of free slots.
    BufferFull(BufferFullError),

    /// An entity owned no slot in the requested buffer.
    ComponentNotFound(ComponentNotFoundError),

    /// Snapshot arrays did not match the buffer's capacity.
    StateShape(StateShapeError),

    /// A system event was raised with no registered listener.
    NoListener(NoListenerError),

    /// Event dispatch re-entered a system that is already running.
    ReentrantDispatch {
        /// Event type whose delivery re-entered a running system.
        event: &'static str,
    },
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::AlreadyInitialized => {
                f.write_str("the simulation is already initialized")
            }
            SimulationError::NotInitialized => {
                f.write_str("the simulation has not been initialized")
            }
            SimulationError::DuplicateRegistration { name } => {
                write!(f, "{} is already registered", name)
            }
            SimulationError::InvalidCapacity { requested } => {
                write!(f, "invalid buffer capacity {} (minimum 1)", requested)
            }
            SimulationError::UnknownSystem { system } => {
                write!(f, "system {} was never added to the world", system)
            }
            SimulationError::UnregisteredComponent { component } => {
                write!(f, "component {} was never registered", component)
            }
            SimulationError::BufferFull(e) => write!(f, "{e}"),
            SimulationError::ComponentNotFound(e) => write!(f, "{e}"),
            SimulationError::StateShape(e) => write!(f, "{e}"),
            SimulationError::NoListener(e) => write!(f, "{e}"),
            SimulationError::ReentrantDispatch { event } => {
                write!(f, "event {} re-entered a system that is already running", event)
            }
        }
    }
}

impl std::error::Error for SimulationError {}

impl From<BufferFullError> for SimulationError {
    fn from(e: BufferFullError) -> Self { SimulationError::BufferFull(e) }
}

impl From<ComponentNotFoundError> for SimulationError {
    fn from(e: ComponentNotFoundError) -> Self { SimulationError::ComponentNotFound(e) }
}

impl From<StateShapeError> for SimulationError {
    fn from(e: StateShapeError) -> Self { SimulationError::StateShape(e) }
}

impl From<NoListenerError> for SimulationError {
    fn from(e: NoListenerError) -> Self { SimulationError::NoListener(e) }
}

/// Convenience alias for simulation results.
pub type SimResult<T> = Result<T, SimulationError>;
