//! The simulation orchestrator.
//!
//! [`World`] owns everything a deterministic simulation needs: the
//! per-instance component kind registry and its type-erased buffers, the
//! query cache, the ordered list of systems, both event channels, the
//! monotonic entity counter, and the tick counter. Nothing in this module is
//! process-global — independent worlds in one process (server-side
//! multi-match hosting) share no mutable state whatsoever.
//!
//! ## Lifecycle
//!
//! `Uninitialized → Initialized → (ticking)*`. Component kinds, singletons,
//! systems, and listeners are registered while uninitialized;
//! [`World::initialize`] runs every system's init hook once in registration
//! order and transitions; [`World::tick`] then advances the simulation one
//! step at a time. Lifecycle violations fail loudly — they are programmer
//! errors, never tolerated silently.
//!
//! ## One tick
//!
//! [`World::tick`] increments the tick counter, runs every system's
//! `process` hook synchronously in registration order, and finally drains
//! the external event queue. There is no suspension point inside a tick and
//! no internal parallelism; if a host wants time-boxed ticks it enforces
//! that around the call.
//!
//! ## Structural mutation routing
//!
//! [`World::set`] and [`World::remove`] are the only paths that change
//! which entity owns which slot. Each structural change is forwarded to the
//! query cache as an added/removed notification, which is what keeps
//! incrementally maintained query sets exact without rescans.
//!
//! ## Rollback
//!
//! [`World::get_state`] and [`World::set_state`] snapshot and restore one
//! buffer at a time; a full checkpoint is every relevant buffer's state
//! (the deterministic RNG singleton included, since it is an ordinary
//! component) plus the tick number. The world keeps no ring buffer of past
//! frames — checkpoint retention is the caller's policy, typically owned by
//! a networking layer.

use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, info, warn};

use crate::engine::error::{ComponentNotFoundError, NoListenerError, SimResult, SimulationError};
use crate::engine::events::{ExternalEvents, SubscriptionId};
use crate::engine::query::{Query, QueryCache};
use crate::engine::store::{BufferState, Component, ComponentBuffer, StoreEvent, TypeErasedStore};
use crate::engine::systems::{EventListener, System};
use crate::engine::types::{Entity, EntityId, KindId, Tick, KIND_CAP};


/// Registration metadata for one component kind.
struct StoreDesc {
    name: &'static str,
    capacity: usize,
}

/// Monomorphized dispatch thunk bridging a type-erased system and event
/// back to their concrete types.
type ListenerFn = fn(&mut dyn System, &mut World, &dyn Any) -> SimResult<()>;

#[derive(Clone, Copy)]
struct ListenerEntry {
    system: usize,
    deliver: ListenerFn,
}

fn deliver_event<E: 'static, S: EventListener<E>>(
    system: &mut dyn System,
    world: &mut World,
    event: &dyn Any,
) -> SimResult<()> {
    let system = system
        .as_any_mut()
        .downcast_mut::<S>()
        .expect("listener system type matches its registration");
    let event = event
        .downcast_ref::<E>()
        .expect("event payload type matches its registration");
    system.on_event(world, event)
}

/// The simulation orchestrator: owner of all component buffers, the query
/// cache, the event channels, and the ordered system list.
pub struct World {
    initialized: bool,
    tick_number: Tick,
    entity_counter: EntityId,
    kinds: HashMap<TypeId, KindId>,
    descs: Vec<StoreDesc>,
    stores: Vec<Box<dyn TypeErasedStore>>,
    queries: QueryCache,
    systems: Vec<Rc<RefCell<dyn System>>>,
    system_types: HashMap<TypeId, usize>,
    listeners: HashMap<TypeId, Vec<ListenerEntry>>,
    external: ExternalEvents,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates an empty, uninitialized world.
    pub fn new() -> Self {
        Self {
            initialized: false,
            tick_number: 0,
            entity_counter: 0,
            kinds: HashMap::new(),
            descs: Vec::new(),
            stores: Vec::new(),
            queries: QueryCache::new(),
            systems: Vec::new(),
            system_types: HashMap::new(),
            listeners: HashMap::new(),
            external: ExternalEvents::new(),
        }
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Registers a component kind with a fixed slot capacity.
    ///
    /// Legal only before [`World::initialize`]. Fails with
    /// `AlreadyInitialized` afterwards, `DuplicateRegistration` if a buffer
    /// for `T` already exists, and `InvalidCapacity` for capacities below 1.
    pub fn register_component<T: Component>(&mut self, capacity: usize) -> SimResult<()> {
        self.register_store::<T>(capacity).map(|_| ())
    }

    /// Registers a simulation-wide singleton value: sugar over a capacity-1
    /// buffer whose single slot is assigned immediately.
    ///
    /// Singletons participate in snapshot/restore exactly like per-entity
    /// components, which is how the deterministic RNG is kept inside the
    /// rollback boundary.
    pub fn register_singleton<T: Component>(&mut self, initial: T) -> SimResult<()> {
        let kind = self.register_store::<T>(1)?;
        let entity = self.create_entity();
        let _ = self
            .typed_store_mut::<T>(kind)
            .set(entity, initial)
            .expect("freshly registered singleton buffer has a free slot");
        self.queries.on_added(kind, entity, &self.stores);
        Ok(())
    }

    fn register_store<T: Component>(&mut self, capacity: usize) -> SimResult<KindId> {
        if self.initialized {
            return Err(SimulationError::AlreadyInitialized);
        }
        if capacity < 1 {
            return Err(SimulationError::InvalidCapacity { requested: capacity });
        }
        let type_id = TypeId::of::<T>();
        if self.kinds.contains_key(&type_id) {
            return Err(SimulationError::DuplicateRegistration { name: type_name::<T>() });
        }
        assert!(self.stores.len() < KIND_CAP, "exceeded configured component kind capacity");

        let kind = self.stores.len() as KindId;
        self.kinds.insert(type_id, kind);
        self.descs.push(StoreDesc { name: type_name::<T>(), capacity });
        self.stores.push(Box::new(ComponentBuffer::<T>::with_capacity(capacity)));
        debug!("registered component store {} with capacity {}", type_name::<T>(), capacity);
        Ok(kind)
    }

    /// Adds a system to the end of the execution order.
    ///
    /// Legal only before [`World::initialize`]. Each system type may be
    /// added once; the type identifies the system for listener registration.
    pub fn add_system<S: System>(&mut self, system: S) -> SimResult<()> {
        if self.initialized {
            return Err(SimulationError::AlreadyInitialized);
        }
        let type_id = TypeId::of::<S>();
        if self.system_types.contains_key(&type_id) {
            return Err(SimulationError::DuplicateRegistration { name: type_name::<S>() });
        }
        debug!("registered system {}", system.name());
        let index = self.systems.len();
        self.system_types.insert(type_id, index);
        self.systems.push(Rc::new(RefCell::new(system)));
        Ok(())
    }

    /// Registers system `S` as a listener for system events of type `E`.
    ///
    /// `S` must already have been added. Delivery order follows system
    /// registration order regardless of listener registration order.
    pub fn add_listener<E: 'static, S: EventListener<E>>(&mut self) -> SimResult<()> {
        if self.initialized {
            return Err(SimulationError::AlreadyInitialized);
        }
        let Some(&system) = self.system_types.get(&TypeId::of::<S>()) else {
            return Err(SimulationError::UnknownSystem { system: type_name::<S>() });
        };

        let entries = self.listeners.entry(TypeId::of::<E>()).or_default();
        if entries.iter().any(|entry| entry.system == system) {
            return Err(SimulationError::DuplicateRegistration { name: type_name::<S>() });
        }
        let position = entries
            .iter()
            .position(|entry| entry.system > system)
            .unwrap_or(entries.len());
        entries.insert(position, ListenerEntry { system, deliver: deliver_event::<E, S> });
        Ok(())
    }

    /// Runs every system's init hook once, in registration order, and
    /// transitions the world to initialized.
    ///
    /// Fails with `AlreadyInitialized` on a second call.
    pub fn initialize(&mut self) -> SimResult<()> {
        if self.initialized {
            return Err(SimulationError::AlreadyInitialized);
        }
        for index in 0..self.systems.len() {
            let cell = Rc::clone(&self.systems[index]);
            let mut system = cell.borrow_mut();
            system.init(self)?;
        }
        self.initialized = true;
        info!(
            "simulation initialized with {} component store(s) and {} system(s)",
            self.stores.len(),
            self.systems.len()
        );
        for desc in &self.descs {
            debug!("  store {} (capacity {})", desc.name, desc.capacity);
        }
        Ok(())
    }

    /// Returns `true` once [`World::initialize`] has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Allocates a fresh entity identity: `previous + 1`, never zero, never
    /// reused within a run.
    pub fn create_entity(&mut self) -> Entity {
        self.entity_counter += 1;
        Entity(self.entity_counter)
    }

    /// Returns the current tick number.
    pub fn current_tick(&self) -> Tick {
        self.tick_number
    }

    /// Advances the simulation by one tick.
    ///
    /// Increments the tick counter, invokes every system's `process` hook
    /// synchronously in registration order, then drains the external event
    /// queue. Fails with `NotInitialized` before [`World::initialize`].
    pub fn tick(&mut self) -> SimResult<()> {
        if !self.initialized {
            return Err(SimulationError::NotInitialized);
        }
        self.tick_number += 1;
        for index in 0..self.systems.len() {
            let cell = Rc::clone(&self.systems[index]);
            // Top-level borrow: a running system cannot call back into
            // tick, so this borrow never observes a nested one.
            let mut system = cell.borrow_mut();
            system.process(self)?;
        }
        self.external.drain();
        Ok(())
    }

    // ─── Storage access ──────────────────────────────────────────────────

    /// Assigns `value` to `entity` in `T`'s buffer.
    ///
    /// Overwrites in place (no structural change, no notification) when the
    /// entity already owns a slot; otherwise claims a free slot and notifies
    /// the query cache. Fails with `BufferFull` — leaving all state
    /// untouched — when the buffer has no free slot.
    pub fn set<T: Component>(&mut self, entity: Entity, value: T) -> SimResult<()> {
        let kind = self.kind_of::<T>()?;
        let event = match self.typed_store_mut::<T>(kind).set(entity, value) {
            Ok(event) => event,
            Err(e) => {
                warn!("{e}");
                return Err(e.into());
            }
        };
        if event == StoreEvent::Added {
            self.queries.on_added(kind, entity, &self.stores);
        }
        Ok(())
    }

    /// Assigns a default-initialized `T` to `entity`.
    pub fn set_default<T: Component>(&mut self, entity: Entity) -> SimResult<()> {
        self.set(entity, T::default())
    }

    /// Returns the entity's `T` value.
    pub fn get<T: Component>(&self, entity: Entity) -> SimResult<&T> {
        let kind = self.kind_of::<T>()?;
        self.typed_store::<T>(kind).get(entity).ok_or_else(|| {
            ComponentNotFoundError { entity, component: type_name::<T>() }.into()
        })
    }

    /// Returns the entity's `T` value mutably, for in-place mutation.
    ///
    /// Value mutation is never a structural change and fires no
    /// notification.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> SimResult<&mut T> {
        let kind = self.kind_of::<T>()?;
        self.typed_store_mut::<T>(kind).get_mut(entity).ok_or_else(|| {
            ComponentNotFoundError { entity, component: type_name::<T>() }.into()
        })
    }

    /// Releases the entity's slot in `T`'s buffer, notifying the query
    /// cache. Returns `false` as a no-op when the entity owns no slot.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> SimResult<bool> {
        let kind = self.kind_of::<T>()?;
        let removed = self.typed_store_mut::<T>(kind).remove(entity);
        if removed {
            self.queries.on_removed(kind, entity);
        }
        Ok(removed)
    }

    /// Returns `true` if the entity owns a slot in `T`'s buffer.
    pub fn contains<T: Component>(&self, entity: Entity) -> SimResult<bool> {
        let kind = self.kind_of::<T>()?;
        Ok(self.typed_store::<T>(kind).contains(entity))
    }

    /// Returns the number of currently assigned slots in `T`'s buffer.
    pub fn live_count<T: Component>(&self) -> SimResult<usize> {
        Ok(self.buffer::<T>()?.live_count())
    }

    /// Returns the fixed capacity of `T`'s buffer.
    pub fn capacity<T: Component>(&self) -> SimResult<usize> {
        Ok(self.buffer::<T>()?.capacity())
    }

    /// Returns `T`'s buffer for iteration and lookups.
    pub fn buffer<T: Component>(&self) -> SimResult<&ComponentBuffer<T>> {
        let kind = self.kind_of::<T>()?;
        Ok(self.typed_store::<T>(kind))
    }

    /// Returns `T`'s buffer with mutable value access (`iter_mut`,
    /// `get_mut`). Structural mutation still goes through
    /// [`World::set`] / [`World::remove`].
    pub fn buffer_mut<T: Component>(&mut self) -> SimResult<&mut ComponentBuffer<T>> {
        let kind = self.kind_of::<T>()?;
        Ok(self.typed_store_mut::<T>(kind))
    }

    // ─── Singletons ──────────────────────────────────────────────────────

    /// Reads the singleton value of `T` (slot 0 of its buffer).
    ///
    /// Intended for kinds registered through [`World::register_singleton`].
    pub fn singleton<T: Component>(&self) -> SimResult<&T> {
        let kind = self.kind_of::<T>()?;
        self.typed_store::<T>(kind).slot_value(0).ok_or_else(|| {
            ComponentNotFoundError { entity: Entity::NONE, component: type_name::<T>() }.into()
        })
    }

    /// Reads the singleton value of `T` mutably.
    pub fn singleton_mut<T: Component>(&mut self) -> SimResult<&mut T> {
        let kind = self.kind_of::<T>()?;
        self.typed_store_mut::<T>(kind).slot_value_mut(0).ok_or_else(|| {
            ComponentNotFoundError { entity: Entity::NONE, component: type_name::<T>() }.into()
        })
    }

    /// Overwrites the singleton value of `T`, assigning slot 0 to a fresh
    /// entity if a restore left it unassigned.
    pub fn set_singleton<T: Component>(&mut self, value: T) -> SimResult<()> {
        let kind = self.kind_of::<T>()?;
        if self.typed_store::<T>(kind).slot_owner(0).is_some() {
            let slot = self
                .typed_store_mut::<T>(kind)
                .slot_value_mut(0)
                .expect("assigned slot holds a value");
            *slot = value;
            return Ok(());
        }
        let entity = self.create_entity();
        let event = self.typed_store_mut::<T>(kind).set(entity, value)?;
        if event == StoreEvent::Added {
            self.queries.on_added(kind, entity, &self.stores);
        }
        Ok(())
    }

    // ─── Events ──────────────────────────────────────────────────────────

    /// Raises a system event, synchronously invoking every registered
    /// listener in system registration order on the current call stack.
    ///
    /// Fails with `NoListener` when no system listens for `E` — system
    /// events are a closed intra-tick contract, so a missing handler is a
    /// configuration bug. Fails with `ReentrantDispatch` if delivery would
    /// re-enter the system that is currently running.
    pub fn system_event<E: 'static>(&mut self, event: E) -> SimResult<()> {
        let entries: Vec<ListenerEntry> = match self.listeners.get(&TypeId::of::<E>()) {
            Some(entries) if !entries.is_empty() => entries.clone(),
            _ => return Err(NoListenerError { event: type_name::<E>() }.into()),
        };

        for entry in entries {
            let cell = Rc::clone(&self.systems[entry.system]);
            let mut system = cell.try_borrow_mut().map_err(|_| {
                SimulationError::ReentrantDispatch { event: type_name::<E>() }
            })?;
            (entry.deliver)(&mut *system, self, &event)?;
        }
        Ok(())
    }

    /// Buffers an external event for delivery after all systems have run
    /// for the current tick. Zero subscribers is not an error.
    pub fn queue_external<E: 'static>(&mut self, event: E) {
        self.external.enqueue(event);
    }

    /// Attaches a callback for external events of type `E`, returning a
    /// handle for [`World::unsubscribe`]. Callbacks receive the event only
    /// — they cannot reenter the simulation.
    pub fn subscribe<E: 'static>(
        &mut self,
        callback: impl FnMut(&E) + 'static,
    ) -> SubscriptionId {
        self.external.subscribe(callback)
    }

    /// Detaches an external-event callback by handle. Returns `false` for
    /// unknown handles.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.external.unsubscribe(id)
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    /// Returns the query node for all entities currently holding `T`,
    /// creating and caching it on first use.
    pub fn query<T: Component>(&mut self) -> SimResult<Query<'_>> {
        let kind = self.kind_of::<T>()?;
        self.queries.ensure_root(kind, &self.stores);
        Ok(Query::new(self, vec![kind]))
    }

    // ─── Rollback ────────────────────────────────────────────────────────

    /// Copies the complete state of `T`'s buffer.
    pub fn get_state<T: Component>(&self) -> SimResult<BufferState<T>> {
        Ok(self.buffer::<T>()?.snapshot())
    }

    /// Restores `T`'s buffer from a snapshot, sets the tick counter to the
    /// caller-supplied checkpoint value, and clears the query cache (a
    /// derived structure that must be rebuilt lazily against restored
    /// state).
    ///
    /// A full rollback calls this for the RNG singleton and every relevant
    /// buffer, in any order, with the same checkpointed tick number.
    pub fn set_state<T: Component>(&mut self, state: &BufferState<T>, tick: Tick) -> SimResult<()> {
        let kind = self.kind_of::<T>()?;
        self.typed_store_mut::<T>(kind).restore(state)?;
        self.tick_number = tick;
        self.queries.clear();
        debug!("restored {} state at tick {}", self.descs[kind as usize].name, tick);
        Ok(())
    }

    // ─── Internals ───────────────────────────────────────────────────────

    pub(crate) fn kind_of<T: Component>(&self) -> SimResult<KindId> {
        self.kinds
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or(SimulationError::UnregisteredComponent { component: type_name::<T>() })
    }

    pub(crate) fn query_parts(&mut self) -> (&mut QueryCache, &[Box<dyn TypeErasedStore>]) {
        (&mut self.queries, &self.stores)
    }

    pub(crate) fn query_cache(&self) -> &QueryCache {
        &self.queries
    }

    fn typed_store<T: Component>(&self, kind: KindId) -> &ComponentBuffer<T> {
        self.stores[kind as usize]
            .as_any()
            .downcast_ref::<ComponentBuffer<T>>()
            .expect("store type matches its kind registration")
    }

    fn typed_store_mut<T: Component>(&mut self, kind: KindId) -> &mut ComponentBuffer<T> {
        self.stores[kind as usize]
            .as_any_mut()
            .downcast_mut::<ComponentBuffer<T>>()
            .expect("store type matches its kind registration")
    }
}
