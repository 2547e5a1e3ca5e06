use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use lockstep_framework::{
    Entity, EventListener, SimResult, SimulationError, System, World,
};

#[derive(Clone, Copy, Default, PartialEq, Debug)]
struct Health(i32);

/// Raised synchronously between systems within a tick.
struct DamageEvent {
    target: Entity,
    amount: i32,
}

/// Queued for collaborators outside the simulation.
#[derive(Clone, PartialEq, Debug)]
struct EntityDied {
    entity: Entity,
}

/// Shared observation log used to assert ordering across the tick.
type TraceLog = Rc<RefCell<Vec<String>>>;

struct AttackSystem {
    target: Entity,
}

impl System for AttackSystem {
    fn process(&mut self, world: &mut World) -> SimResult<()> {
        world.system_event(DamageEvent { target: self.target, amount: 40 })
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct HealthSystem {
    trace: TraceLog,
}

impl System for HealthSystem {
    fn process(&mut self, world: &mut World) -> SimResult<()> {
        self.trace.borrow_mut().push(format!("health tick {}", world.current_tick()));
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl EventListener<DamageEvent> for HealthSystem {
    fn on_event(&mut self, world: &mut World, event: &DamageEvent) -> SimResult<()> {
        self.trace.borrow_mut().push(format!("damage {}", event.amount));
        let health = world.get_mut::<Health>(event.target)?;
        health.0 -= event.amount;
        if health.0 <= 0 {
            world.queue_external(EntityDied { entity: event.target });
        }
        Ok(())
    }
}

struct AuditSystem {
    trace: TraceLog,
}

impl System for AuditSystem {
    fn process(&mut self, _world: &mut World) -> SimResult<()> {
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl EventListener<DamageEvent> for AuditSystem {
    fn on_event(&mut self, _world: &mut World, event: &DamageEvent) -> SimResult<()> {
        self.trace.borrow_mut().push(format!("audit {}", event.amount));
        Ok(())
    }
}

fn build_combat_world(trace: &TraceLog) -> SimResult<(World, Entity)> {
    let mut world = World::new();
    world.register_component::<Health>(8)?;

    let victim = world.create_entity();
    world.set(victim, Health(60))?;

    world.add_system(AttackSystem { target: victim })?;
    world.add_system(HealthSystem { trace: Rc::clone(trace) })?;
    world.add_system(AuditSystem { trace: Rc::clone(trace) })?;
    world.add_listener::<DamageEvent, HealthSystem>()?;
    world.add_listener::<DamageEvent, AuditSystem>()?;
    world.initialize()?;
    Ok((world, victim))
}

#[test]
fn system_events_fan_out_in_registration_order() -> SimResult<()> {
    let trace: TraceLog = Rc::new(RefCell::new(Vec::new()));
    let (mut world, victim) = build_combat_world(&trace)?;

    world.tick()?;

    // AttackSystem raised the event before HealthSystem's own process hook
    // ran: dispatch is synchronous on the raising call stack, and listeners
    // fire in system registration order.
    assert_eq!(
        *trace.borrow(),
        vec!["damage 40".to_string(), "audit 40".to_string(), "health tick 1".to_string()]
    );
    assert_eq!(*world.get::<Health>(victim)?, Health(20));
    Ok(())
}

#[test]
fn raising_an_unhandled_system_event_fails() -> SimResult<()> {
    struct Unhandled;

    let mut world = World::new();
    world.initialize()?;

    assert!(matches!(
        world.system_event(Unhandled),
        Err(SimulationError::NoListener(_))
    ));
    Ok(())
}

#[test]
fn external_events_are_delivered_after_all_systems_ran() -> SimResult<()> {
    let trace: TraceLog = Rc::new(RefCell::new(Vec::new()));
    let (mut world, victim) = build_combat_world(&trace)?;

    let deaths: Rc<RefCell<Vec<EntityDied>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&deaths);
    let observer = Rc::clone(&trace);
    world.subscribe(move |event: &EntityDied| {
        observer.borrow_mut().push("death observed".to_string());
        sink.borrow_mut().push(event.clone());
    });

    world.tick()?;
    assert!(deaths.borrow().is_empty());

    world.tick()?;
    assert_eq!(*deaths.borrow(), vec![EntityDied { entity: victim }]);

    // The death notification arrived after every system finished tick 2.
    assert_eq!(
        trace.borrow().last().map(String::as_str),
        Some("death observed")
    );
    Ok(())
}

#[test]
fn external_subscribers_fire_in_subscription_order_until_unsubscribed() -> SimResult<()> {
    let mut world = World::new();
    world.initialize()?;

    let order: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
    let first_log = Rc::clone(&order);
    let second_log = Rc::clone(&order);

    let first = world.subscribe(move |_: &EntityDied| first_log.borrow_mut().push("first"));
    let _second = world.subscribe(move |_: &EntityDied| second_log.borrow_mut().push("second"));

    world.queue_external(EntityDied { entity: Entity(1) });
    world.tick()?;
    assert_eq!(*order.borrow(), vec!["first", "second"]);

    assert!(world.unsubscribe(first));
    assert!(!world.unsubscribe(first));

    world.queue_external(EntityDied { entity: Entity(2) });
    world.tick()?;
    assert_eq!(*order.borrow(), vec!["first", "second", "second"]);
    Ok(())
}

#[test]
fn queuing_with_zero_subscribers_is_silently_fine() -> SimResult<()> {
    let mut world = World::new();
    world.initialize()?;

    world.queue_external(EntityDied { entity: Entity(3) });
    world.tick()?;
    Ok(())
}

#[test]
fn listener_registration_requires_a_known_system() -> SimResult<()> {
    let mut world = World::new();
    let result = world.add_listener::<DamageEvent, HealthSystem>();
    assert!(matches!(result, Err(SimulationError::UnknownSystem { .. })));
    Ok(())
}
