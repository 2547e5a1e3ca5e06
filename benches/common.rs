#![allow(dead_code)]

use std::any::Any;

use lockstep_framework::{Entity, SimResult, System, World, XorShift128};

pub const AGENTS_SMALL: usize = 1_000;
pub const AGENTS_MED: usize = 10_000;
pub const AGENTS_LARGE: usize = 100_000;

#[derive(Clone, Copy, Default)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

#[derive(Clone, Copy, Default)]
pub struct Velocity {
    pub dx: i64,
    pub dy: i64,
}

#[derive(Clone, Copy, Default)]
pub struct Wealth {
    pub value: i64,
}

pub struct IntegrateSystem;

impl System for IntegrateSystem {
    fn process(&mut self, world: &mut World) -> SimResult<()> {
        let movers = world.query::<Position>()?.and::<Velocity>()?.collect_entities();
        for entity in movers {
            let velocity = *world.get::<Velocity>(entity)?;
            let position = world.get_mut::<Position>(entity)?;
            position.x += velocity.dx;
            position.y += velocity.dy;
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub struct DecaySystem;

impl System for DecaySystem {
    fn process(&mut self, world: &mut World) -> SimResult<()> {
        for (_, wealth) in world.buffer_mut::<Wealth>()?.iter_mut() {
            wealth.value -= wealth.value >> 6;
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub fn setup_world(agent_count: usize) -> SimResult<(World, Vec<Entity>)> {
    let mut world = World::new();
    world.register_component::<Position>(agent_count)?;
    world.register_component::<Velocity>(agent_count)?;
    world.register_component::<Wealth>(agent_count)?;
    world.register_singleton(XorShift128::from_seed(0xBEEF))?;
    world.add_system(IntegrateSystem)?;
    world.add_system(DecaySystem)?;
    world.initialize()?;

    let mut entities = Vec::with_capacity(agent_count);
    for i in 0..agent_count {
        let entity = world.create_entity();
        world.set(entity, Position { x: i as i64, y: 0 })?;
        world.set(entity, Velocity { dx: 1, dy: (i % 3) as i64 })?;
        world.set(entity, Wealth { value: 1_000 + i as i64 })?;
        entities.push(entity);
    }
    Ok((world, entities))
}
