use criterion::*;
use std::hint::black_box;

mod common;
use common::*;

fn tick_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    group.bench_function("tick_2_systems_10k", |b| {
        let (mut world, _) = setup_world(AGENTS_MED).unwrap();
        b.iter(|| {
            world.tick().unwrap();
            black_box(world.current_tick());
        });
    });

    group.bench_function("tick_2_systems_100k", |b| {
        let (mut world, _) = setup_world(AGENTS_LARGE).unwrap();
        b.iter(|| {
            world.tick().unwrap();
            black_box(world.current_tick());
        });
    });

    group.finish();
}

fn snapshot_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    group.bench_function("get_state_100k", |b| {
        let (world, _) = setup_world(AGENTS_LARGE).unwrap();
        b.iter(|| black_box(world.get_state::<Position>().unwrap()));
    });

    group.bench_function("set_state_100k", |b| {
        let (mut world, _) = setup_world(AGENTS_LARGE).unwrap();
        let state = world.get_state::<Position>().unwrap();
        b.iter(|| world.set_state(black_box(&state), 0).unwrap());
    });

    group.finish();
}

criterion_group!(benches, tick_benchmark, snapshot_benchmark);
criterion_main!(benches);
