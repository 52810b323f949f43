use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use shoal_core::{Aabb, SimConfig, Tier, TroutRecord, TroutWorld};

fn bench_world_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_tick");
    for &agents in &[2_000_usize, 10_000, 30_000] {
        group.bench_function(format!("tick_{agents}_agents"), |b| {
            b.iter_batched(
                || {
                    let config = SimConfig {
                        rng_seed: Some(0xBEEF),
                        ..SimConfig::default()
                    };
                    let mut world = TroutWorld::new(config).expect("world");
                    let records: Vec<TroutRecord> = (0..agents)
                        .map(|i| {
                            let tier = Tier::ALL[i % Tier::ALL.len()];
                            TroutRecord::new(format!("bench-{i}"), tier, 1.0)
                        })
                        .collect();
                    world.load(&records);
                    world.set_viewport(Aabb::new(0.0, 0.0, 4_000.0, 2_400.0));
                    world
                },
                |mut world| {
                    for _ in 0..16 {
                        world.tick(16.0);
                    }
                    world.visible()
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_world_tick);
criterion_main!(benches);
