use shoal_core::{
    Aabb, FLOATS_PER_TROUT, Position, SimConfig, Tier, TroutRecord, TroutWorld,
};

fn config() -> SimConfig {
    SimConfig {
        world_width: 10_000.0,
        world_height: 6_000.0,
        rng_seed: Some(0xDEAD_BEEF),
        ..SimConfig::default()
    }
}

fn record(id: &str, tier: Tier, x: f32, y: f32) -> TroutRecord {
    TroutRecord::new(id, tier, 1.0).with_position(Position::new(x, y))
}

#[test]
fn three_agents_fill_a_whole_world_snapshot() {
    let mut world = TroutWorld::new(config()).expect("world");
    world.load(&[
        record("A", Tier::Fry, 500.0, 500.0),
        record("B", Tier::Adult, 5_000.0, 3_000.0),
        record("C", Tier::Leviathan, 9_000.0, 5_500.0),
    ]);
    world.set_viewport(Aabb::new(0.0, 0.0, 10_000.0, 6_000.0));
    world.tick(16.0);

    let snapshot = world.visible();
    assert_eq!(snapshot.len(), 3, "whole-world viewport must see all agents");
    assert_eq!(snapshot.buffer.len(), 3 * FLOATS_PER_TROUT);

    let mut seen: Vec<&str> = snapshot.iter().map(|t| t.id).collect();
    seen.sort_unstable();
    assert_eq!(seen, ["A", "B", "C"]);

    for trout in snapshot.iter() {
        assert!(
            trout.facing == 1.0 || trout.facing == -1.0,
            "facing must be +1 or -1, got {}",
            trout.facing
        );
        assert!(
            trout.frame < trout.tier.profile().frame_count,
            "frame {} out of range for {:?}",
            trout.frame,
            trout.tier
        );
    }
}

#[test]
fn update_of_unknown_id_matches_a_single_load() {
    let mut loaded = TroutWorld::new(config()).expect("loaded");
    let mut updated = TroutWorld::new(config()).expect("updated");
    let rec = record("wallet-7f3k", Tier::Trophy, 4_200.0, 1_800.0);

    loaded.load(std::slice::from_ref(&rec));
    updated.upsert(&rec);

    let state_a = loaded.trout("wallet-7f3k").expect("loaded state");
    let state_b = updated.trout("wallet-7f3k").expect("updated state");
    assert_eq!(state_a, state_b, "upsert of an unknown id must equal a load");
}

#[test]
fn removal_excludes_an_agent_from_every_subsequent_reply() {
    let mut world = TroutWorld::new(config()).expect("world");
    world.load(&[
        record("A", Tier::Fry, 500.0, 500.0),
        record("B", Tier::Fry, 600.0, 600.0),
    ]);
    world.set_viewport(Aabb::new(0.0, 0.0, 10_000.0, 6_000.0));
    world.tick(16.0);
    assert_eq!(world.visible().len(), 2);

    assert!(world.remove("A"));
    for _ in 0..4 {
        world.tick(16.0);
        let snapshot = world.visible();
        assert!(
            !snapshot.ids.iter().any(|id| id == "A"),
            "removed agent leaked into a snapshot"
        );
        assert!(snapshot.ids.iter().any(|id| id == "B"));
    }
}

#[test]
fn seeded_worlds_wander_identically() {
    let mut world_a = TroutWorld::new(config()).expect("world_a");
    let mut world_b = TroutWorld::new(config()).expect("world_b");
    let records = vec![
        record("A", Tier::Fry, 500.0, 500.0),
        record("B", Tier::Juvenile, 5_000.0, 3_000.0),
        record("C", Tier::Leviathan, 9_000.0, 5_500.0),
    ];
    world_a.load(&records);
    world_b.load(&records);

    for _ in 0..120 {
        world_a.tick(16.0);
        world_b.tick(16.0);
    }

    for id in ["A", "B", "C"] {
        let state_a = world_a.trout(id).expect("state_a");
        let state_b = world_b.trout(id).expect("state_b");
        assert_eq!(state_a, state_b, "agent {id} diverged between seeded worlds");
    }
}

#[test]
fn long_sessions_never_freeze_agents() {
    let mut world = TroutWorld::new(config()).expect("world");
    world.load(&[record("A", Tier::Fry, 5_000.0, 3_000.0)]);

    let mut last = world.trout("A").expect("state").position;
    let mut moved_frames = 0_u32;
    // Enough sim time to cross many waypoint deadlines.
    for _ in 0..2_000 {
        world.tick(16.0);
        let now = world.trout("A").expect("state").position;
        if (now.x - last.x).abs() > f32::EPSILON || (now.y - last.y).abs() > f32::EPSILON {
            moved_frames += 1;
        }
        last = now;
    }
    assert!(
        moved_frames > 1_900,
        "agent stalled: moved on only {moved_frames}/2000 frames"
    );
}
