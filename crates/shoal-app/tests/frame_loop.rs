use std::thread;
use std::time::Duration;

use shoal_app::{FOLLOW_ZOOM, FrameOrchestrator, SimRequest, SimWorker};
use shoal_core::{Position, SimConfig, Tier, TroutRecord};
use shoal_render::{Camera, CameraConfig, QualityLevel, RenderMode};

fn orchestrator_with_agents(count: usize) -> FrameOrchestrator {
    let config = SimConfig {
        world_width: 4_000.0,
        world_height: 2_400.0,
        rng_seed: Some(11),
        ..SimConfig::default()
    };
    let handle = SimWorker::spawn(config).expect("worker spawns");

    let records: Vec<TroutRecord> = (0..count)
        .map(|i| {
            let x = 200.0 + (i % 40) as f32 * 90.0;
            let y = 200.0 + (i / 40) as f32 * 90.0;
            TroutRecord::new(format!("agent-{i}"), Tier::Juvenile, 1.0)
                .with_position(Position::new(x, y))
        })
        .collect();
    handle.send(SimRequest::Load(records));

    let camera = Camera::new(CameraConfig::default(), 1_600.0, 900.0);
    let mut orchestrator = FrameOrchestrator::new(handle, camera, QualityLevel::Low);
    // Center on the agent cluster so zoomed-in frames keep it on screen.
    orchestrator.camera_mut().pan_to(1_950.0, 600.0);
    orchestrator.camera_mut().snap_to_target();
    orchestrator
}

/// Run frames until the report satisfies `predicate`, failing after a bound.
fn advance_until(
    orchestrator: &mut FrameOrchestrator,
    predicate: impl Fn(&shoal_app::FrameReport) -> bool,
) -> shoal_app::FrameReport {
    for _ in 0..500 {
        let report = orchestrator.advance(16.0);
        if predicate(&report) {
            return report;
        }
        thread::sleep(Duration::from_millis(2));
    }
    panic!("frame loop never reached the expected state");
}

#[test]
fn sprite_mode_caps_handles_at_the_quality_budget() {
    let mut orchestrator = orchestrator_with_agents(400);
    orchestrator.camera_mut().set_zoom(1.0);
    orchestrator.camera_mut().snap_to_target();

    let report = advance_until(&mut orchestrator, |r| r.visible > 0 && r.drawn > 0);
    assert_eq!(report.mode, RenderMode::Sprite);
    assert!(
        report.visible > QualityLevel::Low.sprite_budget(),
        "scenario should overflow the budget, saw {} visible",
        report.visible
    );
    assert!(
        report.drawn <= QualityLevel::Low.sprite_budget(),
        "drew {} handles, budget is {}",
        report.drawn,
        QualityLevel::Low.sprite_budget()
    );
    assert!(orchestrator.sprites().active_count() <= QualityLevel::Low.sprite_budget());
    assert_eq!(orchestrator.dots().active_count(), 0);
}

#[test]
fn far_zoom_switches_to_dots_and_back() {
    let mut orchestrator = orchestrator_with_agents(200);

    // Far out: dot representation.
    orchestrator.camera_mut().set_zoom(0.05);
    orchestrator.camera_mut().snap_to_target();
    let report = advance_until(&mut orchestrator, |r| r.visible > 0 && r.drawn > 0);
    assert_eq!(report.mode, RenderMode::Dot);
    assert!(orchestrator.dots().active_count() > 0);
    assert_eq!(orchestrator.sprites().active_count(), 0);

    // Back in: sprites take over and dots drain.
    orchestrator.camera_mut().set_zoom(2.0);
    orchestrator.camera_mut().snap_to_target();
    let report = advance_until(&mut orchestrator, |r| {
        r.mode == RenderMode::Sprite && r.drawn > 0
    });
    assert!(report.visible > 0);
    assert!(orchestrator.sprites().active_count() > 0);
    assert_eq!(orchestrator.dots().active_count(), 0);
}

#[test]
fn handles_carry_facing_and_scale_onto_sprites() {
    let mut orchestrator = orchestrator_with_agents(10);
    orchestrator.camera_mut().pan_to(650.0, 200.0);
    orchestrator.camera_mut().set_zoom(2.0);
    orchestrator.camera_mut().snap_to_target();
    advance_until(&mut orchestrator, |r| r.drawn > 0);

    let pool = orchestrator.sprites();
    let handle_id = pool.bound("agent-0").expect("agent-0 drawn");
    let handle = pool.handle(handle_id).expect("handle state");
    assert!(handle.visible);
    assert_eq!(handle.tier, Some(Tier::Juvenile));
    assert!(
        handle.scale_x.abs() > 0.0 && handle.scale_y > 0.0,
        "sprite scale must be applied, got ({}, {})",
        handle.scale_x,
        handle.scale_y
    );
}

#[test]
fn following_an_agent_recenters_and_focuses_the_camera() {
    let mut orchestrator = orchestrator_with_agents(30);
    orchestrator.follow("agent-5");
    advance_until(&mut orchestrator, |r| r.visible > 0);

    for _ in 0..200 {
        orchestrator.advance(16.0);
        thread::sleep(Duration::from_millis(1));
    }
    assert!(orchestrator.camera().target_zoom() >= FOLLOW_ZOOM);

    let followed = orchestrator
        .visible()
        .iter()
        .find(|t| t.id == "agent-5")
        .expect("followed agent stays visible");
    let (cam_x, cam_y) = orchestrator.camera().position();
    let dx = cam_x - followed.x;
    let dy = cam_y - followed.y;
    assert!(
        (dx * dx + dy * dy).sqrt() < 200.0,
        "camera should settle near the followed agent"
    );
}
