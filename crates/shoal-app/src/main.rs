use anyhow::Result;
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

use shoal_app::{FrameOrchestrator, InMemoryFeed, SimRequest, SimWorker, load_all};
use shoal_core::{
    SimConfig, TroutRecord, assign_tier, compute_thresholds, holder_score, stable_position,
    visual_scale, world_size_for,
};
use shoal_render::{Camera, CameraConfig, DeviceProfile, QualityLevel};

fn main() -> Result<()> {
    init_tracing();

    let holder_count = 12_000_usize;
    let (world_width, world_height) = world_size_for(holder_count);
    let config = SimConfig {
        world_width,
        world_height,
        rng_seed: Some(0x0F15_F00D),
        ..SimConfig::default()
    };

    let handle = SimWorker::spawn(config)?;
    handle.send(SimRequest::Init {
        world_width,
        world_height,
    });

    let records = synthetic_records(holder_count, world_width, world_height);
    let mut feed = InMemoryFeed::new(records, 2_000);
    let pumped = load_all(&mut feed, &handle)?;
    info!(pumped, world_width, world_height, "seeded demo population");

    let quality = QualityLevel::detect(&DeviceProfile {
        cores: thread::available_parallelism().map_or(4, |n| n.get()),
        memory_gb: None,
        is_mobile: false,
        screen_width: 1_920,
    });
    info!(?quality, "selected render quality");

    let camera = Camera::new(CameraConfig::default(), 1_920.0, 1_080.0);
    let mut orchestrator = FrameOrchestrator::new(handle, camera, quality);
    orchestrator
        .camera_mut()
        .pan_to(world_width * 0.5, world_height * 0.5);
    orchestrator.camera_mut().snap_to_target();

    let frame_interval = Duration::from_millis(16);
    let mut last_frame = Instant::now();
    for frame_index in 0..300_u32 {
        let delta_ms = last_frame.elapsed().as_secs_f64() * 1_000.0;
        last_frame = Instant::now();

        // Exercise the LOD switch: zoom far out, then back in.
        match frame_index {
            60 => orchestrator.camera_mut().set_zoom(0.08),
            180 => orchestrator.camera_mut().set_zoom(1.2),
            _ => {}
        }

        let report = orchestrator.advance(delta_ms);
        if frame_index % 60 == 0 {
            info!(
                frame = frame_index,
                visible = report.visible,
                drawn = report.drawn,
                mode = ?report.mode,
                zoom = orchestrator.camera().zoom(),
                "frame summary",
            );
        }
        thread::sleep(frame_interval);
    }

    if let Some(stats) = orchestrator.handle().latest_stats() {
        info!(
            total = stats.total,
            visible = stats.visible,
            "final population stats",
        );
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Deterministic stand-in for the holder feed: a long-tail score
/// distribution tiered against its own percentiles.
fn synthetic_records(count: usize, world_width: f32, world_height: f32) -> Vec<TroutRecord> {
    let scores: Vec<f64> = (0..count)
        .map(|i| {
            let tokens = 1.0e9 / (i as f64 + 1.0);
            let days = 1.0 + (i % 365) as f64;
            holder_score(tokens, days)
        })
        .collect();

    let mut sorted = scores.clone();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let thresholds = compute_thresholds(&sorted);

    scores
        .into_iter()
        .enumerate()
        .map(|(i, score)| {
            let id = format!("wallet-{i:05x}");
            let tier = assign_tier(score, &thresholds);
            let scale = visual_scale(score, tier, &thresholds);
            let position = stable_position(&id, world_width, world_height);
            TroutRecord {
                id,
                score,
                tier,
                scale,
                position: Some(position),
            }
        })
        .collect()
}
