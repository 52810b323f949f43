//! Core simulation types for the shoal canvas: deterministic seeding, size
//! classes, scoring math, and the wandering-agent world.

use rand::{Rng, SeedableRng, rngs::SmallRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub use shoal_index::{Aabb, IndexError, SpatialGrid};

/// Horizontal motion below this magnitude keeps the previous facing, so
/// near-vertical travel does not flicker the sprite every frame.
const FACING_FLIP_THRESHOLD: f32 = 0.5;

/// Number of `f32` lanes per agent in the packed visibility buffer:
/// `(x, y, facing, tier, scale, frame)`. Field order and stride are a
/// compatibility contract with snapshot consumers.
pub const FLOATS_PER_TROUT: usize = 6;

/// Ordered size classes, smallest to largest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum Tier {
    #[default]
    Fry,
    Fingerling,
    Juvenile,
    Adult,
    Trophy,
    Leviathan,
}

/// Per-tier simulation and presentation constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierProfile {
    /// Slowest speed an agent of this tier can draw, world units per second.
    pub speed_min: f32,
    /// Fastest speed an agent of this tier can draw.
    pub speed_max: f32,
    /// Waypoint sampling radius; larger tiers roam more broadly.
    pub wander_radius: f32,
    /// Preferred vertical band as fractions of world height (top, bottom).
    pub y_band: (f32, f32),
    /// Frames in the swim animation cycle.
    pub frame_count: u32,
    /// Baseline visual scale before per-score adjustment.
    pub base_scale: f32,
    /// Dot radius in pixels for the far-zoom representation.
    pub dot_radius: f32,
}

static TIER_PROFILES: [TierProfile; 6] = [
    // Fry: fast and darty, shallow water
    TierProfile {
        speed_min: 60.0,
        speed_max: 100.0,
        wander_radius: 150.0,
        y_band: (0.1, 0.5),
        frame_count: 6,
        base_scale: 0.5,
        dot_radius: 1.0,
    },
    TierProfile {
        speed_min: 45.0,
        speed_max: 75.0,
        wander_radius: 250.0,
        y_band: (0.1, 0.5),
        frame_count: 6,
        base_scale: 0.8,
        dot_radius: 2.0,
    },
    TierProfile {
        speed_min: 30.0,
        speed_max: 55.0,
        wander_radius: 400.0,
        y_band: (0.2, 0.7),
        frame_count: 6,
        base_scale: 1.0,
        dot_radius: 3.0,
    },
    TierProfile {
        speed_min: 20.0,
        speed_max: 40.0,
        wander_radius: 600.0,
        y_band: (0.2, 0.7),
        frame_count: 6,
        base_scale: 1.3,
        dot_radius: 3.0,
    },
    TierProfile {
        speed_min: 12.0,
        speed_max: 25.0,
        wander_radius: 800.0,
        y_band: (0.3, 0.8),
        frame_count: 6,
        base_scale: 1.6,
        dot_radius: 4.0,
    },
    // Leviathan: slow and majestic, deep water
    TierProfile {
        speed_min: 8.0,
        speed_max: 15.0,
        wander_radius: 1_200.0,
        y_band: (0.3, 0.8),
        frame_count: 6,
        base_scale: 2.0,
        dot_radius: 5.0,
    },
];

impl Tier {
    /// All tiers, smallest to largest.
    pub const ALL: [Self; 6] = [
        Self::Fry,
        Self::Fingerling,
        Self::Juvenile,
        Self::Adult,
        Self::Trophy,
        Self::Leviathan,
    ];

    /// One-based rank, 1 (Fry) through 6 (Leviathan).
    #[must_use]
    pub const fn rank(self) -> u8 {
        self as u8 + 1
    }

    /// Inverse of [`Tier::rank`].
    #[must_use]
    pub const fn from_rank(rank: u8) -> Option<Self> {
        match rank {
            1 => Some(Self::Fry),
            2 => Some(Self::Fingerling),
            3 => Some(Self::Juvenile),
            4 => Some(Self::Adult),
            5 => Some(Self::Trophy),
            6 => Some(Self::Leviathan),
            _ => None,
        }
    }

    /// Constants governing this tier's motion and presentation.
    #[must_use]
    pub fn profile(self) -> &'static TierProfile {
        &TIER_PROFILES[self as usize]
    }

    /// Wire encoding used in the packed visibility buffer.
    #[must_use]
    pub const fn as_wire(self) -> f32 {
        self.rank() as f32
    }
}

/// Axis-aligned 2D position in world units.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    /// Construct a new position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Horizontal facing of an agent sprite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    /// Moving rightward; `+1` on the wire.
    #[default]
    Forward,
    /// Moving leftward; `-1` on the wire.
    Backward,
}

impl Facing {
    /// Wire encoding used in the packed visibility buffer.
    #[must_use]
    pub const fn as_f32(self) -> f32 {
        match self {
            Self::Forward => 1.0,
            Self::Backward => -1.0,
        }
    }

    /// Facing implied by a horizontal delta.
    #[must_use]
    pub fn from_dx(dx: f32) -> Self {
        if dx > 0.0 { Self::Forward } else { Self::Backward }
    }
}

/// Derive a stable pseudo-random value in `[0, 1)` from an agent id.
///
/// Polynomial 32-bit rolling hash over the id bytes; the same id yields the
/// same value across process restarts, so placement and speed are
/// reproducible without persisting them.
#[must_use]
pub fn seed_from_id(id: &str) -> f32 {
    let mut hash: i32 = 0;
    for byte in id.bytes() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(byte));
    }
    ((hash as u32) as f64 / 4_294_967_296.0) as f32
}

/// Stable world position for an id. The second axis hashes a suffixed copy of
/// the id so the two coordinates are decorrelated.
#[must_use]
pub fn stable_position(id: &str, world_width: f32, world_height: f32) -> Position {
    let suffixed = format!("{id}y");
    Position::new(
        seed_from_id(id) * world_width,
        seed_from_id(&suffixed) * world_height,
    )
}

/// Balance-derived score: geometric blend of holdings and holding age.
#[must_use]
pub fn holder_score(tokens_held: f64, days_held: f64) -> f64 {
    tokens_held.max(0.0).sqrt() * days_held.max(1.0).sqrt()
}

/// Percentile cut points over a descending score distribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub p20: f64,
    pub p50: f64,
    pub p80: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Compute tier cut points from scores sorted in descending order.
#[must_use]
pub fn compute_thresholds(sorted_scores_desc: &[f64]) -> TierThresholds {
    let n = sorted_scores_desc.len();
    if n == 0 {
        return TierThresholds::default();
    }
    let at = |fraction: f64| -> f64 {
        sorted_scores_desc
            .get((n as f64 * fraction) as usize)
            .copied()
            .unwrap_or(0.0)
    };
    TierThresholds {
        p20: at(0.8),
        p50: at(0.5),
        p80: at(0.2),
        p95: at(0.05),
        p99: at(0.01),
    }
}

/// Assign a tier from a score and the population cut points.
#[must_use]
pub fn assign_tier(score: f64, thresholds: &TierThresholds) -> Tier {
    if score >= thresholds.p99 {
        Tier::Leviathan
    } else if score >= thresholds.p95 {
        Tier::Trophy
    } else if score >= thresholds.p80 {
        Tier::Adult
    } else if score >= thresholds.p50 {
        Tier::Juvenile
    } else if score >= thresholds.p20 {
        Tier::Fingerling
    } else {
        Tier::Fry
    }
}

fn tier_score_span(tier: Tier, t: &TierThresholds) -> (f64, f64) {
    match tier {
        Tier::Fry => (0.0, t.p20),
        Tier::Fingerling => (t.p20, t.p50),
        Tier::Juvenile => (t.p50, t.p80),
        Tier::Adult => (t.p80, t.p95),
        Tier::Trophy => (t.p95, t.p99),
        Tier::Leviathan => (t.p99, f64::INFINITY),
    }
}

/// Visual scale for a score within its tier: base scale plus up to 0.3
/// depending on where the score sits inside the tier's span.
#[must_use]
pub fn visual_scale(score: f64, tier: Tier, thresholds: &TierThresholds) -> f32 {
    let (lo, hi) = tier_score_span(tier, thresholds);
    let range = hi - lo;
    let t = if range > 0.0 && range.is_finite() {
        ((score - lo) / range).min(1.0)
    } else {
        0.5
    };
    tier.profile().base_scale + t as f32 * 0.3
}

/// World extents for a holder population: ~1600 square units per holder at a
/// 5:3 aspect ratio, floored at 4000 x 2400.
#[must_use]
pub fn world_size_for(holder_count: usize) -> (f32, f32) {
    let area = holder_count as f64 * 1_600.0;
    let aspect = 5.0 / 3.0;
    let height = (area / aspect).sqrt();
    let width = height * aspect;
    (
        (width.round() as f32).max(4_000.0),
        (height.round() as f32).max(2_400.0),
    )
}

/// One agent as delivered by the record feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TroutRecord {
    /// Opaque unique identifier; never reused across agents.
    pub id: String,
    /// Balance-derived score backing the tier assignment.
    pub score: f64,
    /// Discrete size class.
    pub tier: Tier,
    /// Visual scale factor within the tier.
    pub scale: f32,
    /// Stable world position when the feed supplies one.
    pub position: Option<Position>,
}

impl TroutRecord {
    /// Construct a record without a supplied position.
    #[must_use]
    pub fn new(id: impl Into<String>, tier: Tier, scale: f32) -> Self {
        Self {
            id: id.into(),
            score: 0.0,
            tier,
            scale,
            position: None,
        }
    }

    /// Attach a stable position.
    #[must_use]
    pub const fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }
}

/// Errors raised when constructing or reconfiguring a world.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Indicates configuration values that cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// Spatial grid rejected its derived configuration.
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Tunable simulation constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Width of the world in world units.
    pub world_width: f32,
    /// Height of the world in world units.
    pub world_height: f32,
    /// Edge length of one spatial-grid cell in world units.
    pub cell_size: f32,
    /// Optional RNG seed for reproducible wandering.
    pub rng_seed: Option<u64>,
    /// Distance below which an agent counts as arrived at its waypoint.
    pub arrive_epsilon: f32,
    /// Minimum clearance kept between waypoints and the world edge.
    pub edge_margin: f32,
    /// Fraction of the gap to the preferred depth band applied per retarget.
    pub band_pull: f32,
    /// Upper bound on the random slack granted past expected travel time, ms.
    pub waypoint_jitter_ms: f64,
    /// Milliseconds each animation frame stays on screen.
    pub frame_duration_ms: f32,
    /// Wrap point for the animation phase accumulator, ms.
    pub anim_wrap_ms: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            world_width: 20_000.0,
            world_height: 12_000.0,
            cell_size: 200.0,
            rng_seed: None,
            arrive_epsilon: 2.0,
            edge_margin: 50.0,
            band_pull: 0.1,
            waypoint_jitter_ms: 2_000.0,
            frame_duration_ms: 200.0,
            anim_wrap_ms: 100_000.0,
        }
    }
}

impl SimConfig {
    fn validate(&self) -> Result<(), WorldError> {
        if !self.world_width.is_finite() || !self.world_height.is_finite() {
            return Err(WorldError::InvalidConfig("world dimensions must be finite"));
        }
        if self.world_width <= 0.0 || self.world_height <= 0.0 {
            return Err(WorldError::InvalidConfig(
                "world dimensions must be positive",
            ));
        }
        if self.cell_size <= 0.0 || !self.cell_size.is_finite() {
            return Err(WorldError::InvalidConfig("cell_size must be positive"));
        }
        if self.edge_margin < 0.0
            || self.edge_margin * 2.0 >= self.world_width.min(self.world_height)
        {
            return Err(WorldError::InvalidConfig(
                "edge_margin must leave room inside the world",
            ));
        }
        if self.arrive_epsilon <= 0.0 {
            return Err(WorldError::InvalidConfig("arrive_epsilon must be positive"));
        }
        if !(0.0..=1.0).contains(&self.band_pull) {
            return Err(WorldError::InvalidConfig("band_pull must be within [0, 1]"));
        }
        if self.waypoint_jitter_ms < 0.0 {
            return Err(WorldError::InvalidConfig(
                "waypoint_jitter_ms must be non-negative",
            ));
        }
        if self.frame_duration_ms <= 0.0 || self.anim_wrap_ms <= 0.0 {
            return Err(WorldError::InvalidConfig(
                "animation timings must be positive",
            ));
        }
        Ok(())
    }

    /// Returns the configured RNG, seeding from entropy if no seed is set.
    fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}

/// Mutable per-agent motion state, owned exclusively by the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TroutSim {
    pub position: Position,
    pub target: Position,
    /// Drawn once from the tier speed range and the id seed; constant for
    /// the agent's lifetime.
    pub speed: f32,
    pub facing: Facing,
    pub tier: Tier,
    pub scale: f32,
    /// Absolute sim time at which the current waypoint expires, ms.
    pub waypoint_deadline_ms: f64,
    /// Monotonic animation accumulator, wrapped to bound precision loss.
    pub anim_phase_ms: f32,
}

/// One agent as decoded from a [`VisibleSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleTrout<'a> {
    pub id: &'a str,
    pub x: f32,
    pub y: f32,
    /// `+1.0` forward, `-1.0` backward.
    pub facing: f32,
    pub tier: Tier,
    pub scale: f32,
    pub frame: u32,
}

/// Flat visibility reply: ids aligned with a packed stride-6 float buffer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisibleSnapshot {
    pub ids: Vec<String>,
    pub buffer: Vec<f32>,
    pub count: usize,
}

impl VisibleSnapshot {
    /// Number of agents in the snapshot.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns true when no agents are visible.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Decode the agent at `index`, if present.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<VisibleTrout<'_>> {
        let id = self.ids.get(index)?;
        let off = index * FLOATS_PER_TROUT;
        let lanes = self.buffer.get(off..off + FLOATS_PER_TROUT)?;
        Some(VisibleTrout {
            id,
            x: lanes[0],
            y: lanes[1],
            facing: lanes[2],
            tier: Tier::from_rank(lanes[3] as u8).unwrap_or_default(),
            scale: lanes[4],
            frame: lanes[5] as u32,
        })
    }

    /// Iterate over the decoded agents.
    pub fn iter(&self) -> impl Iterator<Item = VisibleTrout<'_>> {
        (0..self.count).filter_map(|index| self.get(index))
    }
}

/// Population counters published after bulk loads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimStats {
    pub total: usize,
    pub visible: usize,
}

/// The wandering-agent world: agent map, spatial grid, sim clock, and RNG,
/// owned together so a single thread of control mutates them.
///
/// Lifecycle is explicit: `new` -> `configure`/`load` -> `tick`* -> drop.
pub struct TroutWorld {
    config: SimConfig,
    clock_ms: f64,
    rng: SmallRng,
    trouts: HashMap<String, TroutSim>,
    grid: SpatialGrid,
    viewport: Aabb,
}

impl std::fmt::Debug for TroutWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TroutWorld")
            .field("config", &self.config)
            .field("clock_ms", &self.clock_ms)
            .field("agent_count", &self.trouts.len())
            .field("viewport", &self.viewport)
            .finish()
    }
}

impl TroutWorld {
    /// Instantiate a world from the supplied configuration.
    pub fn new(config: SimConfig) -> Result<Self, WorldError> {
        config.validate()?;
        let rng = config.seeded_rng();
        let grid = SpatialGrid::new(config.cell_size, config.world_width, config.world_height)?;
        Ok(Self {
            config,
            clock_ms: 0.0,
            rng,
            trouts: HashMap::new(),
            grid,
            viewport: Aabb::new(0.0, 0.0, 4_000.0, 2_400.0),
        })
    }

    /// Reconfigure world extents, rebuilding the grid and clearing the
    /// population. Must precede agent loads.
    pub fn configure(&mut self, world_width: f32, world_height: f32) -> Result<(), WorldError> {
        let candidate = SimConfig {
            world_width,
            world_height,
            ..self.config.clone()
        };
        candidate.validate()?;
        self.grid = SpatialGrid::new(candidate.cell_size, world_width, world_height)?;
        self.config = candidate;
        self.trouts.clear();
        Ok(())
    }

    /// Idempotent bulk insert; records whose id is already known are left
    /// untouched so reloading a batch never disturbs motion state. Returns
    /// the number of newly created agents.
    pub fn load(&mut self, records: &[TroutRecord]) -> usize {
        let mut inserted = 0;
        for record in records {
            if self.trouts.contains_key(&record.id) {
                continue;
            }
            let state = self.init_state(record);
            self.grid
                .insert(&record.id, state.position.x, state.position.y);
            self.trouts.insert(record.id.clone(), state);
            inserted += 1;
        }
        inserted
    }

    /// Update the tier/scale of a known agent, or insert it when unknown.
    pub fn upsert(&mut self, record: &TroutRecord) {
        if let Some(state) = self.trouts.get_mut(&record.id) {
            state.tier = record.tier;
            state.scale = record.scale;
        } else {
            self.load(std::slice::from_ref(record));
        }
    }

    /// Delete an agent; returns false (and does nothing) for unknown ids.
    pub fn remove(&mut self, id: &str) -> bool {
        let existed = self.trouts.remove(id).is_some();
        self.grid.remove(id);
        existed
    }

    /// Replace the viewport used by visibility queries. Non-finite bounds
    /// are ignored so erratic input can never reach the grid.
    pub fn set_viewport(&mut self, bounds: Aabb) {
        if bounds.is_finite() {
            self.viewport = bounds;
        }
    }

    /// Advance every agent by `delta_ms` and re-index it in the grid.
    pub fn tick(&mut self, delta_ms: f64) {
        if !delta_ms.is_finite() || delta_ms < 0.0 {
            return;
        }
        self.clock_ms += delta_ms;
        let now = self.clock_ms;
        let dt = (delta_ms / 1_000.0) as f32;
        let delta_anim = delta_ms as f32;
        let epsilon = self.config.arrive_epsilon;
        let wrap = self.config.anim_wrap_ms;

        // Movement is pure per-agent work and runs in parallel; agents that
        // arrived or whose waypoint expired are collected for the serial
        // retargeting pass, which owns the RNG.
        let mut retarget: Vec<String> = self
            .trouts
            .par_iter_mut()
            .filter_map(|(id, state)| {
                state.anim_phase_ms = (state.anim_phase_ms + delta_anim) % wrap;

                let dx = state.target.x - state.position.x;
                let dy = state.target.y - state.position.y;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist < epsilon || now > state.waypoint_deadline_ms {
                    return Some(id.clone());
                }

                let step = state.speed * dt;
                let ratio = (step / dist).min(1.0);
                state.position.x += dx * ratio;
                state.position.y += dy * ratio;
                if dx.abs() > FACING_FLIP_THRESHOLD {
                    state.facing = Facing::from_dx(dx);
                }
                None
            })
            .collect();

        // Stable order so waypoint draws consume the RNG deterministically
        // for a given seed regardless of map iteration order.
        retarget.sort_unstable();
        for id in retarget {
            if let Some(state) = self.trouts.get_mut(&id) {
                Self::pick_waypoint(&mut self.rng, &self.config, state, now);
            }
        }

        for (id, state) in &self.trouts {
            self.grid.insert(id, state.position.x, state.position.y);
        }
    }

    /// Snapshot the agents inside the current viewport.
    ///
    /// Ids returned by the grid that are no longer present in the agent map
    /// are skipped. Ordering is unspecified; consumers treat the result as a
    /// set.
    #[must_use]
    pub fn visible(&self) -> VisibleSnapshot {
        let candidates = self.grid.query(&self.viewport);
        let mut ids = Vec::with_capacity(candidates.len());
        let mut buffer = Vec::with_capacity(candidates.len() * FLOATS_PER_TROUT);
        for id in candidates {
            let Some(state) = self.trouts.get(&id) else {
                continue;
            };
            let frame = (state.anim_phase_ms / self.config.frame_duration_ms) as u32
                % state.tier.profile().frame_count;
            buffer.extend_from_slice(&[
                state.position.x,
                state.position.y,
                state.facing.as_f32(),
                state.tier.as_wire(),
                state.scale,
                frame as f32,
            ]);
            ids.push(id);
        }
        let count = ids.len();
        VisibleSnapshot { ids, buffer, count }
    }

    /// Population counters for the stats signal.
    #[must_use]
    pub fn stats(&self, visible: usize) -> SimStats {
        SimStats {
            total: self.trouts.len(),
            visible,
        }
    }

    /// Immutable access to the configuration.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Current simulation time in milliseconds.
    #[must_use]
    pub const fn clock_ms(&self) -> f64 {
        self.clock_ms
    }

    /// Viewport used by the next visibility query.
    #[must_use]
    pub const fn viewport(&self) -> Aabb {
        self.viewport
    }

    /// Number of live agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trouts.len()
    }

    /// Returns true when no agents are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trouts.is_empty()
    }

    /// Whether an agent with this id is loaded.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.trouts.contains_key(id)
    }

    /// Borrow an agent's motion state.
    #[must_use]
    pub fn trout(&self, id: &str) -> Option<&TroutSim> {
        self.trouts.get(id)
    }

    /// Build initial motion state for a record: speed interpolated across the
    /// tier range by the id seed, position from the record or seed-derived,
    /// and an immediate first waypoint so the agent moves on the next tick.
    fn init_state(&mut self, record: &TroutRecord) -> TroutSim {
        let seed = seed_from_id(&record.id);
        let profile = record.tier.profile();
        let speed = profile.speed_min + seed * (profile.speed_max - profile.speed_min);

        let position = record.position.unwrap_or_else(|| {
            let (band_lo, band_hi) = profile.y_band;
            Position::new(
                seed * self.config.world_width,
                self.config.world_height * (band_lo + seed * (band_hi - band_lo)),
            )
        });

        let mut state = TroutSim {
            position,
            target: Position::default(),
            speed,
            facing: if seed > 0.5 {
                Facing::Forward
            } else {
                Facing::Backward
            },
            tier: record.tier,
            scale: record.scale,
            waypoint_deadline_ms: 0.0,
            anim_phase_ms: seed * 1_000.0,
        };
        Self::pick_waypoint(&mut self.rng, &self.config, &mut state, self.clock_ms);
        state
    }

    /// Choose a fresh waypoint: random heading, distance in half-to-full
    /// wander radius, a gentle pull toward the tier's depth band, and a
    /// deadline of expected travel time plus jitter so agents occasionally
    /// pick a new heading mid-travel.
    fn pick_waypoint(rng: &mut SmallRng, config: &SimConfig, state: &mut TroutSim, now_ms: f64) {
        let profile = state.tier.profile();
        let angle = rng.random_range(0.0..std::f32::consts::TAU);
        let dist = profile.wander_radius * rng.random_range(0.5..1.0);

        let (band_lo, band_hi) = profile.y_band;
        let band_center = config.world_height * (band_lo + band_hi) * 0.5;
        let pull = (band_center - state.position.y) * config.band_pull;

        let margin = config.edge_margin;
        state.target.x =
            (state.position.x + angle.cos() * dist).clamp(margin, config.world_width - margin);
        state.target.y = (state.position.y + angle.sin() * dist + pull)
            .clamp(margin, config.world_height - margin);
        state.facing = Facing::from_dx(state.target.x - state.position.x);

        let travel_ms = f64::from(dist / state.speed) * 1_000.0;
        let jitter = if config.waypoint_jitter_ms > 0.0 {
            rng.random_range(0.0..config.waypoint_jitter_ms)
        } else {
            0.0
        };
        state.waypoint_deadline_ms = now_ms + travel_ms + jitter;
    }
}
