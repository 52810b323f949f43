//! Render-side resources for the shoal canvas: a bounded pool of reusable
//! draw handles, and the quality/LOD policy that decides how visible agents
//! are represented each frame.

use serde::{Deserialize, Serialize};
use shoal_core::Tier;
use slotmap::{SecondaryMap, SlotMap, new_key_type};
use std::collections::{HashMap, HashSet};

pub mod camera;

pub use camera::{Camera, CameraConfig};

new_key_type! {
    /// Stable handle for pooled draw resources.
    pub struct HandleId;
}

/// Handles allocated per growth step when the available pool runs dry.
const GROW_BATCH: usize = 50;
/// Minimum interval between shrink passes, milliseconds.
const SHRINK_INTERVAL_MS: f64 = 30_000.0;
/// Parking position for released handles, far off any plausible viewport so
/// a reused handle never flashes at its previous location.
const PARKED: f32 = -9_999.0;

/// One reusable draw resource. A renderer maps these to whatever its backend
/// draws (sprites, instanced quads, dots); the simulation side only fills in
/// position, orientation, and animation state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawHandle {
    pub visible: bool,
    pub x: f32,
    pub y: f32,
    /// Horizontal scale; negative values flip the sprite for backward facing.
    pub scale_x: f32,
    pub scale_y: f32,
    pub tier: Option<Tier>,
    pub frame: u32,
}

impl DrawHandle {
    fn parked() -> Self {
        Self {
            visible: false,
            x: PARKED,
            y: PARKED,
            scale_x: 1.0,
            scale_y: 1.0,
            tier: None,
            frame: 0,
        }
    }

    fn park(&mut self) {
        self.visible = false;
        self.x = PARKED;
        self.y = PARKED;
    }
}

/// Pool of draw handles partitioned into available and active (keyed by agent
/// id, one handle per id).
///
/// The pool only grows on demand; handles are destroyed solely by the
/// rate-limited [`HandlePool::maybe_shrink`] pass, which never touches active
/// handles. Per-frame reconciliation uses frame stamping: `begin_frame`
/// advances the stamp, `acquire` marks, and `sweep` releases every active
/// handle the frame did not touch.
pub struct HandlePool {
    handles: SlotMap<HandleId, DrawHandle>,
    available: Vec<HandleId>,
    active: HashMap<String, HandleId>,
    stamps: SecondaryMap<HandleId, u64>,
    frame_stamp: u64,
    last_shrink_ms: f64,
}

impl HandlePool {
    /// Create a pool pre-warmed with `initial` parked handles.
    #[must_use]
    pub fn new(initial: usize) -> Self {
        let mut pool = Self {
            handles: SlotMap::with_key(),
            available: Vec::new(),
            active: HashMap::new(),
            stamps: SecondaryMap::new(),
            frame_stamp: 0,
            last_shrink_ms: 0.0,
        };
        pool.prewarm(initial);
        pool
    }

    fn prewarm(&mut self, count: usize) {
        for _ in 0..count {
            let id = self.handles.insert(DrawHandle::parked());
            self.available.push(id);
        }
    }

    /// Start a new reconciliation frame; handles acquired from here on are
    /// considered in use by [`HandlePool::sweep`].
    pub fn begin_frame(&mut self) {
        self.frame_stamp += 1;
    }

    /// Return the handle bound to `id`, binding a fresh one (growing the pool
    /// if necessary) when the id is not active. The handle is marked for the
    /// current frame and reset to a visible state on (re)binding.
    pub fn acquire(&mut self, id: &str) -> HandleId {
        if let Some(&existing) = self.active.get(id) {
            self.stamps.insert(existing, self.frame_stamp);
            return existing;
        }

        let handle_id = match self.available.pop() {
            Some(handle_id) => handle_id,
            None => {
                self.prewarm(GROW_BATCH);
                self.available.pop().expect("pool grew by a full batch")
            }
        };
        if let Some(handle) = self.handles.get_mut(handle_id) {
            handle.visible = true;
        }
        self.stamps.insert(handle_id, self.frame_stamp);
        self.active.insert(id.to_owned(), handle_id);
        handle_id
    }

    /// Borrow a handle's draw state.
    #[must_use]
    pub fn handle(&self, id: HandleId) -> Option<&DrawHandle> {
        self.handles.get(id)
    }

    /// Mutably borrow a handle's draw state.
    #[must_use]
    pub fn handle_mut(&mut self, id: HandleId) -> Option<&mut DrawHandle> {
        self.handles.get_mut(id)
    }

    /// Handle currently bound to an agent id, if any.
    #[must_use]
    pub fn bound(&self, id: &str) -> Option<HandleId> {
        self.active.get(id).copied()
    }

    /// Return `id`'s handle to the available pool, parking it off-screen.
    /// No-op for ids without an active handle.
    pub fn release(&mut self, id: &str) {
        if let Some(handle_id) = self.active.remove(id) {
            if let Some(handle) = self.handles.get_mut(handle_id) {
                handle.park();
            }
            self.available.push(handle_id);
        }
    }

    /// Release every active handle whose id is not in `keep`.
    pub fn release_except(&mut self, keep: &HashSet<String>) {
        let stale: Vec<String> = self
            .active
            .keys()
            .filter(|id| !keep.contains(*id))
            .cloned()
            .collect();
        for id in stale {
            self.release(&id);
        }
    }

    /// Release every active handle not acquired since the last
    /// [`HandlePool::begin_frame`].
    pub fn sweep(&mut self) {
        let stamp = self.frame_stamp;
        let stale: Vec<String> = self
            .active
            .iter()
            .filter(|(_, handle_id)| self.stamps.get(**handle_id).copied() != Some(stamp))
            .map(|(id, _)| id.clone())
            .collect();
        for id in stale {
            self.release(&id);
        }
    }

    /// Release every active handle.
    pub fn release_all(&mut self) {
        let all: Vec<String> = self.active.keys().cloned().collect();
        for id in all {
            self.release(&id);
        }
    }

    /// Rate-limited shrink: when the available pool holds well more than the
    /// active set plus two growth batches, destroy half the excess. Bounds
    /// long-run memory after a burst without churning during oscillation.
    pub fn maybe_shrink(&mut self, now_ms: f64) {
        if now_ms - self.last_shrink_ms < SHRINK_INTERVAL_MS {
            return;
        }
        self.last_shrink_ms = now_ms;

        let excess = self.available.len() as i64 - self.active.len() as i64;
        if excess > (GROW_BATCH * 2) as i64 {
            let to_remove = (excess / 2) as usize;
            for _ in 0..to_remove {
                if let Some(handle_id) = self.available.pop() {
                    self.handles.remove(handle_id);
                    self.stamps.remove(handle_id);
                }
            }
        }
    }

    /// Number of handles currently bound to agent ids.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of parked handles ready for reuse.
    #[must_use]
    pub fn available_count(&self) -> usize {
        self.available.len()
    }

    /// Total handles owned by the pool.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.handles.len()
    }
}

/// Coarse device signals sampled once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub cores: usize,
    pub memory_gb: Option<f32>,
    pub is_mobile: bool,
    pub screen_width: u32,
}

/// Render quality tier chosen once from device signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QualityLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityLevel {
    /// Pick a quality level from coarse device capability signals.
    #[must_use]
    pub fn detect(profile: &DeviceProfile) -> Self {
        if profile.is_mobile || profile.cores <= 2 || profile.screen_width < 768 {
            Self::Low
        } else if profile.cores <= 4 || profile.memory_gb.is_some_and(|gb| gb <= 4.0) {
            Self::Medium
        } else {
            Self::High
        }
    }

    /// Maximum full-detail handles updated per frame.
    #[must_use]
    pub const fn sprite_budget(self) -> usize {
        match self {
            Self::Low => 100,
            Self::Medium => 300,
            Self::High => 600,
        }
    }

    /// Maximum dot handles updated per frame; dots are cheap, so double.
    #[must_use]
    pub const fn dot_budget(self) -> usize {
        self.sprite_budget() * 2
    }

    /// Zoom level below which the dot representation takes over. Lower
    /// quality settings switch to dots at higher zoom.
    #[must_use]
    pub const fn dot_zoom_threshold(self) -> f32 {
        match self {
            Self::Low => 1.0,
            Self::Medium => 0.3,
            Self::High => 0.15,
        }
    }
}

/// Representation chosen for visible agents this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Cheap far-zoom dots.
    Dot,
    /// Full-detail sprites.
    Sprite,
}

impl RenderMode {
    /// Pick the mode for a frame from the quality setting and current zoom.
    #[must_use]
    pub fn select(quality: QualityLevel, zoom: f32) -> Self {
        if zoom < quality.dot_zoom_threshold() {
            Self::Dot
        } else {
            Self::Sprite
        }
    }

    /// Handle budget for this mode at the given quality.
    #[must_use]
    pub const fn budget(self, quality: QualityLevel) -> usize {
        match self {
            Self::Dot => quality.dot_budget(),
            Self::Sprite => quality.sprite_budget(),
        }
    }
}
