//! The per-frame driver: advances the camera, exchanges viewport/tick
//! messages with the simulation worker, and reconciles the visible set
//! against the draw-handle pools under the quality/LOD policy.

use shoal_core::VisibleSnapshot;
use shoal_render::{Camera, HandlePool, QualityLevel, RenderMode};

use crate::bus::SimRequest;
use crate::worker::SimHandle;

/// Minimum target zoom applied while following an agent.
pub const FOLLOW_ZOOM: f32 = 1.5;

/// Outcome of one orchestrated frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    /// Representation used this frame.
    pub mode: RenderMode,
    /// Agents in the snapshot consumed this frame.
    pub visible: usize,
    /// Handles actually updated (capped by the mode budget).
    pub drawn: usize,
}

/// Owns the camera, the draw-handle pools, and the worker handle, and runs
/// the fixed per-frame sequence.
pub struct FrameOrchestrator {
    handle: SimHandle,
    camera: Camera,
    quality: QualityLevel,
    sprites: HandlePool,
    dots: HandlePool,
    visible: VisibleSnapshot,
    followed: Option<String>,
    clock_ms: f64,
}

impl FrameOrchestrator {
    /// Build an orchestrator around a running worker.
    #[must_use]
    pub fn new(handle: SimHandle, camera: Camera, quality: QualityLevel) -> Self {
        Self {
            handle,
            camera,
            quality,
            sprites: HandlePool::new(300),
            dots: HandlePool::new(500),
            visible: VisibleSnapshot::default(),
            followed: None,
            clock_ms: 0.0,
        }
    }

    /// Track an agent: the camera recenters on it each frame while it is
    /// visible, at a minimum focused zoom.
    pub fn follow(&mut self, id: impl Into<String>) {
        self.followed = Some(id.into());
    }

    /// Stop tracking.
    pub fn unfollow(&mut self) {
        self.followed = None;
    }

    /// Agent currently being followed, if any.
    #[must_use]
    pub fn followed(&self) -> Option<&str> {
        self.followed.as_deref()
    }

    /// The camera driven by this orchestrator.
    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable camera access for gesture plumbing (pan/zoom input).
    #[must_use]
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Quality tier the orchestrator was built with.
    #[must_use]
    pub const fn quality(&self) -> QualityLevel {
        self.quality
    }

    /// Snapshot consumed by the most recent frame.
    #[must_use]
    pub fn visible(&self) -> &VisibleSnapshot {
        &self.visible
    }

    /// Handle to the simulation worker.
    #[must_use]
    pub fn handle(&self) -> &SimHandle {
        &self.handle
    }

    /// Full-detail pool (exposed for renderers to enumerate).
    #[must_use]
    pub fn sprites(&self) -> &HandlePool {
        &self.sprites
    }

    /// Dot pool (exposed for renderers to enumerate).
    #[must_use]
    pub fn dots(&self) -> &HandlePool {
        &self.dots
    }

    /// Run one frame. `delta_ms` is the elapsed wall time since the previous
    /// frame; the snapshot applied may lag the request by a frame or more
    /// (latest wins).
    pub fn advance(&mut self, delta_ms: f64) -> FrameReport {
        let delta_ms = if delta_ms.is_finite() {
            delta_ms.max(0.0)
        } else {
            0.0
        };
        self.clock_ms += delta_ms;

        // Consume whatever reply is waiting before driving the camera, so a
        // followed agent is tracked from its freshest known position.
        if let Some(snapshot) = self.handle.latest_visible() {
            self.visible = snapshot;
        }

        if let Some(id) = self.followed.as_deref() {
            if let Some(trout) = self.visible.iter().find(|t| t.id == id) {
                self.camera.pan_to(trout.x, trout.y);
                self.camera.raise_zoom_to(FOLLOW_ZOOM);
            }
        }

        self.camera.smooth_step();
        let bounds = self.camera.visible_bounds();
        self.handle.send(SimRequest::SetViewport(bounds));
        self.handle.send(SimRequest::Tick { delta_ms });

        let mode = RenderMode::select(self.quality, self.camera.zoom());
        let budget = mode.budget(self.quality);
        let drawn = match mode {
            RenderMode::Dot => {
                self.sprites.release_all();
                Self::reconcile(&mut self.dots, &self.visible, budget, mode)
            }
            RenderMode::Sprite => {
                self.dots.release_all();
                Self::reconcile(&mut self.sprites, &self.visible, budget, mode)
            }
        };

        self.sprites.maybe_shrink(self.clock_ms);
        self.dots.maybe_shrink(self.clock_ms);

        FrameReport {
            mode,
            visible: self.visible.len(),
            drawn,
        }
    }

    /// Acquire and update a handle per visible agent up to `budget`; agents
    /// beyond the budget are simply not drawn this frame.
    fn reconcile(
        pool: &mut HandlePool,
        visible: &VisibleSnapshot,
        budget: usize,
        mode: RenderMode,
    ) -> usize {
        pool.begin_frame();
        let mut drawn = 0_usize;
        for trout in visible.iter().take(budget) {
            let handle_id = pool.acquire(trout.id);
            if let Some(handle) = pool.handle_mut(handle_id) {
                handle.x = trout.x;
                handle.y = trout.y;
                handle.tier = Some(trout.tier);
                handle.frame = trout.frame;
                match mode {
                    RenderMode::Sprite => {
                        let scale = if trout.scale > 0.0 { trout.scale } else { 1.0 };
                        handle.scale_x = trout.facing * scale;
                        handle.scale_y = scale;
                    }
                    RenderMode::Dot => {
                        handle.scale_x = 1.0;
                        handle.scale_y = 1.0;
                    }
                }
            }
            drawn += 1;
        }
        pool.sweep();
        drawn
    }
}
