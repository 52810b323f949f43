use shoal_core::Aabb;

/// Tunable camera constants.
#[derive(Clone, Copy, Debug)]
pub struct CameraConfig {
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub default_zoom: f32,
    /// Fraction of the pan gap closed per smoothing step.
    pub pan_rate: f32,
    /// Fraction of the zoom gap closed per smoothing step.
    pub zoom_rate: f32,
    /// Multiplier applied to wheel deltas before they scale the zoom.
    pub zoom_sensitivity: f32,
    /// World-unit margin added around the strict viewport so agents just
    /// outside it are pre-loaded instead of popping in.
    pub bounds_margin: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.05,
            max_zoom: 4.0,
            default_zoom: 0.3,
            pan_rate: 0.08,
            zoom_rate: 0.1,
            zoom_sensitivity: 0.001,
            bounds_margin: 200.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct CameraPose {
    x: f32,
    y: f32,
    zoom: f32,
}

/// Smoothed pan/zoom camera over a centered viewport.
///
/// The current pose chases the target pose exponentially; gestures mutate the
/// target only. Target zoom is clamped when set, so it can never leave
/// `[min_zoom, max_zoom]` regardless of input sequence.
pub struct Camera {
    config: CameraConfig,
    view_width: f32,
    view_height: f32,
    current: CameraPose,
    target: CameraPose,
}

impl Camera {
    /// Create a camera for a viewport of the given pixel dimensions.
    #[must_use]
    pub fn new(config: CameraConfig, view_width: f32, view_height: f32) -> Self {
        let pose = CameraPose {
            x: 0.0,
            y: 0.0,
            zoom: config.default_zoom.clamp(config.min_zoom, config.max_zoom),
        };
        Self {
            config,
            view_width: view_width.max(1.0),
            view_height: view_height.max(1.0),
            current: pose,
            target: pose,
        }
    }

    /// Current zoom factor.
    #[must_use]
    pub const fn zoom(&self) -> f32 {
        self.current.zoom
    }

    /// Zoom the smoothing step is converging toward.
    #[must_use]
    pub const fn target_zoom(&self) -> f32 {
        self.target.zoom
    }

    /// Current pan position in world coordinates.
    #[must_use]
    pub const fn position(&self) -> (f32, f32) {
        (self.current.x, self.current.y)
    }

    /// Update the viewport pixel dimensions (window resize).
    pub fn resize(&mut self, view_width: f32, view_height: f32) {
        if view_width.is_finite() && view_width > 0.0 {
            self.view_width = view_width;
        }
        if view_height.is_finite() && view_height > 0.0 {
            self.view_height = view_height;
        }
    }

    /// Exponentially chase the target pose. Called once per frame.
    pub fn smooth_step(&mut self) {
        self.current.x += (self.target.x - self.current.x) * self.config.pan_rate;
        self.current.y += (self.target.y - self.current.y) * self.config.pan_rate;
        self.current.zoom += (self.target.zoom - self.current.zoom) * self.config.zoom_rate;
    }

    /// Jump the current pose straight to the target, skipping smoothing.
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
    }

    /// Multiplicatively adjust target zoom around a world point, re-solving
    /// target pan so the point stays under the same screen position once the
    /// smoothing settles. Non-finite inputs are ignored.
    pub fn zoom_toward(&mut self, world_x: f32, world_y: f32, delta: f32) {
        if !world_x.is_finite() || !world_y.is_finite() || !delta.is_finite() {
            return;
        }
        let old_zoom = self.target.zoom;
        let new_zoom = (old_zoom * (1.0 + delta * self.config.zoom_sensitivity))
            .clamp(self.config.min_zoom, self.config.max_zoom);
        // Fixed-point transform: (w - pan') * new == (w - pan) * old.
        let scale = old_zoom / new_zoom;
        self.target.x = world_x - (world_x - self.target.x) * scale;
        self.target.y = world_y - (world_y - self.target.y) * scale;
        self.target.zoom = new_zoom;
    }

    /// Shift the target pan by a screen-space delta, scaled by the current
    /// zoom so panning feels speed-consistent at any zoom level.
    pub fn pan_by(&mut self, dx_screen: f32, dy_screen: f32) {
        if !dx_screen.is_finite() || !dy_screen.is_finite() {
            return;
        }
        self.target.x -= dx_screen / self.current.zoom;
        self.target.y -= dy_screen / self.current.zoom;
    }

    /// Aim the target pan at a world position.
    pub fn pan_to(&mut self, world_x: f32, world_y: f32) {
        if !world_x.is_finite() || !world_y.is_finite() {
            return;
        }
        self.target.x = world_x;
        self.target.y = world_y;
    }

    /// Set the target zoom directly, clamped to the configured bounds.
    pub fn set_zoom(&mut self, zoom: f32) {
        if !zoom.is_finite() {
            return;
        }
        self.target.zoom = zoom.clamp(self.config.min_zoom, self.config.max_zoom);
    }

    /// Raise the target zoom to at least `min_zoom` (used when focusing on a
    /// followed agent); never lowers it.
    pub fn raise_zoom_to(&mut self, min_zoom: f32) {
        if min_zoom.is_finite() && self.target.zoom < min_zoom {
            self.set_zoom(min_zoom);
        }
    }

    /// Convert a screen position to world coordinates using the current pose.
    #[must_use]
    pub fn screen_to_world(&self, screen_x: f32, screen_y: f32) -> (f32, f32) {
        (
            self.current.x + (screen_x - self.view_width * 0.5) / self.current.zoom,
            self.current.y + (screen_y - self.view_height * 0.5) / self.current.zoom,
        )
    }

    /// Convert a world position to screen coordinates using the current pose.
    #[must_use]
    pub fn world_to_screen(&self, world_x: f32, world_y: f32) -> (f32, f32) {
        (
            (world_x - self.current.x) * self.current.zoom + self.view_width * 0.5,
            (world_y - self.current.y) * self.current.zoom + self.view_height * 0.5,
        )
    }

    /// World-space box currently visible, expanded by the bounds margin on
    /// every side.
    #[must_use]
    pub fn visible_bounds(&self) -> Aabb {
        let margin = self.config.bounds_margin;
        let half_w = self.view_width * 0.5 / self.current.zoom;
        let half_h = self.view_height * 0.5 / self.current.zoom;
        Aabb::new(
            self.current.x - half_w - margin,
            self.current.y - half_h - margin,
            self.current.x + half_w + margin,
            self.current.y + half_h + margin,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEW: (f32, f32) = (1_600.0, 900.0);

    fn camera() -> Camera {
        Camera::new(CameraConfig::default(), VIEW.0, VIEW.1)
    }

    fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() <= eps
    }

    #[test]
    fn zoom_stays_clamped_under_any_sequence() {
        let mut cam = camera();
        let config = CameraConfig::default();
        for delta in [5_000.0, -5_000.0, 120.0, -120.0, 1.0e9, -1.0e9] {
            for _ in 0..16 {
                cam.zoom_toward(100.0, 100.0, delta);
                assert!(
                    (config.min_zoom..=config.max_zoom).contains(&cam.target_zoom()),
                    "target zoom escaped bounds: {}",
                    cam.target_zoom()
                );
            }
        }
        cam.set_zoom(99.0);
        assert!(approx_eq(cam.target_zoom(), config.max_zoom, 1e-6));
        cam.set_zoom(0.0);
        assert!(approx_eq(cam.target_zoom(), config.min_zoom, 1e-6));
    }

    #[test]
    fn zoom_toward_keeps_the_cursor_point_fixed() {
        let mut cam = camera();
        cam.pan_to(5_000.0, 3_000.0);
        cam.snap_to_target();

        let screen = (1_200.0, 700.0);
        for delta in [120.0, 120.0, -80.0, 250.0, -500.0] {
            let world = cam.screen_to_world(screen.0, screen.1);
            cam.zoom_toward(world.0, world.1, delta);
            cam.snap_to_target();
            let back = cam.world_to_screen(world.0, world.1);
            assert!(
                approx_eq(back.0, screen.0, 0.1) && approx_eq(back.1, screen.1, 0.1),
                "cursor point drifted: {back:?} vs {screen:?}"
            );
        }
    }

    #[test]
    fn pan_speed_scales_with_zoom() {
        let mut low = camera();
        low.set_zoom(0.1);
        low.snap_to_target();
        let before_low = low.screen_to_world(0.0, 0.0);
        low.pan_by(100.0, 0.0);
        low.snap_to_target();
        let after_low = low.screen_to_world(0.0, 0.0);

        let mut high = camera();
        high.set_zoom(2.0);
        high.snap_to_target();
        let before_high = high.screen_to_world(0.0, 0.0);
        high.pan_by(100.0, 0.0);
        high.snap_to_target();
        let after_high = high.screen_to_world(0.0, 0.0);

        let moved_low = before_low.0 - after_low.0;
        let moved_high = before_high.0 - after_high.0;
        assert!(
            moved_low > moved_high * 10.0,
            "zoomed-out pans must cover more world distance ({moved_low} vs {moved_high})"
        );
    }

    #[test]
    fn screen_world_round_trip() {
        let mut cam = camera();
        cam.pan_to(1_234.0, 567.0);
        cam.set_zoom(1.7);
        cam.snap_to_target();

        let world = (2_000.0, 800.0);
        let screen = cam.world_to_screen(world.0, world.1);
        let back = cam.screen_to_world(screen.0, screen.1);
        assert!(approx_eq(back.0, world.0, 1e-2) && approx_eq(back.1, world.1, 1e-2));

        let center = cam.screen_to_world(VIEW.0 * 0.5, VIEW.1 * 0.5);
        assert!(approx_eq(center.0, 1_234.0, 1e-3) && approx_eq(center.1, 567.0, 1e-3));
    }

    #[test]
    fn smoothing_converges_on_the_target() {
        let mut cam = camera();
        cam.pan_to(500.0, 400.0);
        cam.set_zoom(1.5);
        for _ in 0..400 {
            cam.smooth_step();
        }
        let (x, y) = cam.position();
        assert!(approx_eq(x, 500.0, 0.5) && approx_eq(y, 400.0, 0.5));
        assert!(approx_eq(cam.zoom(), 1.5, 0.01));
    }

    #[test]
    fn visible_bounds_include_the_buffer_margin() {
        let mut cam = camera();
        cam.pan_to(1_000.0, 1_000.0);
        cam.set_zoom(1.0);
        cam.snap_to_target();

        let bounds = cam.visible_bounds();
        assert!(approx_eq(bounds.x1, 1_000.0 - 800.0 - 200.0, 1e-3));
        assert!(approx_eq(bounds.x2, 1_000.0 + 800.0 + 200.0, 1e-3));
        assert!(approx_eq(bounds.y1, 1_000.0 - 450.0 - 200.0, 1e-3));
        assert!(approx_eq(bounds.y2, 1_000.0 + 450.0 + 200.0, 1e-3));
        assert!(bounds.is_finite());
    }

    #[test]
    fn malformed_gestures_are_ignored() {
        let mut cam = camera();
        let zoom_before = cam.target_zoom();
        cam.zoom_toward(f32::NAN, 0.0, 120.0);
        cam.zoom_toward(0.0, 0.0, f32::INFINITY);
        cam.pan_by(f32::NAN, 10.0);
        cam.pan_to(f32::INFINITY, 0.0);
        cam.set_zoom(f32::NAN);
        cam.snap_to_target();
        assert!(approx_eq(cam.zoom(), zoom_before, 1e-6));
        assert_eq!(cam.position(), (0.0, 0.0));
        assert!(cam.visible_bounds().is_finite());
    }

    #[test]
    fn raise_zoom_never_lowers() {
        let mut cam = camera();
        cam.set_zoom(2.0);
        cam.raise_zoom_to(1.5);
        assert!(approx_eq(cam.target_zoom(), 2.0, 1e-6));
        cam.set_zoom(0.4);
        cam.raise_zoom_to(1.5);
        assert!(approx_eq(cam.target_zoom(), 1.5, 1e-6));
    }
}
