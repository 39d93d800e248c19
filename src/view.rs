use crate::vertex::Point;

/// Zoom and pan mapping between screen and world coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewState {
    pub scale: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            scale: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

/// Owns the [`ViewState`] and keeps its scale inside the configured bounds
#[derive(Clone, Debug)]
pub struct ViewTransform {
    state: ViewState,
    min_scale: f64,
    max_scale: f64,
    drag_anchor: Option<Point>,
}

impl ViewTransform {
    pub fn new(min_scale: f64, max_scale: f64) -> Self {
        debug_assert!(min_scale > 0.0 && min_scale <= max_scale);
        ViewTransform {
            state: ViewState::default().clamped(min_scale, max_scale),
            min_scale,
            max_scale,
            drag_anchor: None,
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn scale(&self) -> f64 {
        self.state.scale
    }

    pub fn pan(&self) -> Point {
        Point::new(self.state.pan_x, self.state.pan_y)
    }

    pub fn screen_to_world(&self, screen: Point) -> Point {
        (screen - self.pan()) / self.state.scale
    }

    pub fn world_to_screen(&self, world: Point) -> Point {
        world * self.state.scale + self.pan()
    }

    /// Multiplies the scale by `factor` while keeping the world point under
    /// `focal` fixed on screen.
    ///
    /// Returns `false` when the clamped scale did not change.
    pub fn zoom_at(&mut self, focal: Point, factor: f64) -> bool {
        debug_assert!(
            factor.is_finite() && factor > 0.0,
            "zoom factor must be positive, got {factor}"
        );
        if !(factor.is_finite() && factor > 0.0) {
            return false;
        }

        let anchor = self.screen_to_world(focal);
        let old_scale = self.state.scale;
        let new_scale = (old_scale * factor).clamp(self.min_scale, self.max_scale);
        if (new_scale - old_scale).abs() <= f64::EPSILON {
            return false;
        }

        self.state.scale = new_scale;
        self.state.pan_x = focal.x - anchor.x * new_scale;
        self.state.pan_y = focal.y - anchor.y * new_scale;
        true
    }

    /// Shifts the view by a raw screen-space delta
    pub fn pan_by(&mut self, delta: Point) {
        self.state.pan_x += delta.x;
        self.state.pan_y += delta.y;
    }

    pub fn begin_drag(&mut self, cursor: Point) {
        self.drag_anchor = Some(cursor);
    }

    /// Pans by the cursor movement since the previous drag position
    pub fn drag_to(&mut self, cursor: Point) -> bool {
        let Some(anchor) = self.drag_anchor else {
            return false;
        };
        let delta = cursor - anchor;
        if delta.x.abs() <= f64::EPSILON && delta.y.abs() <= f64::EPSILON {
            return false;
        }
        self.pan_by(delta);
        self.drag_anchor = Some(cursor);
        true
    }

    pub fn end_drag(&mut self) {
        self.drag_anchor = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_anchor.is_some()
    }

    pub fn reset(&mut self) {
        self.state = ViewState::default().clamped(self.min_scale, self.max_scale);
        self.drag_anchor = None;
    }
}

impl ViewState {
    fn clamped(mut self, min_scale: f64, max_scale: f64) -> Self {
        self.scale = self.scale.clamp(min_scale, max_scale);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() <= eps
    }

    #[test]
    fn identity_view_maps_screen_to_world_unchanged() {
        let view = ViewTransform::new(0.1, 10.0);
        let p = Point::new(123.0, -45.5);
        assert_eq!(view.screen_to_world(p), p);
    }

    #[test]
    fn zoom_keeps_focal_world_point_fixed() {
        let mut view = ViewTransform::new(0.1, 10.0);
        view.pan_by(Point::new(37.0, -12.0));
        let focal = Point::new(250.0, 140.0);
        for factor in [1.1, 0.5, 3.0, 0.9] {
            let before = view.screen_to_world(focal);
            view.zoom_at(focal, factor);
            let after = view.screen_to_world(focal);
            assert!(approx_eq(before.x, after.x, 1e-9), "{before:?} vs {after:?}");
            assert!(approx_eq(before.y, after.y, 1e-9), "{before:?} vs {after:?}");
        }
    }

    #[test]
    fn zoom_clamps_to_scale_bounds() {
        let mut view = ViewTransform::new(0.5, 4.0);
        for _ in 0..50 {
            view.zoom_at(Point::ZERO, 1.5);
        }
        assert_eq!(view.scale(), 4.0);
        assert!(!view.zoom_at(Point::ZERO, 2.0));
        for _ in 0..50 {
            view.zoom_at(Point::new(10.0, 10.0), 0.5);
        }
        assert_eq!(view.scale(), 0.5);
    }

    #[test]
    fn clamped_zoom_still_preserves_focal_point() {
        let mut view = ViewTransform::new(0.5, 2.0);
        let focal = Point::new(80.0, 60.0);
        let before = view.screen_to_world(focal);
        view.zoom_at(focal, 100.0);
        assert_eq!(view.scale(), 2.0);
        let after = view.screen_to_world(focal);
        assert!(approx_eq(before.x, after.x, 1e-9));
        assert!(approx_eq(before.y, after.y, 1e-9));
    }

    #[test]
    fn pan_is_not_scaled() {
        let mut view = ViewTransform::new(0.1, 10.0);
        view.zoom_at(Point::ZERO, 2.0);
        view.pan_by(Point::new(10.0, 20.0));
        assert_eq!(view.pan(), Point::new(10.0, 20.0));
        assert_eq!(view.screen_to_world(Point::new(10.0, 20.0)), Point::ZERO);
    }

    #[test]
    fn drag_accumulates_cursor_deltas() {
        let mut view = ViewTransform::new(0.1, 10.0);
        assert!(!view.drag_to(Point::new(5.0, 5.0)));
        view.begin_drag(Point::new(10.0, 10.0));
        assert!(view.drag_to(Point::new(15.0, 12.0)));
        assert!(view.drag_to(Point::new(20.0, 20.0)));
        view.end_drag();
        assert_eq!(view.pan(), Point::new(10.0, 10.0));
    }

    #[test]
    fn reset_restores_identity() {
        let mut view = ViewTransform::new(0.1, 10.0);
        view.zoom_at(Point::new(3.0, 4.0), 2.5);
        view.pan_by(Point::new(-7.0, 9.0));
        view.reset();
        assert_eq!(view.state(), ViewState::default());
    }

    #[test]
    fn world_to_screen_inverts_screen_to_world() {
        let mut view = ViewTransform::new(0.1, 10.0);
        view.zoom_at(Point::new(40.0, 40.0), 1.7);
        view.pan_by(Point::new(3.0, -8.0));
        let world = Point::new(12.5, 99.0);
        let round_trip = view.screen_to_world(view.world_to_screen(world));
        assert!(approx_eq(round_trip.x, world.x, 1e-9));
        assert!(approx_eq(round_trip.y, world.y, 1e-9));
    }
}
