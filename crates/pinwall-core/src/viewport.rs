//! Viewport transform, pivot zoom and animated fly-to.

use crate::config::CanvasConfig;
use crate::input::{Duration, Instant};
use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// World-to-screen transform: `screen = world * scale + (x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
        }
    }
}

impl Viewport {
    pub fn new(x: f64, y: f64, scale: f64) -> Self {
        Self { x, y, scale }
    }

    pub fn offset(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Transform converting world coordinates to screen coordinates.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset()) * Affine::scale(self.scale)
    }

    /// Transform converting screen coordinates to world coordinates.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.offset())
    }

    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point::new((screen.x - self.x) / self.scale, (screen.y - self.y) / self.scale)
    }

    pub fn world_to_screen(&self, world: Point) -> Point {
        Point::new(world.x * self.scale + self.x, world.y * self.scale + self.y)
    }

    /// Convert a screen rectangle (any corner order) to world space.
    pub fn screen_rect_to_world(&self, rect: Rect) -> Rect {
        let rect = rect.abs();
        Rect::from_points(
            self.screen_to_world(rect.origin()),
            self.screen_to_world(Point::new(rect.x1, rect.y1)),
        )
    }

    /// The viewport at `new_scale`, translated so `screen` shows the same world point.
    pub fn zoomed_at(&self, screen: Point, new_scale: f64) -> Self {
        let world = self.screen_to_world(screen);
        Self {
            x: screen.x - world.x * new_scale,
            y: screen.y - world.y * new_scale,
            scale: new_scale,
        }
    }

    /// Viewport that centers `bounds` in a surface of `size` with `padding` pixels
    /// on every side. Empty bounds center the origin at scale 1.
    pub fn fit_to_bounds(bounds: Rect, size: Size, padding: f64, min_scale: f64, max_scale: f64) -> Self {
        let scale = if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            1.0_f64.clamp(min_scale, max_scale)
        } else {
            let avail_w = (size.width - padding * 2.0).max(1.0);
            let avail_h = (size.height - padding * 2.0).max(1.0);
            (avail_w / bounds.width())
                .min(avail_h / bounds.height())
                .clamp(min_scale, max_scale)
        };
        let center = bounds.center();
        Self {
            x: size.width / 2.0 - center.x * scale,
            y: size.height / 2.0 - center.y * scale,
            scale,
        }
    }

    /// Linear blend between two viewports.
    pub fn lerp(&self, to: &Viewport, t: f64) -> Self {
        Self {
            x: self.x + (to.x - self.x) * t,
            y: self.y + (to.y - self.y) * t,
            scale: self.scale + (to.scale - self.scale) * t,
        }
    }
}

/// Ease-out curve used by fly-to.
pub fn ease_out_quart(progress: f64) -> f64 {
    let p = progress.clamp(0.0, 1.0);
    1.0 - (1.0 - p).powi(4)
}

/// Identifier of a fly-to animation. Increases with every new animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnimationId(pub u64);

#[derive(Debug, Clone)]
struct FlyTo {
    id: AnimationId,
    from: Viewport,
    to: Viewport,
    started: Instant,
    duration: Duration,
}

/// Background grid placement for the current transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayer {
    /// Pattern offset in screen pixels, in `[0, cell_px)`.
    pub offset: Vec2,
    /// Size of one cell on screen.
    pub cell_px: f64,
    /// 0 hides the grid entirely.
    pub opacity: f64,
}

impl GridLayer {
    pub fn is_visible(&self) -> bool {
        self.opacity > 0.0
    }
}

/// Everything the visual layer needs to follow the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewLayer {
    /// Container transform for the object layer.
    pub transform: Affine,
    pub viewport: Viewport,
    pub grid: GridLayer,
}

/// Owns the viewport and applies pan, zoom and fly-to animations.
#[derive(Debug, Clone)]
pub struct ViewportController {
    viewport: Viewport,
    min_scale: f64,
    max_scale: f64,
    grid_size: f64,
    grid_fade_min_px: f64,
    fly_duration: Duration,
    animation: Option<FlyTo>,
    next_animation: u64,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(&CanvasConfig::default())
    }
}

impl ViewportController {
    pub fn new(config: &CanvasConfig) -> Self {
        Self {
            viewport: Viewport::default(),
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            grid_size: config.grid_size,
            grid_fade_min_px: config.grid_fade_min_px,
            fly_duration: config.fly_to_duration(),
            animation: None,
            next_animation: 0,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scale(&self) -> f64 {
        self.viewport.scale
    }

    fn clamp_scale(&self, scale: f64) -> f64 {
        scale.clamp(self.min_scale, self.max_scale)
    }

    /// Clamp `target` into range. Non-finite fields keep the current value.
    fn sanitize(&self, target: Viewport) -> Viewport {
        let keep = |value: f64, current: f64| if value.is_finite() { value } else { current };
        Viewport {
            x: keep(target.x, self.viewport.x),
            y: keep(target.y, self.viewport.y),
            scale: self.clamp_scale(keep(target.scale, self.viewport.scale)),
        }
    }

    /// Replace the viewport outright, clamping the scale.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.cancel_animation();
        self.viewport = self.sanitize(viewport);
    }

    pub fn screen_to_world(&self, screen: Point) -> Point {
        self.viewport.screen_to_world(screen)
    }

    pub fn world_to_screen(&self, world: Point) -> Point {
        self.viewport.world_to_screen(world)
    }

    /// Pan by a screen-space delta. Cancels any fly-to.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.cancel_animation();
        self.viewport.x += delta.x;
        self.viewport.y += delta.y;
    }

    /// Zoom by `factor` keeping the world point under `screen` fixed.
    ///
    /// The resulting scale is clamped; non-finite factors are ignored.
    /// Cancels any fly-to. Returns the new scale.
    pub fn zoom_at(&mut self, screen: Point, factor: f64) -> f64 {
        self.cancel_animation();
        if !factor.is_finite() {
            return self.viewport.scale;
        }
        let new_scale = self.clamp_scale(self.viewport.scale * factor);
        self.viewport = self.viewport.zoomed_at(screen, new_scale);
        new_scale
    }

    /// Start an animated transition, replacing any animation in flight.
    pub fn fly_to(&mut self, target: Viewport, now: Instant) -> AnimationId {
        self.fly_to_with_duration(target, self.fly_duration, now)
    }

    pub fn fly_to_with_duration(&mut self, target: Viewport, duration: Duration, now: Instant) -> AnimationId {
        if let Some(previous) = self.animation.take() {
            log::debug!("Fly-to {:?} replaced", previous.id);
        }
        self.next_animation += 1;
        let id = AnimationId(self.next_animation);
        let to = self.sanitize(target);
        self.animation = Some(FlyTo {
            id,
            from: self.viewport,
            to,
            started: now,
            duration,
        });
        id
    }

    /// Stop the running animation where it is.
    pub fn cancel_animation(&mut self) -> Option<AnimationId> {
        self.animation.take().map(|animation| {
            log::debug!("Fly-to {:?} cancelled", animation.id);
            animation.id
        })
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn current_animation(&self) -> Option<AnimationId> {
        self.animation.as_ref().map(|a| a.id)
    }

    /// Advance the animation to `now`. Returns true while it is still running.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(animation) = &self.animation else {
            return false;
        };
        let elapsed = now.saturating_duration_since(animation.started);
        let progress = if animation.duration.is_zero() {
            1.0
        } else {
            elapsed.as_secs_f64() / animation.duration.as_secs_f64()
        };
        if progress >= 1.0 {
            self.viewport = animation.to;
            self.animation = None;
            return false;
        }
        self.viewport = animation.from.lerp(&animation.to, ease_out_quart(progress));
        true
    }

    /// Grid placement and container transform for the current viewport.
    pub fn layer(&self) -> ViewLayer {
        let cell_px = self.grid_size * self.viewport.scale;
        let opacity = if cell_px < self.grid_fade_min_px {
            0.0
        } else {
            ((cell_px - self.grid_fade_min_px) / self.grid_fade_min_px).min(1.0)
        };
        ViewLayer {
            transform: self.viewport.transform(),
            viewport: self.viewport,
            grid: GridLayer {
                offset: Vec2::new(
                    self.viewport.x.rem_euclid(cell_px),
                    self.viewport.y.rem_euclid(cell_px),
                ),
                cell_px,
                opacity,
            },
        }
    }
}

impl ViewLayer {
    /// Layer for a bare viewport using the default grid settings.
    pub fn for_viewport(viewport: Viewport) -> Self {
        let mut controller = ViewportController::default();
        controller.viewport = viewport;
        controller.layer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MAX_SCALE, MIN_SCALE};

    fn assert_close(a: Point, b: Point) {
        assert!((a.x - b.x).abs() < 1e-9, "{a:?} != {b:?}");
        assert!((a.y - b.y).abs() < 1e-9, "{a:?} != {b:?}");
    }

    #[test]
    fn test_screen_to_world_with_offset_and_scale() {
        let vp = Viewport::new(50.0, 100.0, 2.0);
        assert_close(vp.screen_to_world(Point::new(150.0, 300.0)), Point::new(50.0, 100.0));
        assert_close(vp.world_to_screen(Point::new(50.0, 100.0)), Point::new(150.0, 300.0));
    }

    #[test]
    fn test_transform_matches_formula() {
        let vp = Viewport::new(30.0, -20.0, 1.5);
        let world = Point::new(123.0, 456.0);
        assert_close(vp.transform() * world, vp.world_to_screen(world));
        assert_close(vp.inverse_transform() * (vp.transform() * world), world);
    }

    #[test]
    fn test_pan_by() {
        let mut controller = ViewportController::default();
        controller.pan_by(Vec2::new(10.0, -20.0));
        let vp = controller.viewport();
        assert!((vp.x - 10.0).abs() < f64::EPSILON);
        assert!((vp.y + 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zoom_keeps_pivot() {
        let mut controller = ViewportController::default();
        controller.set_viewport(Viewport::new(37.0, -12.0, 0.8));
        let pivot = Point::new(400.0, 300.0);
        for factor in [1.3, 0.2, 7.0, 1.0 / 3.0] {
            let before = controller.screen_to_world(pivot);
            controller.zoom_at(pivot, factor);
            assert_close(controller.screen_to_world(pivot), before);
        }
    }

    #[test]
    fn test_zoom_clamped() {
        let mut controller = ViewportController::default();
        controller.zoom_at(Point::ZERO, 0.0001);
        assert!((controller.scale() - MIN_SCALE).abs() < f64::EPSILON);
        controller.zoom_at(Point::ZERO, 1e9);
        assert!((controller.scale() - MAX_SCALE).abs() < f64::EPSILON);
        controller.zoom_at(Point::ZERO, -3.0);
        assert!((controller.scale() - MIN_SCALE).abs() < f64::EPSILON);
        controller.zoom_at(Point::ZERO, f64::NAN);
        assert!((controller.scale() - MIN_SCALE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_set_viewport_clamps() {
        let mut controller = ViewportController::default();
        controller.set_viewport(Viewport::new(0.0, 0.0, 500.0));
        assert!((controller.scale() - MAX_SCALE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_set_viewport_keeps_non_finite_offsets() {
        let mut controller = ViewportController::default();
        controller.set_viewport(Viewport::new(30.0, -40.0, 2.0));
        controller.set_viewport(Viewport::new(f64::NAN, f64::INFINITY, 3.0));
        assert_eq!(controller.viewport(), Viewport::new(30.0, -40.0, 3.0));
    }

    #[test]
    fn test_ease_out_quart() {
        assert!((ease_out_quart(0.0)).abs() < f64::EPSILON);
        assert!((ease_out_quart(1.0) - 1.0).abs() < f64::EPSILON);
        assert!((ease_out_quart(0.5) - 0.9375).abs() < f64::EPSILON);
        assert!((ease_out_quart(2.0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fly_to_progresses_and_finishes() {
        let mut controller = ViewportController::default();
        let start = Instant::now();
        controller.fly_to(Viewport::new(100.0, 200.0, 2.0), start);
        assert!(controller.is_animating());

        assert!(controller.tick(start + Duration::from_millis(250)));
        let mid = controller.viewport();
        assert!((mid.x - 93.75).abs() < 1e-9);
        assert!((mid.scale - 1.9375).abs() < 1e-9);

        assert!(!controller.tick(start + Duration::from_millis(500)));
        assert_eq!(controller.viewport(), Viewport::new(100.0, 200.0, 2.0));
        assert!(!controller.is_animating());
    }

    #[test]
    fn test_fly_to_ignores_non_finite_scale() {
        let mut controller = ViewportController::default();
        let start = Instant::now();
        controller.fly_to(Viewport::new(f64::NAN, 50.0, f64::NAN), start);
        assert!(!controller.tick(start + Duration::from_millis(600)));

        let vp = controller.viewport();
        assert!(vp.scale.is_finite());
        assert!((MIN_SCALE..=MAX_SCALE).contains(&vp.scale));
        assert!((vp.scale - 1.0).abs() < f64::EPSILON);
        assert!((vp.x).abs() < f64::EPSILON);
        assert!((vp.y - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_new_fly_to_replaces_previous() {
        let mut controller = ViewportController::default();
        let start = Instant::now();
        let first = controller.fly_to(Viewport::new(100.0, 0.0, 1.0), start);
        let second = controller.fly_to(Viewport::new(-100.0, 0.0, 1.0), start);
        assert!(second > first);
        assert_eq!(controller.current_animation(), Some(second));

        controller.tick(start + Duration::from_secs(1));
        assert!((controller.viewport().x + 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_manual_pan_cancels_fly_to() {
        let mut controller = ViewportController::default();
        let start = Instant::now();
        controller.fly_to(Viewport::new(100.0, 0.0, 1.0), start);
        controller.pan_by(Vec2::new(5.0, 0.0));
        assert!(!controller.is_animating());
        assert!(!controller.tick(start + Duration::from_secs(1)));
        assert!((controller.viewport().x - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_grid_hidden_when_cells_too_small() {
        let layer = ViewLayer::for_viewport(Viewport::new(0.0, 0.0, 0.3));
        assert!((layer.grid.cell_px - 12.0).abs() < 1e-9);
        assert!(!layer.grid.is_visible());

        let layer = ViewLayer::for_viewport(Viewport::new(0.0, 0.0, 0.5));
        assert!((layer.grid.opacity - 0.25).abs() < 1e-9);

        let layer = ViewLayer::for_viewport(Viewport::new(0.0, 0.0, 1.0));
        assert!((layer.grid.opacity - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_grid_offset_wraps() {
        let layer = ViewLayer::for_viewport(Viewport::new(-10.0, 95.0, 1.0));
        assert!((layer.grid.offset.x - 30.0).abs() < 1e-9);
        assert!((layer.grid.offset.y - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_to_bounds_centers_content() {
        let bounds = Rect::new(0.0, 0.0, 400.0, 200.0);
        let vp = Viewport::fit_to_bounds(bounds, Size::new(800.0, 600.0), 0.0, MIN_SCALE, MAX_SCALE);
        assert!((vp.scale - 2.0).abs() < f64::EPSILON);
        assert_close(vp.world_to_screen(bounds.center()), Point::new(400.0, 300.0));
    }

    #[test]
    fn test_screen_rect_to_world_normalizes() {
        let vp = Viewport::new(0.0, 0.0, 2.0);
        let rect = vp.screen_rect_to_world(Rect::new(100.0, 100.0, 0.0, 0.0));
        assert_eq!(rect, Rect::new(0.0, 0.0, 50.0, 50.0));
    }
}
