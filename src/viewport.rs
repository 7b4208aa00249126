//! World/screen coordinate transforms under pan and zoom.
//!
//! World (canvas) space is where nodes live. Screen space is pixel
//! coordinates as reported by pointer events. The canvas element's bounding
//! rectangle sits between the two: a screen point is first made local to the
//! element, then un-panned and un-zoomed.
//!
//! ```text
//! screen = rect.origin + pan + world * zoom
//! world  = (screen - rect.origin - pan) / zoom
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// A point in either world or screen space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const ZERO: Position = Position { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Position) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub(crate) fn as_tuple(self) -> (f32, f32) {
        (self.x, self.y)
    }
}

impl From<(f32, f32)> for Position {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

impl Add for Position {
    type Output = Position;
    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Position {
    type Output = Position;
    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Position {
    type Output = Position;
    fn mul(self, rhs: f32) -> Position {
        Position::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle. `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_origin_size(origin: Position, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    /// Rectangle spanned by two arbitrary corners.
    pub fn from_corners(a: Position, b: Position) -> Self {
        Self::new(
            a.x.min(b.x),
            a.y.min(b.y),
            (a.x - b.x).abs(),
            (a.y - b.y).abs(),
        )
    }

    pub fn origin(&self) -> Position {
        Position::new(self.x, self.y)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Position {
        Position::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Strict overlap test: rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    pub fn contains(&self, point: Position) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    /// Intersection of two rectangles, `None` when they do not overlap.
    pub fn clip_to(&self, bounds: &Rect) -> Option<Rect> {
        let x = self.x.max(bounds.x);
        let y = self.y.max(bounds.y);
        let right = self.right().min(bounds.right());
        let bottom = self.bottom().min(bounds.bottom());
        if right < x || bottom < y {
            return None;
        }
        Some(Rect::new(x, y, right - x, bottom - y))
    }

    /// Bounding box of a set of rectangles.
    pub fn bounding<I>(rects: I) -> Option<Rect>
    where
        I: IntoIterator<Item = Rect>,
    {
        rects.into_iter().reduce(|acc, r| acc.union(&r))
    }
}

/// Allowed zoom range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomLimits {
    pub min: f32,
    pub max: f32,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self { min: 0.1, max: 3.0 }
    }
}

impl ZoomLimits {
    pub fn clamp(&self, zoom: f32) -> f32 {
        if !zoom.is_finite() {
            return 1.0_f32.clamp(self.min, self.max);
        }
        zoom.clamp(self.min, self.max)
    }
}

/// Pan offset (screen pixels, applied before scaling) and zoom factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, zoom: 1.0 }
    }
}

impl Viewport {
    pub const fn new(x: f32, y: f32, zoom: f32) -> Self {
        Self { x, y, zoom }
    }

    pub fn pan(&self) -> Position {
        Position::new(self.x, self.y)
    }

    /// Same viewport with the zoom forced into `limits`.
    pub fn clamped(self, limits: &ZoomLimits) -> Self {
        Self { zoom: limits.clamp(self.zoom), ..self }
    }

    fn safe_zoom(&self) -> f32 {
        if self.zoom > 0.0 {
            self.zoom
        } else {
            1.0
        }
    }

    /// Convert a screen-space length (e.g. a hit radius in pixels) to world units.
    pub fn screen_to_world_len(&self, len: f32) -> f32 {
        len / self.safe_zoom()
    }

    pub fn world_to_screen_len(&self, len: f32) -> f32 {
        len * self.safe_zoom()
    }
}

/// Map a screen point to world space.
pub fn screen_to_canvas(screen: Position, viewport: &Viewport, rect: &Rect) -> Position {
    let z = viewport.safe_zoom();
    Position::new(
        (screen.x - rect.x - viewport.x) / z,
        (screen.y - rect.y - viewport.y) / z,
    )
}

/// Map a world point to screen space. Inverse of [`screen_to_canvas`].
pub fn canvas_to_screen(world: Position, viewport: &Viewport, rect: &Rect) -> Position {
    let z = viewport.safe_zoom();
    Position::new(
        world.x * z + viewport.x + rect.x,
        world.y * z + viewport.y + rect.y,
    )
}

/// World-space rectangle mapped to screen space.
pub fn rect_to_screen(world: &Rect, viewport: &Viewport, rect: &Rect) -> Rect {
    let origin = canvas_to_screen(world.origin(), viewport, rect);
    Rect::new(
        origin.x,
        origin.y,
        viewport.world_to_screen_len(world.width),
        viewport.world_to_screen_len(world.height),
    )
}

/// Screen-space rectangle mapped to world space.
pub fn rect_to_canvas(screen: &Rect, viewport: &Viewport, rect: &Rect) -> Rect {
    let origin = screen_to_canvas(screen.origin(), viewport, rect);
    Rect::new(
        origin.x,
        origin.y,
        viewport.screen_to_world_len(screen.width),
        viewport.screen_to_world_len(screen.height),
    )
}

/// Zoom by `factor` keeping the world point under `anchor` (screen space) fixed.
pub fn zoom_to_point(
    anchor: Position,
    factor: f32,
    viewport: &Viewport,
    rect: &Rect,
    limits: &ZoomLimits,
) -> Viewport {
    let old_zoom = viewport.safe_zoom();
    let new_zoom = limits.clamp(old_zoom * factor);
    let ratio = new_zoom / old_zoom;

    // Anchor relative to the canvas element
    let ax = anchor.x - rect.x;
    let ay = anchor.y - rect.y;

    Viewport {
        x: ax - (ax - viewport.x) * ratio,
        y: ay - (ay - viewport.y) * ratio,
        zoom: new_zoom,
    }
}

/// Translate the pan offset only.
pub fn pan_canvas(dx: f32, dy: f32, viewport: &Viewport) -> Viewport {
    Viewport {
        x: viewport.x + dx,
        y: viewport.y + dy,
        zoom: viewport.zoom,
    }
}

/// Viewport that centres and fits `bounds` (world space) inside `rect` minus `padding`.
///
/// Returns the identity viewport when there is nothing to fit.
pub fn fit_to_view(
    bounds: Option<Rect>,
    rect: &Rect,
    padding: f32,
    limits: &ZoomLimits,
) -> Viewport {
    let Some(bounds) = bounds else {
        return Viewport::default().clamped(limits);
    };

    let avail_w = (rect.width - 2.0 * padding).max(1.0);
    let avail_h = (rect.height - 2.0 * padding).max(1.0);

    let zoom = if bounds.width <= f32::EPSILON || bounds.height <= f32::EPSILON {
        limits.clamp(1.0)
    } else {
        limits.clamp((avail_w / bounds.width).min(avail_h / bounds.height))
    };

    let center = bounds.center();
    Viewport {
        x: rect.width / 2.0 - center.x * zoom,
        y: rect.height / 2.0 - center.y * zoom,
        zoom,
    }
}

/// The world-space rectangle currently visible through the canvas element.
pub fn visible_world_rect(viewport: &Viewport, rect: &Rect) -> Rect {
    let origin = screen_to_canvas(rect.origin(), viewport, rect);
    Rect::new(
        origin.x,
        origin.y,
        viewport.screen_to_world_len(rect.width),
        viewport.screen_to_world_len(rect.height),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn approx(a: Position, b: Position) -> bool {
        (a.x - b.x).abs() < EPS && (a.y - b.y).abs() < EPS
    }

    // ========================================================================
    // screen_to_canvas() / canvas_to_screen()
    // ========================================================================

    #[test]
    fn test_screen_to_canvas_identity() {
        let p = screen_to_canvas(Position::new(10.0, 20.0), &Viewport::default(), &Rect::default());
        assert_eq!(p, Position::new(10.0, 20.0));
    }

    #[test]
    fn test_screen_to_canvas_accounts_for_rect_pan_and_zoom() {
        let vp = Viewport::new(50.0, 20.0, 2.0);
        let rect = Rect::new(100.0, 10.0, 800.0, 600.0);
        let p = screen_to_canvas(Position::new(250.0, 130.0), &vp, &rect);
        // (250 - 100 - 50) / 2 = 50, (130 - 10 - 20) / 2 = 50
        assert_eq!(p, Position::new(50.0, 50.0));
    }

    #[test]
    fn test_inverse_transform_roundtrip() {
        let rects = [Rect::default(), Rect::new(120.0, 64.0, 1024.0, 768.0)];
        let viewports = [
            Viewport::default(),
            Viewport::new(-340.0, 75.5, 0.1),
            Viewport::new(12.0, -8.0, 2.75),
            Viewport::new(999.0, 999.0, 0.33),
        ];
        let points = [(0.0, 0.0), (123.4, -56.7), (-1000.0, 2500.0), (0.5, 0.25)];

        for rect in &rects {
            for vp in &viewports {
                for &(wx, wy) in &points {
                    let world = Position::new(wx, wy);
                    let screen = canvas_to_screen(world, vp, rect);
                    let back = screen_to_canvas(screen, vp, rect);
                    assert!(
                        (back.x - wx).abs() < 1e-2 && (back.y - wy).abs() < 1e-2,
                        "roundtrip failed for {:?} with {:?}/{:?}: got {:?}",
                        world,
                        vp,
                        rect,
                        back
                    );
                }
            }
        }
    }

    #[test]
    fn test_zero_zoom_does_not_divide_by_zero() {
        let vp = Viewport::new(0.0, 0.0, 0.0);
        let p = screen_to_canvas(Position::new(10.0, 10.0), &vp, &Rect::default());
        assert!(p.x.is_finite() && p.y.is_finite());
    }

    // ========================================================================
    // zoom_to_point()
    // ========================================================================

    #[test]
    fn test_zoom_to_point_keeps_anchor_fixed() {
        let rect = Rect::new(40.0, 30.0, 800.0, 600.0);
        let limits = ZoomLimits::default();
        let vp = Viewport::new(25.0, -60.0, 1.3);
        let anchor = Position::new(410.0, 275.0);

        for factor in [0.5, 0.9, 1.1, 2.0] {
            let before = screen_to_canvas(anchor, &vp, &rect);
            let new_vp = zoom_to_point(anchor, factor, &vp, &rect, &limits);
            let after = screen_to_canvas(anchor, &new_vp, &rect);
            assert!(approx(before, after), "factor {}: {:?} != {:?}", factor, before, after);
        }
    }

    #[test]
    fn test_zoom_to_point_clamps_and_still_keeps_anchor() {
        let rect = Rect::new(0.0, 0.0, 800.0, 600.0);
        let limits = ZoomLimits::default();
        let vp = Viewport::new(0.0, 0.0, 2.5);
        let anchor = Position::new(100.0, 100.0);

        let new_vp = zoom_to_point(anchor, 10.0, &vp, &rect, &limits);
        assert_eq!(new_vp.zoom, 3.0);
        assert!(approx(
            screen_to_canvas(anchor, &vp, &rect),
            screen_to_canvas(anchor, &new_vp, &rect)
        ));

        let new_vp = zoom_to_point(anchor, 0.0001, &vp, &rect, &limits);
        assert_eq!(new_vp.zoom, 0.1);
    }

    // ========================================================================
    // pan_canvas()
    // ========================================================================

    #[test]
    fn test_pan_canvas_only_translates() {
        let vp = Viewport::new(10.0, 20.0, 1.5);
        let panned = pan_canvas(5.0, -7.0, &vp);
        assert_eq!(panned, Viewport::new(15.0, 13.0, 1.5));
    }

    // ========================================================================
    // fit_to_view()
    // ========================================================================

    #[test]
    fn test_fit_to_view_empty_returns_identity() {
        let vp = fit_to_view(None, &Rect::new(0.0, 0.0, 800.0, 600.0), 50.0, &ZoomLimits::default());
        assert_eq!(vp, Viewport::default());
    }

    #[test]
    fn test_fit_to_view_centers_bounds() {
        let rect = Rect::new(0.0, 0.0, 800.0, 600.0);
        let bounds = Rect::new(0.0, 0.0, 700.0, 100.0);
        let vp = fit_to_view(Some(bounds), &rect, 50.0, &ZoomLimits::default());

        // Width-limited: (800 - 100) / 700 = 1.0
        assert!((vp.zoom - 1.0).abs() < EPS);
        let center_on_screen = canvas_to_screen(bounds.center(), &vp, &rect);
        assert!(approx(center_on_screen, Position::new(400.0, 300.0)));
    }

    #[test]
    fn test_fit_to_view_clamps_zoom() {
        let rect = Rect::new(0.0, 0.0, 800.0, 600.0);
        let tiny = Rect::new(10.0, 10.0, 1.0, 1.0);
        let vp = fit_to_view(Some(tiny), &rect, 0.0, &ZoomLimits::default());
        assert_eq!(vp.zoom, 3.0);

        let huge = Rect::new(0.0, 0.0, 1_000_000.0, 1_000_000.0);
        let vp = fit_to_view(Some(huge), &rect, 0.0, &ZoomLimits::default());
        assert_eq!(vp.zoom, 0.1);
    }

    #[test]
    fn test_fit_to_view_zero_area_bounds() {
        let rect = Rect::new(0.0, 0.0, 800.0, 600.0);
        let point = Rect::new(100.0, 100.0, 0.0, 0.0);
        let vp = fit_to_view(Some(point), &rect, 20.0, &ZoomLimits::default());
        assert_eq!(vp.zoom, 1.0);
        assert!(vp.x.is_finite() && vp.y.is_finite());
    }

    // ========================================================================
    // Rect helpers
    // ========================================================================

    #[test]
    fn test_rect_from_corners_normalizes() {
        let r = Rect::from_corners(Position::new(50.0, 80.0), Position::new(10.0, 20.0));
        assert_eq!(r, Rect::new(10.0, 20.0, 40.0, 60.0));
    }

    #[test]
    fn test_rect_touching_edges_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(100.0, 0.0, 100.0, 100.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&Rect::new(99.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn test_rect_clip_to() {
        let a = Rect::new(-10.0, -10.0, 50.0, 50.0);
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(a.clip_to(&bounds), Some(Rect::new(0.0, 0.0, 40.0, 40.0)));
        assert_eq!(Rect::new(200.0, 200.0, 5.0, 5.0).clip_to(&bounds), None);
    }

    #[test]
    fn test_visible_world_rect() {
        let vp = Viewport::new(-100.0, -50.0, 2.0);
        let rect = Rect::new(0.0, 0.0, 800.0, 600.0);
        let visible = visible_world_rect(&vp, &rect);
        assert_eq!(visible, Rect::new(50.0, 25.0, 400.0, 300.0));
    }
}
