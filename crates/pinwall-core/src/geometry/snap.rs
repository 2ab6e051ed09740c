//! Grid snapping.

use kurbo::Point;

/// Round a value to the nearest multiple of `cell`.
///
/// A non-positive cell leaves the value unchanged.
pub fn snap_to_grid(value: f64, cell: f64) -> f64 {
    if cell <= 0.0 {
        return value;
    }
    (value / cell).round() * cell
}

/// Result of a snap operation.
#[derive(Debug, Clone, Copy)]
pub struct SnapResult {
    /// The snapped point.
    pub point: Point,
    /// Whether the X coordinate was moved.
    pub snapped_x: bool,
    /// Whether the Y coordinate was moved.
    pub snapped_y: bool,
}

/// Snap a point to the nearest grid intersection.
pub fn snap_point(point: Point, cell: f64) -> SnapResult {
    let snapped = Point::new(snap_to_grid(point.x, cell), snap_to_grid(point.y, cell));
    SnapResult {
        point: snapped,
        snapped_x: (snapped.x - point.x).abs() > f64::EPSILON,
        snapped_y: (snapped.y - point.y).abs() > f64::EPSILON,
    }
}

/// Snap a point if a grid is given.
pub fn snap_point_to(point: Point, grid: Option<f64>) -> Point {
    match grid {
        Some(cell) => snap_point(point, cell).point,
        None => point,
    }
}
