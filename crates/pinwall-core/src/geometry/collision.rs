//! Collision tests and free-position search.

use super::snap::snap_to_grid;
use kurbo::{Point, Rect};

/// Default overlap tolerance in world units.
pub const COLLISION_EPSILON: f64 = 0.5;
/// Default ring limit for [`find_free_position`].
pub const MAX_SEARCH_RINGS: u32 = 50;

/// AABB overlap test with the default tolerance.
///
/// Rectangles that only share an edge do not collide.
pub fn rect_intersects(a: Rect, b: Rect) -> bool {
    rect_intersects_with(a, b, COLLISION_EPSILON)
}

/// AABB overlap test; overlaps thinner than `epsilon` on either axis are ignored.
pub fn rect_intersects_with(a: Rect, b: Rect, epsilon: f64) -> bool {
    a.x0 < b.x1 - epsilon
        && b.x0 < a.x1 - epsilon
        && a.y0 < b.y1 - epsilon
        && b.y0 < a.y1 - epsilon
}

/// Whether `rect` overlaps any of `obstacles`.
pub fn collides_with_any(rect: Rect, obstacles: &[Rect], epsilon: f64) -> bool {
    obstacles
        .iter()
        .any(|obstacle| rect_intersects_with(rect, *obstacle, epsilon))
}

/// Bounding box of a set of rectangles, or `None` when empty.
pub fn group_bounds<I>(rects: I) -> Option<Rect>
where
    I: IntoIterator<Item = Rect>,
{
    rects.into_iter().reduce(|acc, r| acc.union(r))
}

/// Outcome of a free-position search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Grid-aligned origin for the rectangle.
    pub origin: Point,
    /// False when the ring limit was hit and `origin` is the snapped candidate.
    pub found: bool,
    /// Ring at which the search stopped (0 means the candidate itself).
    pub ring: u32,
}

/// Grid offsets on the perimeter of a square ring of Chebyshev radius `ring`.
///
/// Order: top edge left to right, right edge top to bottom, bottom edge right
/// to left, left edge bottom to top.
pub fn ring_offsets(ring: u32) -> impl Iterator<Item = (i64, i64)> {
    let r = i64::from(ring);
    let top = (-r..=r).map(move |i| (i, -r));
    let right = (-r + 1..=r).map(move |j| (r, j));
    let bottom = (-r..r).rev().map(move |i| (i, r));
    let left = (-r + 1..r).rev().map(move |j| (-r, j));
    top.chain(right).chain(bottom).chain(left)
}

/// Nearest grid-aligned origin where `candidate` does not overlap `obstacles`,
/// using the default tolerance and ring limit.
pub fn find_free_position(candidate: Rect, obstacles: &[Rect], cell: f64) -> Placement {
    find_free_position_with(
        candidate,
        obstacles,
        cell,
        MAX_SEARCH_RINGS,
        COLLISION_EPSILON,
    )
}

/// Ring search around the snapped origin of `candidate`.
///
/// When every ring up to `max_rings` is blocked, the snapped candidate origin
/// is returned with `found == false`.
pub fn find_free_position_with(
    candidate: Rect,
    obstacles: &[Rect],
    cell: f64,
    max_rings: u32,
    epsilon: f64,
) -> Placement {
    let size = candidate.size();
    let start = Point::new(
        snap_to_grid(candidate.x0, cell),
        snap_to_grid(candidate.y0, cell),
    );
    let fits = |origin: Point| {
        !collides_with_any(Rect::from_origin_size(origin, size), obstacles, epsilon)
    };

    if fits(start) {
        return Placement {
            origin: start,
            found: true,
            ring: 0,
        };
    }
    if cell > 0.0 {
        for ring in 1..=max_rings {
            let hit = ring_offsets(ring)
                .map(|(i, j)| Point::new(start.x + i as f64 * cell, start.y + j as f64 * cell))
                .find(|origin| fits(*origin));
            if let Some(origin) = hit {
                return Placement {
                    origin,
                    found: true,
                    ring,
                };
            }
        }
    }

    log::warn!(
        "No free position within {} rings of ({}, {}), keeping candidate",
        max_rings,
        start.x,
        start.y
    );
    Placement {
        origin: start,
        found: false,
        ring: max_rings,
    }
}
