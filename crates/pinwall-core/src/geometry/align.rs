//! Alignment, distribution and compaction layouts.

use super::collision::rect_intersects_with;
use super::snap::snap_to_grid;
use crate::object::ObjectId;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Layout action applied to a group of items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlignKind {
    /// Share the mean vertical center (items end up in a row).
    AlignH,
    /// Share the mean horizontal center (items end up in a column).
    AlignV,
    /// Spread evenly between the leftmost and rightmost items.
    DistH,
    /// Spread evenly between the topmost and bottommost items.
    DistV,
    /// Stack left to right with a fixed gap.
    CompactH,
    /// Stack top to bottom with a fixed gap.
    CompactV,
}

impl AlignKind {
    pub const ALL: [AlignKind; 6] = [
        AlignKind::AlignH,
        AlignKind::AlignV,
        AlignKind::DistH,
        AlignKind::DistV,
        AlignKind::CompactH,
        AlignKind::CompactV,
    ];

    /// Whether the action orders items along the X axis.
    pub fn is_horizontal(self) -> bool {
        matches!(self, AlignKind::AlignH | AlignKind::DistH | AlignKind::CompactH)
    }
}

/// An item's rectangle, either current or projected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub id: ObjectId,
    pub rect: Rect,
}

impl Projection {
    pub fn new(id: ObjectId, rect: Rect) -> Self {
        Self { id, rect }
    }

    fn moved_to(self, x: f64, y: f64, grid: f64) -> Self {
        let origin = Point::new(snap_to_grid(x, grid), snap_to_grid(y, grid));
        Self {
            id: self.id,
            rect: Rect::from_origin_size(origin, self.rect.size()),
        }
    }
}

/// Projected layout for `items`, one entry per item, grid-snapped.
///
/// Fewer than two items produce no projections.
pub fn alignment_projections(
    kind: AlignKind,
    items: &[Projection],
    grid: f64,
    padding: f64,
) -> Vec<Projection> {
    if items.len() < 2 {
        return Vec::new();
    }
    let count = items.len() as f64;

    match kind {
        AlignKind::AlignH => {
            let mean = items.iter().map(|p| p.rect.center().y).sum::<f64>() / count;
            items
                .iter()
                .map(|p| p.moved_to(p.rect.x0, mean - p.rect.height() / 2.0, grid))
                .collect()
        }
        AlignKind::AlignV => {
            let mean = items.iter().map(|p| p.rect.center().x).sum::<f64>() / count;
            items
                .iter()
                .map(|p| p.moved_to(mean - p.rect.width() / 2.0, p.rect.y0, grid))
                .collect()
        }
        AlignKind::DistH | AlignKind::DistV => {
            let horizontal = kind.is_horizontal();
            let sorted = sorted_along(items, horizontal);
            let pos = |p: &Projection| if horizontal { p.rect.x0 } else { p.rect.y0 };
            let first = pos(&sorted[0]);
            let last = pos(&sorted[sorted.len() - 1]);
            let step = (last - first) / (count - 1.0);
            sorted
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let along = first + step * i as f64;
                    if horizontal {
                        p.moved_to(along, p.rect.y0, grid)
                    } else {
                        p.moved_to(p.rect.x0, along, grid)
                    }
                })
                .collect()
        }
        AlignKind::CompactH | AlignKind::CompactV => {
            let horizontal = kind.is_horizontal();
            let sorted = sorted_along(items, horizontal);
            let mut cursor = if horizontal {
                sorted[0].rect.x0
            } else {
                sorted[0].rect.y0
            };
            let mut out = Vec::with_capacity(sorted.len());
            for p in sorted {
                let projected = if horizontal {
                    p.moved_to(cursor, p.rect.y0, grid)
                } else {
                    p.moved_to(p.rect.x0, cursor, grid)
                };
                cursor = if horizontal {
                    projected.rect.x1 + padding
                } else {
                    projected.rect.y1 + padding
                };
                out.push(projected);
            }
            out
        }
    }
}

fn sorted_along(items: &[Projection], horizontal: bool) -> Vec<Projection> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| {
        let (pa, pb) = if horizontal {
            (a.rect.x0, b.rect.x0)
        } else {
            (a.rect.y0, b.rect.y0)
        };
        pa.partial_cmp(&pb).unwrap_or(Ordering::Equal)
    });
    sorted
}

/// Whether a projected layout overlaps a non-moving item or itself.
pub fn is_group_colliding(projections: &[Projection], all_items: &[Projection], epsilon: f64) -> bool {
    let moving: HashSet<ObjectId> = projections.iter().map(|p| p.id).collect();
    let hits_obstacle = all_items
        .iter()
        .filter(|item| !moving.contains(&item.id))
        .any(|item| {
            projections
                .iter()
                .any(|p| rect_intersects_with(p.rect, item.rect, epsilon))
        });
    if hits_obstacle {
        return true;
    }
    projections.iter().enumerate().any(|(i, a)| {
        projections[i + 1..]
            .iter()
            .any(|b| rect_intersects_with(a.rect, b.rect, epsilon))
    })
}
