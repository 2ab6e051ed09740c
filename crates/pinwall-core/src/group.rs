//! Group transforms: broadcast translation and bounding-box-relative resize.

use crate::geometry::group_bounds;
use crate::object::ObjectId;
use kurbo::{Rect, Vec2};

/// Position and size of a member as fractions of the group bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeRect {
    pub rel_x: f64,
    pub rel_y: f64,
    pub rel_w: f64,
    pub rel_h: f64,
}

impl RelativeRect {
    /// Express `rect` relative to `bounds`.
    pub fn capture(rect: Rect, bounds: Rect) -> Self {
        Self {
            rel_x: (rect.x0 - bounds.x0) / bounds.width(),
            rel_y: (rect.y0 - bounds.y0) / bounds.height(),
            rel_w: rect.width() / bounds.width(),
            rel_h: rect.height() / bounds.height(),
        }
    }

    /// Absolute rectangle inside `bounds`.
    pub fn resolve(&self, bounds: Rect) -> Rect {
        let x = bounds.x0 + self.rel_x * bounds.width();
        let y = bounds.y0 + self.rel_y * bounds.height();
        Rect::new(
            x,
            y,
            x + self.rel_w * bounds.width(),
            y + self.rel_h * bounds.height(),
        )
    }
}

/// Snapshot of a group taken when a resize starts.
#[derive(Debug, Clone)]
pub struct GroupLayout {
    bounds: Rect,
    members: Vec<(ObjectId, RelativeRect)>,
}

impl GroupLayout {
    /// Capture the layout of `members`. Returns `None` for an empty group or a
    /// degenerate bounding box.
    pub fn capture(members: &[(ObjectId, Rect)]) -> Option<Self> {
        let bounds = group_bounds(members.iter().map(|(_, r)| *r))?;
        if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return None;
        }
        Some(Self {
            bounds,
            members: members
                .iter()
                .map(|(id, rect)| (*id, RelativeRect::capture(*rect, bounds)))
                .collect(),
        })
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn relative(&self, id: ObjectId) -> Option<RelativeRect> {
        self.members
            .iter()
            .find(|(member, _)| *member == id)
            .map(|(_, rel)| *rel)
    }

    /// Smallest X and Y scale factors that keep every member at least `min_size`.
    pub fn min_scale(&self, min_size: f64) -> (f64, f64) {
        self.members
            .iter()
            .fold((0.0_f64, 0.0_f64), |(sx, sy), (_, rel)| {
                let w = rel.rel_w * self.bounds.width();
                let h = rel.rel_h * self.bounds.height();
                (sx.max(min_size / w), sy.max(min_size / h))
            })
    }

    /// Rescale the whole group so that `driver` ends up at `driver_new`.
    ///
    /// The new bounding box is `bounds` scaled by the driver's size change,
    /// positioned so the driver's relative origin lands on `driver_new`.
    /// Returns `None` if `driver` is not a member.
    pub fn rescale(&self, driver: ObjectId, driver_original: Rect, driver_new: Rect) -> Option<Vec<(ObjectId, Rect)>> {
        let rel = self.relative(driver)?;
        let scale_x = driver_new.width() / driver_original.width();
        let scale_y = driver_new.height() / driver_original.height();
        let width = self.bounds.width() * scale_x;
        let height = self.bounds.height() * scale_y;
        let x = driver_new.x0 - rel.rel_x * width;
        let y = driver_new.y0 - rel.rel_y * height;
        let bounds = Rect::new(x, y, x + width, y + height);
        Some(
            self.members
                .iter()
                .map(|(id, rel)| (*id, rel.resolve(bounds)))
                .collect(),
        )
    }
}

/// Translate every member by the same delta.
pub fn broadcast_delta(members: &[(ObjectId, Rect)], delta: Vec2) -> Vec<(ObjectId, Rect)> {
    members.iter().map(|(id, rect)| (*id, *rect + delta)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_capture_fractions() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let layout = GroupLayout::capture(&[
            (a, Rect::new(0.0, 0.0, 100.0, 100.0)),
            (b, Rect::new(100.0, 0.0, 200.0, 50.0)),
        ])
        .unwrap();
        assert_eq!(layout.bounds(), Rect::new(0.0, 0.0, 200.0, 100.0));

        let rel_b = layout.relative(b).unwrap();
        assert!((rel_b.rel_x - 0.5).abs() < f64::EPSILON);
        assert!((rel_b.rel_w - 0.5).abs() < f64::EPSILON);
        assert!((rel_b.rel_h - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_degenerate_group() {
        assert!(GroupLayout::capture(&[]).is_none());
        let a = Uuid::new_v4();
        assert!(GroupLayout::capture(&[(a, Rect::new(0.0, 0.0, 0.0, 10.0))]).is_none());
    }

    #[test]
    fn test_rescale_doubles_width() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let ra = Rect::new(0.0, 0.0, 100.0, 100.0);
        let rb = Rect::new(100.0, 0.0, 200.0, 100.0);
        let layout = GroupLayout::capture(&[(a, ra), (b, rb)]).unwrap();

        let out = layout
            .rescale(a, ra, Rect::new(0.0, 0.0, 200.0, 100.0))
            .unwrap();
        let new_b = out.iter().find(|(id, _)| *id == b).unwrap().1;
        assert!((new_b.x0 - 200.0).abs() < 1e-9);
        assert!((new_b.width() - 200.0).abs() < 1e-9);
        assert!((new_b.height() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_rescale_preserves_ratios() {
        let ids: Vec<_> = (0..3).map(|_| Uuid::new_v4()).collect();
        let rects = [
            Rect::new(0.0, 0.0, 80.0, 40.0),
            Rect::new(120.0, 40.0, 200.0, 160.0),
            Rect::new(40.0, 200.0, 160.0, 240.0),
        ];
        let members: Vec<_> = ids.iter().copied().zip(rects).collect();
        let layout = GroupLayout::capture(&members).unwrap();

        // Drag the middle member's NW corner outwards.
        let driver_new = Rect::new(100.0, 10.0, 200.0, 160.0);
        let out = layout.rescale(ids[1], rects[1], driver_new).unwrap();
        let new_bounds = group_bounds(out.iter().map(|(_, r)| *r)).unwrap();

        for (id, rect) in &out {
            let rel = layout.relative(*id).unwrap();
            assert!(((rect.x0 - new_bounds.x0) / new_bounds.width() - rel.rel_x).abs() < 1e-9);
            assert!(((rect.y0 - new_bounds.y0) / new_bounds.height() - rel.rel_y).abs() < 1e-9);
            assert!((rect.width() / new_bounds.width() - rel.rel_w).abs() < 1e-9);
        }
        let driver = out.iter().find(|(id, _)| *id == ids[1]).unwrap().1;
        assert!((driver.x0 - 100.0).abs() < 1e-9);
        assert!((driver.y0 - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_min_scale() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let layout = GroupLayout::capture(&[
            (a, Rect::new(0.0, 0.0, 100.0, 40.0)),
            (b, Rect::new(100.0, 0.0, 140.0, 200.0)),
        ])
        .unwrap();
        let (sx, sy) = layout.min_scale(20.0);
        assert!((sx - 0.5).abs() < 1e-9);
        assert!((sy - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_broadcast_delta() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let out = broadcast_delta(
            &[(a, Rect::new(0.0, 0.0, 10.0, 10.0)), (b, Rect::new(50.0, 50.0, 60.0, 60.0))],
            Vec2::new(40.0, -40.0),
        );
        assert_eq!(out[0], (a, Rect::new(40.0, -40.0, 50.0, -30.0)));
        assert_eq!(out[1], (b, Rect::new(90.0, 10.0, 100.0, 20.0)));
    }
}
