//! Per-object pointer sessions: tap checks, drags, resizes and commit-time
//! collision resolution.
//!
//! Sessions only compute candidate geometry. The canvas writes candidates into
//! its local cache for immediate feedback and resolves collisions once, when
//! the pointer is released.

use crate::geometry::{collides_with_any, find_free_position_with, snap_point_to};
use crate::group::GroupLayout;
use crate::handles::{ResizeHandle, ResizeParams, resize_rect};
use crate::input::{Modifiers, PointerId};
use crate::object::ObjectId;
use kurbo::{Point, Rect, Vec2};

/// How a primary press on an object is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressKind {
    /// Unselected object: the press also reaches the surface; selection
    /// happens on release if the pointer stayed put.
    TapCheck,
    /// Selected object: the press is captured and may become a drag.
    Drag,
    /// Handle of a selected object.
    Resize(ResizeHandle),
}

impl PressKind {
    /// Classify a press on an object.
    pub fn classify(selected: bool, handle: Option<ResizeHandle>) -> Self {
        match (selected, handle) {
            (true, Some(handle)) => PressKind::Resize(handle),
            (true, None) => PressKind::Drag,
            (false, _) => PressKind::TapCheck,
        }
    }

    /// Whether the surface should stop seeing this press.
    pub fn stops_propagation(self) -> bool {
        !matches!(self, PressKind::TapCheck)
    }
}

/// Movement tracking for a press that selects on release.
#[derive(Debug, Clone, PartialEq)]
pub struct TapCheck {
    pub id: ObjectId,
    origin: Point,
    threshold: f64,
    moved: bool,
}

impl TapCheck {
    pub fn new(id: ObjectId, origin: Point, threshold: f64) -> Self {
        Self {
            id,
            origin,
            threshold,
            moved: false,
        }
    }

    /// Record a pointer position. Returns whether the press is still a tap.
    pub fn update(&mut self, position: Point) -> bool {
        if self.origin.distance(position) > self.threshold {
            self.moved = true;
        }
        !self.moved
    }

    pub fn is_tap(&self) -> bool {
        !self.moved
    }
}

/// Drag of one object or of the whole selection.
#[derive(Debug, Clone)]
pub struct DragSession {
    pub pointer: PointerId,
    /// Object under the pointer.
    pub driver: ObjectId,
    /// Screen position of the press.
    anchor: Point,
    /// Geometry of every dragged object when the press started.
    originals: Vec<(ObjectId, Rect)>,
    /// Driver origin last broadcast to the group.
    last_emitted: Point,
    threshold: f64,
    active: bool,
    pub modifiers: Modifiers,
}

impl DragSession {
    /// Start a session. `originals` must contain the driver.
    pub fn new(
        pointer: PointerId,
        driver: ObjectId,
        anchor: Point,
        originals: Vec<(ObjectId, Rect)>,
        threshold: f64,
        modifiers: Modifiers,
    ) -> Option<Self> {
        let driver_rect = originals.iter().find(|(id, _)| *id == driver)?.1;
        Some(Self {
            pointer,
            driver,
            anchor,
            last_emitted: driver_rect.origin(),
            originals,
            threshold,
            active: false,
            modifiers,
        })
    }

    /// Whether the pointer has moved past the tap threshold.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_group(&self) -> bool {
        self.originals.len() > 1
    }

    pub fn originals(&self) -> &[(ObjectId, Rect)] {
        &self.originals
    }

    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.originals.iter().map(|(id, _)| *id)
    }

    fn driver_original(&self) -> Option<Rect> {
        self.originals
            .iter()
            .find(|(id, _)| *id == self.driver)
            .map(|(_, rect)| *rect)
    }

    /// Feed a pointer position. Returns the world delta to apply to every
    /// dragged object, or `None` if nothing should move.
    ///
    /// The driver's target origin is snapped; the delta is measured from the
    /// driver's last emitted origin so other members follow it verbatim.
    pub fn update(&mut self, position: Point, scale: f64, grid: Option<f64>) -> Option<Vec2> {
        if !self.active {
            if self.anchor.distance(position) <= self.threshold {
                return None;
            }
            self.active = true;
            log::debug!("Drag started on {} ({} objects)", self.driver, self.originals.len());
        }
        let original = self.driver_original()?;
        let raw = (position - self.anchor) / scale;
        let target = snap_point_to(original.origin() + raw, grid);
        let delta = target - self.last_emitted;
        if delta.hypot2() == 0.0 {
            return None;
        }
        self.last_emitted = target;
        Some(delta)
    }
}

/// Resize of one object, or of the selection through a driver.
#[derive(Debug, Clone)]
pub struct ResizeSession {
    pub pointer: PointerId,
    pub driver: ObjectId,
    pub handle: ResizeHandle,
    anchor: Point,
    initial: Rect,
    originals: Vec<(ObjectId, Rect)>,
    group: Option<GroupLayout>,
    threshold: f64,
    active: bool,
}

impl ResizeSession {
    /// Start a session. Multi-object `originals` enable group resize.
    pub fn new(
        pointer: PointerId,
        driver: ObjectId,
        handle: ResizeHandle,
        anchor: Point,
        originals: Vec<(ObjectId, Rect)>,
        threshold: f64,
    ) -> Option<Self> {
        let initial = originals.iter().find(|(id, _)| *id == driver)?.1;
        let group = if originals.len() > 1 {
            GroupLayout::capture(&originals)
        } else {
            None
        };
        Some(Self {
            pointer,
            driver,
            handle,
            anchor,
            initial,
            originals,
            group,
            threshold,
            active: false,
        })
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_group(&self) -> bool {
        self.group.is_some()
    }

    pub fn originals(&self) -> &[(ObjectId, Rect)] {
        &self.originals
    }

    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.originals.iter().map(|(id, _)| *id)
    }

    /// Candidate geometry for every affected object at `position`.
    pub fn update(&mut self, position: Point, scale: f64, params: ResizeParams) -> Option<Vec<(ObjectId, Rect)>> {
        if !self.active {
            if self.anchor.distance(position) <= self.threshold {
                return None;
            }
            self.active = true;
            log::debug!("Resize started on {} via {:?}", self.driver, self.handle);
        }
        let delta = (position - self.anchor) / scale;
        let driver_new = resize_rect(self.initial, self.handle, delta, params);
        match &self.group {
            None => Some(vec![(self.driver, driver_new)]),
            Some(layout) => {
                let (min_sx, min_sy) = layout.min_scale(params.min_size);
                let scale_x = (driver_new.width() / self.initial.width()).max(min_sx);
                let scale_y = (driver_new.height() / self.initial.height()).max(min_sy);
                let width = self.initial.width() * scale_x;
                let height = self.initial.height() * scale_y;
                let x = if self.handle.moves_left() {
                    self.initial.x1 - width
                } else {
                    self.initial.x0
                };
                let y = if self.handle.moves_top() {
                    self.initial.y1 - height
                } else {
                    self.initial.y0
                };
                let clamped = Rect::new(x, y, x + width, y + height);
                layout.rescale(self.driver, self.initial, clamped)
            }
        }
    }
}

/// Parameters for commit-time collision resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommitParams {
    pub grid_size: f64,
    pub max_rings: u32,
    pub epsilon: f64,
}

/// Final placement of one committed object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved {
    pub id: ObjectId,
    pub rect: Rect,
    /// Whether the free-position search moved it.
    pub relocated: bool,
}

/// Resolve collisions for objects being committed.
///
/// Each candidate is checked on its own against `obstacles` plus the objects
/// already placed earlier in the list. Colliding candidates go to the
/// free-position search; the others are kept exactly as they are.
pub fn resolve_commit(candidates: &[(ObjectId, Rect)], obstacles: &[Rect], params: CommitParams) -> Vec<Resolved> {
    let mut occupied = obstacles.to_vec();
    let mut out = Vec::with_capacity(candidates.len());
    for (id, rect) in candidates {
        let resolved = if collides_with_any(*rect, &occupied, params.epsilon) {
            let placement = find_free_position_with(
                *rect,
                &occupied,
                params.grid_size,
                params.max_rings,
                params.epsilon,
            );
            log::debug!(
                "Object {} collides at ({}, {}), moved to ({}, {})",
                id,
                rect.x0,
                rect.y0,
                placement.origin.x,
                placement.origin.y
            );
            Resolved {
                id: *id,
                rect: Rect::from_origin_size(placement.origin, rect.size()),
                relocated: true,
            }
        } else {
            Resolved {
                id: *id,
                rect: *rect,
                relocated: false,
            }
        };
        occupied.push(resolved.rect);
        out.push(resolved);
    }
    out
}
