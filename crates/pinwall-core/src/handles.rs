//! Resize handles and the resize math behind them.

use crate::geometry::snap_to_grid;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// One of the eight compass handles around an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResizeHandle {
    N,
    S,
    E,
    W,
    NE,
    NW,
    SE,
    SW,
}

impl ResizeHandle {
    /// Corners first so they win over edges when both are in reach.
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::NW,
        ResizeHandle::NE,
        ResizeHandle::SE,
        ResizeHandle::SW,
        ResizeHandle::N,
        ResizeHandle::E,
        ResizeHandle::S,
        ResizeHandle::W,
    ];

    pub fn moves_left(self) -> bool {
        matches!(self, ResizeHandle::W | ResizeHandle::NW | ResizeHandle::SW)
    }

    pub fn moves_right(self) -> bool {
        matches!(self, ResizeHandle::E | ResizeHandle::NE | ResizeHandle::SE)
    }

    pub fn moves_top(self) -> bool {
        matches!(self, ResizeHandle::N | ResizeHandle::NE | ResizeHandle::NW)
    }

    pub fn moves_bottom(self) -> bool {
        matches!(self, ResizeHandle::S | ResizeHandle::SE | ResizeHandle::SW)
    }

    pub fn affects_width(self) -> bool {
        self.moves_left() || self.moves_right()
    }

    pub fn affects_height(self) -> bool {
        self.moves_top() || self.moves_bottom()
    }

    pub fn is_corner(self) -> bool {
        self.affects_width() && self.affects_height()
    }

    /// Position of the handle on `rect`.
    pub fn position(self, rect: Rect) -> Point {
        let center = rect.center();
        let x = if self.moves_left() {
            rect.x0
        } else if self.moves_right() {
            rect.x1
        } else {
            center.x
        };
        let y = if self.moves_top() {
            rect.y0
        } else if self.moves_bottom() {
            rect.y1
        } else {
            center.y
        };
        Point::new(x, y)
    }
}

/// A handle with its position in world coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Handle {
    pub position: Point,
    pub kind: ResizeHandle,
}

impl Handle {
    pub fn new(position: Point, kind: ResizeHandle) -> Self {
        Self { position, kind }
    }

    /// Check if a point is within `tolerance` of this handle.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        (point.x - self.position.x).abs() <= tolerance && (point.y - self.position.y).abs() <= tolerance
    }
}

/// All handles for an object rectangle.
pub fn handles_for(rect: Rect) -> Vec<Handle> {
    ResizeHandle::ALL
        .iter()
        .map(|kind| Handle::new(kind.position(rect), *kind))
        .collect()
}

/// Handle under `point`, if any. `tolerance` is in world units.
pub fn hit_test_handles(rect: Rect, point: Point, tolerance: f64) -> Option<ResizeHandle> {
    handles_for(rect)
        .into_iter()
        .find(|handle| handle.hit_test(point, tolerance))
        .map(|handle| handle.kind)
}

/// Constraints applied while resizing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeParams {
    /// Derive the second dimension from the original aspect ratio.
    pub keep_aspect: bool,
    /// Floor for both dimensions.
    pub min_size: f64,
    /// Snap dragged dimensions to multiples of this cell.
    pub grid: Option<f64>,
}

/// New rectangle for dragging `handle` of `initial` by `delta` world units.
///
/// The edge or corner opposite the handle stays in place. The size floor is
/// applied before aspect correction; if aspect correction pushes the derived
/// dimension below the floor, both dimensions grow together.
pub fn resize_rect(initial: Rect, handle: ResizeHandle, delta: Vec2, params: ResizeParams) -> Rect {
    let (w0, h0) = (initial.width(), initial.height());
    let mut w = w0;
    let mut h = h0;

    if handle.moves_right() {
        w = w0 + delta.x;
    } else if handle.moves_left() {
        w = w0 - delta.x;
    }
    if handle.moves_bottom() {
        h = h0 + delta.y;
    } else if handle.moves_top() {
        h = h0 - delta.y;
    }

    if let Some(cell) = params.grid {
        if handle.affects_width() {
            w = snap_to_grid(w, cell);
        }
        if handle.affects_height() {
            h = snap_to_grid(h, cell);
        }
    }

    w = w.max(params.min_size);
    h = h.max(params.min_size);

    if params.keep_aspect && w0 > 0.0 && h0 > 0.0 {
        let ratio = w0 / h0;
        let width_drives = if handle.is_corner() {
            (w / w0 - 1.0).abs() >= (h / h0 - 1.0).abs()
        } else {
            handle.affects_width()
        };
        if width_drives {
            h = w / ratio;
        } else {
            w = h * ratio;
        }
        let grow = (params.min_size / w).max(params.min_size / h).max(1.0);
        w *= grow;
        h *= grow;
    }

    let x = if handle.moves_left() { initial.x1 - w } else { initial.x0 };
    let y = if handle.moves_top() { initial.y1 - h } else { initial.y0 };
    Rect::new(x, y, x + w, y + h)
}
