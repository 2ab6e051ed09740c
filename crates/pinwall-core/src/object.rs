//! Image objects placed on the canvas.

use crate::error::{CanvasError, CanvasResult};
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a canvas object.
pub type ObjectId = Uuid;

/// Crop window as fractions of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Crop {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for Crop {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }
}

/// Display filters. Carried through untouched by the interaction core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filters {
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    pub blur: f64,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
            blur: 0.0,
        }
    }
}

/// A rectangular image object in world units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasObject {
    pub id: ObjectId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Rotation in degrees.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub z_index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<Crop>,
    #[serde(default)]
    pub filters: Filters,
}

impl CanvasObject {
    /// Create an object with a fresh id.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::with_id(Uuid::new_v4(), x, y, width, height)
    }

    /// Create an object with a known id.
    pub fn with_id(id: ObjectId, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id,
            x,
            y,
            width,
            height,
            rotation: 0.0,
            z_index: 0,
            crop: None,
            filters: Filters::default(),
        }
    }

    pub fn with_z_index(mut self, z_index: i64) -> Self {
        self.z_index = z_index;
        self
    }

    /// Axis-aligned rectangle occupied by the object.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Overwrite position and size from a rectangle.
    pub fn set_rect(&mut self, rect: Rect) {
        let rect = rect.abs();
        self.x = rect.x0;
        self.y = rect.y0;
        self.width = rect.width();
        self.height = rect.height();
    }

    /// Reject objects whose geometry cannot be laid out.
    pub fn validate(&self) -> CanvasResult<()> {
        let finite = self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite();
        if !finite || self.width <= 0.0 || self.height <= 0.0 {
            return Err(CanvasError::InvalidGeometry {
                id: self.id,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// Partial update sent to the object store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl ObjectPatch {
    /// Patch carrying the full geometry of `rect`.
    pub fn geometry(rect: Rect) -> Self {
        Self {
            x: Some(rect.x0),
            y: Some(rect.y0),
            width: Some(rect.width()),
            height: Some(rect.height()),
        }
    }

    /// Patch carrying only the fields that differ between `before` and `after`.
    pub fn diff(before: Rect, after: Rect) -> Self {
        let changed = |a: f64, b: f64| ((a - b).abs() > f64::EPSILON).then_some(b);
        Self {
            x: changed(before.x0, after.x0),
            y: changed(before.y0, after.y0),
            width: changed(before.width(), after.width()),
            height: changed(before.height(), after.height()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.width.is_none() && self.height.is_none()
    }

    /// Apply the set fields to an object.
    pub fn apply(&self, object: &mut CanvasObject) {
        if let Some(x) = self.x {
            object.x = x;
        }
        if let Some(y) = self.y {
            object.y = y;
        }
        if let Some(width) = self.width {
            object.width = width;
        }
        if let Some(height) = self.height {
            object.height = height;
        }
    }
}
