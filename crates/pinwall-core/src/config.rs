//! Tunable constants for the canvas, loadable from JSON.

use crate::error::{CanvasError, CanvasResult};
use crate::input::{Duration, PointerKind};
use serde::{Deserialize, Serialize};

/// Snap grid cell size in world units.
pub const GRID_SIZE: f64 = 40.0;
/// Smallest object edge in world units when snapping is off.
pub const MIN_OBJECT_SIZE: f64 = 20.0;
/// Lower zoom bound.
pub const MIN_SCALE: f64 = 0.05;
/// Upper zoom bound.
pub const MAX_SCALE: f64 = 50.0;

/// Canvas configuration.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use pinwall_core::config::CanvasConfig;
///
/// let config = CanvasConfig::from_json(r#"{ "snap_enabled": true }"#).unwrap();
/// assert!(config.snap_enabled);
/// assert_eq!(config.min_size(), 40.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Snap grid cell size in world units.
    pub grid_size: f64,
    /// Whether drag and resize snap to the grid.
    pub snap_enabled: bool,
    /// Minimum object edge when snapping is off.
    pub min_object_size: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    /// Wheel zoom factor is `exp(-delta_y * wheel_zoom_sensitivity)`.
    pub wheel_zoom_sensitivity: f64,
    pub fly_to_duration_ms: u64,
    /// Grid cells smaller than this many screen pixels are not drawn.
    pub grid_fade_min_px: f64,
    pub long_press_ms: u64,
    /// Movement in screen pixels that turns a press into a drag (mouse/pen).
    pub tap_threshold_mouse: f64,
    /// Movement in screen pixels that turns a press into a drag (touch).
    pub tap_threshold_touch: f64,
    /// Overlap tolerance for collision tests, in world units.
    pub collision_epsilon: f64,
    /// Ring limit for the free-position search.
    pub max_search_rings: u32,
    /// Gap left between items by the compact alignments.
    pub compact_padding: f64,
    /// Resize handle hit radius in screen pixels.
    pub handle_hit_radius: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            grid_size: GRID_SIZE,
            snap_enabled: false,
            min_object_size: MIN_OBJECT_SIZE,
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            wheel_zoom_sensitivity: 0.001,
            fly_to_duration_ms: 500,
            grid_fade_min_px: 16.0,
            long_press_ms: 500,
            tap_threshold_mouse: 3.0,
            tap_threshold_touch: 10.0,
            collision_epsilon: 0.5,
            max_search_rings: 50,
            compact_padding: 20.0,
            handle_hit_radius: 10.0,
        }
    }
}

impl CanvasConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> CanvasResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CanvasError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the values are usable.
    pub fn validate(&self) -> CanvasResult<()> {
        let positive = [
            ("grid_size", self.grid_size),
            ("min_object_size", self.min_object_size),
            ("min_scale", self.min_scale),
            ("max_scale", self.max_scale),
            ("grid_fade_min_px", self.grid_fade_min_px),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(CanvasError::Config(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if self.min_scale >= self.max_scale {
            return Err(CanvasError::Config(format!(
                "min_scale ({}) must be below max_scale ({})",
                self.min_scale, self.max_scale
            )));
        }
        let non_negative = [
            ("wheel_zoom_sensitivity", self.wheel_zoom_sensitivity),
            ("tap_threshold_mouse", self.tap_threshold_mouse),
            ("tap_threshold_touch", self.tap_threshold_touch),
            ("collision_epsilon", self.collision_epsilon),
            ("compact_padding", self.compact_padding),
            ("handle_hit_radius", self.handle_hit_radius),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(CanvasError::Config(format!(
                    "{name} must not be negative, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Size floor for objects: one grid cell while snapping, otherwise `min_object_size`.
    pub fn min_size(&self) -> f64 {
        if self.snap_enabled {
            self.grid_size.max(self.min_object_size)
        } else {
            self.min_object_size
        }
    }

    /// Grid cell to snap to, if snapping is on.
    pub fn snap_grid(&self) -> Option<f64> {
        self.snap_enabled.then_some(self.grid_size)
    }

    /// Movement threshold for a pointer of the given kind.
    pub fn tap_threshold(&self, kind: PointerKind) -> f64 {
        match kind {
            PointerKind::Touch => self.tap_threshold_touch,
            PointerKind::Mouse | PointerKind::Pen => self.tap_threshold_mouse,
        }
    }

    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    pub fn fly_to_duration(&self) -> Duration {
        Duration::from_millis(self.fly_to_duration_ms)
    }
}
