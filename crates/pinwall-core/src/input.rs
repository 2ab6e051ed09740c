//! Unified pointer, wheel and drop events.
//!
//! Platform layers build one [`InputEvent`] per raw event; everything past that
//! point only sees these types.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// Use web_time for WASM compatibility
#[cfg(target_arch = "wasm32")]
pub use web_time::{Duration, Instant};
#[cfg(not(target_arch = "wasm32"))]
pub use std::time::{Duration, Instant};

/// Identifier of a pointer stream. Mice use a fixed id, touches their own.
pub type PointerId = u64;

/// Pointer id used for the mouse.
pub const MOUSE_POINTER_ID: PointerId = 0;

/// Kind of device behind a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerKind {
    #[default]
    Mouse,
    Touch,
    Pen,
}

/// Pointer button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    #[default]
    Primary,
    Secondary,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    /// Ctrl or Cmd: starts a box selection on empty surface.
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }

    /// Whether a tap adds to / removes from the selection instead of replacing it.
    pub fn toggles_selection(self) -> bool {
        self.shift || self.command()
    }

    /// Whether resizing ignores the original aspect ratio.
    pub fn frees_aspect(self) -> bool {
        self.shift
    }
}

/// A pointer press, move or release.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    pub id: PointerId,
    /// Position in screen pixels relative to the canvas surface.
    pub position: Point,
    pub kind: PointerKind,
    pub button: MouseButton,
    pub modifiers: Modifiers,
    pub timestamp: Instant,
}

impl PointerEvent {
    /// Primary mouse button event.
    pub fn mouse(position: Point, timestamp: Instant) -> Self {
        Self {
            id: MOUSE_POINTER_ID,
            position,
            kind: PointerKind::Mouse,
            button: MouseButton::Primary,
            modifiers: Modifiers::NONE,
            timestamp,
        }
    }

    /// Touch contact event.
    pub fn touch(id: PointerId, position: Point, timestamp: Instant) -> Self {
        Self {
            id,
            position,
            kind: PointerKind::Touch,
            button: MouseButton::Primary,
            modifiers: Modifiers::NONE,
            timestamp,
        }
    }

    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = button;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn is_touch(&self) -> bool {
        self.kind == PointerKind::Touch
    }
}

/// Scroll wheel or trackpad scroll.
#[derive(Debug, Clone, PartialEq)]
pub struct WheelEvent {
    pub position: Point,
    /// Scroll amount in pixels; positive `y` scrolls down (zooms out).
    pub delta: Vec2,
    pub modifiers: Modifiers,
    pub timestamp: Instant,
}

impl WheelEvent {
    pub fn new(position: Point, delta: Vec2, timestamp: Instant) -> Self {
        Self {
            position,
            delta,
            modifiers: Modifiers::NONE,
            timestamp,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Every input the gesture dispatcher understands.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown(PointerEvent),
    PointerMove(PointerEvent),
    PointerUp(PointerEvent),
    Wheel(WheelEvent),
    /// Trackpad magnification with a ready-made zoom factor.
    PinchZoom {
        position: Point,
        factor: f64,
        timestamp: Instant,
    },
    /// Focus loss or a cancelled touch: abort whatever gesture is running.
    Cancel,
    /// Files dropped onto the surface at a screen position.
    FilesDropped {
        files: Vec<PathBuf>,
        position: Point,
    },
}

impl InputEvent {
    /// Timestamp carried by the event, if any.
    pub fn timestamp(&self) -> Option<Instant> {
        match self {
            InputEvent::PointerDown(e) | InputEvent::PointerMove(e) | InputEvent::PointerUp(e) => {
                Some(e.timestamp)
            }
            InputEvent::Wheel(e) => Some(e.timestamp),
            InputEvent::PinchZoom { timestamp, .. } => Some(*timestamp),
            InputEvent::Cancel | InputEvent::FilesDropped { .. } => None,
        }
    }
}
