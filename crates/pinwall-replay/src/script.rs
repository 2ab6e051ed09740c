//! Scene and script file formats.

use kurbo::{Point, Vec2};
use pinwall_core::input::{Instant, Modifiers, MouseButton, PointerEvent, PointerId, WheelEvent};
use pinwall_core::{AlignKind, CanvasObject, InputEvent, ObjectId, Viewport};
use serde::Deserialize;

/// Initial canvas contents.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Scene {
    pub objects: Vec<CanvasObject>,
    pub viewport: Option<Viewport>,
    /// Surface size in screen pixels.
    pub viewport_size: Option<(f64, f64)>,
}

/// One timed script entry.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    /// Milliseconds since the start of the replay.
    #[serde(default)]
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    MouseDown {
        x: f64,
        y: f64,
        #[serde(default)]
        button: MouseButton,
        #[serde(default)]
        modifiers: Modifiers,
    },
    MouseMove {
        x: f64,
        y: f64,
        #[serde(default)]
        modifiers: Modifiers,
    },
    MouseUp {
        x: f64,
        y: f64,
        #[serde(default)]
        button: MouseButton,
        #[serde(default)]
        modifiers: Modifiers,
    },
    TouchStart {
        id: PointerId,
        x: f64,
        y: f64,
    },
    TouchMove {
        id: PointerId,
        x: f64,
        y: f64,
    },
    TouchEnd {
        id: PointerId,
        x: f64,
        y: f64,
    },
    Wheel {
        x: f64,
        y: f64,
        #[serde(default)]
        dx: f64,
        dy: f64,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Pinch {
        x: f64,
        y: f64,
        factor: f64,
    },
    /// Let time pass; runs the pending frame.
    Tick,
    Cancel,
    Drop {
        files: Vec<std::path::PathBuf>,
        x: f64,
        y: f64,
    },
    FlyTo {
        x: f64,
        y: f64,
        scale: f64,
    },
    ZoomToFit,
    Select {
        ids: Vec<ObjectId>,
    },
    Align {
        kind: AlignKind,
    },
    DeleteSelection,
}

impl Action {
    /// The input event this action stands for, if it is an input action.
    pub fn to_input(&self, now: Instant) -> Option<InputEvent> {
        let event = match self {
            Action::MouseDown {
                x,
                y,
                button,
                modifiers,
            } => InputEvent::PointerDown(
                PointerEvent::mouse(Point::new(*x, *y), now)
                    .with_button(*button)
                    .with_modifiers(*modifiers),
            ),
            Action::MouseMove { x, y, modifiers } => InputEvent::PointerMove(
                PointerEvent::mouse(Point::new(*x, *y), now).with_modifiers(*modifiers),
            ),
            Action::MouseUp {
                x,
                y,
                button,
                modifiers,
            } => InputEvent::PointerUp(
                PointerEvent::mouse(Point::new(*x, *y), now)
                    .with_button(*button)
                    .with_modifiers(*modifiers),
            ),
            Action::TouchStart { id, x, y } => {
                InputEvent::PointerDown(PointerEvent::touch(*id, Point::new(*x, *y), now))
            }
            Action::TouchMove { id, x, y } => {
                InputEvent::PointerMove(PointerEvent::touch(*id, Point::new(*x, *y), now))
            }
            Action::TouchEnd { id, x, y } => {
                InputEvent::PointerUp(PointerEvent::touch(*id, Point::new(*x, *y), now))
            }
            Action::Wheel {
                x,
                y,
                dx,
                dy,
                modifiers,
            } => InputEvent::Wheel(
                WheelEvent::new(Point::new(*x, *y), Vec2::new(*dx, *dy), now)
                    .with_modifiers(*modifiers),
            ),
            Action::Pinch { x, y, factor } => InputEvent::PinchZoom {
                position: Point::new(*x, *y),
                factor: *factor,
                timestamp: now,
            },
            Action::Cancel => InputEvent::Cancel,
            Action::Drop { files, x, y } => InputEvent::FilesDropped {
                files: files.clone(),
                position: Point::new(*x, *y),
            },
            Action::Tick
            | Action::FlyTo { .. }
            | Action::ZoomToFit
            | Action::Select { .. }
            | Action::Align { .. }
            | Action::DeleteSelection => return None,
        };
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps() {
        let json = r#"[
            { "at_ms": 0, "type": "mouse_down", "x": 10, "y": 20, "modifiers": { "shift": true } },
            { "at_ms": 16, "type": "wheel", "x": 400, "y": 300, "dy": -100 },
            { "at_ms": 600, "type": "tick" },
            { "type": "align", "kind": "align-h" }
        ]"#;
        let steps: Vec<Step> = serde_json::from_str(json).unwrap();
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[3].at_ms, 0);

        let now = Instant::now();
        match steps[0].action.to_input(now) {
            Some(InputEvent::PointerDown(event)) => {
                assert_eq!(event.position, Point::new(10.0, 20.0));
                assert!(event.modifiers.shift);
                assert_eq!(event.button, MouseButton::Primary);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(steps[1].action.to_input(now), Some(InputEvent::Wheel(_))));
        assert!(steps[2].action.to_input(now).is_none());
        assert!(matches!(
            steps[3].action,
            Action::Align {
                kind: AlignKind::AlignH
            }
        ));
    }

    #[test]
    fn test_parse_scene() {
        let json = r#"{
            "objects": [
                { "id": "67e55044-10b1-426f-9247-bb680e5fe0c8", "x": 0, "y": 0, "width": 100, "height": 80 }
            ],
            "viewport": { "x": 10, "y": 0, "scale": 2 }
        }"#;
        let scene: Scene = serde_json::from_str(json).unwrap();
        assert_eq!(scene.objects.len(), 1);
        assert!((scene.objects[0].height - 80.0).abs() < f64::EPSILON);
        assert!((scene.viewport.unwrap().scale - 2.0).abs() < f64::EPSILON);
        assert!(scene.viewport_size.is_none());
    }
}
