//! Translation of winit window events into [`InputEvent`]s.

use crate::input::{
    InputEvent, Instant, MOUSE_POINTER_ID, Modifiers, MouseButton, PointerEvent, PointerId,
    WheelEvent,
};
use kurbo::{Point, Vec2};
use winit::event::{ElementState, MouseScrollDelta, Touch, TouchPhase, WindowEvent};

/// Pixels per scroll line.
const LINE_HEIGHT: f64 = 20.0;

/// Tracks cursor and modifier state between winit events.
#[derive(Debug, Clone, Default)]
pub struct WinitInput {
    cursor: Point,
    modifiers: Modifiers,
}

impl WinitInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> Point {
        self.cursor
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Translate one window event. Events the canvas does not care about,
    /// and state-only events such as modifier changes, return `None`.
    pub fn translate(&mut self, event: &WindowEvent, now: Instant) -> Option<InputEvent> {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Point::new(position.x, position.y);
                Some(InputEvent::PointerMove(self.mouse_event(MouseButton::Primary, now)))
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = map_button(*button)?;
                let event = self.mouse_event(button, now);
                Some(match state {
                    ElementState::Pressed => InputEvent::PointerDown(event),
                    ElementState::Released => InputEvent::PointerUp(event),
                })
            }
            WindowEvent::MouseWheel { delta, .. } => Some(InputEvent::Wheel(
                WheelEvent::new(self.cursor, scroll_delta(*delta), now).with_modifiers(self.modifiers),
            )),
            WindowEvent::PinchGesture { delta, .. } => Some(InputEvent::PinchZoom {
                position: self.cursor,
                factor: 1.0 + delta,
                timestamp: now,
            }),
            WindowEvent::Touch(touch) => Some(self.touch_event(touch, now)),
            WindowEvent::ModifiersChanged(modifiers) => {
                let state = modifiers.state();
                self.modifiers = Modifiers {
                    shift: state.shift_key(),
                    ctrl: state.control_key(),
                    alt: state.alt_key(),
                    meta: state.super_key(),
                };
                None
            }
            WindowEvent::Focused(false) => Some(InputEvent::Cancel),
            WindowEvent::DroppedFile(path) => Some(InputEvent::FilesDropped {
                files: vec![path.clone()],
                position: self.cursor,
            }),
            _ => None,
        }
    }

    fn mouse_event(&self, button: MouseButton, now: Instant) -> PointerEvent {
        PointerEvent::mouse(self.cursor, now)
            .with_button(button)
            .with_modifiers(self.modifiers)
    }

    fn touch_event(&self, touch: &Touch, now: Instant) -> InputEvent {
        let position = Point::new(touch.location.x, touch.location.y);
        let event = PointerEvent::touch(touch_pointer_id(touch.id), position, now)
            .with_modifiers(self.modifiers);
        match touch.phase {
            TouchPhase::Started => InputEvent::PointerDown(event),
            TouchPhase::Moved => InputEvent::PointerMove(event),
            TouchPhase::Ended => InputEvent::PointerUp(event),
            TouchPhase::Cancelled => InputEvent::Cancel,
        }
    }
}

/// Touch ids are shifted past the mouse pointer id.
///
/// The id space has one slot fewer than winit's, so winit ids `u64::MAX - 1`
/// and `u64::MAX` share a pointer. Touch ids that high do not occur in practice.
fn touch_pointer_id(id: u64) -> PointerId {
    match id.wrapping_add(MOUSE_POINTER_ID + 1) {
        MOUSE_POINTER_ID => PointerId::MAX,
        mapped => mapped,
    }
}

fn map_button(button: winit::event::MouseButton) -> Option<MouseButton> {
    match button {
        winit::event::MouseButton::Left => Some(MouseButton::Primary),
        winit::event::MouseButton::Right => Some(MouseButton::Secondary),
        winit::event::MouseButton::Middle => Some(MouseButton::Middle),
        _ => None,
    }
}

/// winit reports positive y for scrolling up; canvas wheel deltas use the
/// opposite sign.
fn scroll_delta(delta: MouseScrollDelta) -> Vec2 {
    match delta {
        MouseScrollDelta::LineDelta(x, y) => {
            Vec2::new(-(x as f64) * LINE_HEIGHT, -(y as f64) * LINE_HEIGHT)
        }
        MouseScrollDelta::PixelDelta(pos) => Vec2::new(-pos.x, -pos.y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;

    #[test]
    fn test_scroll_up_zooms_in() {
        let delta = scroll_delta(MouseScrollDelta::LineDelta(0.0, 1.0));
        assert!((delta.y + 20.0).abs() < f64::EPSILON);

        let delta = scroll_delta(MouseScrollDelta::PixelDelta(PhysicalPosition::new(3.0, -40.0)));
        assert!((delta.x + 3.0).abs() < f64::EPSILON);
        assert!((delta.y - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_button_mapping() {
        assert_eq!(map_button(winit::event::MouseButton::Left), Some(MouseButton::Primary));
        assert_eq!(map_button(winit::event::MouseButton::Right), Some(MouseButton::Secondary));
        assert_eq!(map_button(winit::event::MouseButton::Back), None);
    }

    #[test]
    fn test_touch_ids_never_collide_with_mouse() {
        assert_ne!(touch_pointer_id(0), MOUSE_POINTER_ID);
        assert_ne!(touch_pointer_id(u64::MAX), MOUSE_POINTER_ID);
        assert_ne!(touch_pointer_id(u64::MAX - 2), touch_pointer_id(u64::MAX - 1));
        assert_eq!(touch_pointer_id(u64::MAX - 1), touch_pointer_id(u64::MAX));
        assert_eq!(touch_pointer_id(41), 42);
    }
}
