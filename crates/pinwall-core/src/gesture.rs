//! Gesture dispatcher: turns surface input into pans, zooms, box selection,
//! context menus and object sessions.

use crate::canvas::Canvas;
use crate::frame::FrameId;
use crate::input::{
    InputEvent, Instant, Modifiers, MouseButton, PointerEvent, PointerId, PointerKind, WheelEvent,
};
use crate::interaction::{DragSession, PressKind, ResizeSession, TapCheck};
use crate::object::ObjectId;
use crate::viewport::ViewLayer;
use kurbo::{Point, Rect};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;

/// Receives files dropped onto the canvas.
pub trait FileIngest {
    /// Hand off files dropped at a world position. Must return immediately.
    fn ingest_files(&mut self, files: Vec<PathBuf>, world: Point);
}

/// A press on the surface waiting to become a pan, a tap or a long press.
#[derive(Debug, Clone)]
pub struct PendingPress {
    pub pointer: PointerId,
    pub kind: PointerKind,
    pub origin: Point,
    pub current: Point,
    pub started: Instant,
    pub modifiers: Modifiers,
    /// Set when the press landed on an unselected object.
    pub tap: Option<TapCheck>,
}

/// Two-finger pinch tracking.
#[derive(Debug, Clone, PartialEq)]
pub struct Pinch {
    pub first: PointerId,
    pub second: PointerId,
    pub last_distance: f64,
    pub last_mid: Point,
}

/// Dispatcher state. At most one session runs at a time.
#[derive(Debug, Clone)]
pub enum GestureState {
    Idle,
    LongPressPending(PendingPress),
    Panning {
        pointer: PointerId,
        last: Point,
    },
    BoxSelecting {
        pointer: PointerId,
        origin: Point,
        current: Point,
        additive: bool,
    },
    Pinching(Pinch),
    Dragging(DragSession),
    Resizing(ResizeSession),
    /// A long press opened the context menu; the rest of the gesture is ignored.
    MenuOpen {
        pointer: PointerId,
    },
}

impl GestureState {
    pub fn name(&self) -> &'static str {
        match self {
            GestureState::Idle => "idle",
            GestureState::LongPressPending(_) => "long-press-pending",
            GestureState::Panning { .. } => "panning",
            GestureState::BoxSelecting { .. } => "box-selecting",
            GestureState::Pinching(_) => "pinching",
            GestureState::Dragging(_) => "dragging",
            GestureState::Resizing(_) => "resizing",
            GestureState::MenuOpen { .. } => "menu-open",
        }
    }

    /// Pointer that owns the current session.
    pub fn pointer(&self) -> Option<PointerId> {
        match self {
            GestureState::Idle | GestureState::Pinching(_) => None,
            GestureState::LongPressPending(press) => Some(press.pointer),
            GestureState::Panning { pointer, .. }
            | GestureState::BoxSelecting { pointer, .. }
            | GestureState::MenuOpen { pointer } => Some(*pointer),
            GestureState::Dragging(session) => Some(session.pointer),
            GestureState::Resizing(session) => Some(session.pointer),
        }
    }

    /// Screen rectangle of an ongoing box selection.
    pub fn selection_box(&self) -> Option<Rect> {
        match self {
            GestureState::BoxSelecting { origin, current, .. } => {
                Some(Rect::from_points(*origin, *current))
            }
            _ => None,
        }
    }
}

/// Routes input for one canvas surface.
pub struct GestureDispatcher {
    state: GestureState,
    touches: BTreeMap<PointerId, Point>,
    ingest: Option<Box<dyn FileIngest>>,
}

impl fmt::Debug for GestureDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GestureDispatcher")
            .field("state", &self.state)
            .field("touches", &self.touches)
            .field("ingest", &self.ingest.is_some())
            .finish()
    }
}

impl Default for GestureDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureDispatcher {
    pub fn new() -> Self {
        Self {
            state: GestureState::Idle,
            touches: BTreeMap::new(),
            ingest: None,
        }
    }

    /// Attach the collaborator that receives dropped files.
    pub fn with_ingest(mut self, ingest: Box<dyn FileIngest>) -> Self {
        self.ingest = Some(ingest);
        self
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    /// Whether a session is running. Hosts keep window-level move/up
    /// listeners attached exactly while this is true.
    pub fn is_capturing(&self) -> bool {
        !matches!(self.state, GestureState::Idle)
    }

    /// Objects whose geometry is owned by the running session.
    pub fn active_objects(&self) -> HashSet<ObjectId> {
        match &self.state {
            GestureState::Dragging(session) => session.ids().collect(),
            GestureState::Resizing(session) => session.ids().collect(),
            _ => HashSet::new(),
        }
    }

    /// Process one input event.
    pub fn handle(&mut self, canvas: &mut Canvas, event: InputEvent) {
        match event {
            InputEvent::PointerDown(e) => self.pointer_down(canvas, e),
            InputEvent::PointerMove(e) => self.pointer_move(canvas, e),
            InputEvent::PointerUp(e) => self.pointer_up(canvas, e),
            InputEvent::Wheel(e) => self.wheel(canvas, e),
            InputEvent::PinchZoom {
                position, factor, ..
            } => {
                canvas.zoom_at(position, factor);
            }
            InputEvent::Cancel => self.cancel(canvas),
            InputEvent::FilesDropped { files, position } => self.drop_files(canvas, files, position),
        }
    }

    /// Run an animation frame: advance the canvas, then fire timers.
    pub fn frame(&mut self, canvas: &mut Canvas, id: FrameId, now: Instant) -> Option<ViewLayer> {
        let layer = canvas.run_frame(id, now)?;
        self.tick(canvas, now);
        Some(layer)
    }

    /// Fire the long-press timer if it is due. Keeps frames coming while it is armed.
    pub fn tick(&mut self, canvas: &mut Canvas, now: Instant) {
        self.check_long_press(canvas, now);
        if matches!(self.state, GestureState::LongPressPending(_)) {
            canvas.ensure_frame();
        }
    }

    /// Abort the running session, restoring any object it was moving.
    pub fn cancel(&mut self, canvas: &mut Canvas) {
        self.abort_session(canvas);
        self.touches.clear();
    }

    fn abort_session(&mut self, canvas: &mut Canvas) {
        let state = std::mem::replace(&mut self.state, GestureState::Idle);
        match &state {
            GestureState::Idle => return,
            GestureState::Dragging(session) => canvas.restore(session.originals()),
            GestureState::Resizing(session) => canvas.restore(session.originals()),
            _ => {}
        }
        log::debug!("{} cancelled", state.name());
    }

    fn pointer_down(&mut self, canvas: &mut Canvas, event: PointerEvent) {
        if event.is_touch() {
            self.touches.insert(event.id, event.position);
            if self.touches.len() == 2 {
                self.begin_pinch(canvas);
                return;
            }
            if self.touches.len() > 2 {
                return;
            }
        }
        if self.is_capturing() {
            log::debug!("Ignoring press while {}", self.state.name());
            return;
        }

        match event.button {
            MouseButton::Middle => {
                log::debug!("Pan started");
                self.state = GestureState::Panning {
                    pointer: event.id,
                    last: event.position,
                };
                return;
            }
            MouseButton::Secondary => {
                let target = canvas.hit_object(event.position);
                canvas.request_context_menu(target, event.position);
                return;
            }
            MouseButton::Primary => {}
        }

        let threshold = canvas.config().tap_threshold(event.kind);
        let hit = canvas
            .hit_handle(event.position)
            .map(|(id, handle)| (id, Some(handle)))
            .or_else(|| canvas.hit_object(event.position).map(|id| (id, None)));

        if let Some((id, handle)) = hit {
            match PressKind::classify(canvas.selection().contains(id), handle) {
                PressKind::Resize(handle) => {
                    if let Some(session) = ResizeSession::new(
                        event.id,
                        id,
                        handle,
                        event.position,
                        canvas.gesture_members(id),
                        threshold,
                    ) {
                        if session.is_group() {
                            log::debug!("Group resize armed on {}", id);
                        }
                        self.state = GestureState::Resizing(session);
                    }
                }
                PressKind::Drag => {
                    if let Some(session) = DragSession::new(
                        event.id,
                        id,
                        event.position,
                        canvas.gesture_members(id),
                        threshold,
                        event.modifiers,
                    ) {
                        if session.is_group() {
                            log::debug!("Group drag armed on {}", id);
                        }
                        self.state = GestureState::Dragging(session);
                    }
                }
                PressKind::TapCheck => {
                    let tap = TapCheck::new(id, event.position, threshold);
                    self.begin_press(canvas, &event, Some(tap));
                }
            }
            return;
        }

        if event.modifiers.command() {
            log::debug!("Box selection started");
            self.state = GestureState::BoxSelecting {
                pointer: event.id,
                origin: event.position,
                current: event.position,
                additive: event.modifiers.shift,
            };
            return;
        }
        self.begin_press(canvas, &event, None);
    }

    fn begin_press(&mut self, canvas: &mut Canvas, event: &PointerEvent, tap: Option<TapCheck>) {
        self.state = GestureState::LongPressPending(PendingPress {
            pointer: event.id,
            kind: event.kind,
            origin: event.position,
            current: event.position,
            started: event.timestamp,
            modifiers: event.modifiers,
            tap,
        });
        canvas.request_frame();
    }

    fn begin_pinch(&mut self, canvas: &mut Canvas) {
        self.abort_session(canvas);
        let mut touches = self.touches.iter();
        let (Some((&first, &a)), Some((&second, &b))) = (touches.next(), touches.next()) else {
            return;
        };
        log::debug!("Pinch started");
        self.state = GestureState::Pinching(Pinch {
            first,
            second,
            last_distance: a.distance(b),
            last_mid: a.midpoint(b),
        });
    }

    /// Fire the pending long press if `now` is past its deadline.
    fn check_long_press(&mut self, canvas: &mut Canvas, now: Instant) -> bool {
        let GestureState::LongPressPending(press) = &self.state else {
            return false;
        };
        if now.saturating_duration_since(press.started) < canvas.config().long_press() {
            return false;
        }
        let target = press.tap.as_ref().map(|tap| tap.id);
        let pointer = press.pointer;
        let screen = press.current;
        log::debug!("Long press at ({}, {})", screen.x, screen.y);
        canvas.request_context_menu(target, screen);
        self.state = GestureState::MenuOpen { pointer };
        true
    }

    fn pointer_move(&mut self, canvas: &mut Canvas, event: PointerEvent) {
        if event.is_touch() {
            if let Some(position) = self.touches.get_mut(&event.id) {
                *position = event.position;
            }
        }
        if self.state.pointer() == Some(event.id) && self.check_long_press(canvas, event.timestamp) {
            return;
        }

        let mut next = None;
        match &mut self.state {
            GestureState::Idle | GestureState::MenuOpen { .. } => {}
            GestureState::LongPressPending(press) => {
                if press.pointer != event.id {
                    return;
                }
                press.current = event.position;
                if let Some(tap) = &mut press.tap {
                    tap.update(event.position);
                }
                let threshold = canvas.config().tap_threshold(press.kind);
                if press.origin.distance(event.position) > threshold {
                    log::debug!("Pan started");
                    canvas.pan_by(event.position - press.origin);
                    next = Some(GestureState::Panning {
                        pointer: press.pointer,
                        last: event.position,
                    });
                }
            }
            GestureState::Panning { pointer, last } => {
                if *pointer == event.id {
                    canvas.pan_by(event.position - *last);
                    *last = event.position;
                }
            }
            GestureState::BoxSelecting {
                pointer, current, ..
            } => {
                if *pointer == event.id {
                    *current = event.position;
                    canvas.request_frame();
                }
            }
            GestureState::Pinching(pinch) => {
                let a = self.touches.get(&pinch.first).copied();
                let b = self.touches.get(&pinch.second).copied();
                if let (Some(a), Some(b)) = (a, b) {
                    let distance = a.distance(b);
                    let mid = a.midpoint(b);
                    canvas.pan_by(mid - pinch.last_mid);
                    if pinch.last_distance > 0.0 && distance > 0.0 {
                        canvas.zoom_at(mid, distance / pinch.last_distance);
                    }
                    pinch.last_distance = distance;
                    pinch.last_mid = mid;
                }
            }
            GestureState::Dragging(session) => {
                if session.pointer == event.id {
                    let grid = canvas.config().snap_grid();
                    if let Some(delta) = session.update(event.position, canvas.scale(), grid) {
                        let ids: Vec<_> = session.ids().collect();
                        canvas.translate_live(&ids, delta);
                    }
                }
            }
            GestureState::Resizing(session) => {
                if session.pointer == event.id {
                    let params = canvas.resize_params(event.modifiers);
                    if let Some(rects) = session.update(event.position, canvas.scale(), params) {
                        canvas.set_live_rects(&rects);
                    }
                }
            }
        }
        if let Some(state) = next {
            self.state = state;
        }
    }

    fn pointer_up(&mut self, canvas: &mut Canvas, event: PointerEvent) {
        if event.is_touch() {
            self.touches.remove(&event.id);
            if matches!(self.state, GestureState::Pinching(_)) {
                self.end_pinch_touch(canvas);
                return;
            }
        }
        if self.state.pointer() != Some(event.id) {
            return;
        }
        self.check_long_press(canvas, event.timestamp);

        match std::mem::replace(&mut self.state, GestureState::Idle) {
            GestureState::LongPressPending(press) => match press.tap {
                Some(tap) if tap.is_tap() => canvas.tap_unselected(tap.id, press.modifiers),
                Some(_) => {}
                None => {
                    if !press.modifiers.toggles_selection() {
                        canvas.clear_selection();
                    }
                }
            },
            GestureState::Panning { .. } => log::debug!("Pan ended"),
            GestureState::BoxSelecting {
                origin, additive, ..
            } => {
                canvas.select_in_screen_rect(Rect::from_points(origin, event.position), additive);
            }
            GestureState::Dragging(session) => {
                if session.is_active() {
                    canvas.commit(session.originals());
                } else {
                    canvas.tap_selected(session.driver, session.modifiers);
                }
            }
            GestureState::Resizing(session) => {
                if session.is_active() {
                    canvas.commit(session.originals());
                }
            }
            GestureState::Idle | GestureState::Pinching(_) | GestureState::MenuOpen { .. } => {}
        }
    }

    /// A finger lifted during a pinch.
    fn end_pinch_touch(&mut self, canvas: &mut Canvas) {
        match self.touches.len() {
            0 => {
                log::debug!("Pinch ended");
                self.state = GestureState::Idle;
            }
            1 => {
                if let Some((&pointer, &last)) = self.touches.iter().next() {
                    log::debug!("Pinch ended, panning with remaining touch");
                    self.state = GestureState::Panning { pointer, last };
                }
            }
            _ => self.begin_pinch(canvas),
        }
    }

    fn wheel(&mut self, canvas: &mut Canvas, event: WheelEvent) {
        if event.modifiers.shift {
            canvas.pan_by(-event.delta);
            return;
        }
        let factor = (-event.delta.y * canvas.config().wheel_zoom_sensitivity).exp();
        canvas.zoom_at(event.position, factor);
    }

    fn drop_files(&mut self, canvas: &mut Canvas, files: Vec<PathBuf>, position: Point) {
        let world = canvas.screen_to_world(position);
        match &mut self.ingest {
            Some(ingest) => ingest.ingest_files(files, world),
            None => log::warn!("Dropped {} files with no ingestion attached", files.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::CanvasEvent;
    use crate::input::Duration;
    use crate::object::CanvasObject;
    use kurbo::Vec2;
    use std::sync::{Arc, Mutex};

    fn setup(objects: Vec<CanvasObject>) -> (Canvas, GestureDispatcher) {
        let mut canvas = Canvas::default();
        canvas.load_objects(objects).unwrap();
        canvas.take_events();
        (canvas, GestureDispatcher::new())
    }

    fn down(d: &mut GestureDispatcher, c: &mut Canvas, event: PointerEvent) {
        d.handle(c, InputEvent::PointerDown(event));
    }

    fn moved(d: &mut GestureDispatcher, c: &mut Canvas, event: PointerEvent) {
        d.handle(c, InputEvent::PointerMove(event));
    }

    fn up(d: &mut GestureDispatcher, c: &mut Canvas, event: PointerEvent) {
        d.handle(c, InputEvent::PointerUp(event));
    }

    #[test]
    fn test_mouse_drag_on_background_pans() {
        let (mut canvas, mut dispatcher) = setup(vec![]);
        let t = Instant::now();
        down(&mut dispatcher, &mut canvas, PointerEvent::mouse(Point::new(100.0, 100.0), t));
        assert!(matches!(dispatcher.state(), GestureState::LongPressPending(_)));

        moved(&mut dispatcher, &mut canvas, PointerEvent::mouse(Point::new(102.0, 100.0), t));
        assert!(matches!(dispatcher.state(), GestureState::LongPressPending(_)));

        moved(&mut dispatcher, &mut canvas, PointerEvent::mouse(Point::new(130.0, 90.0), t));
        assert!(matches!(dispatcher.state(), GestureState::Panning { .. }));
        let vp = canvas.get_viewport();
        assert!((vp.x - 30.0).abs() < f64::EPSILON);
        assert!((vp.y + 10.0).abs() < f64::EPSILON);

        up(&mut dispatcher, &mut canvas, PointerEvent::mouse(Point::new(130.0, 90.0), t));
        assert!(!dispatcher.is_capturing());
    }

    #[test]
    fn test_touch_threshold_is_larger() {
        let (mut canvas, mut dispatcher) = setup(vec![]);
        let t = Instant::now();
        down(&mut dispatcher, &mut canvas, PointerEvent::touch(1, Point::new(100.0, 100.0), t));
        moved(&mut dispatcher, &mut canvas, PointerEvent::touch(1, Point::new(108.0, 100.0), t));
        assert!(matches!(dispatcher.state(), GestureState::LongPressPending(_)));
        moved(&mut dispatcher, &mut canvas, PointerEvent::touch(1, Point::new(111.0, 100.0), t));
        assert!(matches!(dispatcher.state(), GestureState::Panning { .. }));
    }

    #[test]
    fn test_long_press_opens_menu_and_ignores_moves() {
        let obj = CanvasObject::new(0.0, 0.0, 100.0, 100.0);
        let (mut canvas, mut dispatcher) = setup(vec![obj.clone()]);
        let t = Instant::now();
        down(&mut dispatcher, &mut canvas, PointerEvent::touch(1, Point::new(50.0, 50.0), t));

        dispatcher.tick(&mut canvas, t + Duration::from_millis(499));
        assert!(matches!(dispatcher.state(), GestureState::LongPressPending(_)));

        dispatcher.tick(&mut canvas, t + Duration::from_millis(500));
        assert!(matches!(dispatcher.state(), GestureState::MenuOpen { .. }));
        assert_eq!(
            canvas.take_events(),
            vec![CanvasEvent::ContextMenuRequested {
                target: Some(obj.id),
                screen: Point::new(50.0, 50.0),
            }]
        );

        let later = t + Duration::from_millis(600);
        moved(&mut dispatcher, &mut canvas, PointerEvent::touch(1, Point::new(200.0, 50.0), later));
        assert_eq!(canvas.get_viewport().x, 0.0);
        up(&mut dispatcher, &mut canvas, PointerEvent::touch(1, Point::new(200.0, 50.0), later));
        assert!(canvas.selection().is_empty());
        assert!(!dispatcher.is_capturing());
    }

    #[test]
    fn test_late_move_fires_long_press_first() {
        let (mut canvas, mut dispatcher) = setup(vec![]);
        let t = Instant::now();
        down(&mut dispatcher, &mut canvas, PointerEvent::mouse(Point::new(10.0, 10.0), t));
        moved(
            &mut dispatcher,
            &mut canvas,
            PointerEvent::mouse(Point::new(80.0, 10.0), t + Duration::from_millis(700)),
        );
        assert!(matches!(dispatcher.state(), GestureState::MenuOpen { .. }));
        assert_eq!(canvas.get_viewport().x, 0.0);
        let events = canvas.take_events();
        assert!(matches!(
            events.as_slice(),
            [CanvasEvent::ContextMenuRequested { target: None, .. }]
        ));
    }

    #[test]
    fn test_frames_keep_long_press_armed() {
        let (mut canvas, mut dispatcher) = setup(vec![]);
        let t = Instant::now();
        down(&mut dispatcher, &mut canvas, PointerEvent::mouse(Point::new(10.0, 10.0), t));
        let frame = canvas.pending_frame().unwrap();
        dispatcher.frame(&mut canvas, frame, t + Duration::from_millis(16)).unwrap();
        let frame = canvas.pending_frame().unwrap();
        dispatcher.frame(&mut canvas, frame, t + Duration::from_millis(520)).unwrap();
        assert!(matches!(dispatcher.state(), GestureState::MenuOpen { .. }));
    }

    #[test]
    fn test_tick_keeps_pending_frame() {
        let (mut canvas, mut dispatcher) = setup(vec![]);
        let t = Instant::now();
        down(&mut dispatcher, &mut canvas, PointerEvent::mouse(Point::new(10.0, 10.0), t));
        let frame = canvas.pending_frame().unwrap();
        dispatcher.tick(&mut canvas, t + Duration::from_millis(100));
        dispatcher.tick(&mut canvas, t + Duration::from_millis(200));
        assert_eq!(canvas.pending_frame(), Some(frame));
        assert!(matches!(dispatcher.state(), GestureState::LongPressPending(_)));
    }

    #[test]
    fn test_secondary_button_menu() {
        let obj = CanvasObject::new(0.0, 0.0, 100.0, 100.0);
        let (mut canvas, mut dispatcher) = setup(vec![obj.clone()]);
        let t = Instant::now();
        down(
            &mut dispatcher,
            &mut canvas,
            PointerEvent::mouse(Point::new(20.0, 20.0), t).with_button(MouseButton::Secondary),
        );
        assert!(!dispatcher.is_capturing());
        assert_eq!(
            canvas.take_events(),
            vec![CanvasEvent::ContextMenuRequested {
                target: Some(obj.id),
                screen: Point::new(20.0, 20.0),
            }]
        );
    }

    #[test]
    fn test_middle_button_pans_over_objects() {
        let obj = CanvasObject::new(0.0, 0.0, 100.0, 100.0);
        let (mut canvas, mut dispatcher) = setup(vec![obj.clone()]);
        let t = Instant::now();
        let middle = |p: Point| PointerEvent::mouse(p, t).with_button(MouseButton::Middle);
        down(&mut dispatcher, &mut canvas, middle(Point::new(50.0, 50.0)));
        moved(&mut dispatcher, &mut canvas, middle(Point::new(60.0, 50.0)));
        up(&mut dispatcher, &mut canvas, middle(Point::new(60.0, 50.0)));
        assert!((canvas.get_viewport().x - 10.0).abs() < f64::EPSILON);
        assert!((canvas.document().get(obj.id).unwrap().x).abs() < f64::EPSILON);
    }

    #[test]
    fn test_box_selection() {
        let a = CanvasObject::new(0.0, 0.0, 100.0, 100.0);
        let b = CanvasObject::new(300.0, 0.0, 100.0, 100.0);
        let c = CanvasObject::new(600.0, 0.0, 100.0, 100.0);
        let (mut canvas, mut dispatcher) = setup(vec![a.clone(), b.clone(), c.clone()]);
        canvas.set_viewport(crate::viewport::Viewport::new(0.0, 200.0, 0.5));
        let t = Instant::now();
        let ctrl = |p: Point| PointerEvent::mouse(p, t).with_modifiers(Modifiers::ctrl());

        // World (-40, -40) .. (340, 40) in screen space.
        down(&mut dispatcher, &mut canvas, ctrl(Point::new(-20.0, 180.0)));
        assert!(matches!(dispatcher.state(), GestureState::BoxSelecting { .. }));
        moved(&mut dispatcher, &mut canvas, ctrl(Point::new(170.0, 220.0)));
        assert!(dispatcher.state().selection_box().is_some());
        up(&mut dispatcher, &mut canvas, ctrl(Point::new(170.0, 220.0)));

        assert_eq!(canvas.selection().ids().len(), 2);
        assert!(canvas.selection().contains(a.id));
        assert!(canvas.selection().contains(b.id));
        assert!(!canvas.selection().contains(c.id));
    }

    #[test]
    fn test_tap_on_background_clears_selection() {
        let a = CanvasObject::new(0.0, 0.0, 100.0, 100.0);
        let (mut canvas, mut dispatcher) = setup(vec![a.clone()]);
        canvas.select(a.id).unwrap();
        let t = Instant::now();
        down(&mut dispatcher, &mut canvas, PointerEvent::mouse(Point::new(500.0, 500.0), t));
        up(&mut dispatcher, &mut canvas, PointerEvent::mouse(Point::new(500.0, 500.0), t));
        assert!(canvas.selection().is_empty());
    }

    #[test]
    fn test_tap_toggle_and_deselect() {
        let a = CanvasObject::new(0.0, 0.0, 100.0, 100.0);
        let b = CanvasObject::new(200.0, 0.0, 100.0, 100.0);
        let (mut canvas, mut dispatcher) = setup(vec![a.clone(), b.clone()]);
        let t = Instant::now();
        let shift = |p: Point| PointerEvent::mouse(p, t).with_modifiers(Modifiers::shift());

        down(&mut dispatcher, &mut canvas, PointerEvent::mouse(Point::new(50.0, 50.0), t));
        up(&mut dispatcher, &mut canvas, PointerEvent::mouse(Point::new(50.0, 50.0), t));
        assert!(canvas.selection().is_sole(a.id));

        down(&mut dispatcher, &mut canvas, shift(Point::new(250.0, 50.0)));
        up(&mut dispatcher, &mut canvas, shift(Point::new(250.0, 50.0)));
        assert_eq!(canvas.selection().len(), 2);

        // Plain tap on a selected member narrows the selection.
        down(&mut dispatcher, &mut canvas, PointerEvent::mouse(Point::new(250.0, 50.0), t));
        assert!(matches!(dispatcher.state(), GestureState::Dragging(_)));
        up(&mut dispatcher, &mut canvas, PointerEvent::mouse(Point::new(251.0, 50.0), t));
        assert!(canvas.selection().is_sole(b.id));

        down(&mut dispatcher, &mut canvas, shift(Point::new(250.0, 50.0)));
        up(&mut dispatcher, &mut canvas, shift(Point::new(250.0, 50.0)));
        assert!(canvas.selection().is_empty());
        assert!(canvas.take_commands().is_empty());
    }

    #[test]
    fn test_drag_selected_and_commit() {
        let a = CanvasObject::new(0.0, 0.0, 100.0, 100.0);
        let (mut canvas, mut dispatcher) = setup(vec![a.clone()]);
        canvas.select(a.id).unwrap();
        let t = Instant::now();
        down(&mut dispatcher, &mut canvas, PointerEvent::mouse(Point::new(50.0, 50.0), t));
        moved(&mut dispatcher, &mut canvas, PointerEvent::mouse(Point::new(150.0, 250.0), t));
        assert_eq!(dispatcher.active_objects().len(), 1);
        assert!((canvas.document().get(a.id).unwrap().x - 100.0).abs() < f64::EPSILON);
        assert!(canvas.take_commands().is_empty());

        up(&mut dispatcher, &mut canvas, PointerEvent::mouse(Point::new(150.0, 250.0), t));
        assert_eq!(canvas.take_commands().len(), 1);
        assert!(dispatcher.active_objects().is_empty());
    }

    #[test]
    fn test_cancel_restores_drag() {
        let a = CanvasObject::new(0.0, 0.0, 100.0, 100.0);
        let (mut canvas, mut dispatcher) = setup(vec![a.clone()]);
        canvas.select(a.id).unwrap();
        let t = Instant::now();
        down(&mut dispatcher, &mut canvas, PointerEvent::mouse(Point::new(50.0, 50.0), t));
        moved(&mut dispatcher, &mut canvas, PointerEvent::mouse(Point::new(150.0, 50.0), t));
        dispatcher.handle(&mut canvas, InputEvent::Cancel);

        assert_eq!(canvas.document().rect(a.id), Some(a.rect()));
        assert!(!dispatcher.is_capturing());
        assert!(canvas.take_commands().is_empty());
    }

    #[test]
    fn test_resize_via_handle() {
        let a = CanvasObject::new(0.0, 0.0, 200.0, 100.0);
        let (mut canvas, mut dispatcher) = setup(vec![a.clone()]);
        canvas.select(a.id).unwrap();
        let t = Instant::now();
        down(&mut dispatcher, &mut canvas, PointerEvent::mouse(Point::new(200.0, 100.0), t));
        assert!(matches!(dispatcher.state(), GestureState::Resizing(_)));
        moved(&mut dispatcher, &mut canvas, PointerEvent::mouse(Point::new(400.0, 110.0), t));
        up(&mut dispatcher, &mut canvas, PointerEvent::mouse(Point::new(400.0, 110.0), t));
        let rect = canvas.document().rect(a.id).unwrap();
        assert!((rect.width() - 400.0).abs() < 1e-9);
        assert!((rect.height() - 200.0).abs() < 1e-9);
        assert_eq!(canvas.take_commands().len(), 1);
    }

    #[test]
    fn test_resize_free_aspect_with_shift() {
        let a = CanvasObject::new(0.0, 0.0, 200.0, 100.0);
        let (mut canvas, mut dispatcher) = setup(vec![a.clone()]);
        canvas.select(a.id).unwrap();
        let t = Instant::now();
        let shift = |p: Point| PointerEvent::mouse(p, t).with_modifiers(Modifiers::shift());
        down(&mut dispatcher, &mut canvas, shift(Point::new(200.0, 100.0)));
        moved(&mut dispatcher, &mut canvas, shift(Point::new(400.0, 110.0)));
        up(&mut dispatcher, &mut canvas, shift(Point::new(400.0, 110.0)));
        let rect = canvas.document().rect(a.id).unwrap();
        assert!((rect.width() - 400.0).abs() < 1e-9);
        assert!((rect.height() - 110.0).abs() < 1e-9);
    }

    #[test]
    fn test_pinch_zooms_about_midpoint() {
        let (mut canvas, mut dispatcher) = setup(vec![]);
        let t = Instant::now();
        down(&mut dispatcher, &mut canvas, PointerEvent::touch(1, Point::new(300.0, 300.0), t));
        down(&mut dispatcher, &mut canvas, PointerEvent::touch(2, Point::new(500.0, 300.0), t));
        assert!(matches!(dispatcher.state(), GestureState::Pinching(_)));

        let pivot_world = canvas.screen_to_world(Point::new(400.0, 300.0));
        moved(&mut dispatcher, &mut canvas, PointerEvent::touch(1, Point::new(200.0, 300.0), t));
        moved(&mut dispatcher, &mut canvas, PointerEvent::touch(2, Point::new(600.0, 300.0), t));
        assert!((canvas.scale() - 2.0).abs() < 1e-9);
        let after = canvas.screen_to_world(Point::new(400.0, 300.0));
        assert!((after.x - pivot_world.x).abs() < 1e-9);
        assert!((after.y - pivot_world.y).abs() < 1e-9);
    }

    #[test]
    fn test_second_touch_cancels_long_press() {
        let (mut canvas, mut dispatcher) = setup(vec![]);
        let t = Instant::now();
        down(&mut dispatcher, &mut canvas, PointerEvent::touch(1, Point::new(300.0, 300.0), t));
        down(&mut dispatcher, &mut canvas, PointerEvent::touch(2, Point::new(400.0, 300.0), t));
        dispatcher.tick(&mut canvas, t + Duration::from_secs(2));
        assert!(matches!(dispatcher.state(), GestureState::Pinching(_)));
        assert!(canvas.take_events().is_empty());
    }

    #[test]
    fn test_pinch_to_single_touch_pans() {
        let (mut canvas, mut dispatcher) = setup(vec![]);
        let t = Instant::now();
        down(&mut dispatcher, &mut canvas, PointerEvent::touch(1, Point::new(300.0, 300.0), t));
        down(&mut dispatcher, &mut canvas, PointerEvent::touch(2, Point::new(400.0, 300.0), t));
        up(&mut dispatcher, &mut canvas, PointerEvent::touch(1, Point::new(300.0, 300.0), t));
        assert!(matches!(
            dispatcher.state(),
            GestureState::Panning { pointer: 2, .. }
        ));

        let before = canvas.get_viewport();
        moved(&mut dispatcher, &mut canvas, PointerEvent::touch(2, Point::new(420.0, 310.0), t));
        let after = canvas.get_viewport();
        assert!((after.x - before.x - 20.0).abs() < 1e-9);
        assert!((after.y - before.y - 10.0).abs() < 1e-9);

        up(&mut dispatcher, &mut canvas, PointerEvent::touch(2, Point::new(420.0, 310.0), t));
        assert!(!dispatcher.is_capturing());
    }

    #[test]
    fn test_second_touch_restores_drag() {
        let a = CanvasObject::new(0.0, 0.0, 100.0, 100.0);
        let (mut canvas, mut dispatcher) = setup(vec![a.clone()]);
        canvas.select(a.id).unwrap();
        let t = Instant::now();
        down(&mut dispatcher, &mut canvas, PointerEvent::touch(1, Point::new(50.0, 50.0), t));
        moved(&mut dispatcher, &mut canvas, PointerEvent::touch(1, Point::new(150.0, 50.0), t));
        down(&mut dispatcher, &mut canvas, PointerEvent::touch(2, Point::new(300.0, 300.0), t));
        assert!(matches!(dispatcher.state(), GestureState::Pinching(_)));
        assert_eq!(canvas.document().rect(a.id), Some(a.rect()));
    }

    #[test]
    fn test_shift_wheel_pans() {
        let (mut canvas, mut dispatcher) = setup(vec![]);
        let wheel = WheelEvent::new(Point::ZERO, Vec2::new(0.0, 30.0), Instant::now())
            .with_modifiers(Modifiers::shift());
        dispatcher.handle(&mut canvas, InputEvent::Wheel(wheel));
        assert!((canvas.get_viewport().y + 30.0).abs() < f64::EPSILON);
        assert!((canvas.scale() - 1.0).abs() < f64::EPSILON);
    }

    struct Recorder(Arc<Mutex<Vec<(usize, Point)>>>);

    impl FileIngest for Recorder {
        fn ingest_files(&mut self, files: Vec<PathBuf>, world: Point) {
            self.0.lock().unwrap().push((files.len(), world));
        }
    }

    #[test]
    fn test_drop_converts_to_world() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut canvas = Canvas::default();
        canvas.set_viewport(crate::viewport::Viewport::new(100.0, 0.0, 2.0));
        let mut dispatcher = GestureDispatcher::new().with_ingest(Box::new(Recorder(log.clone())));
        dispatcher.handle(
            &mut canvas,
            InputEvent::FilesDropped {
                files: vec![PathBuf::from("a.png"), PathBuf::from("b.png")],
                position: Point::new(300.0, 100.0),
            },
        );
        assert_eq!(log.lock().unwrap().as_slice(), &[(2, Point::new(100.0, 50.0))]);
    }
}
