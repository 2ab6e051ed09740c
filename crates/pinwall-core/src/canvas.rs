//! Local object cache and runtime canvas state.

use crate::config::CanvasConfig;
use crate::error::{CanvasError, CanvasResult};
use crate::frame::{FrameId, FrameScheduler};
use crate::geometry::{
    AlignKind, Projection, alignment_projections, group_bounds, is_group_colliding,
    rect_intersects_with,
};
use crate::group::broadcast_delta;
use crate::handles::{ResizeHandle, ResizeParams, hit_test_handles};
use crate::input::{Instant, Modifiers};
use crate::interaction::{CommitParams, Resolved, resolve_commit};
use crate::object::{CanvasObject, ObjectId, ObjectPatch};
use crate::selection::Selection;
use crate::store::StoreCommand;
use crate::viewport::{AnimationId, ViewLayer, Viewport, ViewportController};
use kurbo::{Point, Rect, Size, Vec2};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Padding in screen pixels kept around content by [`Canvas::zoom_to_fit`].
pub const FIT_PADDING: f64 = 50.0;

/// Local cache of canvas objects, ordered back to front by z-index.
#[derive(Debug, Clone, Default)]
pub struct CanvasDocument {
    objects: HashMap<ObjectId, CanvasObject>,
    /// Back to front. Ties keep insertion order.
    z_order: Vec<ObjectId>,
}

impl CanvasDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document, rejecting objects with unusable geometry.
    pub fn from_objects(objects: impl IntoIterator<Item = CanvasObject>) -> CanvasResult<Self> {
        let mut document = Self::new();
        for object in objects {
            document.insert(object)?;
        }
        Ok(document)
    }

    /// Add or replace an object.
    pub fn insert(&mut self, object: CanvasObject) -> CanvasResult<()> {
        object.validate()?;
        let id = object.id;
        if self.objects.insert(id, object).is_none() {
            self.z_order.push(id);
        }
        self.sort_z_order();
        Ok(())
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<CanvasObject> {
        self.z_order.retain(|&z| z != id);
        self.objects.remove(&id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&CanvasObject> {
        self.objects.get(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn rect(&self, id: ObjectId) -> Option<Rect> {
        self.objects.get(&id).map(CanvasObject::rect)
    }

    /// Overwrite an object's geometry.
    pub fn set_rect(&mut self, id: ObjectId, rect: Rect) -> CanvasResult<()> {
        let object = self
            .objects
            .get_mut(&id)
            .ok_or(CanvasError::UnknownObject(id))?;
        object.set_rect(rect);
        Ok(())
    }

    /// Objects back to front.
    pub fn objects_ordered(&self) -> impl Iterator<Item = &CanvasObject> {
        self.z_order.iter().filter_map(|id| self.objects.get(id))
    }

    /// Topmost object containing `point` (world coordinates).
    pub fn object_at_point(&self, point: Point) -> Option<ObjectId> {
        self.z_order
            .iter()
            .rev()
            .find(|id| self.objects.get(*id).is_some_and(|o| o.rect().contains(point)))
            .copied()
    }

    /// Objects overlapping `rect`, back to front.
    pub fn objects_in_rect(&self, rect: Rect, epsilon: f64) -> Vec<ObjectId> {
        self.objects_ordered()
            .filter(|o| rect_intersects_with(o.rect(), rect, epsilon))
            .map(|o| o.id)
            .collect()
    }

    /// Bounding box of all objects.
    pub fn bounds(&self) -> Option<Rect> {
        group_bounds(self.objects.values().map(CanvasObject::rect))
    }

    /// Rectangles of every object not in `exclude`.
    pub fn rects_excluding(&self, exclude: &HashSet<ObjectId>) -> Vec<Rect> {
        self.objects_ordered()
            .filter(|o| !exclude.contains(&o.id))
            .map(CanvasObject::rect)
            .collect()
    }

    pub fn projections(&self) -> Vec<Projection> {
        self.objects_ordered()
            .map(|o| Projection::new(o.id, o.rect()))
            .collect()
    }

    /// Replace the contents with a collaborator snapshot. Objects listed in
    /// `keep` retain their local state. Nothing changes if any incoming object
    /// is invalid.
    pub fn replace_all(&mut self, objects: Vec<CanvasObject>, keep: &HashSet<ObjectId>) -> CanvasResult<()> {
        for object in &objects {
            object.validate()?;
        }
        let mut next: HashMap<ObjectId, CanvasObject> = HashMap::with_capacity(objects.len());
        let mut order = Vec::with_capacity(objects.len());
        for object in objects {
            let id = object.id;
            let object = match self.objects.get(&id) {
                Some(local) if keep.contains(&id) => local.clone(),
                _ => object,
            };
            if next.insert(id, object).is_none() {
                order.push(id);
            }
        }
        for id in keep {
            if !next.contains_key(id) {
                if let Some(local) = self.objects.get(id) {
                    next.insert(*id, local.clone());
                    order.push(*id);
                }
            }
        }
        self.objects = next;
        self.z_order = order;
        self.sort_z_order();
        Ok(())
    }

    fn sort_z_order(&mut self) {
        let objects = &self.objects;
        self.z_order
            .sort_by_key(|id| objects.get(id).map(|o| o.z_index).unwrap_or_default());
    }
}

/// Notification for the host UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanvasEvent {
    SelectionChanged { selected: Vec<ObjectId> },
    ObjectUpdated { id: ObjectId, rect: Rect },
    /// `target` is `None` for the background.
    ContextMenuRequested { target: Option<ObjectId>, screen: Point },
}

/// Result of previewing an alignment action.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentPreview {
    pub kind: AlignKind,
    pub projections: Vec<Projection>,
    /// When true the action should be disabled.
    pub colliding: bool,
}

/// Runtime canvas state: local cache, viewport, selection and outbound queues.
#[derive(Debug)]
pub struct Canvas {
    document: CanvasDocument,
    viewport: ViewportController,
    selection: Selection,
    config: CanvasConfig,
    /// Size of the host surface in screen pixels.
    pub viewport_size: Size,
    frames: FrameScheduler,
    commands: Vec<StoreCommand>,
    events: Vec<CanvasEvent>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::with_config(CanvasConfig::default())
    }
}

impl Canvas {
    /// Create a canvas after validating `config`.
    pub fn new(config: CanvasConfig) -> CanvasResult<Self> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    fn with_config(config: CanvasConfig) -> Self {
        Self {
            document: CanvasDocument::new(),
            viewport: ViewportController::new(&config),
            selection: Selection::new(),
            config,
            viewport_size: Size::new(800.0, 600.0),
            frames: FrameScheduler::new(),
            commands: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn document(&self) -> &CanvasDocument {
        &self.document
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.viewport_size = Size::new(width, height);
        self.request_frame();
    }

    // --- Viewport ---------------------------------------------------------

    pub fn get_viewport(&self) -> Viewport {
        self.viewport.viewport()
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport.set_viewport(viewport);
        self.request_frame();
    }

    pub fn scale(&self) -> f64 {
        self.viewport.scale()
    }

    pub fn screen_to_world(&self, screen: Point) -> Point {
        self.viewport.screen_to_world(screen)
    }

    pub fn world_to_screen(&self, world: Point) -> Point {
        self.viewport.world_to_screen(world)
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.viewport.pan_by(delta);
        self.request_frame();
    }

    pub fn zoom_at(&mut self, screen: Point, factor: f64) -> f64 {
        let scale = self.viewport.zoom_at(screen, factor);
        self.request_frame();
        scale
    }

    pub fn fly_to(&mut self, x: f64, y: f64, scale: f64, now: Instant) -> AnimationId {
        let id = self.viewport.fly_to(Viewport::new(x, y, scale), now);
        self.request_frame();
        id
    }

    pub fn is_animating(&self) -> bool {
        self.viewport.is_animating()
    }

    /// Animate to show every object. Does nothing on an empty canvas.
    pub fn zoom_to_fit(&mut self, now: Instant) -> Option<AnimationId> {
        let bounds = self.document.bounds()?;
        let target = Viewport::fit_to_bounds(
            bounds,
            self.viewport_size,
            FIT_PADDING,
            self.config.min_scale,
            self.config.max_scale,
        );
        Some(self.fly_to(target.x, target.y, target.scale, now))
    }

    // --- Frames -----------------------------------------------------------

    /// Ask the host for an animation frame, replacing any pending one.
    pub fn request_frame(&mut self) -> FrameId {
        self.frames.request()
    }

    /// Ask for a frame only if none is pending.
    pub fn ensure_frame(&mut self) -> FrameId {
        self.frames.ensure()
    }

    pub fn pending_frame(&self) -> Option<FrameId> {
        self.frames.pending()
    }

    /// Run a frame: advance animations and return the layer to display.
    /// Stale frame ids return `None`.
    pub fn run_frame(&mut self, id: FrameId, now: Instant) -> Option<ViewLayer> {
        if !self.frames.begin(id) {
            log::debug!("Skipping stale frame {:?}", id);
            return None;
        }
        if self.viewport.tick(now) {
            self.frames.request();
        }
        Some(self.viewport.layer())
    }

    /// Current visual layer without consuming a frame.
    pub fn layer(&self) -> ViewLayer {
        self.viewport.layer()
    }

    // --- Objects ----------------------------------------------------------

    /// Load the initial object set.
    pub fn load_objects(&mut self, objects: Vec<CanvasObject>) -> CanvasResult<()> {
        self.apply_remote_objects(objects, &HashSet::new())
    }

    /// Apply a collaborator snapshot. Objects in `active` are mid-gesture and
    /// keep their local geometry.
    pub fn apply_remote_objects(&mut self, objects: Vec<CanvasObject>, active: &HashSet<ObjectId>) -> CanvasResult<()> {
        self.document.replace_all(objects, active)?;
        let document = &self.document;
        if self.selection.retain(|id| document.contains(id)) {
            self.emit_selection();
        }
        self.request_frame();
        Ok(())
    }

    /// Topmost object under a screen position.
    pub fn hit_object(&self, screen: Point) -> Option<ObjectId> {
        self.document.object_at_point(self.screen_to_world(screen))
    }

    /// Resize handle of a selected object under a screen position.
    pub fn hit_handle(&self, screen: Point) -> Option<(ObjectId, ResizeHandle)> {
        let world = self.screen_to_world(screen);
        let tolerance = self.config.handle_hit_radius / self.scale();
        self.document
            .objects_ordered()
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .filter(|o| self.selection.contains(o.id))
            .find_map(|o| hit_test_handles(o.rect(), world, tolerance).map(|h| (o.id, h)))
    }

    /// Members for a gesture started on `driver`: the driver first, then the
    /// rest of the selection back to front when the driver is part of a
    /// multi-selection.
    pub fn gesture_members(&self, driver: ObjectId) -> Vec<(ObjectId, Rect)> {
        let Some(driver_rect) = self.document.rect(driver) else {
            return Vec::new();
        };
        let mut members = vec![(driver, driver_rect)];
        if self.selection.len() >= 2 && self.selection.contains(driver) {
            members.extend(
                self.document
                    .objects_ordered()
                    .filter(|o| o.id != driver && self.selection.contains(o.id))
                    .map(|o| (o.id, o.rect())),
            );
        }
        members
    }

    pub fn resize_params(&self, modifiers: Modifiers) -> ResizeParams {
        ResizeParams {
            keep_aspect: !modifiers.frees_aspect(),
            min_size: self.config.min_size(),
            grid: self.config.snap_grid(),
        }
    }

    /// Write candidate geometry for immediate feedback. Not collision checked.
    pub fn set_live_rects(&mut self, rects: &[(ObjectId, Rect)]) {
        for (id, rect) in rects {
            if let Err(e) = self.document.set_rect(*id, *rect) {
                log::warn!("Live update skipped: {}", e);
            }
        }
        self.request_frame();
    }

    /// Move objects by a world delta for immediate feedback.
    pub fn translate_live(&mut self, ids: &[ObjectId], delta: Vec2) {
        let members: Vec<_> = ids
            .iter()
            .filter_map(|id| self.document.rect(*id).map(|r| (*id, r)))
            .collect();
        self.set_live_rects(&broadcast_delta(&members, delta));
    }

    /// Put objects back where a cancelled gesture found them.
    pub fn restore(&mut self, originals: &[(ObjectId, Rect)]) {
        self.set_live_rects(originals);
    }

    /// Commit the current local geometry of `originals`' objects.
    ///
    /// Collisions with non-participating objects are resolved with the
    /// free-position search, the result is written locally and one command is
    /// queued (`Update` for a single object, `Batch` for several). Objects that
    /// end where they started produce no command.
    pub fn commit(&mut self, originals: &[(ObjectId, Rect)]) -> Vec<Resolved> {
        let moving: HashSet<ObjectId> = originals.iter().map(|(id, _)| *id).collect();
        let candidates: Vec<_> = originals
            .iter()
            .filter_map(|(id, _)| self.document.rect(*id).map(|r| (*id, r)))
            .collect();
        let obstacles = self.document.rects_excluding(&moving);
        let resolved = resolve_commit(&candidates, &obstacles, self.commit_params());

        let mut updates = Vec::new();
        for item in &resolved {
            if let Err(e) = self.document.set_rect(item.id, item.rect) {
                log::warn!("Commit skipped: {}", e);
                continue;
            }
            let before = originals
                .iter()
                .find(|(id, _)| *id == item.id)
                .map(|(_, r)| *r)
                .unwrap_or(item.rect);
            let patch = ObjectPatch::diff(before, item.rect);
            if patch.is_empty() {
                continue;
            }
            log::info!(
                "Committed {} at ({}, {}) {}x{}{}",
                item.id,
                item.rect.x0,
                item.rect.y0,
                item.rect.width(),
                item.rect.height(),
                if item.relocated { " (relocated)" } else { "" }
            );
            self.events.push(CanvasEvent::ObjectUpdated {
                id: item.id,
                rect: item.rect,
            });
            updates.push((item.id, patch));
        }
        self.queue_updates(updates);
        self.request_frame();
        resolved
    }

    fn queue_updates(&mut self, mut updates: Vec<(ObjectId, ObjectPatch)>) {
        match updates.len() {
            0 => {}
            1 => {
                if let Some((id, patch)) = updates.pop() {
                    self.commands.push(StoreCommand::Update { id, patch });
                }
            }
            _ => self.commands.push(StoreCommand::Batch { updates }),
        }
    }

    fn commit_params(&self) -> CommitParams {
        CommitParams {
            grid_size: self.config.grid_size,
            max_rings: self.config.max_search_rings,
            epsilon: self.config.collision_epsilon,
        }
    }

    /// Remove the selected objects locally and queue their deletion.
    pub fn delete_selected(&mut self) -> Vec<ObjectId> {
        let ids = self.selection.ids();
        for id in &ids {
            if self.document.remove(*id).is_some() {
                self.commands.push(StoreCommand::Delete { id: *id });
            }
        }
        if self.selection.clear() {
            self.emit_selection();
        }
        self.request_frame();
        ids
    }

    // --- Selection --------------------------------------------------------

    fn emit_selection(&mut self) {
        self.events.push(CanvasEvent::SelectionChanged {
            selected: self.selection.ids(),
        });
    }

    fn ensure_known(&self, id: ObjectId) -> CanvasResult<()> {
        if self.document.contains(id) {
            Ok(())
        } else {
            log::warn!("Unknown object {}", id);
            Err(CanvasError::UnknownObject(id))
        }
    }

    /// Make `id` the only selected object.
    pub fn select(&mut self, id: ObjectId) -> CanvasResult<()> {
        self.ensure_known(id)?;
        if self.selection.select_only(id) {
            self.emit_selection();
            self.request_frame();
        }
        Ok(())
    }

    pub fn add_to_selection(&mut self, id: ObjectId) -> CanvasResult<()> {
        self.ensure_known(id)?;
        if self.selection.add(id) {
            self.emit_selection();
            self.request_frame();
        }
        Ok(())
    }

    pub fn deselect(&mut self, id: ObjectId) {
        if self.selection.remove(id) {
            self.emit_selection();
            self.request_frame();
        }
    }

    pub fn clear_selection(&mut self) {
        if self.selection.clear() {
            self.emit_selection();
            self.request_frame();
        }
    }

    /// Replace the selection. Unknown ids are rejected.
    pub fn set_selection(&mut self, ids: &[ObjectId]) -> CanvasResult<()> {
        for id in ids {
            self.ensure_known(*id)?;
        }
        if self.selection.replace(ids.iter().copied()) {
            self.emit_selection();
            self.request_frame();
        }
        Ok(())
    }

    /// Tap released on an object that was not selected.
    pub fn tap_unselected(&mut self, id: ObjectId, modifiers: Modifiers) {
        let result = if modifiers.toggles_selection() {
            self.add_to_selection(id)
        } else {
            self.select(id)
        };
        if let Err(e) = result {
            log::warn!("Tap ignored: {}", e);
        }
    }

    /// Tap released on a selected object without moving it.
    pub fn tap_selected(&mut self, id: ObjectId, modifiers: Modifiers) {
        if modifiers.toggles_selection() {
            self.deselect(id);
        } else if let Err(e) = self.select(id) {
            log::warn!("Tap ignored: {}", e);
        }
    }

    /// Select everything overlapping a screen-space box.
    pub fn select_in_screen_rect(&mut self, screen: Rect, additive: bool) -> Vec<ObjectId> {
        let world = self.viewport.viewport().screen_rect_to_world(screen);
        let hits = self
            .document
            .objects_in_rect(world, self.config.collision_epsilon);
        log::info!("Box selected {} objects", hits.len());
        let changed = if additive {
            self.selection.extend(hits.iter().copied())
        } else {
            self.selection.replace(hits.iter().copied())
        };
        if changed {
            self.emit_selection();
        }
        self.request_frame();
        hits
    }

    pub fn request_context_menu(&mut self, target: Option<ObjectId>, screen: Point) {
        self.events
            .push(CanvasEvent::ContextMenuRequested { target, screen });
    }

    // --- Alignment --------------------------------------------------------

    /// Projected layout of the selection for `kind`, with a collision flag.
    pub fn alignment_preview(&self, kind: AlignKind) -> CanvasResult<AlignmentPreview> {
        let items: Vec<Projection> = self
            .document
            .objects_ordered()
            .filter(|o| self.selection.contains(o.id))
            .map(|o| Projection::new(o.id, o.rect()))
            .collect();
        if items.len() < 2 {
            return Err(CanvasError::SelectionTooSmall {
                required: 2,
                actual: items.len(),
            });
        }
        let projections = alignment_projections(
            kind,
            &items,
            self.config.grid_size,
            self.config.compact_padding,
        );
        let colliding = is_group_colliding(
            &projections,
            &self.document.projections(),
            self.config.collision_epsilon,
        );
        Ok(AlignmentPreview {
            kind,
            projections,
            colliding,
        })
    }

    /// Apply an alignment to the selection. Colliding layouts are refused.
    pub fn apply_alignment(&mut self, kind: AlignKind) -> CanvasResult<Vec<Projection>> {
        let preview = self.alignment_preview(kind)?;
        if preview.colliding {
            log::warn!("Alignment {:?} rejected: layout would overlap", kind);
            return Err(CanvasError::AlignmentCollides(kind));
        }
        let mut updates = Vec::new();
        for projection in &preview.projections {
            let before = self.document.rect(projection.id).unwrap_or(projection.rect);
            self.document.set_rect(projection.id, projection.rect)?;
            let patch = ObjectPatch::diff(before, projection.rect);
            if !patch.is_empty() {
                self.events.push(CanvasEvent::ObjectUpdated {
                    id: projection.id,
                    rect: projection.rect,
                });
                updates.push((projection.id, patch));
            }
        }
        log::info!("Applied {:?} to {} objects", kind, updates.len());
        self.queue_updates(updates);
        self.request_frame();
        Ok(preview.projections)
    }

    // --- Outbound queues --------------------------------------------------

    /// Drain queued store commands.
    pub fn take_commands(&mut self) -> Vec<StoreCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Drain queued host notifications.
    pub fn take_events(&mut self) -> Vec<CanvasEvent> {
        std::mem::take(&mut self.events)
    }
}
