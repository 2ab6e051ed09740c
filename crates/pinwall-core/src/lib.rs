//! Pinwall Core Library
//!
//! Platform-agnostic viewport, gesture and collision-resolution engine for an
//! infinite image canvas.

pub mod canvas;
pub mod config;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod gesture;
pub mod group;
pub mod handles;
pub mod input;
pub mod interaction;
pub mod object;
pub mod selection;
pub mod store;
pub mod viewport;
#[cfg(feature = "winit")]
pub mod winit_input;

pub use canvas::{AlignmentPreview, Canvas, CanvasDocument, CanvasEvent};
pub use config::{CanvasConfig, GRID_SIZE, MAX_SCALE, MIN_OBJECT_SIZE, MIN_SCALE};
pub use error::{CanvasError, CanvasResult};
pub use frame::{FrameId, FrameScheduler};
pub use geometry::{AlignKind, Placement, Projection, find_free_position, rect_intersects, snap_to_grid};
pub use gesture::{FileIngest, GestureDispatcher, GestureState};
pub use group::GroupLayout;
pub use handles::{ResizeHandle, ResizeParams, resize_rect};
pub use input::{InputEvent, Modifiers, MouseButton, PointerEvent, PointerKind, WheelEvent};
pub use interaction::{DragSession, ResizeSession, Resolved};
pub use object::{CanvasObject, ObjectId, ObjectPatch};
pub use selection::Selection;
pub use store::{MemoryStore, ObjectStore, StoreCommand, StoreError, flush_commands};
pub use viewport::{ViewLayer, Viewport, ViewportController};
#[cfg(feature = "winit")]
pub use winit_input::WinitInput;
