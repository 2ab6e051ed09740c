//! Rectangle geometry: grid snapping, collision tests, free-position search
//! and group layouts.

mod align;
mod collision;
mod snap;

pub use align::{AlignKind, Projection, alignment_projections, is_group_colliding};
pub use collision::{
    COLLISION_EPSILON, MAX_SEARCH_RINGS, Placement, collides_with_any, find_free_position,
    find_free_position_with, group_bounds, rect_intersects, rect_intersects_with, ring_offsets,
};
pub use snap::{SnapResult, snap_point, snap_point_to, snap_to_grid};
