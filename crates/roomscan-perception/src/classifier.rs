//! Surface classification from the anchor sample.
//!
//! | Normal vs. up | Anchor height `h` | Type |
//! |---|---|---|
//! | < 20° | `h < 0.1` | [`SurfaceType::Floor`] |
//! | < 20° | `0.1 ≤ h < 1.0` | [`SurfaceType::Shelf`] |
//! | < 20° | `h ≥ 1.0` | [`SurfaceType::Table`] |
//! | ≥ 20° | any | [`SurfaceType::Wall`] |
//!
//! The type is decided once, when a surface is created, and is not revised
//! by later merges.

use roomscan_types::{SurfaceType, Vec3};

/// Maximum tilt from vertical-up for a surface to count as horizontal.
pub const HORIZONTAL_TOLERANCE_DEG: f32 = 20.0;
/// Horizontal surfaces below this height are floor.
pub const FLOOR_MAX_HEIGHT: f32 = 0.1;
/// Horizontal surfaces below this height (and above the floor) are shelves.
pub const SHELF_MAX_HEIGHT: f32 = 1.0;

/// Classify a surface from its anchor normal and anchor height (world Y).
pub fn classify(normal: Vec3, height: f32) -> SurfaceType {
    if normal.angle_deg(Vec3::up()) < HORIZONTAL_TOLERANCE_DEG {
        if height < FLOOR_MAX_HEIGHT {
            SurfaceType::Floor
        } else if height < SHELF_MAX_HEIGHT {
            SurfaceType::Shelf
        } else {
            SurfaceType::Table
        }
    } else {
        SurfaceType::Wall
    }
}
