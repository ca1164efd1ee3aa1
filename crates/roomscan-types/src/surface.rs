//! Surface records and the persisted calibration record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::math::Vec3;

/// Semantic category of a detected planar surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceType {
    Floor,
    Wall,
    Table,
    Shelf,
}

impl std::fmt::Display for SurfaceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceType::Floor => write!(f, "Floor"),
            SurfaceType::Wall => write!(f, "Wall"),
            SurfaceType::Table => write!(f, "Table"),
            SurfaceType::Shelf => write!(f, "Shelf"),
        }
    }
}

/// One detected planar region, built up incrementally during a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    /// Session-local identifier, increasing in creation order.
    pub id: u64,
    /// The first sample that created this surface.  Never recomputed.
    pub anchor: Vec3,
    /// Normal reported with the anchor sample.
    pub normal: Vec3,
    /// Append-only list of contributing samples, starting with the anchor.
    pub samples: Vec<Vec3>,
    /// Extent along X of the samples' bounding box.
    pub width: f32,
    /// Extent along Z of the samples' bounding box.
    pub depth: f32,
    /// Extent along Y of the samples' bounding box.
    pub height: f32,
    /// Fixed at creation from the anchor sample.
    pub surface_type: SurfaceType,
    /// Line of sight from the room center; `false` until the visibility pass.
    pub is_visible: bool,
}

impl Surface {
    /// A fresh single-sample surface with zero extents.
    pub fn new(id: u64, anchor: Vec3, normal: Vec3, surface_type: SurfaceType) -> Self {
        Self {
            id,
            anchor,
            normal,
            samples: vec![anchor],
            width: 0.0,
            depth: 0.0,
            height: 0.0,
            surface_type,
            is_visible: false,
        }
    }

    /// Footprint used by the minimum-area test.
    pub fn area(&self) -> f32 {
        self.width * self.depth
    }
}

/// Persisted form of a [`Surface`].  Field names follow the record schema
/// consumed by the object-placement engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceRecord {
    pub position: Vec3,
    pub normal: Vec3,
    pub width: f32,
    pub depth: f32,
    pub height: f32,
    #[serde(rename = "type")]
    pub surface_type: SurfaceType,
    pub is_visible: bool,
}

impl From<&Surface> for SurfaceRecord {
    fn from(s: &Surface) -> Self {
        Self {
            position: s.anchor,
            normal: s.normal,
            width: s.width,
            depth: s.depth,
            height: s.height,
            surface_type: s.surface_type,
            is_visible: s.is_visible,
        }
    }
}

/// The hand-off record written once a calibration completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationRecord {
    pub surfaces: Vec<SurfaceRecord>,
    pub center_point: Vec3,
    pub scan_coverage: f32,
    #[serde(default = "Uuid::nil")]
    pub session_id: Uuid,
    #[serde(default = "epoch")]
    pub completed_at: DateTime<Utc>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl CalibrationRecord {
    /// Build the record for a finished session.
    pub fn new(session_id: Uuid, surfaces: &[Surface], center_point: Vec3, scan_coverage: f32) -> Self {
        Self {
            surfaces: surfaces.iter().map(SurfaceRecord::from).collect(),
            center_point,
            scan_coverage,
            session_id,
            completed_at: Utc::now(),
        }
    }

    /// Surfaces that passed the visibility check, for placement.
    pub fn visible_surfaces(&self) -> impl Iterator<Item = &SurfaceRecord> {
        self.surfaces.iter().filter(|s| s.is_visible)
    }
}
