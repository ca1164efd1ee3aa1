//! Incremental surface accumulation.
//!
//! [`SurfaceAccumulator::ingest`] folds one ray hit into the live surface
//! set:
//!
//! 1. Scan surfaces in creation order; the **first** whose anchor lies
//!    strictly closer than the merge threshold takes the point.
//! 2. On a merge the point is appended and [`DimensionTracker::recompute`]
//!    re-derives the bounding extents.  If the new footprint falls below the
//!    minimum area the surface is removed from the set immediately.
//! 3. Otherwise a new surface is anchored at the point, classified from it,
//!    and appended with zero extents.
//!
//! Single-sample surfaces are never pruned; extents are only computed once a
//! second sample arrives.

use roomscan_types::{Surface, Vec3};
use tracing::debug;

use crate::classifier::classify;

// ────────────────────────────────────────────────────────────────────────────
// DimensionTracker
// ────────────────────────────────────────────────────────────────────────────

/// Recomputes surface extents and applies the minimum-area test.
#[derive(Debug, Clone, Copy)]
pub struct DimensionTracker {
    minimum_area: f32,
}

impl DimensionTracker {
    pub fn new(minimum_area: f32) -> Self {
        Self { minimum_area }
    }

    /// Recompute `width`/`depth`/`height` from the samples' axis-aligned
    /// bounding box (X, Z and Y extents respectively).
    ///
    /// Returns `false` (and leaves the extents untouched) for surfaces with
    /// fewer than two samples.
    pub fn recompute(&self, surface: &mut Surface) -> bool {
        let Some((&first, rest)) = surface.samples.split_first() else {
            return false;
        };
        if rest.is_empty() {
            return false;
        }

        let (min, max) = rest
            .iter()
            .fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p)));

        surface.width = max.x - min.x;
        surface.depth = max.z - min.z;
        surface.height = max.y - min.y;
        true
    }

    /// True when a surface with at least two samples has a footprint below
    /// the minimum area.
    pub fn fails_minimum(&self, surface: &Surface) -> bool {
        surface.samples.len() >= 2 && surface.area() < self.minimum_area
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SurfaceAccumulator
// ────────────────────────────────────────────────────────────────────────────

/// What happened to an ingested point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new surface with this id was created.
    Created(u64),
    /// The point was folded into an existing surface that survived.
    Merged(u64),
    /// The point was folded into a surface that then failed the area test
    /// and was removed.
    Pruned(u64),
}

/// Owns the live surface set of one calibration session.
#[derive(Debug, Clone)]
pub struct SurfaceAccumulator {
    merge_threshold: f32,
    tracker: DimensionTracker,
    surfaces: Vec<Surface>,
    next_id: u64,
}

impl SurfaceAccumulator {
    /// - `merge_threshold` – the scan resolution; anchor distance below which
    ///   a point joins an existing surface.
    /// - `minimum_area` – pruning threshold on `width * depth`.
    pub fn new(merge_threshold: f32, minimum_area: f32) -> Self {
        Self {
            merge_threshold,
            tracker: DimensionTracker::new(minimum_area),
            surfaces: Vec::new(),
            next_id: 0,
        }
    }

    /// Fold one intersection into the surface set.
    pub fn ingest(&mut self, point: Vec3, normal: Vec3) -> IngestOutcome {
        let matched = self
            .surfaces
            .iter()
            .position(|s| point.distance(s.anchor) < self.merge_threshold);

        match matched {
            Some(index) => {
                let surface = &mut self.surfaces[index];
                surface.samples.push(point);
                self.tracker.recompute(surface);
                let id = surface.id;

                if self.tracker.fails_minimum(surface) {
                    let removed = self.surfaces.remove(index);
                    debug!(
                        surface = id,
                        samples = removed.samples.len(),
                        area = removed.area(),
                        "surface pruned below minimum area"
                    );
                    IngestOutcome::Pruned(id)
                } else {
                    IngestOutcome::Merged(id)
                }
            }
            None => {
                let id = self.next_id;
                self.next_id += 1;
                let surface_type = classify(normal, point.y);
                debug!(surface = id, kind = %surface_type, ?point, "surface created");
                self.surfaces.push(Surface::new(id, point, normal, surface_type));
                IngestOutcome::Created(id)
            }
        }
    }

    /// Live surfaces in creation order.
    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Hand the surface set over, leaving the accumulator empty.
    pub fn take_surfaces(&mut self) -> Vec<Surface> {
        std::mem::take(&mut self.surfaces)
    }

    /// Drop all surfaces and restart id numbering.
    pub fn clear(&mut self) {
        self.surfaces.clear();
        self.next_id = 0;
    }
}
