//! One-shot post-scan passes: duplicate removal and visibility marking.

use roomscan_types::{Surface, Vec3};
use tracing::debug;

use crate::raycast::RayCaster;

/// Remove later surfaces whose anchor lies closer than `threshold` to any
/// earlier surface's anchor.
///
/// Every pair is judged against the list as it was passed in, so a chain
/// `A ~ B ~ C` keeps only `A` even when `C` is far from `A`.  Samples of the
/// discarded surfaces are dropped, not merged into the survivor.
pub fn dedupe(surfaces: Vec<Surface>, threshold: f32) -> Vec<Surface> {
    let keep: Vec<bool> = surfaces
        .iter()
        .enumerate()
        .map(|(i, s)| {
            !surfaces[..i]
                .iter()
                .any(|earlier| s.anchor.distance(earlier.anchor) < threshold)
        })
        .collect();

    let before = surfaces.len();
    let survivors: Vec<Surface> = surfaces
        .into_iter()
        .zip(keep)
        .filter_map(|(s, keep)| keep.then_some(s))
        .collect();

    debug!(before, after = survivors.len(), "duplicate surfaces removed");
    survivors
}

/// Line-of-sight test from `room_center` to the surface anchor.
///
/// The sight line stops `epsilon` short of the anchor so the surface itself is
/// not reported as its own occluder.  A sight line with no remaining length
/// counts as visible.
pub fn evaluate_visibility(
    caster: &dyn RayCaster,
    surface: &Surface,
    room_center: Vec3,
    epsilon: f32,
) -> bool {
    let to_surface = surface.anchor.sub(room_center);
    let reach = to_surface.length() - epsilon;
    if reach <= 0.0 {
        return true;
    }
    !caster.any_hit(room_center, to_surface.normalize(), reach)
}

/// Set `is_visible` on every surface.  Returns how many are visible.
pub fn apply_visibility(
    caster: &dyn RayCaster,
    surfaces: &mut [Surface],
    room_center: Vec3,
    epsilon: f32,
) -> usize {
    let mut visible = 0;
    for surface in surfaces.iter_mut() {
        surface.is_visible = evaluate_visibility(caster, surface, room_center, epsilon);
        if surface.is_visible {
            visible += 1;
        }
    }
    visible
}
