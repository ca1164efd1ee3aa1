//! Ray-intersection service.
//!
//! The calibration engine never owns scene geometry; it asks a
//! [`RayCaster`] for every surface a ray passes through.  [`BoxScene`] is a
//! self-contained implementation over axis-aligned boxes, used by the CLI
//! demo and by tests.
//!
//! # Example
//!
//! ```rust
//! use roomscan_perception::raycast::{Aabb, BoxScene, RayCaster};
//! use roomscan_types::Vec3;
//!
//! let mut scene = BoxScene::new();
//! scene.add_box("wall", Aabb::new(Vec3::new(-2.0, 0.0, 3.0), Vec3::new(2.0, 2.5, 3.2)));
//!
//! let hits = scene.cast_all(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, 1.0), 10.0);
//! assert_eq!(hits.len(), 1);
//! assert!((hits[0].point.z - 3.0).abs() < 1e-5);
//! assert_eq!(hits[0].normal, Vec3::new(0.0, 0.0, -1.0));
//! ```

use roomscan_types::Vec3;

// ────────────────────────────────────────────────────────────────────────────
// Contract
// ────────────────────────────────────────────────────────────────────────────

/// One ray / surface intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// World-space intersection point.
    pub point: Vec3,
    /// Outward surface normal at the intersection.
    pub normal: Vec3,
    /// Distance from the ray origin.
    pub distance: f32,
}

/// Physics collaborator that answers ray queries.
pub trait RayCaster: Send + Sync {
    /// Every intersection along the ray within `max_range`.  Order is
    /// unspecified and a single ray may report several hits.
    ///
    /// `direction` need not be normalised.
    fn cast_all(&self, origin: Vec3, direction: Vec3, max_range: f32) -> Vec<RayHit>;

    /// True when the ray hits anything within `max_range`.
    fn any_hit(&self, origin: Vec3, direction: Vec3, max_range: f32) -> bool {
        !self.cast_all(origin, direction, max_range).is_empty()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Aabb
// ────────────────────────────────────────────────────────────────────────────

/// An axis-aligned bounding box, defined by its minimum and maximum corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create a bounding box from its two opposite corners.
    ///
    /// The constructor normalises the corners so that `min ≤ max` per axis.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// True when the point lies inside or on the boundary of the box.
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Slab test.  Returns the entry distance along the unit `direction` and
    /// the normal of the face that was entered.
    ///
    /// Rays starting inside the box report nothing, as does a box that is
    /// entered beyond `max_range`.
    pub fn ray_entry(&self, origin: Vec3, direction: Vec3, max_range: f32) -> Option<(f32, Vec3)> {
        if self.contains_point(origin) {
            return None;
        }

        let o = [origin.x, origin.y, origin.z];
        let d = [direction.x, direction.y, direction.z];
        let lo = [self.min.x, self.min.y, self.min.z];
        let hi = [self.max.x, self.max.y, self.max.z];

        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;
        let mut enter_axis = 0usize;

        for axis in 0..3 {
            if d[axis].abs() < 1e-12 {
                if o[axis] < lo[axis] || o[axis] > hi[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d[axis];
            let (t0, t1) = {
                let a = (lo[axis] - o[axis]) * inv;
                let b = (hi[axis] - o[axis]) * inv;
                if a <= b { (a, b) } else { (b, a) }
            };
            if t0 > t_enter {
                t_enter = t0;
                enter_axis = axis;
            }
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return None;
            }
        }

        if t_enter < 0.0 || t_enter > max_range {
            return None;
        }

        let mut n = [0.0f32; 3];
        n[enter_axis] = -d[enter_axis].signum();
        Some((t_enter, Vec3::new(n[0], n[1], n[2])))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// BoxScene
// ────────────────────────────────────────────────────────────────────────────

/// A static scene of named axis-aligned boxes.
///
/// Each box contributes at most one hit per ray: the point where the ray
/// enters it.
#[derive(Debug, Clone, Default)]
pub struct BoxScene {
    boxes: Vec<(String, Aabb)>,
}

impl BoxScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named box to the scene.
    pub fn add_box(&mut self, name: impl Into<String>, bounds: Aabb) {
        self.boxes.push((name.into(), bounds));
    }

    /// Builder-style [`add_box`][Self::add_box].
    pub fn with_box(mut self, name: impl Into<String>, bounds: Aabb) -> Self {
        self.add_box(name, bounds);
        self
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// A 6 m × 5 m room, 2.5 m high, centred on the origin with the floor
    /// top at `y = 0`.  Contains a shelf, a table top at 1.05 m and a
    /// pillar standing between the center and the east wall.
    pub fn demo_room() -> Self {
        let v = Vec3::new;
        Self::new()
            .with_box("floor", Aabb::new(v(-3.0, -0.2, -2.5), v(3.0, 0.0, 2.5)))
            .with_box("ceiling", Aabb::new(v(-3.0, 2.5, -2.5), v(3.0, 2.7, 2.5)))
            .with_box("wall_north", Aabb::new(v(-3.0, 0.0, 2.5), v(3.0, 2.5, 2.7)))
            .with_box("wall_south", Aabb::new(v(-3.0, 0.0, -2.7), v(3.0, 2.5, -2.5)))
            .with_box("wall_east", Aabb::new(v(3.0, 0.0, -2.5), v(3.2, 2.5, 2.5)))
            .with_box("wall_west", Aabb::new(v(-3.2, 0.0, -2.5), v(-3.0, 2.5, 2.5)))
            .with_box("table", Aabb::new(v(-2.2, 1.0, 1.0), v(-1.0, 1.05, 2.0)))
            .with_box("shelf", Aabb::new(v(1.5, 0.55, -2.5), v(2.8, 0.6, -2.1)))
            .with_box("pillar", Aabb::new(v(1.8, 0.0, -0.2), v(2.2, 2.5, 0.2)))
    }
}

impl RayCaster for BoxScene {
    fn cast_all(&self, origin: Vec3, direction: Vec3, max_range: f32) -> Vec<RayHit> {
        let dir = direction.normalize();
        if dir == Vec3::zero() || max_range <= 0.0 {
            return Vec::new();
        }
        self.boxes
            .iter()
            .filter_map(|(_, b)| b.ray_entry(origin, dir, max_range))
            .map(|(t, normal)| RayHit {
                point: origin.add(dir.scale(t)),
                normal,
                distance: t,
            })
            .collect()
    }
}
