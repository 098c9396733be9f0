//! Collision Primitives
//!
//! Axis-aligned boxes, ray casts, and contact manifolds. A [`Manifold`]
//! stores up to two contact points in a frame-independent local encoding;
//! [`WorldManifold`] re-expresses it in world space for the solver. Each
//! point carries a [`ContactId`] feature tag so the solver can transfer
//! cached impulses to the matching point on the next step (warm starting).

use glam::Vec2;

use crate::math::Transform;
use crate::settings::MAX_MANIFOLD_POINTS;

// ============================================================================
// Aabb
// ============================================================================

/// An axis-aligned bounding box.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    /// Lower-left corner.
    pub lower: Vec2,
    /// Upper-right corner.
    pub upper: Vec2,
}

impl Aabb {
    /// Build from corners.
    #[inline]
    #[must_use]
    pub const fn new(lower: Vec2, upper: Vec2) -> Self {
        Self { lower, upper }
    }

    /// Center point.
    #[inline]
    #[must_use]
    pub fn center(&self) -> Vec2 {
        0.5 * (self.lower + self.upper)
    }

    /// Half-width and half-height.
    #[inline]
    #[must_use]
    pub fn extents(&self) -> Vec2 {
        0.5 * (self.upper - self.lower)
    }

    /// Perimeter length, the tree's surface-area heuristic.
    #[inline]
    #[must_use]
    pub fn perimeter(&self) -> f32 {
        let d = self.upper - self.lower;
        2.0 * (d.x + d.y)
    }

    /// Smallest box containing both operands.
    #[inline]
    #[must_use]
    pub fn combine(&self, other: &Aabb) -> Aabb {
        Aabb {
            lower: self.lower.min(other.lower),
            upper: self.upper.max(other.upper),
        }
    }

    /// True when `other` lies entirely inside `self`.
    #[inline]
    #[must_use]
    pub fn contains(&self, other: &Aabb) -> bool {
        self.lower.x <= other.lower.x
            && self.lower.y <= other.lower.y
            && other.upper.x <= self.upper.x
            && other.upper.y <= self.upper.y
    }

    /// True when the boxes overlap.
    #[inline]
    #[must_use]
    pub fn test_overlap(&self, other: &Aabb) -> bool {
        let d1 = other.lower - self.upper;
        let d2 = self.lower - other.upper;
        d1.x <= 0.0 && d1.y <= 0.0 && d2.x <= 0.0 && d2.y <= 0.0
    }

    /// Slab-based segment cast against the box. Returns the entry fraction
    /// when the segment from `input.p1` toward `input.p2` hits.
    #[must_use]
    pub fn ray_cast(&self, input: &RayCastInput) -> Option<f32> {
        let mut tmin = f32::MIN;
        let mut tmax = f32::MAX;

        let p = input.p1;
        let d = input.p2 - input.p1;

        for axis in 0..2 {
            let (p_i, d_i, lo, hi) = if axis == 0 {
                (p.x, d.x, self.lower.x, self.upper.x)
            } else {
                (p.y, d.y, self.lower.y, self.upper.y)
            };
            if d_i.abs() < f32::EPSILON {
                if p_i < lo || hi < p_i {
                    return None;
                }
            } else {
                let inv_d = 1.0 / d_i;
                let mut t1 = (lo - p_i) * inv_d;
                let mut t2 = (hi - p_i) * inv_d;
                if t1 > t2 {
                    core::mem::swap(&mut t1, &mut t2);
                }
                tmin = tmin.max(t1);
                tmax = tmax.min(t2);
                if tmin > tmax {
                    return None;
                }
            }
        }

        if tmin < 0.0 || input.max_fraction < tmin {
            return None;
        }
        Some(tmin)
    }
}

// ============================================================================
// Ray casts
// ============================================================================

/// Input for a ray (really: segment) cast from `p1` toward `p2`, cut off at
/// `max_fraction` of the segment length.
#[derive(Clone, Copy, Debug)]
pub struct RayCastInput {
    /// Segment start.
    pub p1: Vec2,
    /// Segment end.
    pub p2: Vec2,
    /// Fraction of the segment to consider, in `[0, 1]`.
    pub max_fraction: f32,
}

/// A ray-cast hit.
#[derive(Clone, Copy, Debug)]
pub struct RayCastOutput {
    /// Surface normal at the hit point.
    pub normal: Vec2,
    /// Hit fraction along the input segment.
    pub fraction: f32,
}

// ============================================================================
// Contact features
// ============================================================================

/// The kind of shape feature a contact point was generated from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FeatureKind {
    /// A polygon/edge vertex.
    #[default]
    Vertex,
    /// A polygon/edge face.
    Face,
}

/// Feature pair identifying how a contact point was produced.
///
/// Two points with equal ids across consecutive steps are the "same"
/// geometric contact, so the solver may seed the new point with the old
/// point's impulses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContactId {
    /// Feature index on shape A.
    pub index_a: u8,
    /// Feature index on shape B.
    pub index_b: u8,
    /// Feature kind on shape A.
    pub kind_a: FeatureKind,
    /// Feature kind on shape B.
    pub kind_b: FeatureKind,
}

impl ContactId {
    /// Swap the A/B roles, used when collision routines flip their inputs.
    #[must_use]
    pub fn swapped(self) -> Self {
        Self {
            index_a: self.index_b,
            index_b: self.index_a,
            kind_a: self.kind_b,
            kind_b: self.kind_a,
        }
    }
}

// ============================================================================
// Manifold
// ============================================================================

/// How a manifold's local quantities are interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ManifoldKind {
    /// Circle-circle: `local_point` is circle A's center.
    #[default]
    Circles,
    /// `local_normal`/`local_point` live on face A.
    FaceA,
    /// `local_normal`/`local_point` live on face B.
    FaceB,
}

/// One contact point in manifold-local encoding.
#[derive(Clone, Copy, Debug, Default)]
pub struct ManifoldPoint {
    /// Usage depends on [`ManifoldKind`] (circle B center or clipped point).
    pub local_point: Vec2,
    /// Cached normal impulse for warm starting.
    pub normal_impulse: f32,
    /// Cached tangent impulse for warm starting.
    pub tangent_impulse: f32,
    /// Feature tag for cross-step point matching.
    pub id: ContactId,
}

/// A contact manifold: up to two points plus a shared local normal.
#[derive(Clone, Copy, Debug, Default)]
pub struct Manifold {
    /// Contact points; only the first `point_count` entries are valid.
    pub points: [ManifoldPoint; MAX_MANIFOLD_POINTS],
    /// Normal in the local frame given by `kind`.
    pub local_normal: Vec2,
    /// Reference point in the local frame given by `kind`.
    pub local_point: Vec2,
    /// Interpretation of the local quantities.
    pub kind: ManifoldKind,
    /// Number of valid points.
    pub point_count: usize,
}

// ============================================================================
// WorldManifold
// ============================================================================

/// A manifold expressed in world coordinates.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorldManifold {
    /// World normal, pointing from A to B.
    pub normal: Vec2,
    /// World contact points (midway between the shape surfaces).
    pub points: [Vec2; MAX_MANIFOLD_POINTS],
    /// Signed separations (negative = penetrating).
    pub separations: [f32; MAX_MANIFOLD_POINTS],
}

impl WorldManifold {
    /// Derive world-space contact data from a manifold and the two shape
    /// transforms/radii.
    #[must_use]
    pub fn new(
        manifold: &Manifold,
        xf_a: Transform,
        radius_a: f32,
        xf_b: Transform,
        radius_b: f32,
    ) -> Self {
        let mut out = WorldManifold::default();
        if manifold.point_count == 0 {
            return out;
        }

        match manifold.kind {
            ManifoldKind::Circles => {
                let point_a = xf_a.apply(manifold.local_point);
                let point_b = xf_b.apply(manifold.points[0].local_point);
                out.normal = Vec2::X;
                if point_a.distance_squared(point_b) > f32::EPSILON * f32::EPSILON {
                    out.normal = (point_b - point_a).normalize();
                }
                let c_a = point_a + radius_a * out.normal;
                let c_b = point_b - radius_b * out.normal;
                out.points[0] = 0.5 * (c_a + c_b);
                out.separations[0] = (c_b - c_a).dot(out.normal);
            }
            ManifoldKind::FaceA => {
                out.normal = xf_a.q.apply(manifold.local_normal);
                let plane_point = xf_a.apply(manifold.local_point);
                for i in 0..manifold.point_count {
                    let clip_point = xf_b.apply(manifold.points[i].local_point);
                    let gap = (clip_point - plane_point).dot(out.normal);
                    let c_a = clip_point + (radius_a - gap) * out.normal;
                    let c_b = clip_point - radius_b * out.normal;
                    out.points[i] = 0.5 * (c_a + c_b);
                    out.separations[i] = (c_b - c_a).dot(out.normal);
                }
            }
            ManifoldKind::FaceB => {
                out.normal = xf_b.q.apply(manifold.local_normal);
                let plane_point = xf_b.apply(manifold.local_point);
                for i in 0..manifold.point_count {
                    let clip_point = xf_a.apply(manifold.points[i].local_point);
                    let gap = (clip_point - plane_point).dot(out.normal);
                    let c_b = clip_point + (radius_b - gap) * out.normal;
                    let c_a = clip_point - radius_a * out.normal;
                    out.points[i] = 0.5 * (c_a + c_b);
                    out.separations[i] = (c_a - c_b).dot(out.normal);
                }
                // Ensure the normal still points from A to B.
                out.normal = -out.normal;
            }
        }
        out
    }
}

// ============================================================================
// Clipping
// ============================================================================

/// A vertex being clipped, tagged with its contact feature.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClipVertex {
    /// Vertex position.
    pub v: Vec2,
    /// Feature tag.
    pub id: ContactId,
}

/// Clip a two-vertex segment against the half-plane
/// `normal · x - offset <= 0`. Returns the number of output vertices
/// (a full manifold needs 2).
pub fn clip_segment_to_line(
    out: &mut [ClipVertex; 2],
    input: &[ClipVertex; 2],
    normal: Vec2,
    offset: f32,
    vertex_index_a: u8,
) -> usize {
    let mut count = 0;

    let distance0 = normal.dot(input[0].v) - offset;
    let distance1 = normal.dot(input[1].v) - offset;

    if distance0 <= 0.0 {
        out[count] = input[0];
        count += 1;
    }
    if distance1 <= 0.0 {
        out[count] = input[1];
        count += 1;
    }

    // The segment straddles the plane: emit the intersection point.
    if distance0 * distance1 < 0.0 {
        let interp = distance0 / (distance0 - distance1);
        out[count].v = input[0].v + interp * (input[1].v - input[0].v);
        out[count].id = ContactId {
            index_a: vertex_index_a,
            index_b: input[0].id.index_b,
            kind_a: FeatureKind::Vertex,
            kind_b: FeatureKind::Face,
        };
        count += 1;
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_overlap_and_combine() {
        let a = Aabb::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0));
        let b = Aabb::new(Vec2::new(0.5, 0.5), Vec2::new(2.0, 2.0));
        let c = Aabb::new(Vec2::new(3.0, 3.0), Vec2::new(4.0, 4.0));
        assert!(a.test_overlap(&b));
        assert!(!a.test_overlap(&c));
        let ab = a.combine(&b);
        assert_eq!(ab.lower, Vec2::ZERO);
        assert_eq!(ab.upper, Vec2::new(2.0, 2.0));
        assert!(ab.contains(&a));
    }

    #[test]
    fn test_aabb_ray_cast() {
        let b = Aabb::new(Vec2::new(1.0, -1.0), Vec2::new(2.0, 1.0));
        let hit = b.ray_cast(&RayCastInput {
            p1: Vec2::new(0.0, 0.0),
            p2: Vec2::new(4.0, 0.0),
            max_fraction: 1.0,
        });
        assert!(hit.is_some());
        assert!((hit.unwrap() - 0.25).abs() < 1e-6);

        let miss = b.ray_cast(&RayCastInput {
            p1: Vec2::new(0.0, 5.0),
            p2: Vec2::new(4.0, 5.0),
            max_fraction: 1.0,
        });
        assert!(miss.is_none());
    }

    #[test]
    fn test_clip_segment_straddling() {
        let input = [
            ClipVertex {
                v: Vec2::new(-1.0, 0.0),
                id: ContactId::default(),
            },
            ClipVertex {
                v: Vec2::new(1.0, 0.0),
                id: ContactId::default(),
            },
        ];
        let mut out = [ClipVertex::default(); 2];
        // Half-plane x <= 0.
        let n = clip_segment_to_line(&mut out, &input, Vec2::X, 0.0, 7);
        assert_eq!(n, 2);
        assert!((out[1].v.x).abs() < 1e-6);
        assert_eq!(out[1].id.index_a, 7);
    }

    #[test]
    fn test_world_manifold_circles() {
        let mut manifold = Manifold {
            kind: ManifoldKind::Circles,
            local_point: Vec2::ZERO,
            point_count: 1,
            ..Default::default()
        };
        manifold.points[0].local_point = Vec2::ZERO;
        let xf_a = Transform::new(Vec2::new(0.0, 0.0), 0.0);
        let xf_b = Transform::new(Vec2::new(1.5, 0.0), 0.0);
        let wm = WorldManifold::new(&manifold, xf_a, 1.0, xf_b, 1.0);
        assert_eq!(wm.normal, Vec2::X);
        // Overlap of 0.5 split across both radii.
        assert!((wm.separations[0] + 0.5).abs() < 1e-6);
    }
}
