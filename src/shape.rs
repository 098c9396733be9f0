//! Collision Shapes
//!
//! A closed enum of the shapes the engine simulates:
//!
//! - **Circle** — center + radius
//! - **Polygon** — convex, counter-clockwise, at most
//!   [`MAX_POLYGON_VERTICES`](crate::settings::MAX_POLYGON_VERTICES) vertices
//! - **Edge** — a segment with optional ghost vertices for smooth sliding
//! - **Chain** — a polyline (or loop) whose children are ghost-connected
//!   edges; the only shape with more than one broad-phase child
//!
//! The enum being closed means narrow-phase dispatch is an exhaustive
//! `match`: there is no "unregistered shape pair" failure mode.

use glam::Vec2;

use crate::collision::{Aabb, RayCastInput, RayCastOutput};
use crate::math::{cross_vv, Transform};
use crate::settings::{MAX_POLYGON_VERTICES, POLYGON_RADIUS};

/// Mass, centroid, and rotational inertia of a shape at a given density.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MassData {
    /// Mass in kilograms.
    pub mass: f32,
    /// Centroid relative to the shape's local origin.
    pub center: Vec2,
    /// Rotational inertia about the local origin.
    pub inertia: f32,
}

// ============================================================================
// Circle
// ============================================================================

/// A solid circle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    /// Center in shape-local coordinates.
    pub center: Vec2,
    /// Radius in meters.
    pub radius: f32,
}

impl Circle {
    /// A circle of `radius` centered on the local origin.
    #[must_use]
    pub fn new(radius: f32) -> Self {
        Self {
            center: Vec2::ZERO,
            radius,
        }
    }

    fn compute_mass(&self, density: f32) -> MassData {
        let mass = density * core::f32::consts::PI * self.radius * self.radius;
        MassData {
            mass,
            center: self.center,
            inertia: mass * (0.5 * self.radius * self.radius + self.center.length_squared()),
        }
    }

    fn ray_cast(&self, input: &RayCastInput, xf: Transform) -> Option<RayCastOutput> {
        let position = xf.apply(self.center);
        let s = input.p1 - position;
        let b = s.length_squared() - self.radius * self.radius;

        let r = input.p2 - input.p1;
        let c = s.dot(r);
        let rr = r.length_squared();
        let sigma = c * c - rr * b;

        if sigma < 0.0 || rr < f32::EPSILON {
            return None;
        }

        let t = -(c + sigma.sqrt());
        if 0.0 <= t && t <= input.max_fraction * rr {
            let t = t / rr;
            let normal = (s + t * r).normalize_or_zero();
            return Some(RayCastOutput {
                fraction: t,
                normal,
            });
        }
        None
    }
}

// ============================================================================
// Polygon
// ============================================================================

/// A convex polygon with precomputed normals and centroid.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    /// Vertices in counter-clockwise order.
    pub vertices: Vec<Vec2>,
    /// Outward edge normals, `normals[i]` belonging to edge `i → i+1`.
    pub normals: Vec<Vec2>,
    /// Area centroid.
    pub centroid: Vec2,
}

impl Polygon {
    /// Build from counter-clockwise convex vertices.
    ///
    /// # Panics
    ///
    /// Panics when fewer than 3 or more than
    /// [`MAX_POLYGON_VERTICES`](crate::settings::MAX_POLYGON_VERTICES)
    /// vertices are given.
    #[must_use]
    pub fn new(vertices: &[Vec2]) -> Self {
        assert!(
            (3..=MAX_POLYGON_VERTICES).contains(&vertices.len()),
            "polygon needs 3..={MAX_POLYGON_VERTICES} vertices"
        );
        let n = vertices.len();
        let mut normals = Vec::with_capacity(n);
        for i in 0..n {
            let edge = vertices[(i + 1) % n] - vertices[i];
            debug_assert!(edge.length_squared() > f32::EPSILON * f32::EPSILON);
            normals.push(Vec2::new(edge.y, -edge.x).normalize());
        }
        Self {
            centroid: Self::compute_centroid(vertices),
            vertices: vertices.to_vec(),
            normals,
        }
    }

    /// An axis-aligned box with the given half-extents, centered on the
    /// local origin.
    #[must_use]
    pub fn boxed(half_width: f32, half_height: f32) -> Self {
        Self::new(&[
            Vec2::new(-half_width, -half_height),
            Vec2::new(half_width, -half_height),
            Vec2::new(half_width, half_height),
            Vec2::new(-half_width, half_height),
        ])
    }

    /// A box with the given half-extents, offset and rotated in shape-local
    /// space.
    #[must_use]
    pub fn boxed_at(half_width: f32, half_height: f32, center: Vec2, angle: f32) -> Self {
        let xf = Transform::new(center, angle);
        let verts: Vec<Vec2> = [
            Vec2::new(-half_width, -half_height),
            Vec2::new(half_width, -half_height),
            Vec2::new(half_width, half_height),
            Vec2::new(-half_width, half_height),
        ]
        .iter()
        .map(|&v| xf.apply(v))
        .collect();
        Self::new(&verts)
    }

    /// Internal 2-vertex "polygon" view of an edge, letting the polygon SAT
    /// path handle edge-polygon manifolds.
    pub(crate) fn from_edge(edge: &Edge) -> Self {
        let tangent = (edge.v2 - edge.v1).normalize_or_zero();
        let normal = Vec2::new(tangent.y, -tangent.x);
        Self {
            vertices: vec![edge.v1, edge.v2],
            normals: vec![normal, -normal],
            centroid: 0.5 * (edge.v1 + edge.v2),
        }
    }

    fn compute_centroid(vertices: &[Vec2]) -> Vec2 {
        let mut c = Vec2::ZERO;
        let mut area = 0.0;
        let inv3 = 1.0 / 3.0;
        // Reference point inside the polygon keeps the triangle areas tame.
        let reference = vertices.iter().sum::<Vec2>() / vertices.len() as f32;

        for i in 0..vertices.len() {
            let p1 = vertices[i] - reference;
            let p2 = vertices[(i + 1) % vertices.len()] - reference;
            let d = cross_vv(p1, p2);
            let triangle_area = 0.5 * d;
            area += triangle_area;
            c += triangle_area * inv3 * (p1 + p2);
        }

        if area > f32::EPSILON {
            c /= area;
        }
        c + reference
    }

    fn compute_mass(&self, density: f32) -> MassData {
        let mut center = Vec2::ZERO;
        let mut area = 0.0;
        let mut inertia = 0.0;
        let inv3 = 1.0 / 3.0;
        let reference = self.vertices.iter().sum::<Vec2>() / self.vertices.len() as f32;

        for i in 0..self.vertices.len() {
            let e1 = self.vertices[i] - reference;
            let e2 = self.vertices[(i + 1) % self.vertices.len()] - reference;

            let d = cross_vv(e1, e2);
            let triangle_area = 0.5 * d;
            area += triangle_area;
            center += triangle_area * inv3 * (e1 + e2);

            let int_x2 = e1.x * e1.x + e2.x * e1.x + e2.x * e2.x;
            let int_y2 = e1.y * e1.y + e2.y * e1.y + e2.y * e2.y;
            inertia += (0.25 * inv3 * d) * (int_x2 + int_y2);
        }

        let mass = density * area;
        if area > f32::EPSILON {
            center /= area;
        }
        let center_world = center + reference;
        // Inertia was taken about the reference point; shift to the origin.
        let inertia =
            density * inertia + mass * (center_world.length_squared() - center.length_squared());
        MassData {
            mass,
            center: center_world,
            inertia,
        }
    }

    fn ray_cast(&self, input: &RayCastInput, xf: Transform) -> Option<RayCastOutput> {
        // Work in the polygon's frame.
        let p1 = xf.q.apply_inverse(input.p1 - xf.p);
        let p2 = xf.q.apply_inverse(input.p2 - xf.p);
        let d = p2 - p1;

        let mut lower = 0.0;
        let mut upper = input.max_fraction;
        let mut index = None;

        for i in 0..self.vertices.len() {
            let numerator = self.normals[i].dot(self.vertices[i] - p1);
            let denominator = self.normals[i].dot(d);

            if denominator == 0.0 {
                if numerator < 0.0 {
                    return None;
                }
            } else {
                if denominator < 0.0 && numerator < lower * denominator {
                    lower = numerator / denominator;
                    index = Some(i);
                } else if denominator > 0.0 && numerator < upper * denominator {
                    upper = numerator / denominator;
                }
            }

            if upper < lower {
                return None;
            }
        }

        index.map(|i| RayCastOutput {
            fraction: lower,
            normal: xf.q.apply(self.normals[i]),
        })
    }

    fn test_point(&self, xf: Transform, p: Vec2) -> bool {
        let local = xf.q.apply_inverse(p - xf.p);
        for i in 0..self.vertices.len() {
            if self.normals[i].dot(local - self.vertices[i]) > 0.0 {
                return false;
            }
        }
        true
    }
}

// ============================================================================
// Edge
// ============================================================================

/// A line segment. Ghost vertices, when present, describe the neighboring
/// segments of a chain so that collisions slide smoothly across joins.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    /// Segment start.
    pub v1: Vec2,
    /// Segment end.
    pub v2: Vec2,
    /// Ghost vertex preceding `v1`.
    pub v0: Option<Vec2>,
    /// Ghost vertex following `v2`.
    pub v3: Option<Vec2>,
}

impl Edge {
    /// A bare segment with no ghost vertices.
    #[must_use]
    pub fn new(v1: Vec2, v2: Vec2) -> Self {
        Self {
            v1,
            v2,
            v0: None,
            v3: None,
        }
    }

    fn compute_mass(&self) -> MassData {
        // Edges are boundaries, not solids; they carry no mass.
        MassData {
            mass: 0.0,
            center: 0.5 * (self.v1 + self.v2),
            inertia: 0.0,
        }
    }

    fn ray_cast(&self, input: &RayCastInput, xf: Transform) -> Option<RayCastOutput> {
        let p1 = xf.q.apply_inverse(input.p1 - xf.p);
        let p2 = xf.q.apply_inverse(input.p2 - xf.p);
        let d = p2 - p1;

        let e = self.v2 - self.v1;
        let normal = Vec2::new(e.y, -e.x).normalize_or_zero();

        // q = p1 + t * d on the edge's supporting line.
        let numerator = normal.dot(self.v1 - p1);
        let denominator = normal.dot(d);
        if denominator == 0.0 {
            return None;
        }

        let t = numerator / denominator;
        if t < 0.0 || input.max_fraction < t {
            return None;
        }

        let q = p1 + t * d;

        // Is q on the segment?
        let rr = e.length_squared();
        if rr == 0.0 {
            return None;
        }
        let s = (q - self.v1).dot(e) / rr;
        if !(0.0..=1.0).contains(&s) {
            return None;
        }

        let normal = if numerator > 0.0 { -normal } else { normal };
        Some(RayCastOutput {
            fraction: t,
            normal: xf.q.apply(normal),
        })
    }
}

// ============================================================================
// Chain
// ============================================================================

/// A polyline of ghost-connected edges. Children are segments; the chain
/// never collides with itself.
#[derive(Clone, Debug, PartialEq)]
pub struct Chain {
    /// Polyline vertices.
    pub vertices: Vec<Vec2>,
    /// When true, the last vertex connects back to the first.
    pub is_loop: bool,
}

impl Chain {
    /// An open chain through `vertices`.
    ///
    /// # Panics
    ///
    /// Panics with fewer than 2 vertices.
    #[must_use]
    pub fn new(vertices: &[Vec2]) -> Self {
        assert!(vertices.len() >= 2, "chain needs at least 2 vertices");
        Self {
            vertices: vertices.to_vec(),
            is_loop: false,
        }
    }

    /// A closed loop through `vertices`.
    ///
    /// # Panics
    ///
    /// Panics with fewer than 3 vertices.
    #[must_use]
    pub fn new_loop(vertices: &[Vec2]) -> Self {
        assert!(vertices.len() >= 3, "loop needs at least 3 vertices");
        Self {
            vertices: vertices.to_vec(),
            is_loop: true,
        }
    }

    /// Number of edge children.
    #[inline]
    #[must_use]
    pub fn child_count(&self) -> usize {
        if self.is_loop {
            self.vertices.len()
        } else {
            self.vertices.len() - 1
        }
    }

    /// The `index`-th child edge with ghost vertices from its neighbors.
    #[must_use]
    pub fn child_edge(&self, index: usize) -> Edge {
        debug_assert!(index < self.child_count());
        let n = self.vertices.len();
        let at = |i: usize| self.vertices[i % n];

        let v1 = at(index);
        let v2 = at(index + 1);

        let v0 = if index > 0 {
            Some(self.vertices[index - 1])
        } else if self.is_loop {
            Some(self.vertices[n - 1])
        } else {
            None
        };
        let v3 = if index + 2 < n {
            Some(self.vertices[index + 2])
        } else if self.is_loop {
            Some(at(index + 2))
        } else {
            None
        };

        Edge { v1, v2, v0, v3 }
    }
}

// ============================================================================
// Shape
// ============================================================================

/// Any collidable shape.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// Solid circle.
    Circle(Circle),
    /// Convex polygon.
    Polygon(Polygon),
    /// Single segment.
    Edge(Edge),
    /// Segment polyline.
    Chain(Chain),
}

impl Shape {
    /// Number of broad-phase children (1 for everything except chains).
    #[must_use]
    pub fn child_count(&self) -> usize {
        match self {
            Shape::Chain(chain) => chain.child_count(),
            _ => 1,
        }
    }

    /// The shape's skin radius: real radius for circles, the polygon skin
    /// for everything else.
    #[must_use]
    pub fn radius(&self) -> f32 {
        match self {
            Shape::Circle(c) => c.radius,
            _ => POLYGON_RADIUS,
        }
    }

    /// Tight AABB of the given child under `xf`.
    #[must_use]
    pub fn compute_aabb(&self, xf: Transform, child: usize) -> Aabb {
        match self {
            Shape::Circle(c) => {
                let p = xf.apply(c.center);
                let r = Vec2::splat(c.radius);
                Aabb::new(p - r, p + r)
            }
            Shape::Polygon(poly) => {
                let mut lower = xf.apply(poly.vertices[0]);
                let mut upper = lower;
                for &v in &poly.vertices[1..] {
                    let p = xf.apply(v);
                    lower = lower.min(p);
                    upper = upper.max(p);
                }
                let r = Vec2::splat(POLYGON_RADIUS);
                Aabb::new(lower - r, upper + r)
            }
            Shape::Edge(e) => edge_aabb(e, xf),
            Shape::Chain(chain) => edge_aabb(&chain.child_edge(child), xf),
        }
    }

    /// Aggregate mass properties at `density`.
    #[must_use]
    pub fn compute_mass(&self, density: f32) -> MassData {
        match self {
            Shape::Circle(c) => c.compute_mass(density),
            Shape::Polygon(p) => p.compute_mass(density),
            Shape::Edge(e) => e.compute_mass(),
            Shape::Chain(chain) => {
                // Chains are static boundaries; like edges they are massless.
                let center =
                    chain.vertices.iter().sum::<Vec2>() / chain.vertices.len().max(1) as f32;
                MassData {
                    mass: 0.0,
                    center,
                    inertia: 0.0,
                }
            }
        }
    }

    /// Point containment test (solid shapes only; edges and chains have no
    /// interior).
    #[must_use]
    pub fn test_point(&self, xf: Transform, p: Vec2) -> bool {
        match self {
            Shape::Circle(c) => {
                let center = xf.apply(c.center);
                (p - center).length_squared() <= c.radius * c.radius
            }
            Shape::Polygon(poly) => poly.test_point(xf, p),
            Shape::Edge(_) | Shape::Chain(_) => false,
        }
    }

    /// Cast a segment against the given child.
    #[must_use]
    pub fn ray_cast(
        &self,
        input: &RayCastInput,
        xf: Transform,
        child: usize,
    ) -> Option<RayCastOutput> {
        match self {
            Shape::Circle(c) => c.ray_cast(input, xf),
            Shape::Polygon(p) => p.ray_cast(input, xf),
            Shape::Edge(e) => e.ray_cast(input, xf),
            Shape::Chain(chain) => chain.child_edge(child).ray_cast(input, xf),
        }
    }
}

fn edge_aabb(e: &Edge, xf: Transform) -> Aabb {
    let v1 = xf.apply(e.v1);
    let v2 = xf.apply(e.v2);
    let r = Vec2::splat(POLYGON_RADIUS);
    Aabb::new(v1.min(v2) - r, v1.max(v2) + r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_circle_mass() {
        let circle = Circle::new(1.0);
        let md = Shape::Circle(circle).compute_mass(1.0);
        assert_relative_eq!(md.mass, core::f32::consts::PI, epsilon = 1e-5);
        assert_relative_eq!(md.inertia, 0.5 * core::f32::consts::PI, epsilon = 1e-5);
    }

    #[test]
    fn test_box_mass_matches_formula() {
        // 2x1 box, density 1: m = 2, I_center = m(w^2+h^2)/12.
        let b = Polygon::boxed(1.0, 0.5);
        let md = Shape::Polygon(b).compute_mass(1.0);
        assert_relative_eq!(md.mass, 2.0, epsilon = 1e-4);
        assert_relative_eq!(md.center.x, 0.0, epsilon = 1e-5);
        let expected_i = 2.0 * (4.0 + 1.0) / 12.0;
        assert_relative_eq!(md.inertia, expected_i, epsilon = 1e-3);
    }

    #[test]
    fn test_polygon_contains_point() {
        let b = Shape::Polygon(Polygon::boxed(1.0, 1.0));
        let xf = Transform::IDENTITY;
        assert!(b.test_point(xf, Vec2::new(0.5, 0.5)));
        assert!(!b.test_point(xf, Vec2::new(1.5, 0.0)));
    }

    #[test]
    fn test_polygon_ray_cast() {
        let b = Polygon::boxed(1.0, 1.0);
        let input = RayCastInput {
            p1: Vec2::new(-3.0, 0.0),
            p2: Vec2::new(3.0, 0.0),
            max_fraction: 1.0,
        };
        let hit = b.ray_cast(&input, Transform::IDENTITY).unwrap();
        assert_relative_eq!(hit.fraction, 2.0 / 6.0, epsilon = 1e-5);
        assert_relative_eq!(hit.normal.x, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_circle_ray_cast_miss_behind() {
        let c = Circle::new(1.0);
        let input = RayCastInput {
            p1: Vec2::new(3.0, 0.0),
            p2: Vec2::new(6.0, 0.0),
            max_fraction: 1.0,
        };
        assert!(c.ray_cast(&input, Transform::IDENTITY).is_none());
    }

    #[test]
    fn test_chain_children_and_ghosts() {
        let chain = Chain::new(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(3.0, 0.0),
        ]);
        assert_eq!(chain.child_count(), 3);
        let first = chain.child_edge(0);
        assert_eq!(first.v0, None);
        assert_eq!(first.v3, Some(Vec2::new(2.0, 0.0)));
        let middle = chain.child_edge(1);
        assert_eq!(middle.v0, Some(Vec2::new(0.0, 0.0)));
        assert_eq!(middle.v3, Some(Vec2::new(3.0, 0.0)));

        let ring = Chain::new_loop(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
        ]);
        assert_eq!(ring.child_count(), 3);
        let wrap = ring.child_edge(2);
        assert_eq!(wrap.v2, Vec2::new(0.0, 0.0));
        assert!(wrap.v0.is_some() && wrap.v3.is_some());
    }

    #[test]
    fn test_edge_aabb_has_skin() {
        let e = Shape::Edge(Edge::new(Vec2::ZERO, Vec2::new(2.0, 0.0)));
        let aabb = e.compute_aabb(Transform::IDENTITY, 0);
        assert!(aabb.lower.y < 0.0 && aabb.upper.y > 0.0);
    }
}
