//! GJK Closest-Distance Query
//!
//! Computes the distance between two convex shapes and the closest points
//! on each, using the GJK algorithm over a 1/2/3-vertex simplex. A
//! [`SimplexCache`] carries the converged simplex between calls so
//! repeated queries over nearby configurations (as in the time-of-impact
//! root finder) start warm and converge in one or two iterations.

use glam::Vec2;

use crate::math::{cross_vv, Transform};
use crate::settings::MAX_POLYGON_VERTICES;
use crate::shape::Shape;

/// A convex point cloud view of one shape child for GJK.
#[derive(Clone, Copy, Debug)]
pub struct DistanceProxy {
    vertices: [Vec2; MAX_POLYGON_VERTICES],
    count: usize,
    /// Skin radius around the point cloud.
    pub radius: f32,
}

impl DistanceProxy {
    /// Build a proxy for `shape`'s `child`.
    #[must_use]
    pub fn new(shape: &Shape, child: usize) -> Self {
        let mut vertices = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        let (count, radius) = match shape {
            Shape::Circle(c) => {
                vertices[0] = c.center;
                (1, c.radius)
            }
            Shape::Polygon(p) => {
                for (slot, &v) in vertices.iter_mut().zip(p.vertices.iter()) {
                    *slot = v;
                }
                (p.vertices.len(), shape.radius())
            }
            Shape::Edge(e) => {
                vertices[0] = e.v1;
                vertices[1] = e.v2;
                (2, shape.radius())
            }
            Shape::Chain(chain) => {
                let e = chain.child_edge(child);
                vertices[0] = e.v1;
                vertices[1] = e.v2;
                (2, shape.radius())
            }
        };
        Self {
            vertices,
            count,
            radius,
        }
    }

    /// Number of proxy vertices.
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Vertex by index.
    #[inline]
    #[must_use]
    pub fn vertex(&self, index: usize) -> Vec2 {
        self.vertices[index]
    }

    /// Index of the support vertex in direction `d`.
    #[must_use]
    pub fn support(&self, d: Vec2) -> usize {
        let mut best = 0;
        let mut best_value = self.vertices[0].dot(d);
        for i in 1..self.count {
            let value = self.vertices[i].dot(d);
            if value > best_value {
                best = i;
                best_value = value;
            }
        }
        best
    }
}

/// Warm-start state carried between distance calls.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimplexCache {
    /// Length or area metric of the cached simplex, used to detect
    /// degeneracy before reuse.
    pub metric: f32,
    /// Number of cached vertices (0 = cold start).
    pub count: usize,
    /// Support indices on proxy A.
    pub index_a: [u8; 3],
    /// Support indices on proxy B.
    pub index_b: [u8; 3],
}

/// Input to [`distance`].
#[derive(Clone, Copy, Debug)]
pub struct DistanceInput {
    /// Proxy for shape A.
    pub proxy_a: DistanceProxy,
    /// Proxy for shape B.
    pub proxy_b: DistanceProxy,
    /// World transform of A.
    pub transform_a: Transform,
    /// World transform of B.
    pub transform_b: Transform,
    /// Shrink the result by both skin radii when true.
    pub use_radii: bool,
}

/// Output of [`distance`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DistanceOutput {
    /// Closest point on A in world space.
    pub point_a: Vec2,
    /// Closest point on B in world space.
    pub point_b: Vec2,
    /// Distance between the closest points (0 when overlapping).
    pub distance: f32,
    /// GJK iterations used.
    pub iterations: usize,
}

#[derive(Clone, Copy, Default)]
struct SimplexVertex {
    w_a: Vec2,
    w_b: Vec2,
    w: Vec2,
    a: f32,
    index_a: usize,
    index_b: usize,
}

#[derive(Clone, Copy, Default)]
struct Simplex {
    v: [SimplexVertex; 3],
    count: usize,
}

impl Simplex {
    fn read_cache(
        cache: &SimplexCache,
        proxy_a: &DistanceProxy,
        xf_a: Transform,
        proxy_b: &DistanceProxy,
        xf_b: Transform,
    ) -> Self {
        let mut simplex = Simplex::default();
        simplex.count = cache.count;
        for i in 0..simplex.count {
            let v = &mut simplex.v[i];
            v.index_a = cache.index_a[i] as usize;
            v.index_b = cache.index_b[i] as usize;
            v.w_a = xf_a.apply(proxy_a.vertex(v.index_a));
            v.w_b = xf_b.apply(proxy_b.vertex(v.index_b));
            v.w = v.w_b - v.w_a;
            v.a = 0.0;
        }

        // A cached simplex whose metric collapsed is worse than a cold start.
        if simplex.count > 1 {
            let metric1 = cache.metric;
            let metric2 = simplex.metric();
            if metric2 < 0.5 * metric1 || 2.0 * metric1 < metric2 || metric2 < f32::EPSILON {
                simplex.count = 0;
            }
        }

        if simplex.count == 0 {
            let v = &mut simplex.v[0];
            v.index_a = 0;
            v.index_b = 0;
            v.w_a = xf_a.apply(proxy_a.vertex(0));
            v.w_b = xf_b.apply(proxy_b.vertex(0));
            v.w = v.w_b - v.w_a;
            v.a = 1.0;
            simplex.count = 1;
        }
        simplex
    }

    fn write_cache(&self, cache: &mut SimplexCache) {
        cache.metric = self.metric();
        cache.count = self.count;
        for i in 0..self.count {
            cache.index_a[i] = self.v[i].index_a as u8;
            cache.index_b[i] = self.v[i].index_b as u8;
        }
    }

    fn search_direction(&self) -> Vec2 {
        match self.count {
            1 => -self.v[0].w,
            2 => {
                let e12 = self.v[1].w - self.v[0].w;
                let sgn = cross_vv(e12, -self.v[0].w);
                if sgn > 0.0 {
                    // Origin is left of e12.
                    Vec2::new(-e12.y, e12.x)
                } else {
                    Vec2::new(e12.y, -e12.x)
                }
            }
            _ => Vec2::ZERO,
        }
    }

    fn closest_point(&self) -> Vec2 {
        match self.count {
            1 => self.v[0].w,
            2 => self.v[0].a * self.v[0].w + self.v[1].a * self.v[1].w,
            _ => Vec2::ZERO,
        }
    }

    fn witness_points(&self) -> (Vec2, Vec2) {
        match self.count {
            1 => (self.v[0].w_a, self.v[0].w_b),
            2 => (
                self.v[0].a * self.v[0].w_a + self.v[1].a * self.v[1].w_a,
                self.v[0].a * self.v[0].w_b + self.v[1].a * self.v[1].w_b,
            ),
            _ => {
                let p = self.v[0].a * self.v[0].w_a
                    + self.v[1].a * self.v[1].w_a
                    + self.v[2].a * self.v[2].w_a;
                (p, p)
            }
        }
    }

    fn metric(&self) -> f32 {
        match self.count {
            1 => 0.0,
            2 => self.v[0].w.distance(self.v[1].w),
            3 => cross_vv(self.v[1].w - self.v[0].w, self.v[2].w - self.v[0].w),
            _ => 0.0,
        }
    }

    // Closest point on segment v0-v1 to the origin, reduced barycentrically.
    fn solve2(&mut self) {
        let w1 = self.v[0].w;
        let w2 = self.v[1].w;
        let e12 = w2 - w1;

        let d12_2 = -w1.dot(e12);
        if d12_2 <= 0.0 {
            self.v[0].a = 1.0;
            self.count = 1;
            return;
        }

        let d12_1 = w2.dot(e12);
        if d12_1 <= 0.0 {
            self.v[0] = self.v[1];
            self.v[0].a = 1.0;
            self.count = 1;
            return;
        }

        let inv_d12 = 1.0 / (d12_1 + d12_2);
        self.v[0].a = d12_1 * inv_d12;
        self.v[1].a = d12_2 * inv_d12;
        self.count = 2;
    }

    // Closest point on triangle v0-v1-v2 to the origin.
    fn solve3(&mut self) {
        let w1 = self.v[0].w;
        let w2 = self.v[1].w;
        let w3 = self.v[2].w;

        let e12 = w2 - w1;
        let w1e12 = w1.dot(e12);
        let w2e12 = w2.dot(e12);
        let d12_1 = w2e12;
        let d12_2 = -w1e12;

        let e13 = w3 - w1;
        let w1e13 = w1.dot(e13);
        let w3e13 = w3.dot(e13);
        let d13_1 = w3e13;
        let d13_2 = -w1e13;

        let e23 = w3 - w2;
        let w2e23 = w2.dot(e23);
        let w3e23 = w3.dot(e23);
        let d23_1 = w3e23;
        let d23_2 = -w2e23;

        let n123 = cross_vv(e12, e13);
        let d123_1 = n123 * cross_vv(w2, w3);
        let d123_2 = n123 * cross_vv(w3, w1);
        let d123_3 = n123 * cross_vv(w1, w2);

        // Vertex w1 region.
        if d12_2 <= 0.0 && d13_2 <= 0.0 {
            self.v[0].a = 1.0;
            self.count = 1;
            return;
        }

        // Edge w1-w2 region.
        if d12_1 > 0.0 && d12_2 > 0.0 && d123_3 <= 0.0 {
            let inv_d12 = 1.0 / (d12_1 + d12_2);
            self.v[0].a = d12_1 * inv_d12;
            self.v[1].a = d12_2 * inv_d12;
            self.count = 2;
            return;
        }

        // Edge w1-w3 region.
        if d13_1 > 0.0 && d13_2 > 0.0 && d123_2 <= 0.0 {
            let inv_d13 = 1.0 / (d13_1 + d13_2);
            self.v[0].a = d13_1 * inv_d13;
            self.v[2].a = d13_2 * inv_d13;
            self.count = 2;
            self.v[1] = self.v[2];
            return;
        }

        // Vertex w2 region.
        if d12_1 <= 0.0 && d23_2 <= 0.0 {
            self.v[0] = self.v[1];
            self.v[0].a = 1.0;
            self.count = 1;
            return;
        }

        // Vertex w3 region.
        if d13_1 <= 0.0 && d23_1 <= 0.0 {
            self.v[0] = self.v[2];
            self.v[0].a = 1.0;
            self.count = 1;
            return;
        }

        // Edge w2-w3 region.
        if d23_1 > 0.0 && d23_2 > 0.0 && d123_1 <= 0.0 {
            let inv_d23 = 1.0 / (d23_1 + d23_2);
            self.v[1].a = d23_1 * inv_d23;
            self.v[2].a = d23_2 * inv_d23;
            self.count = 2;
            self.v[0] = self.v[2];
            return;
        }

        // Interior: the origin is inside the triangle.
        let inv_d123 = 1.0 / (d123_1 + d123_2 + d123_3);
        self.v[0].a = d123_1 * inv_d123;
        self.v[1].a = d123_2 * inv_d123;
        self.v[2].a = d123_3 * inv_d123;
        self.count = 3;
    }
}

const MAX_ITERATIONS: usize = 20;

/// Compute the closest distance between two convex proxies.
pub fn distance(cache: &mut SimplexCache, input: &DistanceInput) -> DistanceOutput {
    let proxy_a = &input.proxy_a;
    let proxy_b = &input.proxy_b;
    let xf_a = input.transform_a;
    let xf_b = input.transform_b;

    let mut simplex = Simplex::read_cache(cache, proxy_a, xf_a, proxy_b, xf_b);

    let mut iter = 0;
    let mut save_a = [0usize; 3];
    let mut save_b = [0usize; 3];

    while iter < MAX_ITERATIONS {
        let save_count = simplex.count;
        for i in 0..save_count {
            save_a[i] = simplex.v[i].index_a;
            save_b[i] = simplex.v[i].index_b;
        }

        match simplex.count {
            2 => simplex.solve2(),
            3 => simplex.solve3(),
            _ => {}
        }

        // Interior simplex encloses the origin: overlapping.
        if simplex.count == 3 {
            break;
        }

        let d = simplex.search_direction();
        if d.length_squared() < f32::EPSILON * f32::EPSILON {
            // The origin sits on a simplex feature; touching, not
            // penetrating. Bail without adding a duplicate vertex.
            break;
        }

        let vertex = &mut simplex.v[simplex.count];
        vertex.index_a = proxy_a.support(xf_a.q.apply_inverse(-d));
        vertex.w_a = xf_a.apply(proxy_a.vertex(vertex.index_a));
        vertex.index_b = proxy_b.support(xf_b.q.apply_inverse(d));
        vertex.w_b = xf_b.apply(proxy_b.vertex(vertex.index_b));
        vertex.w = vertex.w_b - vertex.w_a;

        iter += 1;

        // A repeated support vertex means we have converged.
        let mut duplicate = false;
        for i in 0..save_count {
            if vertex.index_a == save_a[i] && vertex.index_b == save_b[i] {
                duplicate = true;
                break;
            }
        }
        if duplicate {
            break;
        }

        simplex.count += 1;
    }

    let (mut point_a, mut point_b) = simplex.witness_points();
    let mut dist = point_a.distance(point_b);
    simplex.write_cache(cache);

    if input.use_radii {
        let r_a = proxy_a.radius;
        let r_b = proxy_b.radius;
        if dist > r_a + r_b && dist > f32::EPSILON {
            // Shrink both witness points toward each other by the radii.
            dist -= r_a + r_b;
            let normal = (point_b - point_a).normalize();
            point_a += r_a * normal;
            point_b -= r_b * normal;
        } else {
            // The skinned shapes overlap; collapse to a shared midpoint.
            let p = 0.5 * (point_a + point_b);
            point_a = p;
            point_b = p;
            dist = 0.0;
        }
    }

    DistanceOutput {
        point_a,
        point_b,
        distance: dist,
        iterations: iter,
    }
}

/// Overlap test through GJK, used for sensor touching and diagnostics.
#[must_use]
pub fn test_overlap(
    shape_a: &Shape,
    child_a: usize,
    shape_b: &Shape,
    child_b: usize,
    xf_a: Transform,
    xf_b: Transform,
) -> bool {
    let input = DistanceInput {
        proxy_a: DistanceProxy::new(shape_a, child_a),
        proxy_b: DistanceProxy::new(shape_b, child_b),
        transform_a: xf_a,
        transform_b: xf_b,
        use_radii: true,
    };
    let mut cache = SimplexCache::default();
    let output = distance(&mut cache, &input);
    output.distance < 10.0 * f32::EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{Circle, Polygon};
    use approx::assert_relative_eq;

    fn query(shape_a: &Shape, xf_a: Transform, shape_b: &Shape, xf_b: Transform) -> DistanceOutput {
        let input = DistanceInput {
            proxy_a: DistanceProxy::new(shape_a, 0),
            proxy_b: DistanceProxy::new(shape_b, 0),
            transform_a: xf_a,
            transform_b: xf_b,
            use_radii: true,
        };
        let mut cache = SimplexCache::default();
        distance(&mut cache, &input)
    }

    #[test]
    fn test_circle_circle_distance() {
        let a = Shape::Circle(Circle::new(1.0));
        let b = Shape::Circle(Circle::new(1.0));
        let out = query(
            &a,
            Transform::IDENTITY,
            &b,
            Transform::new(Vec2::new(5.0, 0.0), 0.0),
        );
        assert_relative_eq!(out.distance, 3.0, epsilon = 1e-4);
        assert_relative_eq!(out.point_a.x, 1.0, epsilon = 1e-4);
        assert_relative_eq!(out.point_b.x, 4.0, epsilon = 1e-4);
    }

    #[test]
    fn test_box_box_distance() {
        let a = Shape::Polygon(Polygon::boxed(1.0, 1.0));
        let b = Shape::Polygon(Polygon::boxed(1.0, 1.0));
        let out = query(
            &a,
            Transform::IDENTITY,
            &b,
            Transform::new(Vec2::new(5.0, 0.0), 0.0),
        );
        // Face gap of 3 minus both polygon skins.
        assert_relative_eq!(
            out.distance,
            3.0 - 2.0 * crate::settings::POLYGON_RADIUS,
            epsilon = 1e-3
        );
    }

    #[test]
    fn test_overlapping_reports_zero() {
        let a = Shape::Circle(Circle::new(1.0));
        let b = Shape::Circle(Circle::new(1.0));
        let out = query(
            &a,
            Transform::IDENTITY,
            &b,
            Transform::new(Vec2::new(1.0, 0.0), 0.0),
        );
        assert_eq!(out.distance, 0.0);
    }

    #[test]
    fn test_test_overlap() {
        let a = Shape::Polygon(Polygon::boxed(1.0, 1.0));
        let b = Shape::Circle(Circle::new(0.5));
        assert!(test_overlap(
            &a,
            0,
            &b,
            0,
            Transform::IDENTITY,
            Transform::new(Vec2::new(1.2, 0.0), 0.0),
        ));
        assert!(!test_overlap(
            &a,
            0,
            &b,
            0,
            Transform::IDENTITY,
            Transform::new(Vec2::new(3.0, 0.0), 0.0),
        ));
    }
}
