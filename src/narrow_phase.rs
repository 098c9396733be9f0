//! Narrow-Phase Manifold Generation
//!
//! Evaluates a contact manifold for every shape pairing. Dispatch is an
//! exhaustive `match` over the closed [`Shape`] enum, so a pairing without
//! a collision routine is unrepresentable. Pairs of zero-area shapes
//! (edge/chain against edge/chain) legitimately produce no manifold.
//!
//! Polygon-polygon uses SAT over face normals plus incident-edge clipping;
//! the resulting points carry feature ids that stay stable while the same
//! faces remain in contact, which is what lets the contact solver transfer
//! cached impulses across steps.

use glam::Vec2;

use crate::collision::{
    clip_segment_to_line, ClipVertex, ContactId, FeatureKind, Manifold, ManifoldKind,
};
use crate::math::{cross_vs, Transform};
use crate::settings::LINEAR_SLOP;
use crate::shape::{Circle, Edge, Polygon, Shape};

/// Collision ordering rank; the higher-ranked shape takes the A slot so
/// every routine sees its canonical argument order.
#[inline]
#[must_use]
pub fn shape_rank(shape: &Shape) -> u8 {
    match shape {
        Shape::Circle(_) => 0,
        Shape::Polygon(_) => 1,
        Shape::Edge(_) => 2,
        Shape::Chain(_) => 3,
    }
}

/// Can this shape pairing produce contact points at all?
///
/// Edges and chains have no interior, so pairs of them never collide and
/// the contact manager skips creating a contact.
#[must_use]
pub fn can_collide(shape_a: &Shape, shape_b: &Shape) -> bool {
    !(shape_rank(shape_a) >= 2 && shape_rank(shape_b) >= 2)
}

/// Evaluate the manifold for an arbitrary shape pairing.
#[must_use]
pub fn evaluate(
    shape_a: &Shape,
    child_a: usize,
    xf_a: Transform,
    shape_b: &Shape,
    child_b: usize,
    xf_b: Transform,
) -> Manifold {
    if shape_rank(shape_a) < shape_rank(shape_b) {
        return flip(&evaluate(shape_b, child_b, xf_b, shape_a, child_a, xf_a));
    }

    match (shape_a, shape_b) {
        (Shape::Circle(a), Shape::Circle(b)) => collide_circles(a, xf_a, b, xf_b),
        (Shape::Polygon(a), Shape::Circle(b)) => collide_polygon_and_circle(a, xf_a, b, xf_b),
        (Shape::Polygon(a), Shape::Polygon(b)) => collide_polygons(a, xf_a, b, xf_b),
        (Shape::Edge(a), Shape::Circle(b)) => collide_edge_and_circle(a, xf_a, b, xf_b),
        (Shape::Edge(a), Shape::Polygon(b)) => collide_edge_and_polygon(a, xf_a, b, xf_b),
        (Shape::Chain(a), Shape::Circle(b)) => {
            collide_edge_and_circle(&a.child_edge(child_a), xf_a, b, xf_b)
        }
        (Shape::Chain(a), Shape::Polygon(b)) => {
            collide_edge_and_polygon(&a.child_edge(child_a), xf_a, b, xf_b)
        }
        // Zero-area vs zero-area: no contact.
        _ => Manifold::default(),
    }
}

/// Swap the A/B roles of a manifold.
fn flip(m: &Manifold) -> Manifold {
    let mut out = *m;
    for p in out.points.iter_mut() {
        p.id = p.id.swapped();
    }
    match m.kind {
        ManifoldKind::Circles => {
            // local_point holds A's center, points[0] B's; swap them.
            if m.point_count > 0 {
                out.local_point = m.points[0].local_point;
                out.points[0].local_point = m.local_point;
            }
        }
        ManifoldKind::FaceA => out.kind = ManifoldKind::FaceB,
        ManifoldKind::FaceB => out.kind = ManifoldKind::FaceA,
    }
    out
}

// ============================================================================
// Circle vs circle
// ============================================================================

/// Circle-circle manifold.
#[must_use]
pub fn collide_circles(a: &Circle, xf_a: Transform, b: &Circle, xf_b: Transform) -> Manifold {
    let mut manifold = Manifold::default();

    let p_a = xf_a.apply(a.center);
    let p_b = xf_b.apply(b.center);
    let d = p_b - p_a;
    let dist_sqr = d.length_squared();
    let radius = a.radius + b.radius;
    if dist_sqr > radius * radius {
        return manifold;
    }

    manifold.kind = ManifoldKind::Circles;
    manifold.local_point = a.center;
    manifold.local_normal = Vec2::ZERO;
    manifold.point_count = 1;
    manifold.points[0].local_point = b.center;
    manifold.points[0].id = ContactId::default();
    manifold
}

// ============================================================================
// Polygon vs circle
// ============================================================================

/// Polygon-circle manifold (polygon in the A slot).
#[must_use]
pub fn collide_polygon_and_circle(
    poly: &Polygon,
    xf_a: Transform,
    circle: &Circle,
    xf_b: Transform,
) -> Manifold {
    let mut manifold = Manifold::default();

    // Circle center in the polygon's frame.
    let c = xf_b.apply(circle.center);
    let c_local = xf_a.apply_inverse(c);

    let radius = crate::settings::POLYGON_RADIUS + circle.radius;
    let count = poly.vertices.len();

    let mut normal_index = 0;
    let mut separation = f32::MIN;
    for i in 0..count {
        let s = poly.normals[i].dot(c_local - poly.vertices[i]);
        if s > radius {
            return manifold;
        }
        if s > separation {
            separation = s;
            normal_index = i;
        }
    }

    let v1 = poly.vertices[normal_index];
    let v2 = poly.vertices[(normal_index + 1) % count];

    if separation < f32::EPSILON {
        // Center inside the polygon: use the face normal directly.
        manifold.point_count = 1;
        manifold.kind = ManifoldKind::FaceA;
        manifold.local_normal = poly.normals[normal_index];
        manifold.local_point = 0.5 * (v1 + v2);
        manifold.points[0].local_point = circle.center;
        manifold.points[0].id = ContactId::default();
        return manifold;
    }

    // Voronoi regions of the reference face.
    let u1 = (c_local - v1).dot(v2 - v1);
    let u2 = (c_local - v2).dot(v1 - v2);
    if u1 <= 0.0 {
        if c_local.distance_squared(v1) > radius * radius {
            return manifold;
        }
        manifold.point_count = 1;
        manifold.kind = ManifoldKind::FaceA;
        manifold.local_normal = (c_local - v1).normalize_or_zero();
        manifold.local_point = v1;
    } else if u2 <= 0.0 {
        if c_local.distance_squared(v2) > radius * radius {
            return manifold;
        }
        manifold.point_count = 1;
        manifold.kind = ManifoldKind::FaceA;
        manifold.local_normal = (c_local - v2).normalize_or_zero();
        manifold.local_point = v2;
    } else {
        let face_center = 0.5 * (v1 + v2);
        if (c_local - face_center).dot(poly.normals[normal_index]) > radius {
            return manifold;
        }
        manifold.point_count = 1;
        manifold.kind = ManifoldKind::FaceA;
        manifold.local_normal = poly.normals[normal_index];
        manifold.local_point = face_center;
    }
    manifold.points[0].local_point = circle.center;
    manifold.points[0].id = ContactId::default();
    manifold
}

// ============================================================================
// Polygon vs polygon
// ============================================================================

/// Highest separation of `poly2` from `poly1`'s faces, and the face index.
fn find_max_separation(
    poly1: &Polygon,
    xf1: Transform,
    poly2: &Polygon,
    xf2: Transform,
) -> (f32, usize) {
    // Work in poly2's frame.
    let xf = xf2.mul_t(xf1);

    let mut best_index = 0;
    let mut max_separation = f32::MIN;
    for i in 0..poly1.vertices.len() {
        let n = xf.q.apply(poly1.normals[i]);
        let v1 = xf.apply(poly1.vertices[i]);

        let mut si = f32::MAX;
        for &v2 in &poly2.vertices {
            si = si.min(n.dot(v2 - v1));
        }

        if si > max_separation {
            max_separation = si;
            best_index = i;
        }
    }
    (max_separation, best_index)
}

/// The edge on `poly2` most anti-parallel to `poly1`'s `edge1` normal.
fn find_incident_edge(
    poly1: &Polygon,
    xf1: Transform,
    edge1: usize,
    poly2: &Polygon,
    xf2: Transform,
) -> [ClipVertex; 2] {
    let normal1 = xf2.q.apply_inverse(xf1.q.apply(poly1.normals[edge1]));

    let count2 = poly2.vertices.len();
    let mut index = 0;
    let mut min_dot = f32::MAX;
    for (i, &n) in poly2.normals.iter().enumerate() {
        let dot = normal1.dot(n);
        if dot < min_dot {
            min_dot = dot;
            index = i;
        }
    }

    let i1 = index;
    let i2 = (index + 1) % count2;

    [
        ClipVertex {
            v: xf2.apply(poly2.vertices[i1]),
            id: ContactId {
                index_a: edge1 as u8,
                index_b: i1 as u8,
                kind_a: FeatureKind::Face,
                kind_b: FeatureKind::Vertex,
            },
        },
        ClipVertex {
            v: xf2.apply(poly2.vertices[i2]),
            id: ContactId {
                index_a: edge1 as u8,
                index_b: i2 as u8,
                kind_a: FeatureKind::Face,
                kind_b: FeatureKind::Vertex,
            },
        },
    ]
}

/// Polygon-polygon manifold via SAT and incident-edge clipping.
#[must_use]
pub fn collide_polygons(
    poly_a: &Polygon,
    xf_a: Transform,
    poly_b: &Polygon,
    xf_b: Transform,
) -> Manifold {
    let mut manifold = Manifold::default();
    let total_radius = 2.0 * crate::settings::POLYGON_RADIUS;

    let (separation_a, edge_a) = find_max_separation(poly_a, xf_a, poly_b, xf_b);
    if separation_a > total_radius {
        return manifold;
    }

    let (separation_b, edge_b) = find_max_separation(poly_b, xf_b, poly_a, xf_a);
    if separation_b > total_radius {
        return manifold;
    }

    let k_tol = 0.1 * LINEAR_SLOP;
    let (poly1, poly2, xf1, xf2, edge1, flip_roles) = if separation_b > separation_a + k_tol {
        (poly_b, poly_a, xf_b, xf_a, edge_b, true)
    } else {
        (poly_a, poly_b, xf_a, xf_b, edge_a, false)
    };

    let incident_edge = find_incident_edge(poly1, xf1, edge1, poly2, xf2);

    let count1 = poly1.vertices.len();
    let iv1 = edge1;
    let iv2 = (edge1 + 1) % count1;

    let mut v11 = poly1.vertices[iv1];
    let mut v12 = poly1.vertices[iv2];

    let local_tangent = (v12 - v11).normalize_or_zero();
    let local_normal = cross_vs(local_tangent, 1.0);
    let plane_point = 0.5 * (v11 + v12);

    let tangent = xf1.q.apply(local_tangent);
    let normal = cross_vs(tangent, 1.0);

    v11 = xf1.apply(v11);
    v12 = xf1.apply(v12);

    let front_offset = normal.dot(v11);
    let side_offset1 = -tangent.dot(v11) + total_radius;
    let side_offset2 = tangent.dot(v12) + total_radius;

    let mut clip_points1 = [ClipVertex::default(); 2];
    let mut clip_points2 = [ClipVertex::default(); 2];

    let np = clip_segment_to_line(
        &mut clip_points1,
        &incident_edge,
        -tangent,
        side_offset1,
        iv1 as u8,
    );
    if np < 2 {
        return manifold;
    }

    let np = clip_segment_to_line(
        &mut clip_points2,
        &clip_points1,
        tangent,
        side_offset2,
        iv2 as u8,
    );
    if np < 2 {
        return manifold;
    }

    manifold.local_normal = local_normal;
    manifold.local_point = plane_point;
    manifold.kind = if flip_roles {
        ManifoldKind::FaceB
    } else {
        ManifoldKind::FaceA
    };

    let mut point_count = 0;
    for cv in &clip_points2 {
        let separation = normal.dot(cv.v) - front_offset;
        if separation <= total_radius {
            let cp = &mut manifold.points[point_count];
            cp.local_point = xf2.apply_inverse(cv.v);
            cp.id = if flip_roles { cv.id.swapped() } else { cv.id };
            point_count += 1;
        }
    }
    manifold.point_count = point_count;
    manifold
}

// ============================================================================
// Edge vs circle
// ============================================================================

/// Edge-circle manifold with ghost-vertex suppression at chain joins.
#[must_use]
pub fn collide_edge_and_circle(
    edge: &Edge,
    xf_a: Transform,
    circle: &Circle,
    xf_b: Transform,
) -> Manifold {
    let mut manifold = Manifold::default();

    // Circle center in the edge's frame.
    let q = xf_a.apply_inverse(xf_b.apply(circle.center));

    let a = edge.v1;
    let b = edge.v2;
    let e = b - a;

    // Barycentric coordinates of q on the segment.
    let u = e.dot(b - q);
    let v = e.dot(q - a);

    let radius = crate::settings::POLYGON_RADIUS + circle.radius;

    // Region A: closest to the start vertex.
    if v <= 0.0 {
        let d = q - a;
        if d.length_squared() > radius * radius {
            return manifold;
        }

        // A ghost vertex before A means the previous segment owns this
        // region; emitting a point here would double-collide the join.
        if let Some(v0) = edge.v0 {
            let e1 = a - v0;
            if e1.dot(a - q) > 0.0 {
                return manifold;
            }
        }

        manifold.kind = ManifoldKind::Circles;
        manifold.local_normal = Vec2::ZERO;
        manifold.local_point = a;
        manifold.point_count = 1;
        manifold.points[0].local_point = circle.center;
        manifold.points[0].id = ContactId {
            index_a: 0,
            index_b: 0,
            kind_a: FeatureKind::Vertex,
            kind_b: FeatureKind::Vertex,
        };
        return manifold;
    }

    // Region B: closest to the end vertex.
    if u <= 0.0 {
        let d = q - b;
        if d.length_squared() > radius * radius {
            return manifold;
        }

        if let Some(v3) = edge.v3 {
            let e2 = v3 - b;
            if e2.dot(q - b) > 0.0 {
                return manifold;
            }
        }

        manifold.kind = ManifoldKind::Circles;
        manifold.local_normal = Vec2::ZERO;
        manifold.local_point = b;
        manifold.point_count = 1;
        manifold.points[0].local_point = circle.center;
        manifold.points[0].id = ContactId {
            index_a: 1,
            index_b: 0,
            kind_a: FeatureKind::Vertex,
            kind_b: FeatureKind::Vertex,
        };
        return manifold;
    }

    // Region AB: closest to the segment interior.
    let den = e.length_squared();
    debug_assert!(den > 0.0);
    let p = (1.0 / den) * (u * a + v * b);
    let d = q - p;
    if d.length_squared() > radius * radius {
        return manifold;
    }

    let mut n = Vec2::new(-e.y, e.x);
    if n.dot(q - a) < 0.0 {
        n = -n;
    }
    let n = n.normalize_or_zero();

    manifold.kind = ManifoldKind::FaceA;
    manifold.local_normal = n;
    manifold.local_point = a;
    manifold.point_count = 1;
    manifold.points[0].local_point = circle.center;
    manifold.points[0].id = ContactId {
        index_a: 0,
        index_b: 0,
        kind_a: FeatureKind::Face,
        kind_b: FeatureKind::Vertex,
    };
    manifold
}

// ============================================================================
// Edge vs polygon
// ============================================================================

/// Edge-polygon manifold. The edge is treated as a two-vertex polygon and
/// run through the SAT/clipping path, which handles both face cases.
#[must_use]
pub fn collide_edge_and_polygon(
    edge: &Edge,
    xf_a: Transform,
    poly: &Polygon,
    xf_b: Transform,
) -> Manifold {
    let edge_poly = Polygon::from_edge(edge);
    collide_polygons(&edge_poly, xf_a, poly, xf_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::WorldManifold;
    use approx::assert_relative_eq;

    #[test]
    fn test_circles_touching() {
        let a = Circle::new(1.0);
        let b = Circle::new(1.0);
        let m = collide_circles(
            &a,
            Transform::IDENTITY,
            &b,
            Transform::new(Vec2::new(1.5, 0.0), 0.0),
        );
        assert_eq!(m.point_count, 1);

        let wm = WorldManifold::new(
            &m,
            Transform::IDENTITY,
            1.0,
            Transform::new(Vec2::new(1.5, 0.0), 0.0),
            1.0,
        );
        assert_relative_eq!(wm.normal.x, 1.0);
        assert_relative_eq!(wm.separations[0], -0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_circles_apart() {
        let a = Circle::new(1.0);
        let b = Circle::new(1.0);
        let m = collide_circles(
            &a,
            Transform::IDENTITY,
            &b,
            Transform::new(Vec2::new(3.0, 0.0), 0.0),
        );
        assert_eq!(m.point_count, 0);
    }

    #[test]
    fn test_box_box_face_contact_two_points() {
        let a = Polygon::boxed(1.0, 1.0);
        let b = Polygon::boxed(1.0, 1.0);
        // Stacked with slight overlap.
        let m = collide_polygons(
            &a,
            Transform::IDENTITY,
            &b,
            Transform::new(Vec2::new(0.0, 1.9), 0.0),
        );
        assert_eq!(m.point_count, 2);

        let wm = WorldManifold::new(
            &m,
            Transform::IDENTITY,
            crate::settings::POLYGON_RADIUS,
            Transform::new(Vec2::new(0.0, 1.9), 0.0),
            crate::settings::POLYGON_RADIUS,
        );
        assert_relative_eq!(wm.normal.y, 1.0, epsilon = 1e-5);
        assert!(wm.separations[0] < 0.0 && wm.separations[1] < 0.0);
    }

    #[test]
    fn test_box_box_ids_stable_across_small_motion() {
        let a = Polygon::boxed(1.0, 1.0);
        let b = Polygon::boxed(1.0, 1.0);
        let m1 = collide_polygons(
            &a,
            Transform::IDENTITY,
            &b,
            Transform::new(Vec2::new(0.0, 1.9), 0.0),
        );
        let m2 = collide_polygons(
            &a,
            Transform::IDENTITY,
            &b,
            Transform::new(Vec2::new(0.01, 1.9), 0.0),
        );
        assert_eq!(m1.point_count, 2);
        assert_eq!(m2.point_count, 2);
        assert_eq!(m1.points[0].id, m2.points[0].id);
        assert_eq!(m1.points[1].id, m2.points[1].id);
    }

    #[test]
    fn test_polygon_circle() {
        let poly = Polygon::boxed(1.0, 1.0);
        let circle = Circle::new(0.5);
        let m = collide_polygon_and_circle(
            &poly,
            Transform::IDENTITY,
            &circle,
            Transform::new(Vec2::new(1.3, 0.0), 0.0),
        );
        assert_eq!(m.point_count, 1);
        assert_eq!(m.kind, ManifoldKind::FaceA);
        assert_relative_eq!(m.local_normal.x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_edge_circle_interior() {
        let edge = Edge::new(Vec2::new(-2.0, 0.0), Vec2::new(2.0, 0.0));
        let circle = Circle::new(0.5);
        let m = collide_edge_and_circle(
            &edge,
            Transform::IDENTITY,
            &circle,
            Transform::new(Vec2::new(0.0, 0.4), 0.0),
        );
        assert_eq!(m.point_count, 1);
        assert_eq!(m.kind, ManifoldKind::FaceA);
        assert_relative_eq!(m.local_normal.y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_edge_circle_ghost_suppression() {
        // Circle sits past the start vertex; a ghost there means the
        // neighbor segment owns the collision.
        let mut edge = Edge::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 0.0));
        edge.v0 = Some(Vec2::new(-2.0, 0.0));
        let circle = Circle::new(0.5);
        let m = collide_edge_and_circle(
            &edge,
            Transform::IDENTITY,
            &circle,
            Transform::new(Vec2::new(-0.3, 0.1), 0.0),
        );
        assert_eq!(m.point_count, 0);

        // Without the ghost the vertex collides.
        let bare = Edge::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 0.0));
        let m = collide_edge_and_circle(
            &bare,
            Transform::IDENTITY,
            &circle,
            Transform::new(Vec2::new(-0.3, 0.1), 0.0),
        );
        assert_eq!(m.point_count, 1);
    }

    #[test]
    fn test_edge_polygon() {
        let edge = Edge::new(Vec2::new(-2.0, 0.0), Vec2::new(2.0, 0.0));
        let poly = Polygon::boxed(0.5, 0.5);
        let m = collide_edge_and_polygon(
            &edge,
            Transform::IDENTITY,
            &poly,
            Transform::new(Vec2::new(0.0, 0.49), 0.0),
        );
        assert!(m.point_count > 0);
    }

    #[test]
    fn test_evaluate_flips_to_canonical_order() {
        // Circle in the A slot against a polygon must still produce points.
        let circle = Shape::Circle(Circle::new(0.5));
        let poly = Shape::Polygon(Polygon::boxed(1.0, 1.0));
        let m = evaluate(
            &circle,
            0,
            Transform::new(Vec2::new(1.3, 0.0), 0.0),
            &poly,
            0,
            Transform::IDENTITY,
        );
        assert_eq!(m.point_count, 1);
        assert_eq!(m.kind, ManifoldKind::FaceB);
    }

    #[test]
    fn test_edge_edge_never_collides() {
        let a = Shape::Edge(Edge::new(Vec2::ZERO, Vec2::new(1.0, 0.0)));
        let b = Shape::Edge(Edge::new(Vec2::ZERO, Vec2::new(0.0, 1.0)));
        assert!(!can_collide(&a, &b));
        let m = evaluate(&a, 0, Transform::IDENTITY, &b, 0, Transform::IDENTITY);
        assert_eq!(m.point_count, 0);
    }
}
