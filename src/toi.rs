//! Time of Impact
//!
//! Conservative advancement between two swept convex shapes: find the
//! earliest time in `[0, t_max]` at which they reach a target separation
//! just above touching. The outer loop advances a lower bound `t1` while a
//! separation function (built from the GJK witness simplex) drives an inner
//! bisection/secant root finder toward the touching time.
//!
//! The target separation is held a few slops *above* zero so that the
//! follow-up discrete solve still sees a small gap to work with; driving
//! shapes to exact contact here would starve the position solver.

use glam::Vec2;

use crate::distance::{distance, DistanceInput, DistanceProxy, SimplexCache};
use crate::math::{cross_vs, Sweep};
use crate::settings::LINEAR_SLOP;

/// Input to [`time_of_impact`].
#[derive(Clone, Copy, Debug)]
pub struct ToiInput {
    /// Proxy for shape A.
    pub proxy_a: DistanceProxy,
    /// Proxy for shape B.
    pub proxy_b: DistanceProxy,
    /// Sweep of body A over the interval.
    pub sweep_a: Sweep,
    /// Sweep of body B over the interval.
    pub sweep_b: Sweep,
    /// Upper bound of the search interval, in `[0, 1]`.
    pub t_max: f32,
}

/// Classification of a TOI query result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToiState {
    /// The solver gave up (slow convergence or iteration cap).
    Failed,
    /// The shapes already overlap at the start of the interval.
    Overlapped,
    /// First touch found at `t`.
    Touching,
    /// The shapes never come within the target separation.
    Separated,
}

/// Output of [`time_of_impact`].
#[derive(Clone, Copy, Debug)]
pub struct ToiOutput {
    /// Result classification.
    pub state: ToiState,
    /// The time of impact (meaning depends on `state`).
    pub t: f32,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum SeparationKind {
    Points,
    FaceA,
    FaceB,
}

struct SeparationFunction<'a> {
    proxy_a: &'a DistanceProxy,
    proxy_b: &'a DistanceProxy,
    sweep_a: Sweep,
    sweep_b: Sweep,
    kind: SeparationKind,
    local_point: Vec2,
    axis: Vec2,
}

impl<'a> SeparationFunction<'a> {
    fn new(
        cache: &SimplexCache,
        proxy_a: &'a DistanceProxy,
        sweep_a: Sweep,
        proxy_b: &'a DistanceProxy,
        sweep_b: Sweep,
        t1: f32,
    ) -> Self {
        debug_assert!(cache.count > 0 && cache.count < 3);

        let xf_a = sweep_a.transform(t1);
        let xf_b = sweep_b.transform(t1);

        if cache.count == 1 {
            let local_point_a = proxy_a.vertex(cache.index_a[0] as usize);
            let local_point_b = proxy_b.vertex(cache.index_b[0] as usize);
            let point_a = xf_a.apply(local_point_a);
            let point_b = xf_b.apply(local_point_b);
            let axis = (point_b - point_a).normalize_or_zero();
            Self {
                proxy_a,
                proxy_b,
                sweep_a,
                sweep_b,
                kind: SeparationKind::Points,
                local_point: Vec2::ZERO,
                axis,
            }
        } else if cache.index_a[0] == cache.index_a[1] {
            // Two witness points on B, one on A: the separating feature is
            // a face of B.
            let local_point_b1 = proxy_b.vertex(cache.index_b[0] as usize);
            let local_point_b2 = proxy_b.vertex(cache.index_b[1] as usize);
            let mut axis = cross_vs(local_point_b2 - local_point_b1, 1.0).normalize_or_zero();
            let normal = xf_b.q.apply(axis);

            let local_point = 0.5 * (local_point_b1 + local_point_b2);
            let point_b = xf_b.apply(local_point);
            let local_point_a = proxy_a.vertex(cache.index_a[0] as usize);
            let point_a = xf_a.apply(local_point_a);

            let s = (point_a - point_b).dot(normal);
            if s < 0.0 {
                axis = -axis;
            }
            Self {
                proxy_a,
                proxy_b,
                sweep_a,
                sweep_b,
                kind: SeparationKind::FaceB,
                local_point,
                axis,
            }
        } else {
            // Two witness points on A: face of A.
            let local_point_a1 = proxy_a.vertex(cache.index_a[0] as usize);
            let local_point_a2 = proxy_a.vertex(cache.index_a[1] as usize);
            let mut axis = cross_vs(local_point_a2 - local_point_a1, 1.0).normalize_or_zero();
            let normal = xf_a.q.apply(axis);

            let local_point = 0.5 * (local_point_a1 + local_point_a2);
            let point_a = xf_a.apply(local_point);
            let local_point_b = proxy_b.vertex(cache.index_b[0] as usize);
            let point_b = xf_b.apply(local_point_b);

            let s = (point_b - point_a).dot(normal);
            if s < 0.0 {
                axis = -axis;
            }
            Self {
                proxy_a,
                proxy_b,
                sweep_a,
                sweep_b,
                kind: SeparationKind::FaceA,
                local_point,
                axis,
            }
        }
    }

    /// Minimum separation over all support pairs at time `t`, plus the pair
    /// realizing it.
    fn find_min_separation(&self, t: f32) -> (f32, usize, usize) {
        let xf_a = self.sweep_a.transform(t);
        let xf_b = self.sweep_b.transform(t);

        match self.kind {
            SeparationKind::Points => {
                let axis_a = xf_a.q.apply_inverse(self.axis);
                let axis_b = xf_b.q.apply_inverse(-self.axis);

                let index_a = self.proxy_a.support(axis_a);
                let index_b = self.proxy_b.support(axis_b);

                let point_a = xf_a.apply(self.proxy_a.vertex(index_a));
                let point_b = xf_b.apply(self.proxy_b.vertex(index_b));

                ((point_b - point_a).dot(self.axis), index_a, index_b)
            }
            SeparationKind::FaceA => {
                let normal = xf_a.q.apply(self.axis);
                let point_a = xf_a.apply(self.local_point);

                let axis_b = xf_b.q.apply_inverse(-normal);
                let index_b = self.proxy_b.support(axis_b);
                let point_b = xf_b.apply(self.proxy_b.vertex(index_b));

                ((point_b - point_a).dot(normal), usize::MAX, index_b)
            }
            SeparationKind::FaceB => {
                let normal = xf_b.q.apply(self.axis);
                let point_b = xf_b.apply(self.local_point);

                let axis_a = xf_a.q.apply_inverse(-normal);
                let index_a = self.proxy_a.support(axis_a);
                let point_a = xf_a.apply(self.proxy_a.vertex(index_a));

                ((point_a - point_b).dot(normal), index_a, usize::MAX)
            }
        }
    }

    /// Separation of a fixed support pair at time `t`.
    fn evaluate(&self, index_a: usize, index_b: usize, t: f32) -> f32 {
        let xf_a = self.sweep_a.transform(t);
        let xf_b = self.sweep_b.transform(t);

        match self.kind {
            SeparationKind::Points => {
                let point_a = xf_a.apply(self.proxy_a.vertex(index_a));
                let point_b = xf_b.apply(self.proxy_b.vertex(index_b));
                (point_b - point_a).dot(self.axis)
            }
            SeparationKind::FaceA => {
                let normal = xf_a.q.apply(self.axis);
                let point_a = xf_a.apply(self.local_point);
                let point_b = xf_b.apply(self.proxy_b.vertex(index_b));
                (point_b - point_a).dot(normal)
            }
            SeparationKind::FaceB => {
                let normal = xf_b.q.apply(self.axis);
                let point_b = xf_b.apply(self.local_point);
                let point_a = xf_a.apply(self.proxy_a.vertex(index_a));
                (point_a - point_b).dot(normal)
            }
        }
    }
}

const MAX_OUTER_ITERATIONS: usize = 20;
const MAX_ROOT_ITERATIONS: usize = 50;

/// Compute the first time of impact of two swept shapes.
pub fn time_of_impact(input: &ToiInput) -> ToiOutput {
    let mut sweep_a = input.sweep_a;
    let mut sweep_b = input.sweep_b;

    // Large rotations make the root finder chase a moving target; keep the
    // angles wrapped.
    sweep_a.normalize();
    sweep_b.normalize();

    let t_max = input.t_max;

    let total_radius = input.proxy_a.radius + input.proxy_b.radius;
    let target = LINEAR_SLOP.max(total_radius - 3.0 * LINEAR_SLOP);
    let tolerance = 0.25 * LINEAR_SLOP;
    debug_assert!(target > tolerance);

    let mut t1 = 0.0;
    let mut cache = SimplexCache::default();

    for _outer in 0..MAX_OUTER_ITERATIONS {
        let xf_a = sweep_a.transform(t1);
        let xf_b = sweep_b.transform(t1);

        // Squared distance at t1 via GJK (skins excluded: the target
        // accounts for them).
        let dist_out = distance(
            &mut cache,
            &DistanceInput {
                proxy_a: input.proxy_a,
                proxy_b: input.proxy_b,
                transform_a: xf_a,
                transform_b: xf_b,
                use_radii: false,
            },
        );

        if dist_out.distance <= 0.0 {
            return ToiOutput {
                state: ToiState::Overlapped,
                t: 0.0,
            };
        }

        if dist_out.distance < target + tolerance {
            return ToiOutput {
                state: ToiState::Touching,
                t: t1,
            };
        }

        let fcn = SeparationFunction::new(
            &cache,
            &input.proxy_a,
            sweep_a,
            &input.proxy_b,
            sweep_b,
            t1,
        );

        // Resolve deepest-point candidates one at a time until none remains
        // below the target at t2.
        let mut t2 = t_max;
        let mut push_back_iter = 0;
        loop {
            let (mut s2, index_a, index_b) = fcn.find_min_separation(t2);

            if s2 > target + tolerance {
                return ToiOutput {
                    state: ToiState::Separated,
                    t: t_max,
                };
            }

            if s2 > target - tolerance {
                // Victory for this candidate: advance the interval.
                t1 = t2;
                break;
            }

            let mut s1 = fcn.evaluate(index_a, index_b, t1);

            if s1 < target - tolerance {
                // The interval start is already past the target; the
                // advancement scheme has broken down.
                return ToiOutput {
                    state: ToiState::Failed,
                    t: t1,
                };
            }

            if s1 <= target + tolerance {
                return ToiOutput {
                    state: ToiState::Touching,
                    t: t1,
                };
            }

            // Root-find the crossing, alternating secant and bisection.
            let mut a1 = t1;
            let mut a2 = t2;
            for root_iter in 0..MAX_ROOT_ITERATIONS {
                let t = if root_iter & 1 == 1 {
                    a1 + (target - s1) * (a2 - a1) / (s2 - s1)
                } else {
                    0.5 * (a1 + a2)
                };

                let s = fcn.evaluate(index_a, index_b, t);

                if (s - target).abs() < tolerance {
                    t2 = t;
                    break;
                }

                if s > target {
                    a1 = t;
                    s1 = s;
                } else {
                    a2 = t;
                    s2 = s;
                }
            }

            push_back_iter += 1;
            if push_back_iter == crate::settings::MAX_POLYGON_VERTICES {
                break;
            }
        }

        if t1 >= t_max {
            return ToiOutput {
                state: ToiState::Separated,
                t: t_max,
            };
        }
    }

    // Root finder stalled; report the best lower bound found so the caller
    // can fall back to discrete handling.
    ToiOutput {
        state: ToiState::Failed,
        t: t1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{Circle, Polygon, Shape};
    use approx::assert_relative_eq;

    fn sweep_linear(from: Vec2, to: Vec2) -> Sweep {
        Sweep {
            local_center: Vec2::ZERO,
            c0: from,
            c: to,
            a0: 0.0,
            a: 0.0,
            alpha0: 0.0,
        }
    }

    #[test]
    fn test_head_on_circles_touch() {
        let a = Shape::Circle(Circle::new(1.0));
        let b = Shape::Circle(Circle::new(1.0));
        let input = ToiInput {
            proxy_a: DistanceProxy::new(&a, 0),
            proxy_b: DistanceProxy::new(&b, 0),
            sweep_a: sweep_linear(Vec2::new(-10.0, 0.0), Vec2::new(0.0, 0.0)),
            sweep_b: sweep_linear(Vec2::new(10.0, 0.0), Vec2::new(0.0, 0.0)),
            t_max: 1.0,
        };
        let out = time_of_impact(&input);
        assert_eq!(out.state, ToiState::Touching);
        // Gap of 18 closes at 20 m per unit time; touching near t = 0.9.
        assert_relative_eq!(out.t, 0.9, epsilon = 0.01);
    }

    #[test]
    fn test_separated_paths() {
        let a = Shape::Circle(Circle::new(0.5));
        let b = Shape::Circle(Circle::new(0.5));
        let input = ToiInput {
            proxy_a: DistanceProxy::new(&a, 0),
            proxy_b: DistanceProxy::new(&b, 0),
            sweep_a: sweep_linear(Vec2::new(-5.0, 0.0), Vec2::new(5.0, 0.0)),
            sweep_b: sweep_linear(Vec2::new(0.0, 10.0), Vec2::new(0.0, 12.0)),
            t_max: 1.0,
        };
        let out = time_of_impact(&input);
        assert_eq!(out.state, ToiState::Separated);
    }

    #[test]
    fn test_overlapped_at_start() {
        let a = Shape::Circle(Circle::new(1.0));
        let b = Shape::Circle(Circle::new(1.0));
        let input = ToiInput {
            proxy_a: DistanceProxy::new(&a, 0),
            proxy_b: DistanceProxy::new(&b, 0),
            sweep_a: sweep_linear(Vec2::ZERO, Vec2::new(1.0, 0.0)),
            sweep_b: sweep_linear(Vec2::new(0.5, 0.0), Vec2::new(2.0, 0.0)),
            t_max: 1.0,
        };
        let out = time_of_impact(&input);
        assert_eq!(out.state, ToiState::Overlapped);
        assert_eq!(out.t, 0.0);
    }

    #[test]
    fn test_bullet_vs_thin_wall() {
        // A small circle crossing a thin box entirely within one interval
        // must still report an interior touching time.
        let bullet = Shape::Circle(Circle::new(0.1));
        let wall = Shape::Polygon(Polygon::boxed(0.05, 5.0));
        let input = ToiInput {
            proxy_a: DistanceProxy::new(&bullet, 0),
            proxy_b: DistanceProxy::new(&wall, 0),
            sweep_a: sweep_linear(Vec2::new(-10.0, 0.0), Vec2::new(10.0, 0.0)),
            sweep_b: sweep_linear(Vec2::ZERO, Vec2::ZERO),
            t_max: 1.0,
        };
        let out = time_of_impact(&input);
        assert_eq!(out.state, ToiState::Touching);
        assert!(out.t > 0.4 && out.t < 0.5, "t = {}", out.t);
    }
}
