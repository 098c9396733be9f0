//! Sequential-Impulse Contact Solver
//!
//! Velocity phase: per contact point, clamped normal impulses (accumulated,
//! never negative) and friction impulses bounded by μ times the accumulated
//! normal impulse. Two-point manifolds get a coupled 2×2 block solve, which
//! removes the jitter an independent per-point solve leaves in box stacks.
//!
//! Position phase: non-linear Gauss-Seidel on the positions only, pushing
//! penetration back toward the slop with a Baumgarte factor, velocities
//! untouched. The TOI variant treats every body except the two sub-stepped
//! ones as infinitely heavy so a continuous event cannot kick bystanders.

use glam::Vec2;

use crate::arena::Arena;
use crate::body::Body;
use crate::collision::{ManifoldKind, WorldManifold};
use crate::contact::{Contact, ContactHandle};
use crate::fixture::Fixture;
use crate::island::{Position, TimeStep, Velocity};
use crate::math::{cross_sv, cross_vs, cross_vv, Mat22, Rot, Transform};
use crate::settings::{
    BAUMGARTE, LINEAR_SLOP, MAX_LINEAR_CORRECTION, MAX_MANIFOLD_POINTS, TOI_BAUMGARTE,
    VELOCITY_THRESHOLD,
};

#[derive(Clone, Copy, Default)]
struct VelocityConstraintPoint {
    r_a: Vec2,
    r_b: Vec2,
    normal_impulse: f32,
    tangent_impulse: f32,
    normal_mass: f32,
    tangent_mass: f32,
    velocity_bias: f32,
}

struct VelocityConstraint {
    points: [VelocityConstraintPoint; MAX_MANIFOLD_POINTS],
    normal: Vec2,
    normal_mass: Mat22,
    k: Mat22,
    index_a: usize,
    index_b: usize,
    inv_mass_a: f32,
    inv_mass_b: f32,
    inv_i_a: f32,
    inv_i_b: f32,
    friction: f32,
    restitution: f32,
    point_count: usize,
    contact: ContactHandle,
}

struct PositionConstraint {
    local_points: [Vec2; MAX_MANIFOLD_POINTS],
    local_normal: Vec2,
    local_point: Vec2,
    index_a: usize,
    index_b: usize,
    inv_mass_a: f32,
    inv_mass_b: f32,
    local_center_a: Vec2,
    local_center_b: Vec2,
    inv_i_a: f32,
    inv_i_b: f32,
    kind: ManifoldKind,
    radius_a: f32,
    radius_b: f32,
    point_count: usize,
}

/// Solver over the touching contacts of one island.
pub(crate) struct ContactSolver {
    velocity_constraints: Vec<VelocityConstraint>,
    position_constraints: Vec<PositionConstraint>,
}

impl ContactSolver {
    /// Snapshot the island's contacts into solver constraints.
    pub fn new(
        step: TimeStep,
        contact_handles: &[ContactHandle],
        contacts: &Arena<Contact>,
        fixtures: &Arena<Fixture>,
        bodies: &Arena<Body>,
    ) -> Self {
        let mut velocity_constraints = Vec::with_capacity(contact_handles.len());
        let mut position_constraints = Vec::with_capacity(contact_handles.len());

        for &handle in contact_handles {
            let contact = contacts.get(handle).expect("island contact missing");
            let fixture_a = fixtures.get(contact.fixture_a).expect("fixture missing");
            let fixture_b = fixtures.get(contact.fixture_b).expect("fixture missing");
            let body_a = bodies.get(contact.body_a).expect("body missing");
            let body_b = bodies.get(contact.body_b).expect("body missing");
            let manifold = contact.manifold;
            debug_assert!(manifold.point_count > 0);

            let radius_a = fixture_a.shape().radius();
            let radius_b = fixture_b.shape().radius();

            let mut vc = VelocityConstraint {
                points: [VelocityConstraintPoint::default(); MAX_MANIFOLD_POINTS],
                normal: Vec2::ZERO,
                normal_mass: Mat22::default(),
                k: Mat22::default(),
                index_a: body_a.island_index,
                index_b: body_b.island_index,
                inv_mass_a: body_a.inv_mass,
                inv_mass_b: body_b.inv_mass,
                inv_i_a: body_a.inv_inertia,
                inv_i_b: body_b.inv_inertia,
                friction: contact.friction,
                restitution: contact.restitution,
                point_count: manifold.point_count,
                contact: handle,
            };
            if step.warm_starting {
                for (point, mp) in vc.points.iter_mut().zip(manifold.points.iter()) {
                    // Warm-starting seed, rescaled for a changed dt.
                    point.normal_impulse = step.dt_ratio * mp.normal_impulse;
                    point.tangent_impulse = step.dt_ratio * mp.tangent_impulse;
                }
            }
            velocity_constraints.push(vc);

            let mut pc = PositionConstraint {
                local_points: [Vec2::ZERO; MAX_MANIFOLD_POINTS],
                local_normal: manifold.local_normal,
                local_point: manifold.local_point,
                index_a: body_a.island_index,
                index_b: body_b.island_index,
                inv_mass_a: body_a.inv_mass,
                inv_mass_b: body_b.inv_mass,
                local_center_a: body_a.sweep.local_center,
                local_center_b: body_b.sweep.local_center,
                inv_i_a: body_a.inv_inertia,
                inv_i_b: body_b.inv_inertia,
                kind: manifold.kind,
                radius_a,
                radius_b,
                point_count: manifold.point_count,
            };
            for (slot, mp) in pc.local_points.iter_mut().zip(manifold.points.iter()) {
                *slot = mp.local_point;
            }
            position_constraints.push(pc);
        }

        Self {
            velocity_constraints,
            position_constraints,
        }
    }

    /// Compute contact-space masses and restitution bias at the current
    /// island state.
    pub fn initialize_velocity_constraints(
        &mut self,
        positions: &[Position],
        velocities: &[Velocity],
        contacts: &Arena<Contact>,
    ) {
        for (vc, pc) in self
            .velocity_constraints
            .iter_mut()
            .zip(self.position_constraints.iter())
        {
            let manifold = contacts.get(vc.contact).expect("contact missing").manifold;

            let m_a = vc.inv_mass_a;
            let m_b = vc.inv_mass_b;
            let i_a = vc.inv_i_a;
            let i_b = vc.inv_i_b;

            let c_a = positions[vc.index_a].c;
            let a_a = positions[vc.index_a].a;
            let v_a = velocities[vc.index_a].v;
            let w_a = velocities[vc.index_a].w;

            let c_b = positions[vc.index_b].c;
            let a_b = positions[vc.index_b].a;
            let v_b = velocities[vc.index_b].v;
            let w_b = velocities[vc.index_b].w;

            let q_a = Rot::new(a_a);
            let q_b = Rot::new(a_b);
            let xf_a = Transform {
                p: c_a - q_a.apply(pc.local_center_a),
                q: q_a,
            };
            let xf_b = Transform {
                p: c_b - q_b.apply(pc.local_center_b),
                q: q_b,
            };

            let world_manifold =
                WorldManifold::new(&manifold, xf_a, pc.radius_a, xf_b, pc.radius_b);

            vc.normal = world_manifold.normal;
            let tangent = cross_vs(vc.normal, 1.0);

            for j in 0..vc.point_count {
                let vcp = &mut vc.points[j];
                vcp.r_a = world_manifold.points[j] - c_a;
                vcp.r_b = world_manifold.points[j] - c_b;

                let rn_a = cross_vv(vcp.r_a, vc.normal);
                let rn_b = cross_vv(vcp.r_b, vc.normal);
                let k_normal = m_a + m_b + i_a * rn_a * rn_a + i_b * rn_b * rn_b;
                vcp.normal_mass = if k_normal > 0.0 { 1.0 / k_normal } else { 0.0 };

                let rt_a = cross_vv(vcp.r_a, tangent);
                let rt_b = cross_vv(vcp.r_b, tangent);
                let k_tangent = m_a + m_b + i_a * rt_a * rt_a + i_b * rt_b * rt_b;
                vcp.tangent_mass = if k_tangent > 0.0 { 1.0 / k_tangent } else { 0.0 };

                // Restitution only above the inelastic threshold.
                vcp.velocity_bias = 0.0;
                let v_rel = vc
                    .normal
                    .dot(v_b + cross_sv(w_b, vcp.r_b) - v_a - cross_sv(w_a, vcp.r_a));
                if v_rel < -VELOCITY_THRESHOLD {
                    vcp.velocity_bias = -vc.restitution * v_rel;
                }
            }

            // Coupled block solve for two-point manifolds, unless the
            // constraint matrix is too ill-conditioned to invert safely.
            if vc.point_count == 2 {
                let rn1_a = cross_vv(vc.points[0].r_a, vc.normal);
                let rn1_b = cross_vv(vc.points[0].r_b, vc.normal);
                let rn2_a = cross_vv(vc.points[1].r_a, vc.normal);
                let rn2_b = cross_vv(vc.points[1].r_b, vc.normal);

                let k11 = m_a + m_b + i_a * rn1_a * rn1_a + i_b * rn1_b * rn1_b;
                let k22 = m_a + m_b + i_a * rn2_a * rn2_a + i_b * rn2_b * rn2_b;
                let k12 = m_a + m_b + i_a * rn1_a * rn2_a + i_b * rn1_b * rn2_b;

                const MAX_CONDITION: f32 = 1000.0;
                if k11 * k11 < MAX_CONDITION * (k11 * k22 - k12 * k12) {
                    vc.k = Mat22::new(Vec2::new(k11, k12), Vec2::new(k12, k22));
                    vc.normal_mass = vc.k.inverse();
                } else {
                    // Degenerate: fall back to one point.
                    vc.point_count = 1;
                }
            }
        }
    }

    /// Apply the cached impulses from the previous step.
    pub fn warm_start(&mut self, velocities: &mut [Velocity]) {
        for vc in &self.velocity_constraints {
            let m_a = vc.inv_mass_a;
            let m_b = vc.inv_mass_b;
            let i_a = vc.inv_i_a;
            let i_b = vc.inv_i_b;
            let normal = vc.normal;
            let tangent = cross_vs(normal, 1.0);

            let mut v_a = velocities[vc.index_a].v;
            let mut w_a = velocities[vc.index_a].w;
            let mut v_b = velocities[vc.index_b].v;
            let mut w_b = velocities[vc.index_b].w;

            for vcp in vc.points.iter().take(vc.point_count) {
                let p = vcp.normal_impulse * normal + vcp.tangent_impulse * tangent;
                w_a -= i_a * cross_vv(vcp.r_a, p);
                v_a -= m_a * p;
                w_b += i_b * cross_vv(vcp.r_b, p);
                v_b += m_b * p;
            }

            velocities[vc.index_a].v = v_a;
            velocities[vc.index_a].w = w_a;
            velocities[vc.index_b].v = v_b;
            velocities[vc.index_b].w = w_b;
        }
    }

    /// One Gauss-Seidel sweep over all contact velocity constraints.
    pub fn solve_velocity_constraints(&mut self, velocities: &mut [Velocity]) {
        for vc in &mut self.velocity_constraints {
            let m_a = vc.inv_mass_a;
            let m_b = vc.inv_mass_b;
            let i_a = vc.inv_i_a;
            let i_b = vc.inv_i_b;
            let normal = vc.normal;
            let tangent = cross_vs(normal, 1.0);
            let friction = vc.friction;

            let mut v_a = velocities[vc.index_a].v;
            let mut w_a = velocities[vc.index_a].w;
            let mut v_b = velocities[vc.index_b].v;
            let mut w_b = velocities[vc.index_b].w;

            debug_assert!(vc.point_count == 1 || vc.point_count == 2);

            // Friction first, bounded by the normal impulse accumulated so
            // far; solving it before the normal keeps boxes from creeping.
            for vcp in vc.points.iter_mut().take(vc.point_count) {
                let dv = v_b + cross_sv(w_b, vcp.r_b) - v_a - cross_sv(w_a, vcp.r_a);

                let vt = dv.dot(tangent);
                let mut lambda = vcp.tangent_mass * (-vt);

                let max_friction = friction * vcp.normal_impulse;
                let new_impulse = (vcp.tangent_impulse + lambda).clamp(-max_friction, max_friction);
                lambda = new_impulse - vcp.tangent_impulse;
                vcp.tangent_impulse = new_impulse;

                let p = lambda * tangent;
                v_a -= m_a * p;
                w_a -= i_a * cross_vv(vcp.r_a, p);
                v_b += m_b * p;
                w_b += i_b * cross_vv(vcp.r_b, p);
            }

            if vc.point_count == 1 {
                let vcp = &mut vc.points[0];
                let dv = v_b + cross_sv(w_b, vcp.r_b) - v_a - cross_sv(w_a, vcp.r_a);

                let vn = dv.dot(normal);
                let mut lambda = -vcp.normal_mass * (vn - vcp.velocity_bias);

                let new_impulse = (vcp.normal_impulse + lambda).max(0.0);
                lambda = new_impulse - vcp.normal_impulse;
                vcp.normal_impulse = new_impulse;

                let p = lambda * normal;
                v_a -= m_a * p;
                w_a -= i_a * cross_vv(vcp.r_a, p);
                v_b += m_b * p;
                w_b += i_b * cross_vv(vcp.r_b, p);
            } else {
                // Coupled solve: enumerate the four complementarity cases
                // of the 2x2 LCP until one yields non-negative impulses and
                // non-negative post-velocities.
                let cp1_r_a = vc.points[0].r_a;
                let cp1_r_b = vc.points[0].r_b;
                let cp2_r_a = vc.points[1].r_a;
                let cp2_r_b = vc.points[1].r_b;

                let a = Vec2::new(vc.points[0].normal_impulse, vc.points[1].normal_impulse);
                debug_assert!(a.x >= 0.0 && a.y >= 0.0);

                let dv1 = v_b + cross_sv(w_b, cp1_r_b) - v_a - cross_sv(w_a, cp1_r_a);
                let dv2 = v_b + cross_sv(w_b, cp2_r_b) - v_a - cross_sv(w_a, cp2_r_a);

                let vn1 = dv1.dot(normal);
                let vn2 = dv2.dot(normal);

                let mut b = Vec2::new(
                    vn1 - vc.points[0].velocity_bias,
                    vn2 - vc.points[1].velocity_bias,
                );
                b -= vc.k.mul(a);

                let mut applied = None;

                // Case 1: both points active.
                let x = -vc.normal_mass.mul(b);
                if x.x >= 0.0 && x.y >= 0.0 {
                    applied = Some(x);
                }

                // Case 2: point 1 active, point 2 separated.
                if applied.is_none() {
                    let x = Vec2::new(-vc.points[0].normal_mass * b.x, 0.0);
                    let vn2 = vc.k.ex.y * x.x + b.y;
                    if x.x >= 0.0 && vn2 >= 0.0 {
                        applied = Some(x);
                    }
                }

                // Case 3: point 2 active, point 1 separated.
                if applied.is_none() {
                    let x = Vec2::new(0.0, -vc.points[1].normal_mass * b.y);
                    let vn1 = vc.k.ey.x * x.y + b.x;
                    if x.y >= 0.0 && vn1 >= 0.0 {
                        applied = Some(x);
                    }
                }

                // Case 4: both separated.
                if applied.is_none() && b.x >= 0.0 && b.y >= 0.0 {
                    applied = Some(Vec2::ZERO);
                }

                // No case matched: numerical trouble; keep the accumulated
                // impulses and move on.
                if let Some(x) = applied {
                    let d = x - a;
                    let p1 = d.x * normal;
                    let p2 = d.y * normal;
                    v_a -= m_a * (p1 + p2);
                    w_a -= i_a * (cross_vv(cp1_r_a, p1) + cross_vv(cp2_r_a, p2));
                    v_b += m_b * (p1 + p2);
                    w_b += i_b * (cross_vv(cp1_r_b, p1) + cross_vv(cp2_r_b, p2));

                    vc.points[0].normal_impulse = x.x;
                    vc.points[1].normal_impulse = x.y;
                }
            }

            velocities[vc.index_a].v = v_a;
            velocities[vc.index_a].w = w_a;
            velocities[vc.index_b].v = v_b;
            velocities[vc.index_b].w = w_b;
        }
    }

    /// Write accumulated impulses back into the contact manifolds for the
    /// next step's warm start.
    pub fn store_impulses(&self, contacts: &mut Arena<Contact>) {
        for vc in &self.velocity_constraints {
            let contact = contacts.get_mut(vc.contact).expect("contact missing");
            for (mp, vcp) in contact
                .manifold
                .points
                .iter_mut()
                .zip(vc.points.iter())
                .take(vc.point_count)
            {
                mp.normal_impulse = vcp.normal_impulse;
                mp.tangent_impulse = vcp.tangent_impulse;
            }
        }
    }

    /// One position-correction sweep. Returns true when every contact is
    /// within triple slop (used for early exit).
    pub fn solve_position_constraints(&self, positions: &mut [Position]) -> bool {
        self.solve_positions(positions, None)
    }

    /// TOI variant: only the two sub-stepped bodies carry mass.
    pub fn solve_toi_position_constraints(
        &self,
        positions: &mut [Position],
        toi_index_a: usize,
        toi_index_b: usize,
    ) -> bool {
        self.solve_positions(positions, Some((toi_index_a, toi_index_b)))
    }

    fn solve_positions(&self, positions: &mut [Position], toi: Option<(usize, usize)>) -> bool {
        let baumgarte = if toi.is_some() { TOI_BAUMGARTE } else { BAUMGARTE };
        let mut min_separation = 0.0_f32;

        for pc in &self.position_constraints {
            let index_a = pc.index_a;
            let index_b = pc.index_b;

            let (m_a, i_a, m_b, i_b) = match toi {
                None => (pc.inv_mass_a, pc.inv_i_a, pc.inv_mass_b, pc.inv_i_b),
                Some((toi_a, toi_b)) => {
                    let a_active = index_a == toi_a || index_a == toi_b;
                    let b_active = index_b == toi_a || index_b == toi_b;
                    (
                        if a_active { pc.inv_mass_a } else { 0.0 },
                        if a_active { pc.inv_i_a } else { 0.0 },
                        if b_active { pc.inv_mass_b } else { 0.0 },
                        if b_active { pc.inv_i_b } else { 0.0 },
                    )
                }
            };

            let mut c_a = positions[index_a].c;
            let mut a_a = positions[index_a].a;
            let mut c_b = positions[index_b].c;
            let mut a_b = positions[index_b].a;

            for j in 0..pc.point_count {
                let q_a = Rot::new(a_a);
                let q_b = Rot::new(a_b);
                let xf_a = Transform {
                    p: c_a - q_a.apply(pc.local_center_a),
                    q: q_a,
                };
                let xf_b = Transform {
                    p: c_b - q_b.apply(pc.local_center_b),
                    q: q_b,
                };

                let (normal, point, separation) = position_manifold(pc, xf_a, xf_b, j);
                min_separation = min_separation.min(separation);

                let r_a = point - c_a;
                let r_b = point - c_b;

                // Clamped Baumgarte correction toward the slop.
                let correction = (baumgarte * (separation + LINEAR_SLOP))
                    .clamp(-MAX_LINEAR_CORRECTION, 0.0);

                let rn_a = cross_vv(r_a, normal);
                let rn_b = cross_vv(r_b, normal);
                let k = m_a + m_b + i_a * rn_a * rn_a + i_b * rn_b * rn_b;

                let impulse = if k > 0.0 { -correction / k } else { 0.0 };
                let p = impulse * normal;

                c_a -= m_a * p;
                a_a -= i_a * cross_vv(r_a, p);
                c_b += m_b * p;
                a_b += i_b * cross_vv(r_b, p);
            }

            positions[index_a].c = c_a;
            positions[index_a].a = a_a;
            positions[index_b].c = c_b;
            positions[index_b].a = a_b;
        }

        // Allow some slop; the solver is approximate by design.
        min_separation >= -3.0 * LINEAR_SLOP
    }

}

/// Normal, point, and separation of one manifold point at the given poses.
fn position_manifold(
    pc: &PositionConstraint,
    xf_a: Transform,
    xf_b: Transform,
    index: usize,
) -> (Vec2, Vec2, f32) {
    debug_assert!(pc.point_count > 0);

    match pc.kind {
        ManifoldKind::Circles => {
            let point_a = xf_a.apply(pc.local_point);
            let point_b = xf_b.apply(pc.local_points[0]);
            let normal = (point_b - point_a).normalize_or_zero();
            let point = 0.5 * (point_a + point_b);
            let separation = (point_b - point_a).dot(normal) - pc.radius_a - pc.radius_b;
            (normal, point, separation)
        }
        ManifoldKind::FaceA => {
            let normal = xf_a.q.apply(pc.local_normal);
            let plane_point = xf_a.apply(pc.local_point);
            let clip_point = xf_b.apply(pc.local_points[index]);
            let separation = (clip_point - plane_point).dot(normal) - pc.radius_a - pc.radius_b;
            (normal, clip_point, separation)
        }
        ManifoldKind::FaceB => {
            let normal = xf_b.q.apply(pc.local_normal);
            let plane_point = xf_b.apply(pc.local_point);
            let clip_point = xf_a.apply(pc.local_points[index]);
            let separation = (clip_point - plane_point).dot(normal) - pc.radius_a - pc.radius_b;
            // Report the normal from A toward B.
            (-normal, clip_point, separation)
        }
    }
}
