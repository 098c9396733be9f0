//! Distance Joint
//!
//! Keeps two anchor points a fixed distance apart. With a nonzero
//! frequency the constraint becomes a damped spring: the frequency and
//! damping ratio are converted to stiffness/damping coefficients inside
//! `init_velocity_constraints`, folded into the effective mass (γ) and a
//! velocity bias (β), which is what keeps the soft mode stable at any
//! stiffness.

use glam::Vec2;

use crate::fixture::BodyHandle;
use crate::island::SolverData;
use crate::joints::BodyContext;
use crate::math::{cross_sv, cross_vv, Rot};
use crate::settings::{LINEAR_SLOP, MAX_LINEAR_CORRECTION};

/// Blueprint for a [`DistanceJoint`].
#[derive(Clone, Copy, Debug)]
pub struct DistanceJointDef {
    /// First attached body.
    pub body_a: BodyHandle,
    /// Second attached body.
    pub body_b: BodyHandle,
    /// Allow the attached bodies to collide with each other?
    pub collide_connected: bool,
    /// Anchor on body A, in A's local frame.
    pub local_anchor_a: Vec2,
    /// Anchor on body B, in B's local frame.
    pub local_anchor_b: Vec2,
    /// Rest length between the anchors.
    pub length: f32,
    /// Spring frequency in Hz; 0 makes the joint rigid.
    pub frequency_hz: f32,
    /// Spring damping ratio (1 = critically damped).
    pub damping_ratio: f32,
}

impl DistanceJointDef {
    /// A rigid joint between body-origin anchors, one meter apart.
    #[must_use]
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            collide_connected: false,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            length: 1.0,
            frequency_hz: 0.0,
            damping_ratio: 0.0,
        }
    }

    /// Soften the joint.
    #[must_use]
    pub fn with_spring(mut self, frequency_hz: f32, damping_ratio: f32) -> Self {
        self.frequency_hz = frequency_hz;
        self.damping_ratio = damping_ratio;
        self
    }
}

/// Fixed (or sprung) separation between two anchors.
pub struct DistanceJoint {
    pub(crate) local_anchor_a: Vec2,
    pub(crate) local_anchor_b: Vec2,
    length: f32,
    frequency_hz: f32,
    damping_ratio: f32,

    impulse: f32,
    gamma: f32,
    bias: f32,

    // Solver cache.
    index_a: usize,
    index_b: usize,
    u: Vec2,
    r_a: Vec2,
    r_b: Vec2,
    local_center_a: Vec2,
    local_center_b: Vec2,
    inv_mass_a: f32,
    inv_mass_b: f32,
    inv_i_a: f32,
    inv_i_b: f32,
    mass: f32,
}

impl DistanceJoint {
    pub(crate) fn new(def: &DistanceJointDef) -> Self {
        Self {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            length: def.length,
            frequency_hz: def.frequency_hz,
            damping_ratio: def.damping_ratio,
            impulse: 0.0,
            gamma: 0.0,
            bias: 0.0,
            index_a: 0,
            index_b: 0,
            u: Vec2::ZERO,
            r_a: Vec2::ZERO,
            r_b: Vec2::ZERO,
            local_center_a: Vec2::ZERO,
            local_center_b: Vec2::ZERO,
            inv_mass_a: 0.0,
            inv_mass_b: 0.0,
            inv_i_a: 0.0,
            inv_i_b: 0.0,
            mass: 0.0,
        }
    }

    /// Rest length.
    #[inline]
    #[must_use]
    pub fn length(&self) -> f32 {
        self.length
    }

    /// Change the rest length.
    pub fn set_length(&mut self, length: f32) {
        self.length = length;
    }

    pub(crate) fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        inv_dt * self.impulse * self.u
    }

    pub(crate) fn init_velocity_constraints(
        &mut self,
        data: &mut SolverData,
        a: BodyContext,
        b: BodyContext,
    ) {
        self.index_a = a.index;
        self.index_b = b.index;
        self.local_center_a = a.local_center;
        self.local_center_b = b.local_center;
        self.inv_mass_a = a.inv_mass;
        self.inv_mass_b = b.inv_mass;
        self.inv_i_a = a.inv_i;
        self.inv_i_b = b.inv_i;

        let c_a = data.positions[self.index_a].c;
        let a_a = data.positions[self.index_a].a;
        let c_b = data.positions[self.index_b].c;
        let a_b = data.positions[self.index_b].a;

        let q_a = Rot::new(a_a);
        let q_b = Rot::new(a_b);

        self.r_a = q_a.apply(self.local_anchor_a - self.local_center_a);
        self.r_b = q_b.apply(self.local_anchor_b - self.local_center_b);
        self.u = c_b + self.r_b - c_a - self.r_a;

        // A joint shorter than the slop has no meaningful direction.
        let length = self.u.length();
        if length > LINEAR_SLOP {
            self.u /= length;
        } else {
            self.u = Vec2::ZERO;
        }

        let cr_a_u = cross_vv(self.r_a, self.u);
        let cr_b_u = cross_vv(self.r_b, self.u);
        let mut inv_mass = self.inv_mass_a
            + self.inv_i_a * cr_a_u * cr_a_u
            + self.inv_mass_b
            + self.inv_i_b * cr_b_u * cr_b_u;
        self.mass = if inv_mass != 0.0 { 1.0 / inv_mass } else { 0.0 };

        if self.frequency_hz > 0.0 {
            let c = length - self.length;

            let omega = 2.0 * core::f32::consts::PI * self.frequency_hz;
            let d = 2.0 * self.mass * self.damping_ratio * omega;
            let k = self.mass * omega * omega;

            let h = data.step.dt;
            self.gamma = h * (d + h * k);
            self.gamma = if self.gamma != 0.0 { 1.0 / self.gamma } else { 0.0 };
            self.bias = c * h * k * self.gamma;

            inv_mass += self.gamma;
            self.mass = if inv_mass != 0.0 { 1.0 / inv_mass } else { 0.0 };
        } else {
            self.gamma = 0.0;
            self.bias = 0.0;
        }

        if data.step.warm_starting {
            self.impulse *= data.step.dt_ratio;
            let p = self.impulse * self.u;
            data.velocities[self.index_a].v -= self.inv_mass_a * p;
            data.velocities[self.index_a].w -= self.inv_i_a * cross_vv(self.r_a, p);
            data.velocities[self.index_b].v += self.inv_mass_b * p;
            data.velocities[self.index_b].w += self.inv_i_b * cross_vv(self.r_b, p);
        } else {
            self.impulse = 0.0;
        }
    }

    pub(crate) fn solve_velocity_constraints(&mut self, data: &mut SolverData) {
        let v_a = data.velocities[self.index_a].v;
        let w_a = data.velocities[self.index_a].w;
        let v_b = data.velocities[self.index_b].v;
        let w_b = data.velocities[self.index_b].w;

        let vp_a = v_a + cross_sv(w_a, self.r_a);
        let vp_b = v_b + cross_sv(w_b, self.r_b);
        let c_dot = self.u.dot(vp_b - vp_a);

        let impulse = -self.mass * (c_dot + self.bias + self.gamma * self.impulse);
        self.impulse += impulse;

        let p = impulse * self.u;
        data.velocities[self.index_a].v -= self.inv_mass_a * p;
        data.velocities[self.index_a].w -= self.inv_i_a * cross_vv(self.r_a, p);
        data.velocities[self.index_b].v += self.inv_mass_b * p;
        data.velocities[self.index_b].w += self.inv_i_b * cross_vv(self.r_b, p);
    }

    pub(crate) fn solve_position_constraints(&mut self, data: &mut SolverData) -> bool {
        if self.frequency_hz > 0.0 {
            // A spring never fights positional drift; there is no drift to
            // fight.
            return true;
        }

        let mut c_a = data.positions[self.index_a].c;
        let mut a_a = data.positions[self.index_a].a;
        let mut c_b = data.positions[self.index_b].c;
        let mut a_b = data.positions[self.index_b].a;

        let q_a = Rot::new(a_a);
        let q_b = Rot::new(a_b);

        let r_a = q_a.apply(self.local_anchor_a - self.local_center_a);
        let r_b = q_b.apply(self.local_anchor_b - self.local_center_b);
        let mut u = c_b + r_b - c_a - r_a;

        let length = u.length();
        u = u.normalize_or_zero();
        let c = (length - self.length).clamp(-MAX_LINEAR_CORRECTION, MAX_LINEAR_CORRECTION);

        let impulse = -self.mass * c;
        let p = impulse * u;

        c_a -= self.inv_mass_a * p;
        a_a -= self.inv_i_a * cross_vv(r_a, p);
        c_b += self.inv_mass_b * p;
        a_b += self.inv_i_b * cross_vv(r_b, p);

        data.positions[self.index_a].c = c_a;
        data.positions[self.index_a].a = a_a;
        data.positions[self.index_b].c = c_b;
        data.positions[self.index_b].a = a_b;

        c.abs() < LINEAR_SLOP
    }
}
