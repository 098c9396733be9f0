//! Rope Joint
//!
//! A one-sided maximum-length tether: inactive while slack, a hard
//! inequality constraint once taut. The accumulated impulse is clamped
//! non-positive so the "rope" can only pull the bodies together, never
//! push them apart.

use glam::Vec2;

use crate::fixture::BodyHandle;
use crate::island::SolverData;
use crate::joints::{BodyContext, LimitState};
use crate::math::{cross_sv, cross_vv, Rot};
use crate::settings::{LINEAR_SLOP, MAX_LINEAR_CORRECTION};

/// Blueprint for a [`RopeJoint`].
#[derive(Clone, Copy, Debug)]
pub struct RopeJointDef {
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
    /// Maximum separation; must exceed the slop to be meaningful.
    pub max_length: f32,
}

impl RopeJointDef {
    /// A tether between the default anchors.
    #[must_use]
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            collide_connected: false,
            local_anchor_a: Vec2::new(-1.0, 0.0),
            local_anchor_b: Vec2::new(1.0, 0.0),
            max_length: 0.0,
        }
    }
}

/// One-sided maximum-length limit.
pub struct RopeJoint {
    pub(crate) local_anchor_a: Vec2,
    pub(crate) local_anchor_b: Vec2,
    max_length: f32,

    impulse: f32,
    length: f32,
    state: LimitState,

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

impl RopeJoint {
    pub(crate) fn new(def: &RopeJointDef) -> Self {
        Self {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            max_length: def.max_length,
            impulse: 0.0,
            length: 0.0,
            state: LimitState::Inactive,
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

    /// Maximum rope length.
    #[inline]
    #[must_use]
    pub fn max_length(&self) -> f32 {
        self.max_length
    }

    /// Change the maximum length.
    pub fn set_max_length(&mut self, length: f32) {
        self.max_length = length;
    }

    /// Is the rope currently taut?
    #[must_use]
    pub fn is_taut(&self) -> bool {
        self.state == LimitState::AtUpper
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

        self.length = self.u.length();

        let c = self.length - self.max_length;
        self.state = if c > 0.0 {
            LimitState::AtUpper
        } else {
            LimitState::Inactive
        };

        if self.length > LINEAR_SLOP {
            self.u /= self.length;
        } else {
            self.u = Vec2::ZERO;
            self.mass = 0.0;
            self.impulse = 0.0;
            return;
        }

        let cr_a = cross_vv(self.r_a, self.u);
        let cr_b = cross_vv(self.r_b, self.u);
        let inv_mass = self.inv_mass_a
            + self.inv_i_a * cr_a * cr_a
            + self.inv_mass_b
            + self.inv_i_b * cr_b * cr_b;
        self.mass = if inv_mass != 0.0 { 1.0 / inv_mass } else { 0.0 };

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

        let c = self.length - self.max_length;
        let mut c_dot = self.u.dot(vp_b - vp_a);

        // Predictive: start pulling just before the rope goes taut.
        if c < 0.0 {
            c_dot += data.step.inv_dt * c;
        }

        let mut impulse = -self.mass * c_dot;
        let old_impulse = self.impulse;
        self.impulse = (self.impulse + impulse).min(0.0);
        impulse = self.impulse - old_impulse;

        let p = impulse * self.u;
        data.velocities[self.index_a].v -= self.inv_mass_a * p;
        data.velocities[self.index_a].w -= self.inv_i_a * cross_vv(self.r_a, p);
        data.velocities[self.index_b].v += self.inv_mass_b * p;
        data.velocities[self.index_b].w += self.inv_i_b * cross_vv(self.r_b, p);
    }

    pub(crate) fn solve_position_constraints(&mut self, data: &mut SolverData) -> bool {
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
        let c = (length - self.max_length).clamp(0.0, MAX_LINEAR_CORRECTION);

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

        length - self.max_length < LINEAR_SLOP
    }
}
