//! Pulley Joint
//!
//! Two bodies hang from fixed ground anchors by an idealized rope over a
//! pulley: `length_a + ratio * length_b` is conserved, so lowering one side
//! raises the other, scaled by the ratio. A segment collapsing below the
//! minimum length has no usable direction; its axis is zeroed for the
//! frame, which slackens the constraint instead of producing NaNs.

use glam::Vec2;

use crate::fixture::BodyHandle;
use crate::island::SolverData;
use crate::joints::BodyContext;
use crate::math::{cross_sv, cross_vv, Rot};
use crate::settings::LINEAR_SLOP;

/// Blueprint for a [`PulleyJoint`].
#[derive(Clone, Copy, Debug)]
pub struct PulleyJointDef {
    /// First attached body.
    pub body_a: BodyHandle,
    /// Second attached body.
    pub body_b: BodyHandle,
    /// Allow the attached bodies to collide with each other?
    pub collide_connected: bool,
    /// World-fixed anchor the A-side rope runs over.
    pub ground_anchor_a: Vec2,
    /// World-fixed anchor the B-side rope runs over.
    pub ground_anchor_b: Vec2,
    /// Attachment on body A, in A's local frame.
    pub local_anchor_a: Vec2,
    /// Attachment on body B, in B's local frame.
    pub local_anchor_b: Vec2,
    /// Rest length of the A-side segment.
    pub length_a: f32,
    /// Rest length of the B-side segment.
    pub length_b: f32,
    /// Mechanical advantage; B's segment counts `ratio` times.
    pub ratio: f32,
}

impl PulleyJointDef {
    /// A unit-ratio pulley with default anchors.
    #[must_use]
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            collide_connected: false,
            ground_anchor_a: Vec2::new(-1.0, 1.0),
            ground_anchor_b: Vec2::new(1.0, 1.0),
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            length_a: 0.0,
            length_b: 0.0,
            ratio: 1.0,
        }
    }
}

/// Combined-length conservation over two ground anchors.
pub struct PulleyJoint {
    ground_anchor_a: Vec2,
    ground_anchor_b: Vec2,
    pub(crate) local_anchor_a: Vec2,
    pub(crate) local_anchor_b: Vec2,
    length_a: f32,
    length_b: f32,
    constant: f32,
    ratio: f32,

    impulse: f32,

    // Solver cache.
    index_a: usize,
    index_b: usize,
    u_a: Vec2,
    u_b: Vec2,
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

impl PulleyJoint {
    pub(crate) fn new(def: &PulleyJointDef) -> Self {
        debug_assert!(def.ratio > f32::EPSILON);
        Self {
            ground_anchor_a: def.ground_anchor_a,
            ground_anchor_b: def.ground_anchor_b,
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            length_a: def.length_a,
            length_b: def.length_b,
            constant: def.length_a + def.ratio * def.length_b,
            ratio: def.ratio,
            impulse: 0.0,
            index_a: 0,
            index_b: 0,
            u_a: Vec2::ZERO,
            u_b: Vec2::ZERO,
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

    /// The pulley ratio.
    #[inline]
    #[must_use]
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    /// Rest length of the A-side segment.
    #[inline]
    #[must_use]
    pub fn length_a(&self) -> f32 {
        self.length_a
    }

    /// Rest length of the B-side segment.
    #[inline]
    #[must_use]
    pub fn length_b(&self) -> f32 {
        self.length_b
    }

    pub(crate) fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        inv_dt * self.impulse * self.u_b
    }

    /// Normalize a rope segment, zeroing it when degenerate.
    fn segment_axis(raw: Vec2) -> Vec2 {
        let length = raw.length();
        if length > 10.0 * LINEAR_SLOP {
            raw / length
        } else {
            log::warn!("pulley segment collapsed below minimum length; slackening for one frame");
            Vec2::ZERO
        }
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

        self.u_a = Self::segment_axis(c_a + self.r_a - self.ground_anchor_a);
        self.u_b = Self::segment_axis(c_b + self.r_b - self.ground_anchor_b);

        let ru_a = cross_vv(self.r_a, self.u_a);
        let ru_b = cross_vv(self.r_b, self.u_b);

        let m_a = self.inv_mass_a + self.inv_i_a * ru_a * ru_a;
        let m_b = self.inv_mass_b + self.inv_i_b * ru_b * ru_b;

        self.mass = m_a + self.ratio * self.ratio * m_b;
        if self.mass > 0.0 {
            self.mass = 1.0 / self.mass;
        }

        if data.step.warm_starting {
            self.impulse *= data.step.dt_ratio;

            let p_a = -self.impulse * self.u_a;
            let p_b = -self.ratio * self.impulse * self.u_b;

            data.velocities[self.index_a].v += self.inv_mass_a * p_a;
            data.velocities[self.index_a].w += self.inv_i_a * cross_vv(self.r_a, p_a);
            data.velocities[self.index_b].v += self.inv_mass_b * p_b;
            data.velocities[self.index_b].w += self.inv_i_b * cross_vv(self.r_b, p_b);
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

        let c_dot = -self.u_a.dot(vp_a) - self.ratio * self.u_b.dot(vp_b);
        let impulse = -self.mass * c_dot;
        self.impulse += impulse;

        let p_a = -impulse * self.u_a;
        let p_b = -self.ratio * impulse * self.u_b;
        data.velocities[self.index_a].v += self.inv_mass_a * p_a;
        data.velocities[self.index_a].w += self.inv_i_a * cross_vv(self.r_a, p_a);
        data.velocities[self.index_b].v += self.inv_mass_b * p_b;
        data.velocities[self.index_b].w += self.inv_i_b * cross_vv(self.r_b, p_b);
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

        let raw_a = c_a + r_a - self.ground_anchor_a;
        let raw_b = c_b + r_b - self.ground_anchor_b;
        let length_a = raw_a.length();
        let length_b = raw_b.length();
        let u_a = Self::segment_axis(raw_a);
        let u_b = Self::segment_axis(raw_b);

        let ru_a = cross_vv(r_a, u_a);
        let ru_b = cross_vv(r_b, u_b);

        let m_a = self.inv_mass_a + self.inv_i_a * ru_a * ru_a;
        let m_b = self.inv_mass_b + self.inv_i_b * ru_b * ru_b;

        let mut mass = m_a + self.ratio * self.ratio * m_b;
        if mass > 0.0 {
            mass = 1.0 / mass;
        }

        let c = self.constant - length_a - self.ratio * length_b;
        let linear_error = c.abs();

        let impulse = -mass * c;

        let p_a = -impulse * u_a;
        let p_b = -self.ratio * impulse * u_b;

        c_a += self.inv_mass_a * p_a;
        a_a += self.inv_i_a * cross_vv(r_a, p_a);
        c_b += self.inv_mass_b * p_b;
        a_b += self.inv_i_b * cross_vv(r_b, p_b);

        data.positions[self.index_a].c = c_a;
        data.positions[self.index_a].a = a_a;
        data.positions[self.index_b].c = c_b;
        data.positions[self.index_b].a = a_b;

        linear_error < LINEAR_SLOP
    }
}
