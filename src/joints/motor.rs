//! Motor Joint
//!
//! Drives body B toward a target offset and angle relative to body A,
//! with bounded force and torque. It has no position solve; instead a
//! correction factor blends the current position error into the velocity
//! constraint, so the target is approached smoothly rather than snapped
//! to.

use glam::Vec2;

use crate::fixture::BodyHandle;
use crate::island::SolverData;
use crate::joints::BodyContext;
use crate::math::{cross_sv, cross_vv, Mat22, Rot};

/// Blueprint for a [`MotorJoint`].
#[derive(Clone, Copy, Debug)]
pub struct MotorJointDef {
    /// First attached body.
    pub body_a: BodyHandle,
    /// Second attached body.
    pub body_b: BodyHandle,
    /// Allow the attached bodies to collide with each other?
    pub collide_connected: bool,
    /// Target position of B's origin, in A's local frame.
    pub linear_offset: Vec2,
    /// Target `angle_b - angle_a`.
    pub angular_offset: f32,
    /// Force budget in newtons.
    pub max_force: f32,
    /// Torque budget in newton-meters.
    pub max_torque: f32,
    /// Fraction of position error fed into the velocity solve, in `[0, 1]`.
    pub correction_factor: f32,
}

impl MotorJointDef {
    /// A motor driving B onto A's origin and angle.
    #[must_use]
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            collide_connected: false,
            linear_offset: Vec2::ZERO,
            angular_offset: 0.0,
            max_force: 1.0,
            max_torque: 1.0,
            correction_factor: 0.3,
        }
    }
}

/// Target-following constraint with bounded effort.
pub struct MotorJoint {
    linear_offset: Vec2,
    angular_offset: f32,
    max_force: f32,
    max_torque: f32,
    correction_factor: f32,

    linear_impulse: Vec2,
    angular_impulse: f32,

    // Solver cache.
    index_a: usize,
    index_b: usize,
    r_a: Vec2,
    r_b: Vec2,
    local_center_a: Vec2,
    local_center_b: Vec2,
    linear_error: Vec2,
    angular_error: f32,
    inv_mass_a: f32,
    inv_mass_b: f32,
    inv_i_a: f32,
    inv_i_b: f32,
    linear_mass: Mat22,
    angular_mass: f32,
}

impl MotorJoint {
    pub(crate) fn new(def: &MotorJointDef) -> Self {
        Self {
            linear_offset: def.linear_offset,
            angular_offset: def.angular_offset,
            max_force: def.max_force,
            max_torque: def.max_torque,
            correction_factor: def.correction_factor,
            linear_impulse: Vec2::ZERO,
            angular_impulse: 0.0,
            index_a: 0,
            index_b: 0,
            r_a: Vec2::ZERO,
            r_b: Vec2::ZERO,
            local_center_a: Vec2::ZERO,
            local_center_b: Vec2::ZERO,
            linear_error: Vec2::ZERO,
            angular_error: 0.0,
            inv_mass_a: 0.0,
            inv_mass_b: 0.0,
            inv_i_a: 0.0,
            inv_i_b: 0.0,
            linear_mass: Mat22::default(),
            angular_mass: 0.0,
        }
    }

    /// Move the target offset (in A's frame).
    pub fn set_linear_offset(&mut self, offset: Vec2) {
        self.linear_offset = offset;
    }

    /// Move the target angle.
    pub fn set_angular_offset(&mut self, offset: f32) {
        self.angular_offset = offset;
    }

    pub(crate) fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        inv_dt * self.linear_impulse
    }

    pub(crate) fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.angular_impulse
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

        self.r_a = q_a.apply(-self.local_center_a);
        self.r_b = q_b.apply(-self.local_center_b);

        let m_a = self.inv_mass_a;
        let m_b = self.inv_mass_b;
        let i_a = self.inv_i_a;
        let i_b = self.inv_i_b;

        let k = Mat22::new(
            Vec2::new(
                m_a + m_b + i_a * self.r_a.y * self.r_a.y + i_b * self.r_b.y * self.r_b.y,
                -i_a * self.r_a.x * self.r_a.y - i_b * self.r_b.x * self.r_b.y,
            ),
            Vec2::new(
                -i_a * self.r_a.x * self.r_a.y - i_b * self.r_b.x * self.r_b.y,
                m_a + m_b + i_a * self.r_a.x * self.r_a.x + i_b * self.r_b.x * self.r_b.x,
            ),
        );
        self.linear_mass = k.inverse();

        self.angular_mass = i_a + i_b;
        if self.angular_mass > 0.0 {
            self.angular_mass = 1.0 / self.angular_mass;
        }

        self.linear_error = c_b + self.r_b - c_a - self.r_a - q_a.apply(self.linear_offset);
        self.angular_error = a_b - a_a - self.angular_offset;

        if data.step.warm_starting {
            self.linear_impulse *= data.step.dt_ratio;
            self.angular_impulse *= data.step.dt_ratio;

            let p = self.linear_impulse;
            data.velocities[self.index_a].v -= m_a * p;
            data.velocities[self.index_a].w -=
                i_a * (cross_vv(self.r_a, p) + self.angular_impulse);
            data.velocities[self.index_b].v += m_b * p;
            data.velocities[self.index_b].w +=
                i_b * (cross_vv(self.r_b, p) + self.angular_impulse);
        } else {
            self.linear_impulse = Vec2::ZERO;
            self.angular_impulse = 0.0;
        }
    }

    pub(crate) fn solve_velocity_constraints(&mut self, data: &mut SolverData) {
        let m_a = self.inv_mass_a;
        let m_b = self.inv_mass_b;
        let i_a = self.inv_i_a;
        let i_b = self.inv_i_b;

        let mut v_a = data.velocities[self.index_a].v;
        let mut w_a = data.velocities[self.index_a].w;
        let mut v_b = data.velocities[self.index_b].v;
        let mut w_b = data.velocities[self.index_b].w;

        let h = data.step.dt;
        let inv_h = data.step.inv_dt;

        // Angular drive with blended position error.
        {
            let c_dot = w_b - w_a + inv_h * self.correction_factor * self.angular_error;
            let mut impulse = -self.angular_mass * c_dot;

            let old_impulse = self.angular_impulse;
            let max_impulse = h * self.max_torque;
            self.angular_impulse =
                (self.angular_impulse + impulse).clamp(-max_impulse, max_impulse);
            impulse = self.angular_impulse - old_impulse;

            w_a -= i_a * impulse;
            w_b += i_b * impulse;
        }

        // Linear drive with blended position error.
        {
            let c_dot = v_b + cross_sv(w_b, self.r_b) - v_a - cross_sv(w_a, self.r_a)
                + inv_h * self.correction_factor * self.linear_error;

            let mut impulse = -self.linear_mass.mul(c_dot);
            let old_impulse = self.linear_impulse;
            self.linear_impulse += impulse;

            let max_impulse = h * self.max_force;
            if self.linear_impulse.length_squared() > max_impulse * max_impulse {
                self.linear_impulse = self.linear_impulse.normalize() * max_impulse;
            }
            impulse = self.linear_impulse - old_impulse;

            v_a -= m_a * impulse;
            w_a -= i_a * cross_vv(self.r_a, impulse);
            v_b += m_b * impulse;
            w_b += i_b * cross_vv(self.r_b, impulse);
        }

        data.velocities[self.index_a].v = v_a;
        data.velocities[self.index_a].w = w_a;
        data.velocities[self.index_b].v = v_b;
        data.velocities[self.index_b].w = w_b;
    }
}
