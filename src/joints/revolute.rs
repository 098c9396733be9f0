//! Revolute Joint
//!
//! Pins two bodies together at a point while leaving relative rotation
//! free, optionally bounded by an angle limit and driven by a motor with
//! bounded torque. The point constraint and the limit share one 3×3
//! effective mass; when the limit impulse would pull (instead of push) the
//! solve falls back to the 2×2 point block.

use glam::Vec2;

use crate::fixture::BodyHandle;
use crate::island::SolverData;
use crate::joints::{BodyContext, LimitState};
use crate::math::{cross_sv, cross_vv, Mat22, Mat33, Rot, Vec3};
use crate::settings::{ANGULAR_SLOP, LINEAR_SLOP, MAX_ANGULAR_CORRECTION};

/// Blueprint for a [`RevoluteJoint`].
#[derive(Clone, Copy, Debug)]
pub struct RevoluteJointDef {
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
    /// `angle_b - angle_a` at rest.
    pub reference_angle: f32,
    /// Enable the angle limit?
    pub enable_limit: bool,
    /// Lower limit angle, relative to the reference.
    pub lower_angle: f32,
    /// Upper limit angle, relative to the reference.
    pub upper_angle: f32,
    /// Enable the motor?
    pub enable_motor: bool,
    /// Target relative angular velocity, radians/second.
    pub motor_speed: f32,
    /// Torque budget for reaching the motor speed.
    pub max_motor_torque: f32,
}

impl RevoluteJointDef {
    /// A pin between body-origin anchors.
    #[must_use]
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            collide_connected: false,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            reference_angle: 0.0,
            enable_limit: false,
            lower_angle: 0.0,
            upper_angle: 0.0,
            enable_motor: false,
            motor_speed: 0.0,
            max_motor_torque: 0.0,
        }
    }

    /// Bound the joint angle.
    #[must_use]
    pub fn with_limit(mut self, lower: f32, upper: f32) -> Self {
        self.enable_limit = true;
        self.lower_angle = lower;
        self.upper_angle = upper;
        self
    }

    /// Drive the joint angle.
    #[must_use]
    pub fn with_motor(mut self, speed: f32, max_torque: f32) -> Self {
        self.enable_motor = true;
        self.motor_speed = speed;
        self.max_motor_torque = max_torque;
        self
    }
}

/// Point pin with optional limit and motor.
pub struct RevoluteJoint {
    pub(crate) local_anchor_a: Vec2,
    pub(crate) local_anchor_b: Vec2,
    reference_angle: f32,
    enable_limit: bool,
    lower_angle: f32,
    upper_angle: f32,
    enable_motor: bool,
    motor_speed: f32,
    max_motor_torque: f32,

    /// (point x, point y, limit) accumulated impulses.
    impulse: Vec3,
    motor_impulse: f32,

    // Solver cache.
    index_a: usize,
    index_b: usize,
    r_a: Vec2,
    r_b: Vec2,
    local_center_a: Vec2,
    local_center_b: Vec2,
    inv_mass_a: f32,
    inv_mass_b: f32,
    inv_i_a: f32,
    inv_i_b: f32,
    mass: Mat33,
    motor_mass: f32,
    limit_state: LimitState,
}

impl RevoluteJoint {
    pub(crate) fn new(def: &RevoluteJointDef) -> Self {
        Self {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            reference_angle: def.reference_angle,
            enable_limit: def.enable_limit,
            lower_angle: def.lower_angle,
            upper_angle: def.upper_angle,
            enable_motor: def.enable_motor,
            motor_speed: def.motor_speed,
            max_motor_torque: def.max_motor_torque,
            impulse: Vec3::ZERO,
            motor_impulse: 0.0,
            index_a: 0,
            index_b: 0,
            r_a: Vec2::ZERO,
            r_b: Vec2::ZERO,
            local_center_a: Vec2::ZERO,
            local_center_b: Vec2::ZERO,
            inv_mass_a: 0.0,
            inv_mass_b: 0.0,
            inv_i_a: 0.0,
            inv_i_b: 0.0,
            mass: Mat33::default(),
            motor_mass: 0.0,
            limit_state: LimitState::Inactive,
        }
    }

    /// The rest angle `angle_b - angle_a`.
    #[inline]
    #[must_use]
    pub fn reference_angle(&self) -> f32 {
        self.reference_angle
    }

    /// Change the motor's target speed, in radians/second.
    pub fn set_motor_speed(&mut self, speed: f32) {
        self.motor_speed = speed;
    }

    /// Motor target speed.
    #[inline]
    #[must_use]
    pub fn motor_speed(&self) -> f32 {
        self.motor_speed
    }

    /// Enable/disable the motor.
    pub fn enable_motor(&mut self, flag: bool) {
        self.enable_motor = flag;
    }

    /// Enable/disable the angle limit.
    pub fn enable_limit(&mut self, flag: bool) {
        if flag != self.enable_limit {
            self.enable_limit = flag;
            self.impulse.z = 0.0;
        }
    }

    /// Motor torque applied last step, for diagnostics.
    #[must_use]
    pub fn motor_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.motor_impulse
    }

    pub(crate) fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        inv_dt * Vec2::new(self.impulse.x, self.impulse.y)
    }

    pub(crate) fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.impulse.z
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

        let a_a = data.positions[self.index_a].a;
        let a_b = data.positions[self.index_b].a;
        let q_a = Rot::new(a_a);
        let q_b = Rot::new(a_b);

        self.r_a = q_a.apply(self.local_anchor_a - self.local_center_a);
        self.r_b = q_b.apply(self.local_anchor_b - self.local_center_b);

        let m_a = self.inv_mass_a;
        let m_b = self.inv_mass_b;
        let i_a = self.inv_i_a;
        let i_b = self.inv_i_b;

        let fixed_rotation = i_a + i_b == 0.0;

        self.mass.ex.x = m_a + m_b + self.r_a.y * self.r_a.y * i_a + self.r_b.y * self.r_b.y * i_b;
        self.mass.ey.x = -self.r_a.y * self.r_a.x * i_a - self.r_b.y * self.r_b.x * i_b;
        self.mass.ez.x = -self.r_a.y * i_a - self.r_b.y * i_b;
        self.mass.ex.y = self.mass.ey.x;
        self.mass.ey.y = m_a + m_b + self.r_a.x * self.r_a.x * i_a + self.r_b.x * self.r_b.x * i_b;
        self.mass.ez.y = self.r_a.x * i_a + self.r_b.x * i_b;
        self.mass.ex.z = self.mass.ez.x;
        self.mass.ey.z = self.mass.ez.y;
        self.mass.ez.z = i_a + i_b;

        self.motor_mass = if i_a + i_b > 0.0 {
            1.0 / (i_a + i_b)
        } else {
            0.0
        };

        if !self.enable_motor || fixed_rotation {
            self.motor_impulse = 0.0;
        }

        if self.enable_limit && !fixed_rotation {
            let joint_angle = a_b - a_a - self.reference_angle;
            if (self.upper_angle - self.lower_angle).abs() < 2.0 * ANGULAR_SLOP {
                self.limit_state = LimitState::Equal;
            } else if joint_angle <= self.lower_angle {
                if self.limit_state != LimitState::AtLower {
                    self.impulse.z = 0.0;
                }
                self.limit_state = LimitState::AtLower;
            } else if joint_angle >= self.upper_angle {
                if self.limit_state != LimitState::AtUpper {
                    self.impulse.z = 0.0;
                }
                self.limit_state = LimitState::AtUpper;
            } else {
                self.limit_state = LimitState::Inactive;
                self.impulse.z = 0.0;
            }
        } else {
            self.limit_state = LimitState::Inactive;
        }

        if data.step.warm_starting {
            self.impulse = Vec3::new(
                data.step.dt_ratio * self.impulse.x,
                data.step.dt_ratio * self.impulse.y,
                data.step.dt_ratio * self.impulse.z,
            );
            self.motor_impulse *= data.step.dt_ratio;

            let p = Vec2::new(self.impulse.x, self.impulse.y);
            data.velocities[self.index_a].v -= m_a * p;
            data.velocities[self.index_a].w -=
                i_a * (cross_vv(self.r_a, p) + self.motor_impulse + self.impulse.z);
            data.velocities[self.index_b].v += m_b * p;
            data.velocities[self.index_b].w +=
                i_b * (cross_vv(self.r_b, p) + self.motor_impulse + self.impulse.z);
        } else {
            self.impulse = Vec3::ZERO;
            self.motor_impulse = 0.0;
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

        let fixed_rotation = i_a + i_b == 0.0;

        // Motor.
        if self.enable_motor && self.limit_state != LimitState::Equal && !fixed_rotation {
            let c_dot = w_b - w_a - self.motor_speed;
            let mut impulse = -self.motor_mass * c_dot;
            let old_impulse = self.motor_impulse;
            let max_impulse = self.max_motor_torque * data.step.dt;
            self.motor_impulse = (self.motor_impulse + impulse).clamp(-max_impulse, max_impulse);
            impulse = self.motor_impulse - old_impulse;

            w_a -= i_a * impulse;
            w_b += i_b * impulse;
        }

        // Limit coupled with the point constraint.
        if self.enable_limit && self.limit_state != LimitState::Inactive && !fixed_rotation {
            let c_dot1 = v_b + cross_sv(w_b, self.r_b) - v_a - cross_sv(w_a, self.r_a);
            let c_dot2 = w_b - w_a;
            let c_dot = Vec3::new(c_dot1.x, c_dot1.y, c_dot2);

            let mut impulse = -self.mass.solve33(c_dot);

            match self.limit_state {
                LimitState::Equal => {
                    self.impulse = self.impulse + impulse;
                }
                LimitState::AtLower => {
                    let new_impulse = self.impulse.z + impulse.z;
                    if new_impulse < 0.0 {
                        let rhs = -c_dot1
                            + self.impulse.z * Vec2::new(self.mass.ez.x, self.mass.ez.y);
                        let reduced = self.mass.solve22(rhs);
                        impulse.x = reduced.x;
                        impulse.y = reduced.y;
                        impulse.z = -self.impulse.z;
                        self.impulse.x += reduced.x;
                        self.impulse.y += reduced.y;
                        self.impulse.z = 0.0;
                    } else {
                        self.impulse = self.impulse + impulse;
                    }
                }
                LimitState::AtUpper => {
                    let new_impulse = self.impulse.z + impulse.z;
                    if new_impulse > 0.0 {
                        let rhs = -c_dot1
                            + self.impulse.z * Vec2::new(self.mass.ez.x, self.mass.ez.y);
                        let reduced = self.mass.solve22(rhs);
                        impulse.x = reduced.x;
                        impulse.y = reduced.y;
                        impulse.z = -self.impulse.z;
                        self.impulse.x += reduced.x;
                        self.impulse.y += reduced.y;
                        self.impulse.z = 0.0;
                    } else {
                        self.impulse = self.impulse + impulse;
                    }
                }
                LimitState::Inactive => unreachable!(),
            }

            let p = Vec2::new(impulse.x, impulse.y);
            v_a -= m_a * p;
            w_a -= i_a * (cross_vv(self.r_a, p) + impulse.z);
            v_b += m_b * p;
            w_b += i_b * (cross_vv(self.r_b, p) + impulse.z);
        } else {
            // Plain point constraint.
            let c_dot = v_b + cross_sv(w_b, self.r_b) - v_a - cross_sv(w_a, self.r_a);
            let impulse = self.mass.solve22(-c_dot);

            self.impulse.x += impulse.x;
            self.impulse.y += impulse.y;

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

    pub(crate) fn solve_position_constraints(&mut self, data: &mut SolverData) -> bool {
        let mut c_a = data.positions[self.index_a].c;
        let mut a_a = data.positions[self.index_a].a;
        let mut c_b = data.positions[self.index_b].c;
        let mut a_b = data.positions[self.index_b].a;

        let mut angular_error = 0.0;
        let fixed_rotation = self.inv_i_a + self.inv_i_b == 0.0;

        // Angle limit first.
        if self.enable_limit && self.limit_state != LimitState::Inactive && !fixed_rotation {
            let angle = a_b - a_a - self.reference_angle;
            let mut limit_impulse = 0.0;

            match self.limit_state {
                LimitState::Equal => {
                    let c = (angle - self.lower_angle)
                        .clamp(-MAX_ANGULAR_CORRECTION, MAX_ANGULAR_CORRECTION);
                    limit_impulse = -self.motor_mass * c;
                    angular_error = c.abs();
                }
                LimitState::AtLower => {
                    let mut c = angle - self.lower_angle;
                    angular_error = -c;
                    c = (c + ANGULAR_SLOP).clamp(-MAX_ANGULAR_CORRECTION, 0.0);
                    limit_impulse = -self.motor_mass * c;
                }
                LimitState::AtUpper => {
                    let mut c = angle - self.upper_angle;
                    angular_error = c;
                    c = (c - ANGULAR_SLOP).clamp(0.0, MAX_ANGULAR_CORRECTION);
                    limit_impulse = -self.motor_mass * c;
                }
                LimitState::Inactive => {}
            }

            a_a -= self.inv_i_a * limit_impulse;
            a_b += self.inv_i_b * limit_impulse;
        }

        // Point coincidence.
        let q_a = Rot::new(a_a);
        let q_b = Rot::new(a_b);
        let r_a = q_a.apply(self.local_anchor_a - self.local_center_a);
        let r_b = q_b.apply(self.local_anchor_b - self.local_center_b);

        let c = c_b + r_b - c_a - r_a;
        let position_error = c.length();

        let m_a = self.inv_mass_a;
        let m_b = self.inv_mass_b;
        let i_a = self.inv_i_a;
        let i_b = self.inv_i_b;

        let k = Mat22::new(
            Vec2::new(
                m_a + m_b + i_a * r_a.y * r_a.y + i_b * r_b.y * r_b.y,
                -i_a * r_a.x * r_a.y - i_b * r_b.x * r_b.y,
            ),
            Vec2::new(
                -i_a * r_a.x * r_a.y - i_b * r_b.x * r_b.y,
                m_a + m_b + i_a * r_a.x * r_a.x + i_b * r_b.x * r_b.x,
            ),
        );
        let impulse = -k.solve(c);

        c_a -= m_a * impulse;
        a_a -= i_a * cross_vv(r_a, impulse);
        c_b += m_b * impulse;
        a_b += i_b * cross_vv(r_b, impulse);

        data.positions[self.index_a].c = c_a;
        data.positions[self.index_a].a = a_a;
        data.positions[self.index_b].c = c_b;
        data.positions[self.index_b].a = a_b;

        position_error <= LINEAR_SLOP && angular_error <= ANGULAR_SLOP
    }
}
