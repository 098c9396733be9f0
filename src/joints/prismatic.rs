//! Prismatic Joint
//!
//! Constrains body B to slide along an axis fixed in body A, with relative
//! rotation locked. Two constraint rows (perpendicular displacement and
//! relative angle) are always active; a third row along the axis activates
//! for the optional translation limit, and a motor drives translation along
//! the axis with bounded force.

use glam::Vec2;

use crate::fixture::BodyHandle;
use crate::island::SolverData;
use crate::joints::{BodyContext, LimitState};
use crate::math::{cross_vv, Mat22, Mat33, Rot, Vec3};
use crate::settings::{ANGULAR_SLOP, LINEAR_SLOP, MAX_LINEAR_CORRECTION};

/// Blueprint for a [`PrismaticJoint`].
#[derive(Clone, Copy, Debug)]
pub struct PrismaticJointDef {
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
    /// Slide axis in A's local frame (unit length).
    pub local_axis_a: Vec2,
    /// `angle_b - angle_a` at rest.
    pub reference_angle: f32,
    /// Enable the translation limit?
    pub enable_limit: bool,
    /// Lower translation limit along the axis.
    pub lower_translation: f32,
    /// Upper translation limit along the axis.
    pub upper_translation: f32,
    /// Enable the motor?
    pub enable_motor: bool,
    /// Target translation speed along the axis.
    pub motor_speed: f32,
    /// Force budget for the motor.
    pub max_motor_force: f32,
}

impl PrismaticJointDef {
    /// A slider along body A's local x axis.
    #[must_use]
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            collide_connected: false,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            local_axis_a: Vec2::X,
            reference_angle: 0.0,
            enable_limit: false,
            lower_translation: 0.0,
            upper_translation: 0.0,
            enable_motor: false,
            motor_speed: 0.0,
            max_motor_force: 0.0,
        }
    }

    /// Bound the translation.
    #[must_use]
    pub fn with_limit(mut self, lower: f32, upper: f32) -> Self {
        self.enable_limit = true;
        self.lower_translation = lower;
        self.upper_translation = upper;
        self
    }

    /// Drive the translation.
    #[must_use]
    pub fn with_motor(mut self, speed: f32, max_force: f32) -> Self {
        self.enable_motor = true;
        self.motor_speed = speed;
        self.max_motor_force = max_force;
        self
    }
}

/// Point-on-axis constraint with angle lock, limit, and motor.
pub struct PrismaticJoint {
    pub(crate) local_anchor_a: Vec2,
    pub(crate) local_anchor_b: Vec2,
    local_x_axis_a: Vec2,
    local_y_axis_a: Vec2,
    reference_angle: f32,
    enable_limit: bool,
    lower_translation: f32,
    upper_translation: f32,
    enable_motor: bool,
    motor_speed: f32,
    max_motor_force: f32,

    /// (perp, angle, axis-limit) accumulated impulses.
    impulse: Vec3,
    motor_impulse: f32,

    // Solver cache.
    index_a: usize,
    index_b: usize,
    local_center_a: Vec2,
    local_center_b: Vec2,
    inv_mass_a: f32,
    inv_mass_b: f32,
    inv_i_a: f32,
    inv_i_b: f32,
    axis: Vec2,
    perp: Vec2,
    s1: f32,
    s2: f32,
    a1: f32,
    a2: f32,
    k: Mat33,
    motor_mass: f32,
    limit_state: LimitState,
}

impl PrismaticJoint {
    pub(crate) fn new(def: &PrismaticJointDef) -> Self {
        let local_x = def.local_axis_a.normalize_or_zero();
        Self {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            local_x_axis_a: local_x,
            local_y_axis_a: crate::math::cross_sv(1.0, local_x),
            reference_angle: def.reference_angle,
            enable_limit: def.enable_limit,
            lower_translation: def.lower_translation,
            upper_translation: def.upper_translation,
            enable_motor: def.enable_motor,
            motor_speed: def.motor_speed,
            max_motor_force: def.max_motor_force,
            impulse: Vec3::ZERO,
            motor_impulse: 0.0,
            index_a: 0,
            index_b: 0,
            local_center_a: Vec2::ZERO,
            local_center_b: Vec2::ZERO,
            inv_mass_a: 0.0,
            inv_mass_b: 0.0,
            inv_i_a: 0.0,
            inv_i_b: 0.0,
            axis: Vec2::ZERO,
            perp: Vec2::ZERO,
            s1: 0.0,
            s2: 0.0,
            a1: 0.0,
            a2: 0.0,
            k: Mat33::default(),
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

    /// The slide axis in body A's local frame.
    #[inline]
    #[must_use]
    pub fn local_axis(&self) -> Vec2 {
        self.local_x_axis_a
    }

    /// Change the motor's target translation speed.
    pub fn set_motor_speed(&mut self, speed: f32) {
        self.motor_speed = speed;
    }

    /// Enable/disable the motor.
    pub fn enable_motor(&mut self, flag: bool) {
        self.enable_motor = flag;
    }

    /// Enable/disable the translation limit.
    pub fn enable_limit(&mut self, flag: bool) {
        if flag != self.enable_limit {
            self.enable_limit = flag;
            self.impulse.z = 0.0;
        }
    }

    pub(crate) fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        inv_dt * (self.impulse.x * self.perp + (self.motor_impulse + self.impulse.z) * self.axis)
    }

    pub(crate) fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.impulse.y
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

        let r_a = q_a.apply(self.local_anchor_a - self.local_center_a);
        let r_b = q_b.apply(self.local_anchor_b - self.local_center_b);
        let d = (c_b - c_a) + r_b - r_a;

        let m_a = self.inv_mass_a;
        let m_b = self.inv_mass_b;
        let i_a = self.inv_i_a;
        let i_b = self.inv_i_b;

        // Axis row (motor/limit).
        self.axis = q_a.apply(self.local_x_axis_a);
        self.a1 = cross_vv(d + r_a, self.axis);
        self.a2 = cross_vv(r_b, self.axis);

        self.motor_mass = m_a + m_b + i_a * self.a1 * self.a1 + i_b * self.a2 * self.a2;
        if self.motor_mass > 0.0 {
            self.motor_mass = 1.0 / self.motor_mass;
        }

        // Perp + angular rows.
        self.perp = q_a.apply(self.local_y_axis_a);
        self.s1 = cross_vv(d + r_a, self.perp);
        self.s2 = cross_vv(r_b, self.perp);

        let k11 = m_a + m_b + i_a * self.s1 * self.s1 + i_b * self.s2 * self.s2;
        let k12 = i_a * self.s1 + i_b * self.s2;
        let k13 = i_a * self.s1 * self.a1 + i_b * self.s2 * self.a2;
        let mut k22 = i_a + i_b;
        if k22 == 0.0 {
            // Both bodies rotation-locked; the angular row is trivially
            // satisfied.
            k22 = 1.0;
        }
        let k23 = i_a * self.a1 + i_b * self.a2;
        let k33 = m_a + m_b + i_a * self.a1 * self.a1 + i_b * self.a2 * self.a2;

        self.k.ex = Vec3::new(k11, k12, k13);
        self.k.ey = Vec3::new(k12, k22, k23);
        self.k.ez = Vec3::new(k13, k23, k33);

        if self.enable_limit {
            let joint_translation = self.axis.dot(d);
            if (self.upper_translation - self.lower_translation).abs() < 2.0 * LINEAR_SLOP {
                self.limit_state = LimitState::Equal;
            } else if joint_translation <= self.lower_translation {
                if self.limit_state != LimitState::AtLower {
                    self.limit_state = LimitState::AtLower;
                    self.impulse.z = 0.0;
                }
            } else if joint_translation >= self.upper_translation {
                if self.limit_state != LimitState::AtUpper {
                    self.limit_state = LimitState::AtUpper;
                    self.impulse.z = 0.0;
                }
            } else {
                self.limit_state = LimitState::Inactive;
                self.impulse.z = 0.0;
            }
        } else {
            self.limit_state = LimitState::Inactive;
            self.impulse.z = 0.0;
        }

        if !self.enable_motor {
            self.motor_impulse = 0.0;
        }

        if data.step.warm_starting {
            self.impulse = Vec3::new(
                data.step.dt_ratio * self.impulse.x,
                data.step.dt_ratio * self.impulse.y,
                data.step.dt_ratio * self.impulse.z,
            );
            self.motor_impulse *= data.step.dt_ratio;

            let p = self.impulse.x * self.perp + (self.motor_impulse + self.impulse.z) * self.axis;
            let l_a =
                self.impulse.x * self.s1 + self.impulse.y + (self.motor_impulse + self.impulse.z) * self.a1;
            let l_b =
                self.impulse.x * self.s2 + self.impulse.y + (self.motor_impulse + self.impulse.z) * self.a2;

            data.velocities[self.index_a].v -= m_a * p;
            data.velocities[self.index_a].w -= i_a * l_a;
            data.velocities[self.index_b].v += m_b * p;
            data.velocities[self.index_b].w += i_b * l_b;
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

        // Motor along the axis.
        if self.enable_motor && self.limit_state != LimitState::Equal {
            let c_dot = self.axis.dot(v_b - v_a) + self.a2 * w_b - self.a1 * w_a;
            let mut impulse = self.motor_mass * (self.motor_speed - c_dot);
            let old_impulse = self.motor_impulse;
            let max_impulse = self.max_motor_force * data.step.dt;
            self.motor_impulse = (self.motor_impulse + impulse).clamp(-max_impulse, max_impulse);
            impulse = self.motor_impulse - old_impulse;

            let p = impulse * self.axis;
            let l_a = impulse * self.a1;
            let l_b = impulse * self.a2;

            v_a -= m_a * p;
            w_a -= i_a * l_a;
            v_b += m_b * p;
            w_b += i_b * l_b;
        }

        let c_dot1 = Vec2::new(
            self.perp.dot(v_b - v_a) + self.s2 * w_b - self.s1 * w_a,
            w_b - w_a,
        );

        if self.enable_limit && self.limit_state != LimitState::Inactive {
            // Solve all three rows, then clamp the limit row one-sidedly
            // and re-solve the free rows against the clamped value.
            let c_dot2 = self.axis.dot(v_b - v_a) + self.a2 * w_b - self.a1 * w_a;
            let c_dot = Vec3::new(c_dot1.x, c_dot1.y, c_dot2);

            let f1 = self.impulse;
            let df = self.k.solve33(-c_dot);
            self.impulse = self.impulse + df;

            if self.limit_state == LimitState::AtLower {
                self.impulse.z = self.impulse.z.max(0.0);
            } else if self.limit_state == LimitState::AtUpper {
                self.impulse.z = self.impulse.z.min(0.0);
            }

            let b = -c_dot1 - (self.impulse.z - f1.z) * Vec2::new(self.k.ez.x, self.k.ez.y);
            let f2r = self.k.solve22(b) + Vec2::new(f1.x, f1.y);
            self.impulse.x = f2r.x;
            self.impulse.y = f2r.y;

            let df = self.impulse - f1;

            let p = df.x * self.perp + df.z * self.axis;
            let l_a = df.x * self.s1 + df.y + df.z * self.a1;
            let l_b = df.x * self.s2 + df.y + df.z * self.a2;

            v_a -= m_a * p;
            w_a -= i_a * l_a;
            v_b += m_b * p;
            w_b += i_b * l_b;
        } else {
            let df = self.k.solve22(-c_dot1);
            self.impulse.x += df.x;
            self.impulse.y += df.y;

            let p = df.x * self.perp;
            let l_a = df.x * self.s1 + df.y;
            let l_b = df.x * self.s2 + df.y;

            v_a -= m_a * p;
            w_a -= i_a * l_a;
            v_b += m_b * p;
            w_b += i_b * l_b;
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

        let q_a = Rot::new(a_a);
        let q_b = Rot::new(a_b);

        let m_a = self.inv_mass_a;
        let m_b = self.inv_mass_b;
        let i_a = self.inv_i_a;
        let i_b = self.inv_i_b;

        let r_a = q_a.apply(self.local_anchor_a - self.local_center_a);
        let r_b = q_b.apply(self.local_anchor_b - self.local_center_b);
        let d = c_b + r_b - c_a - r_a;

        let axis = q_a.apply(self.local_x_axis_a);
        let a1 = cross_vv(d + r_a, axis);
        let a2 = cross_vv(r_b, axis);
        let perp = q_a.apply(self.local_y_axis_a);
        let s1 = cross_vv(d + r_a, perp);
        let s2 = cross_vv(r_b, perp);

        let c1 = Vec2::new(perp.dot(d), a_b - a_a - self.reference_angle);
        let mut linear_error = c1.x.abs();
        let angular_error = c1.y.abs();

        let mut active = false;
        let mut c2 = 0.0;
        if self.enable_limit {
            let translation = axis.dot(d);
            if (self.upper_translation - self.lower_translation).abs() < 2.0 * LINEAR_SLOP {
                c2 = translation.clamp(-MAX_LINEAR_CORRECTION, MAX_LINEAR_CORRECTION);
                linear_error = linear_error.max(translation.abs());
                active = true;
            } else if translation <= self.lower_translation {
                c2 = (translation - self.lower_translation + LINEAR_SLOP)
                    .clamp(-MAX_LINEAR_CORRECTION, 0.0);
                linear_error = linear_error.max(self.lower_translation - translation);
                active = true;
            } else if translation >= self.upper_translation {
                c2 = (translation - self.upper_translation - LINEAR_SLOP)
                    .clamp(0.0, MAX_LINEAR_CORRECTION);
                linear_error = linear_error.max(translation - self.upper_translation);
                active = true;
            }
        }

        let impulse = if active {
            let k11 = m_a + m_b + i_a * s1 * s1 + i_b * s2 * s2;
            let k12 = i_a * s1 + i_b * s2;
            let k13 = i_a * s1 * a1 + i_b * s2 * a2;
            let mut k22 = i_a + i_b;
            if k22 == 0.0 {
                k22 = 1.0;
            }
            let k23 = i_a * a1 + i_b * a2;
            let k33 = m_a + m_b + i_a * a1 * a1 + i_b * a2 * a2;

            let k = Mat33 {
                ex: Vec3::new(k11, k12, k13),
                ey: Vec3::new(k12, k22, k23),
                ez: Vec3::new(k13, k23, k33),
            };
            k.solve33(-Vec3::new(c1.x, c1.y, c2))
        } else {
            let k11 = m_a + m_b + i_a * s1 * s1 + i_b * s2 * s2;
            let k12 = i_a * s1 + i_b * s2;
            let mut k22 = i_a + i_b;
            if k22 == 0.0 {
                k22 = 1.0;
            }
            let k = Mat22::new(Vec2::new(k11, k12), Vec2::new(k12, k22));
            let impulse1 = k.solve(-c1);
            Vec3::new(impulse1.x, impulse1.y, 0.0)
        };

        let p = impulse.x * perp + impulse.z * axis;
        let l_a = impulse.x * s1 + impulse.y + impulse.z * a1;
        let l_b = impulse.x * s2 + impulse.y + impulse.z * a2;

        c_a -= m_a * p;
        a_a -= i_a * l_a;
        c_b += m_b * p;
        a_b += i_b * l_b;

        data.positions[self.index_a].c = c_a;
        data.positions[self.index_a].a = a_a;
        data.positions[self.index_b].c = c_b;
        data.positions[self.index_b].a = a_b;

        linear_error <= LINEAR_SLOP && angular_error <= ANGULAR_SLOP
    }
}
