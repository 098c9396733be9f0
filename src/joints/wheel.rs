//! Wheel Joint
//!
//! Point-on-line constraint for vehicle suspension: body B (the wheel)
//! slides along an axis fixed in body A (the chassis), held to the axis
//! rigidly but sprung along it by an independent suspension spring, with an
//! optional motor on the wheel's rotation.

use glam::Vec2;

use crate::fixture::BodyHandle;
use crate::island::SolverData;
use crate::joints::BodyContext;
use crate::math::{cross_sv, cross_vv, Rot};
use crate::settings::LINEAR_SLOP;

/// Blueprint for a [`WheelJoint`].
#[derive(Clone, Copy, Debug)]
pub struct WheelJointDef {
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
    /// Suspension axis in A's local frame.
    pub local_axis_a: Vec2,
    /// Enable the wheel motor?
    pub enable_motor: bool,
    /// Target angular speed of the wheel.
    pub motor_speed: f32,
    /// Torque budget for the motor.
    pub max_motor_torque: f32,
    /// Suspension frequency in Hz (0 disables the spring, locking the
    /// axis).
    pub frequency_hz: f32,
    /// Suspension damping ratio.
    pub damping_ratio: f32,
}

impl WheelJointDef {
    /// A suspension along body A's local y axis.
    #[must_use]
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            collide_connected: false,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            local_axis_a: Vec2::Y,
            enable_motor: false,
            motor_speed: 0.0,
            max_motor_torque: 0.0,
            frequency_hz: 2.0,
            damping_ratio: 0.7,
        }
    }

    /// Drive the wheel.
    #[must_use]
    pub fn with_motor(mut self, speed: f32, max_torque: f32) -> Self {
        self.enable_motor = true;
        self.motor_speed = speed;
        self.max_motor_torque = max_torque;
        self
    }

    /// Tune the suspension spring.
    #[must_use]
    pub fn with_spring(mut self, frequency_hz: f32, damping_ratio: f32) -> Self {
        self.frequency_hz = frequency_hz;
        self.damping_ratio = damping_ratio;
        self
    }
}

/// Suspension joint: rigid perpendicular to the axis, sprung along it.
pub struct WheelJoint {
    pub(crate) local_anchor_a: Vec2,
    pub(crate) local_anchor_b: Vec2,
    local_x_axis_a: Vec2,
    local_y_axis_a: Vec2,
    enable_motor: bool,
    motor_speed: f32,
    max_motor_torque: f32,
    frequency_hz: f32,
    damping_ratio: f32,

    impulse: f32,
    motor_impulse: f32,
    spring_impulse: f32,

    // Solver cache.
    index_a: usize,
    index_b: usize,
    local_center_a: Vec2,
    local_center_b: Vec2,
    inv_mass_a: f32,
    inv_mass_b: f32,
    inv_i_a: f32,
    inv_i_b: f32,
    ax: Vec2,
    ay: Vec2,
    s_ax: f32,
    s_bx: f32,
    s_ay: f32,
    s_by: f32,
    mass: f32,
    motor_mass: f32,
    spring_mass: f32,
    bias: f32,
    gamma: f32,
}

impl WheelJoint {
    pub(crate) fn new(def: &WheelJointDef) -> Self {
        let local_x = def.local_axis_a.normalize_or_zero();
        Self {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            local_x_axis_a: local_x,
            local_y_axis_a: cross_sv(1.0, local_x),
            enable_motor: def.enable_motor,
            motor_speed: def.motor_speed,
            max_motor_torque: def.max_motor_torque,
            frequency_hz: def.frequency_hz,
            damping_ratio: def.damping_ratio,
            impulse: 0.0,
            motor_impulse: 0.0,
            spring_impulse: 0.0,
            index_a: 0,
            index_b: 0,
            local_center_a: Vec2::ZERO,
            local_center_b: Vec2::ZERO,
            inv_mass_a: 0.0,
            inv_mass_b: 0.0,
            inv_i_a: 0.0,
            inv_i_b: 0.0,
            ax: Vec2::ZERO,
            ay: Vec2::ZERO,
            s_ax: 0.0,
            s_bx: 0.0,
            s_ay: 0.0,
            s_by: 0.0,
            mass: 0.0,
            motor_mass: 0.0,
            spring_mass: 0.0,
            bias: 0.0,
            gamma: 0.0,
        }
    }

    /// Change the motor's target speed.
    pub fn set_motor_speed(&mut self, speed: f32) {
        self.motor_speed = speed;
    }

    /// Enable/disable the motor.
    pub fn enable_motor(&mut self, flag: bool) {
        self.enable_motor = flag;
    }

    pub(crate) fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        inv_dt * (self.impulse * self.ay + self.spring_impulse * self.ax)
    }

    pub(crate) fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.motor_impulse
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

        let m_a = self.inv_mass_a;
        let m_b = self.inv_mass_b;
        let i_a = self.inv_i_a;
        let i_b = self.inv_i_b;

        let c_a = data.positions[self.index_a].c;
        let a_a = data.positions[self.index_a].a;
        let c_b = data.positions[self.index_b].c;
        let a_b = data.positions[self.index_b].a;

        let q_a = Rot::new(a_a);
        let q_b = Rot::new(a_b);

        let r_a = q_a.apply(self.local_anchor_a - self.local_center_a);
        let r_b = q_b.apply(self.local_anchor_b - self.local_center_b);
        let d = c_b + r_b - c_a - r_a;

        // Rigid row perpendicular to the axis.
        self.ay = q_a.apply(self.local_y_axis_a);
        self.s_ay = cross_vv(d + r_a, self.ay);
        self.s_by = cross_vv(r_b, self.ay);

        self.mass = m_a + m_b + i_a * self.s_ay * self.s_ay + i_b * self.s_by * self.s_by;
        if self.mass > 0.0 {
            self.mass = 1.0 / self.mass;
        }

        // Spring row along the axis.
        self.ax = q_a.apply(self.local_x_axis_a);
        self.s_ax = cross_vv(d + r_a, self.ax);
        self.s_bx = cross_vv(r_b, self.ax);

        self.spring_mass = 0.0;
        self.bias = 0.0;
        self.gamma = 0.0;

        if self.frequency_hz > 0.0 {
            let inv_mass = m_a + m_b + i_a * self.s_ax * self.s_ax + i_b * self.s_bx * self.s_bx;
            if inv_mass > 0.0 {
                self.spring_mass = 1.0 / inv_mass;

                let c = d.dot(self.ax);
                let omega = 2.0 * core::f32::consts::PI * self.frequency_hz;
                let damp = 2.0 * self.spring_mass * self.damping_ratio * omega;
                let k = self.spring_mass * omega * omega;

                let h = data.step.dt;
                self.gamma = h * (damp + h * k);
                if self.gamma > 0.0 {
                    self.gamma = 1.0 / self.gamma;
                }
                self.bias = c * h * k * self.gamma;

                self.spring_mass = inv_mass + self.gamma;
                if self.spring_mass > 0.0 {
                    self.spring_mass = 1.0 / self.spring_mass;
                }
            }
        } else {
            self.spring_impulse = 0.0;
        }

        if self.enable_motor {
            self.motor_mass = i_a + i_b;
            if self.motor_mass > 0.0 {
                self.motor_mass = 1.0 / self.motor_mass;
            }
        } else {
            self.motor_mass = 0.0;
            self.motor_impulse = 0.0;
        }

        if data.step.warm_starting {
            self.impulse *= data.step.dt_ratio;
            self.spring_impulse *= data.step.dt_ratio;
            self.motor_impulse *= data.step.dt_ratio;

            let p = self.impulse * self.ay + self.spring_impulse * self.ax;
            let l_a = self.impulse * self.s_ay + self.spring_impulse * self.s_ax + self.motor_impulse;
            let l_b = self.impulse * self.s_by + self.spring_impulse * self.s_bx + self.motor_impulse;

            data.velocities[self.index_a].v -= m_a * p;
            data.velocities[self.index_a].w -= i_a * l_a;
            data.velocities[self.index_b].v += m_b * p;
            data.velocities[self.index_b].w += i_b * l_b;
        } else {
            self.impulse = 0.0;
            self.spring_impulse = 0.0;
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

        // Suspension spring.
        {
            let c_dot = self.ax.dot(v_b - v_a) + self.s_bx * w_b - self.s_ax * w_a;
            let impulse =
                -self.spring_mass * (c_dot + self.bias + self.gamma * self.spring_impulse);
            self.spring_impulse += impulse;

            let p = impulse * self.ax;
            let l_a = impulse * self.s_ax;
            let l_b = impulse * self.s_bx;

            v_a -= m_a * p;
            w_a -= i_a * l_a;
            v_b += m_b * p;
            w_b += i_b * l_b;
        }

        // Wheel motor.
        {
            let c_dot = w_b - w_a - self.motor_speed;
            let mut impulse = -self.motor_mass * c_dot;

            let old_impulse = self.motor_impulse;
            let max_impulse = self.max_motor_torque * data.step.dt;
            self.motor_impulse = (self.motor_impulse + impulse).clamp(-max_impulse, max_impulse);
            impulse = self.motor_impulse - old_impulse;

            w_a -= i_a * impulse;
            w_b += i_b * impulse;
        }

        // Rigid point-on-line row.
        {
            let c_dot = self.ay.dot(v_b - v_a) + self.s_by * w_b - self.s_ay * w_a;
            let impulse = -self.mass * c_dot;
            self.impulse += impulse;

            let p = impulse * self.ay;
            let l_a = impulse * self.s_ay;
            let l_b = impulse * self.s_by;

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

        let r_a = q_a.apply(self.local_anchor_a - self.local_center_a);
        let r_b = q_b.apply(self.local_anchor_b - self.local_center_b);
        let d = c_b + r_b - c_a - r_a;

        let ay = q_a.apply(self.local_y_axis_a);
        let s_ay = cross_vv(d + r_a, ay);
        let s_by = cross_vv(r_b, ay);

        let c = d.dot(ay);

        let k = self.inv_mass_a
            + self.inv_mass_b
            + self.inv_i_a * s_ay * s_ay
            + self.inv_i_b * s_by * s_by;

        let impulse = if k != 0.0 { -c / k } else { 0.0 };
        let p = impulse * ay;
        let l_a = impulse * s_ay;
        let l_b = impulse * s_by;

        c_a -= self.inv_mass_a * p;
        a_a -= self.inv_i_a * l_a;
        c_b += self.inv_mass_b * p;
        a_b += self.inv_i_b * l_b;

        data.positions[self.index_a].c = c_a;
        data.positions[self.index_a].a = a_a;
        data.positions[self.index_b].c = c_b;
        data.positions[self.index_b].a = a_b;

        c.abs() <= LINEAR_SLOP
    }
}
