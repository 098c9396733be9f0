//! Weld Joint
//!
//! Rigidly glues two bodies: point coincidence plus angle lock, solved as
//! one 3×3 block. A nonzero frequency softens only the angular row, which
//! gives breakable-looking structures some give without letting the anchor
//! points drift apart.

use glam::Vec2;

use crate::fixture::BodyHandle;
use crate::island::SolverData;
use crate::joints::BodyContext;
use crate::math::{cross_sv, cross_vv, Mat33, Rot, Vec3};
use crate::settings::{ANGULAR_SLOP, LINEAR_SLOP};

/// Blueprint for a [`WeldJoint`].
#[derive(Clone, Copy, Debug)]
pub struct WeldJointDef {
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
    /// Angular spring frequency in Hz; 0 makes the weld fully rigid.
    pub frequency_hz: f32,
    /// Angular spring damping ratio.
    pub damping_ratio: f32,
}

impl WeldJointDef {
    /// A rigid weld between body-origin anchors.
    #[must_use]
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            collide_connected: false,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            reference_angle: 0.0,
            frequency_hz: 0.0,
            damping_ratio: 0.0,
        }
    }

    /// Soften the angular lock.
    #[must_use]
    pub fn with_spring(mut self, frequency_hz: f32, damping_ratio: f32) -> Self {
        self.frequency_hz = frequency_hz;
        self.damping_ratio = damping_ratio;
        self
    }
}

/// Rigid (or angularly sprung) union of two bodies.
pub struct WeldJoint {
    pub(crate) local_anchor_a: Vec2,
    pub(crate) local_anchor_b: Vec2,
    reference_angle: f32,
    frequency_hz: f32,
    damping_ratio: f32,

    impulse: Vec3,
    gamma: f32,
    bias: f32,

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
    /// Inverted effective mass (the solver multiplies by it).
    mass: Mat33,
}

impl WeldJoint {
    pub(crate) fn new(def: &WeldJointDef) -> Self {
        Self {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            reference_angle: def.reference_angle,
            frequency_hz: def.frequency_hz,
            damping_ratio: def.damping_ratio,
            impulse: Vec3::ZERO,
            gamma: 0.0,
            bias: 0.0,
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
        }
    }

    pub(crate) fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        inv_dt * Vec2::new(self.impulse.x, self.impulse.y)
    }

    pub(crate) fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.impulse.z
    }

    fn stiffness_matrix(&self) -> Mat33 {
        let m_a = self.inv_mass_a;
        let m_b = self.inv_mass_b;
        let i_a = self.inv_i_a;
        let i_b = self.inv_i_b;
        let r_a = self.r_a;
        let r_b = self.r_b;

        let mut k = Mat33::default();
        k.ex.x = m_a + m_b + r_a.y * r_a.y * i_a + r_b.y * r_b.y * i_b;
        k.ey.x = -r_a.y * r_a.x * i_a - r_b.y * r_b.x * i_b;
        k.ez.x = -r_a.y * i_a - r_b.y * i_b;
        k.ex.y = k.ey.x;
        k.ey.y = m_a + m_b + r_a.x * r_a.x * i_a + r_b.x * r_b.x * i_b;
        k.ez.y = r_a.x * i_a + r_b.x * i_b;
        k.ex.z = k.ez.x;
        k.ey.z = k.ez.y;
        k.ez.z = i_a + i_b;
        k
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

        let i_a = self.inv_i_a;
        let i_b = self.inv_i_b;

        let k = self.stiffness_matrix();

        if self.frequency_hz > 0.0 {
            self.mass = k.get_inverse22();

            let mut inv_m = i_a + i_b;
            let m = if inv_m > 0.0 { 1.0 / inv_m } else { 0.0 };

            let c = a_b - a_a - self.reference_angle;

            let omega = 2.0 * core::f32::consts::PI * self.frequency_hz;
            let d = 2.0 * m * self.damping_ratio * omega;
            let spring_k = m * omega * omega;

            let h = data.step.dt;
            self.gamma = h * (d + h * spring_k);
            self.gamma = if self.gamma != 0.0 { 1.0 / self.gamma } else { 0.0 };
            self.bias = c * h * spring_k * self.gamma;

            inv_m += self.gamma;
            self.mass.ez.z = if inv_m != 0.0 { 1.0 / inv_m } else { 0.0 };
        } else if k.ez.z == 0.0 {
            self.mass = k.get_inverse22();
            self.gamma = 0.0;
            self.bias = 0.0;
        } else {
            self.mass = k.get_sym_inverse33();
            self.gamma = 0.0;
            self.bias = 0.0;
        }

        if data.step.warm_starting {
            self.impulse = Vec3::new(
                data.step.dt_ratio * self.impulse.x,
                data.step.dt_ratio * self.impulse.y,
                data.step.dt_ratio * self.impulse.z,
            );

            let p = Vec2::new(self.impulse.x, self.impulse.y);
            data.velocities[self.index_a].v -= self.inv_mass_a * p;
            data.velocities[self.index_a].w -= i_a * (cross_vv(self.r_a, p) + self.impulse.z);
            data.velocities[self.index_b].v += self.inv_mass_b * p;
            data.velocities[self.index_b].w += i_b * (cross_vv(self.r_b, p) + self.impulse.z);
        } else {
            self.impulse = Vec3::ZERO;
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

        if self.frequency_hz > 0.0 {
            // Soft angular row first, then the rigid point rows.
            let c_dot2 = w_b - w_a;
            let impulse2 = -self.mass.ez.z * (c_dot2 + self.bias + self.gamma * self.impulse.z);
            self.impulse.z += impulse2;

            w_a -= i_a * impulse2;
            w_b += i_b * impulse2;

            let c_dot1 = v_b + cross_sv(w_b, self.r_b) - v_a - cross_sv(w_a, self.r_a);
            let impulse1 = -self.mass.mul22(c_dot1);
            self.impulse.x += impulse1.x;
            self.impulse.y += impulse1.y;

            v_a -= m_a * impulse1;
            w_a -= i_a * cross_vv(self.r_a, impulse1);
            v_b += m_b * impulse1;
            w_b += i_b * cross_vv(self.r_b, impulse1);
        } else {
            let c_dot1 = v_b + cross_sv(w_b, self.r_b) - v_a - cross_sv(w_a, self.r_a);
            let c_dot2 = w_b - w_a;
            let c_dot = Vec3::new(c_dot1.x, c_dot1.y, c_dot2);

            let impulse = -self.mass.mul33(c_dot);
            self.impulse = self.impulse + impulse;

            let p = Vec2::new(impulse.x, impulse.y);
            v_a -= m_a * p;
            w_a -= i_a * (cross_vv(self.r_a, p) + impulse.z);
            v_b += m_b * p;
            w_b += i_b * (cross_vv(self.r_b, p) + impulse.z);
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

        self.r_a = q_a.apply(self.local_anchor_a - self.local_center_a);
        self.r_b = q_b.apply(self.local_anchor_b - self.local_center_b);
        let r_a = self.r_a;
        let r_b = self.r_b;

        let k = self.stiffness_matrix();

        let (position_error, angular_error);

        if self.frequency_hz > 0.0 {
            let c1 = c_b + r_b - c_a - r_a;
            position_error = c1.length();
            angular_error = 0.0;

            let p = -k.solve22(c1);

            c_a -= m_a * p;
            a_a -= i_a * cross_vv(r_a, p);
            c_b += m_b * p;
            a_b += i_b * cross_vv(r_b, p);
        } else {
            let c1 = c_b + r_b - c_a - r_a;
            let c2 = a_b - a_a - self.reference_angle;

            position_error = c1.length();
            angular_error = c2.abs();

            let c = Vec3::new(c1.x, c1.y, c2);

            let impulse = if k.ez.z > 0.0 {
                -k.solve33(c)
            } else {
                let impulse2 = -k.solve22(c1);
                Vec3::new(impulse2.x, impulse2.y, 0.0)
            };

            let p = Vec2::new(impulse.x, impulse.y);
            c_a -= m_a * p;
            a_a -= i_a * (cross_vv(r_a, p) + impulse.z);
            c_b += m_b * p;
            a_b += i_b * (cross_vv(r_b, p) + impulse.z);
        }

        data.positions[self.index_a].c = c_a;
        data.positions[self.index_a].a = a_a;
        data.positions[self.index_b].c = c_b;
        data.positions[self.index_b].a = a_b;

        position_error <= LINEAR_SLOP && angular_error <= ANGULAR_SLOP
    }
}
