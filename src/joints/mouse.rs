//! Mouse Joint
//!
//! Drags one dynamic body toward an externally updated world target. It is
//! always soft: the spring/damper coefficients are derived from the body's
//! own mass so the pull feels the same for light and heavy bodies, and the
//! applied force is capped so a fast mouse cannot fling the body through
//! the world.

use glam::Vec2;

use crate::fixture::BodyHandle;
use crate::island::SolverData;
use crate::joints::BodyContext;
use crate::math::{cross_sv, cross_vv, Mat22, Rot};

/// Blueprint for a [`MouseJoint`].
#[derive(Clone, Copy, Debug)]
pub struct MouseJointDef {
    /// A ground body anchoring the joint in the island graph.
    pub body_a: BodyHandle,
    /// The dynamic body being dragged.
    pub body_b: BodyHandle,
    /// Allow the attached bodies to collide with each other?
    pub collide_connected: bool,
    /// Initial world target; the grabbed point at creation time.
    pub target: Vec2,
    /// Force cap in newtons; usually scaled by the body's weight.
    pub max_force: f32,
    /// Response frequency in Hz.
    pub frequency_hz: f32,
    /// Damping ratio.
    pub damping_ratio: f32,
}

impl MouseJointDef {
    /// Grab `body_b` at `target`, anchored through `ground`.
    #[must_use]
    pub fn new(ground: BodyHandle, body_b: BodyHandle, target: Vec2) -> Self {
        Self {
            body_a: ground,
            body_b,
            collide_connected: false,
            target,
            max_force: 0.0,
            frequency_hz: 5.0,
            damping_ratio: 0.7,
        }
    }

    /// Set the force cap.
    #[must_use]
    pub fn with_max_force(mut self, max_force: f32) -> Self {
        self.max_force = max_force;
        self
    }
}

/// Soft single-body drag constraint.
pub struct MouseJoint {
    target: Vec2,
    pub(crate) local_anchor_b: Vec2,
    max_force: f32,
    frequency_hz: f32,
    damping_ratio: f32,

    impulse: Vec2,
    beta: f32,
    gamma: f32,

    // Solver cache.
    index_b: usize,
    r_b: Vec2,
    local_center_b: Vec2,
    inv_mass_b: f32,
    inv_i_b: f32,
    mass: Mat22,
    c: Vec2,
}

impl MouseJoint {
    /// `local_anchor_b` is the grab point in B's frame, computed by the
    /// world from the def's target.
    pub(crate) fn new(def: &MouseJointDef, local_anchor_b: Vec2) -> Self {
        Self {
            target: def.target,
            local_anchor_b,
            max_force: def.max_force,
            frequency_hz: def.frequency_hz,
            damping_ratio: def.damping_ratio,
            impulse: Vec2::ZERO,
            beta: 0.0,
            gamma: 0.0,
            index_b: 0,
            r_b: Vec2::ZERO,
            local_center_b: Vec2::ZERO,
            inv_mass_b: 0.0,
            inv_i_b: 0.0,
            mass: Mat22::default(),
            c: Vec2::ZERO,
        }
    }

    /// The current world target.
    #[inline]
    #[must_use]
    pub fn target(&self) -> Vec2 {
        self.target
    }

    /// Move the target (the caller wakes the body).
    pub fn set_target(&mut self, target: Vec2) {
        self.target = target;
    }

    pub(crate) fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        inv_dt * self.impulse
    }

    pub(crate) fn init_velocity_constraints(&mut self, data: &mut SolverData, b: BodyContext) {
        self.index_b = b.index;
        self.local_center_b = b.local_center;
        self.inv_mass_b = b.inv_mass;
        self.inv_i_b = b.inv_i;

        let c_b = data.positions[self.index_b].c;
        let a_b = data.positions[self.index_b].a;
        let q_b = Rot::new(a_b);

        // Spring/damper tuned to the grabbed body's mass.
        let mass = if self.inv_mass_b > 0.0 {
            1.0 / self.inv_mass_b
        } else {
            0.0
        };

        let omega = 2.0 * core::f32::consts::PI * self.frequency_hz;
        let d = 2.0 * mass * self.damping_ratio * omega;
        let k = mass * omega * omega;

        let h = data.step.dt;
        self.gamma = h * (d + h * k);
        if self.gamma != 0.0 {
            self.gamma = 1.0 / self.gamma;
        }
        self.beta = h * k * self.gamma;

        self.r_b = q_b.apply(self.local_anchor_b - self.local_center_b);

        let i_b = self.inv_i_b;
        let m_b = self.inv_mass_b;
        let k_matrix = Mat22::new(
            Vec2::new(
                m_b + i_b * self.r_b.y * self.r_b.y + self.gamma,
                -i_b * self.r_b.x * self.r_b.y,
            ),
            Vec2::new(
                -i_b * self.r_b.x * self.r_b.y,
                m_b + i_b * self.r_b.x * self.r_b.x + self.gamma,
            ),
        );
        self.mass = k_matrix.inverse();

        self.c = (c_b + self.r_b - self.target) * self.beta;

        // Bleed a little angular velocity; an undamped grabbed body spins
        // forever around the anchor.
        data.velocities[self.index_b].w *= 0.98;

        if data.step.warm_starting {
            self.impulse *= data.step.dt_ratio;
            data.velocities[self.index_b].v += m_b * self.impulse;
            data.velocities[self.index_b].w += i_b * cross_vv(self.r_b, self.impulse);
        } else {
            self.impulse = Vec2::ZERO;
        }
    }

    pub(crate) fn solve_velocity_constraints(&mut self, data: &mut SolverData) {
        let mut v_b = data.velocities[self.index_b].v;
        let mut w_b = data.velocities[self.index_b].w;

        let c_dot = v_b + cross_sv(w_b, self.r_b);
        let mut impulse = self.mass.mul(-(c_dot + self.c + self.gamma * self.impulse));

        let old_impulse = self.impulse;
        self.impulse += impulse;
        let max_impulse = data.step.dt * self.max_force;
        if self.impulse.length_squared() > max_impulse * max_impulse {
            self.impulse *= max_impulse / self.impulse.length();
        }
        impulse = self.impulse - old_impulse;

        v_b += self.inv_mass_b * impulse;
        w_b += self.inv_i_b * cross_vv(self.r_b, impulse);

        data.velocities[self.index_b].v = v_b;
        data.velocities[self.index_b].w = w_b;
    }
}
