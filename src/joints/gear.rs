//! Gear Joint
//!
//! Couples the coordinates of two existing joints — each revolute or
//! prismatic, each connecting a dynamic body to a static ground — so that
//! `coordinate_a + ratio * coordinate_b` stays constant. Mixing the two
//! kinds yields rack-and-pinion behavior. All four involved bodies enter
//! the Jacobian; the grounds contribute zero mass but keep the bookkeeping
//! uniform.

use glam::Vec2;

use crate::arena::Arena;
use crate::body::{Body, BodyType};
use crate::error::WorldError;
use crate::fixture::BodyHandle;
use crate::island::SolverData;
use crate::joints::{Joint, JointHandle, JointKind};
use crate::math::{cross_vv, Rot, Transform};
use crate::settings::LINEAR_SLOP;

/// Blueprint for a [`GearJoint`].
#[derive(Clone, Copy, Debug)]
pub struct GearJointDef {
    /// First linked joint (revolute or prismatic, ground-attached).
    pub joint_a: JointHandle,
    /// Second linked joint (revolute or prismatic, ground-attached).
    pub joint_b: JointHandle,
    /// Gear ratio applied to joint B's coordinate.
    pub ratio: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LinkedKind {
    Revolute,
    Prismatic,
}

/// Ratio coupling of two ground-attached joints.
pub struct GearJoint {
    joint_a: JointHandle,
    joint_b: JointHandle,
    kind_a: LinkedKind,
    kind_b: LinkedKind,

    /// Dynamic end of joint A.
    body_a: BodyHandle,
    /// Dynamic end of joint B.
    body_b: BodyHandle,
    /// Ground of joint A.
    body_c: BodyHandle,
    /// Ground of joint B.
    body_d: BodyHandle,

    pub(crate) local_anchor_a: Vec2,
    pub(crate) local_anchor_b: Vec2,
    local_anchor_c: Vec2,
    local_anchor_d: Vec2,
    local_axis_c: Vec2,
    local_axis_d: Vec2,
    reference_angle_a: f32,
    reference_angle_b: f32,
    constant: f32,
    ratio: f32,

    impulse: f32,

    // Solver cache for the four bodies.
    index_a: usize,
    index_b: usize,
    index_c: usize,
    index_d: usize,
    lc_a: Vec2,
    lc_b: Vec2,
    lc_c: Vec2,
    lc_d: Vec2,
    m_a: f32,
    m_b: f32,
    m_c: f32,
    m_d: f32,
    i_a: f32,
    i_b: f32,
    i_c: f32,
    i_d: f32,
    jv_ac: Vec2,
    jv_bd: Vec2,
    jw_a: f32,
    jw_b: f32,
    jw_c: f32,
    jw_d: f32,
    mass: f32,
}

impl GearJoint {
    /// Extract geometry from the linked joints and validate them.
    ///
    /// Returns the gear plus the two dynamic bodies it connects in the
    /// island graph.
    pub(crate) fn try_new(
        def: &GearJointDef,
        joints: &Arena<Joint>,
        bodies: &Arena<Body>,
    ) -> Result<(Self, BodyHandle, BodyHandle), WorldError> {
        let joint_1 = joints.get(def.joint_a).ok_or(WorldError::StaleHandle {
            kind: "joint",
        })?;
        let joint_2 = joints.get(def.joint_b).ok_or(WorldError::StaleHandle {
            kind: "joint",
        })?;

        let extract = |joint: &Joint| -> Result<(LinkedKind, Vec2, Vec2, Vec2, f32), WorldError> {
            match &joint.kind {
                JointKind::Revolute(j) => Ok((
                    LinkedKind::Revolute,
                    j.local_anchor_a,
                    j.local_anchor_b,
                    Vec2::ZERO,
                    j.reference_angle(),
                )),
                JointKind::Prismatic(j) => Ok((
                    LinkedKind::Prismatic,
                    j.local_anchor_a,
                    j.local_anchor_b,
                    j.local_axis(),
                    j.reference_angle(),
                )),
                _ => Err(WorldError::InvalidJoint {
                    reason: "gear joints require revolute or prismatic links",
                }),
            }
        };

        let (kind_a, local_anchor_c, local_anchor_a, local_axis_c, reference_angle_a) =
            extract(joint_1)?;
        let (kind_b, local_anchor_d, local_anchor_b, local_axis_d, reference_angle_b) =
            extract(joint_2)?;

        // Each link must tie a dynamic body to static ground; the ground is
        // the link's body A by convention.
        let body_c = joint_1.body_a;
        let body_a = joint_1.body_b;
        let body_d = joint_2.body_a;
        let body_b = joint_2.body_b;

        let ground_ok = |ground: BodyHandle, moving: BodyHandle| {
            bodies
                .get(ground)
                .is_some_and(|g| g.body_type() == BodyType::Static)
                && bodies
                    .get(moving)
                    .is_some_and(|m| m.body_type() == BodyType::Dynamic)
        };
        if !ground_ok(body_c, body_a) || !ground_ok(body_d, body_b) {
            return Err(WorldError::InvalidJoint {
                reason: "gear links must each connect a dynamic body to a static ground",
            });
        }

        let xf_a = bodies.get(body_a).unwrap().transform();
        let xf_b = bodies.get(body_b).unwrap().transform();
        let xf_c = bodies.get(body_c).unwrap().transform();
        let xf_d = bodies.get(body_d).unwrap().transform();

        let coordinate_a = linked_coordinate(
            kind_a,
            xf_a,
            xf_c,
            local_anchor_a,
            local_anchor_c,
            local_axis_c,
            reference_angle_a,
        );
        let coordinate_b = linked_coordinate(
            kind_b,
            xf_b,
            xf_d,
            local_anchor_b,
            local_anchor_d,
            local_axis_d,
            reference_angle_b,
        );

        let gear = Self {
            joint_a: def.joint_a,
            joint_b: def.joint_b,
            kind_a,
            kind_b,
            body_a,
            body_b,
            body_c,
            body_d,
            local_anchor_a,
            local_anchor_b,
            local_anchor_c,
            local_anchor_d,
            local_axis_c,
            local_axis_d,
            reference_angle_a,
            reference_angle_b,
            constant: coordinate_a + def.ratio * coordinate_b,
            ratio: def.ratio,
            impulse: 0.0,
            index_a: 0,
            index_b: 0,
            index_c: 0,
            index_d: 0,
            lc_a: Vec2::ZERO,
            lc_b: Vec2::ZERO,
            lc_c: Vec2::ZERO,
            lc_d: Vec2::ZERO,
            m_a: 0.0,
            m_b: 0.0,
            m_c: 0.0,
            m_d: 0.0,
            i_a: 0.0,
            i_b: 0.0,
            i_c: 0.0,
            i_d: 0.0,
            jv_ac: Vec2::ZERO,
            jv_bd: Vec2::ZERO,
            jw_a: 0.0,
            jw_b: 0.0,
            jw_c: 0.0,
            jw_d: 0.0,
            mass: 0.0,
        };
        Ok((gear, body_a, body_b))
    }

    /// The linked joints.
    #[must_use]
    pub fn linked_joints(&self) -> (JointHandle, JointHandle) {
        (self.joint_a, self.joint_b)
    }

    /// The gear ratio.
    #[inline]
    #[must_use]
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub(crate) fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        inv_dt * self.impulse * self.jv_ac
    }

    pub(crate) fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.impulse * self.jw_a
    }

    pub(crate) fn init_velocity_constraints(
        &mut self,
        data: &mut SolverData,
        bodies: &Arena<Body>,
    ) {
        // The linked joints keep all four bodies in this island.
        let body = |h: BodyHandle| bodies.get(h).expect("gear body missing");
        let (ba, bb, bc, bd) = (
            body(self.body_a),
            body(self.body_b),
            body(self.body_c),
            body(self.body_d),
        );

        self.index_a = ba.island_index;
        self.index_b = bb.island_index;
        self.index_c = bc.island_index;
        self.index_d = bd.island_index;
        self.lc_a = ba.sweep.local_center;
        self.lc_b = bb.sweep.local_center;
        self.lc_c = bc.sweep.local_center;
        self.lc_d = bd.sweep.local_center;
        self.m_a = ba.inv_mass;
        self.m_b = bb.inv_mass;
        self.m_c = bc.inv_mass;
        self.m_d = bd.inv_mass;
        self.i_a = ba.inv_inertia;
        self.i_b = bb.inv_inertia;
        self.i_c = bc.inv_inertia;
        self.i_d = bd.inv_inertia;

        let a_a = data.positions[self.index_a].a;
        let a_b = data.positions[self.index_b].a;
        let a_c = data.positions[self.index_c].a;
        let a_d = data.positions[self.index_d].a;

        let q_a = Rot::new(a_a);
        let q_b = Rot::new(a_b);
        let q_c = Rot::new(a_c);
        let q_d = Rot::new(a_d);

        self.mass = 0.0;

        if self.kind_a == LinkedKind::Revolute {
            self.jv_ac = Vec2::ZERO;
            self.jw_a = 1.0;
            self.jw_c = 1.0;
            self.mass += self.i_a + self.i_c;
        } else {
            let u = q_c.apply(self.local_axis_c);
            let r_c = q_c.apply(self.local_anchor_c - self.lc_c);
            let r_a = q_a.apply(self.local_anchor_a - self.lc_a);
            self.jv_ac = u;
            self.jw_c = cross_vv(r_c, u);
            self.jw_a = cross_vv(r_a, u);
            self.mass += self.m_c
                + self.m_a
                + self.i_c * self.jw_c * self.jw_c
                + self.i_a * self.jw_a * self.jw_a;
        }

        if self.kind_b == LinkedKind::Revolute {
            self.jv_bd = Vec2::ZERO;
            self.jw_b = self.ratio;
            self.jw_d = self.ratio;
            self.mass += self.ratio * self.ratio * (self.i_b + self.i_d);
        } else {
            let u = q_d.apply(self.local_axis_d);
            let r_d = q_d.apply(self.local_anchor_d - self.lc_d);
            let r_b = q_b.apply(self.local_anchor_b - self.lc_b);
            self.jv_bd = self.ratio * u;
            self.jw_d = self.ratio * cross_vv(r_d, u);
            self.jw_b = self.ratio * cross_vv(r_b, u);
            self.mass += self.ratio * self.ratio * (self.m_d + self.m_b)
                + self.i_d * self.jw_d * self.jw_d
                + self.i_b * self.jw_b * self.jw_b;
        }

        self.mass = if self.mass > 0.0 { 1.0 / self.mass } else { 0.0 };

        if data.step.warm_starting {
            data.velocities[self.index_a].v += self.m_a * (self.impulse * self.jv_ac);
            data.velocities[self.index_a].w += self.i_a * self.impulse * self.jw_a;
            data.velocities[self.index_b].v += self.m_b * (self.impulse * self.jv_bd);
            data.velocities[self.index_b].w += self.i_b * self.impulse * self.jw_b;
            data.velocities[self.index_c].v -= self.m_c * (self.impulse * self.jv_ac);
            data.velocities[self.index_c].w -= self.i_c * self.impulse * self.jw_c;
            data.velocities[self.index_d].v -= self.m_d * (self.impulse * self.jv_bd);
            data.velocities[self.index_d].w -= self.i_d * self.impulse * self.jw_d;
        } else {
            self.impulse = 0.0;
        }
    }

    pub(crate) fn solve_velocity_constraints(&mut self, data: &mut SolverData) {
        let v_a = data.velocities[self.index_a].v;
        let w_a = data.velocities[self.index_a].w;
        let v_b = data.velocities[self.index_b].v;
        let w_b = data.velocities[self.index_b].w;
        let v_c = data.velocities[self.index_c].v;
        let w_c = data.velocities[self.index_c].w;
        let v_d = data.velocities[self.index_d].v;
        let w_d = data.velocities[self.index_d].w;

        let c_dot = self.jv_ac.dot(v_a - v_c) + self.jv_bd.dot(v_b - v_d) + self.jw_a * w_a
            - self.jw_c * w_c
            + self.jw_b * w_b
            - self.jw_d * w_d;

        let impulse = -self.mass * c_dot;
        self.impulse += impulse;

        data.velocities[self.index_a].v = v_a + self.m_a * (impulse * self.jv_ac);
        data.velocities[self.index_a].w = w_a + self.i_a * impulse * self.jw_a;
        data.velocities[self.index_b].v = v_b + self.m_b * (impulse * self.jv_bd);
        data.velocities[self.index_b].w = w_b + self.i_b * impulse * self.jw_b;
        data.velocities[self.index_c].v = v_c - self.m_c * (impulse * self.jv_ac);
        data.velocities[self.index_c].w = w_c - self.i_c * impulse * self.jw_c;
        data.velocities[self.index_d].v = v_d - self.m_d * (impulse * self.jv_bd);
        data.velocities[self.index_d].w = w_d - self.i_d * impulse * self.jw_d;
    }

    pub(crate) fn solve_position_constraints(&mut self, data: &mut SolverData) -> bool {
        let mut c_a = data.positions[self.index_a].c;
        let mut a_a = data.positions[self.index_a].a;
        let mut c_b = data.positions[self.index_b].c;
        let mut a_b = data.positions[self.index_b].a;
        let mut c_c = data.positions[self.index_c].c;
        let mut a_c = data.positions[self.index_c].a;
        let mut c_d = data.positions[self.index_d].c;
        let mut a_d = data.positions[self.index_d].a;

        let q_a = Rot::new(a_a);
        let q_b = Rot::new(a_b);
        let q_c = Rot::new(a_c);
        let q_d = Rot::new(a_d);

        let mut mass = 0.0;

        let (jv_ac, jw_a, jw_c, coordinate_a);
        if self.kind_a == LinkedKind::Revolute {
            jv_ac = Vec2::ZERO;
            jw_a = 1.0;
            jw_c = 1.0;
            mass += self.i_a + self.i_c;
            coordinate_a = a_a - a_c - self.reference_angle_a;
        } else {
            let u = q_c.apply(self.local_axis_c);
            let r_c = q_c.apply(self.local_anchor_c - self.lc_c);
            let r_a = q_a.apply(self.local_anchor_a - self.lc_a);
            jv_ac = u;
            jw_c = cross_vv(r_c, u);
            jw_a = cross_vv(r_a, u);
            mass += self.m_c + self.m_a + self.i_c * jw_c * jw_c + self.i_a * jw_a * jw_a;

            let p_c = self.local_anchor_c - self.lc_c;
            let p_a = q_c.apply_inverse(r_a + (c_a - c_c));
            coordinate_a = (p_a - p_c).dot(self.local_axis_c);
        }

        let (jv_bd, jw_b, jw_d, coordinate_b);
        if self.kind_b == LinkedKind::Revolute {
            jv_bd = Vec2::ZERO;
            jw_b = self.ratio;
            jw_d = self.ratio;
            mass += self.ratio * self.ratio * (self.i_b + self.i_d);
            coordinate_b = a_b - a_d - self.reference_angle_b;
        } else {
            let u = q_d.apply(self.local_axis_d);
            let r_d = q_d.apply(self.local_anchor_d - self.lc_d);
            let r_b = q_b.apply(self.local_anchor_b - self.lc_b);
            jv_bd = self.ratio * u;
            jw_d = self.ratio * cross_vv(r_d, u);
            jw_b = self.ratio * cross_vv(r_b, u);
            mass += self.ratio * self.ratio * (self.m_d + self.m_b)
                + self.i_d * jw_d * jw_d
                + self.i_b * jw_b * jw_b;

            let p_d = self.local_anchor_d - self.lc_d;
            let p_b = q_d.apply_inverse(r_b + (c_b - c_d));
            coordinate_b = (p_b - p_d).dot(self.local_axis_d);
        }

        let c = (coordinate_a + self.ratio * coordinate_b) - self.constant;

        let impulse = if mass > 0.0 { -c / mass } else { 0.0 };

        c_a += self.m_a * (impulse * jv_ac);
        a_a += self.i_a * impulse * jw_a;
        c_b += self.m_b * (impulse * jv_bd);
        a_b += self.i_b * impulse * jw_b;
        c_c -= self.m_c * (impulse * jv_ac);
        a_c -= self.i_c * impulse * jw_c;
        c_d -= self.m_d * (impulse * jv_bd);
        a_d -= self.i_d * impulse * jw_d;

        data.positions[self.index_a].c = c_a;
        data.positions[self.index_a].a = a_a;
        data.positions[self.index_b].c = c_b;
        data.positions[self.index_b].a = a_b;
        data.positions[self.index_c].c = c_c;
        data.positions[self.index_c].a = a_c;
        data.positions[self.index_d].c = c_d;
        data.positions[self.index_d].a = a_d;

        c.abs() < LINEAR_SLOP
    }
}

/// Current coordinate of a linked joint from the body transforms.
fn linked_coordinate(
    kind: LinkedKind,
    xf_moving: Transform,
    xf_ground: Transform,
    local_anchor_moving: Vec2,
    local_anchor_ground: Vec2,
    local_axis_ground: Vec2,
    reference_angle: f32,
) -> f32 {
    match kind {
        LinkedKind::Revolute => xf_moving.q.angle() - xf_ground.q.angle() - reference_angle,
        LinkedKind::Prismatic => {
            let p_moving = xf_ground.apply_inverse(xf_moving.apply(local_anchor_moving));
            (p_moving - local_anchor_ground).dot(local_axis_ground)
        }
    }
}
