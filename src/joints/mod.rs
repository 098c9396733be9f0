//! Joint Constraints
//!
//! All joints share one contract: `init_velocity_constraints` (compute
//! effective masses, apply warm-start impulses), `solve_velocity_constraints`
//! (one clamped-impulse iteration), and `solve_position_constraints`
//! (positional drift correction, returning whether the joint is within
//! slop). Dispatch is a `match` over the closed [`JointKind`] enum; adding
//! a joint kind means adding a variant and its three solve arms.
//!
//! Every kind caches its last solved impulse and reapplies it scaled by
//! `dt_ratio` on the next step (warm starting); that reuse is what makes
//! 4–8 velocity iterations enough at interactive frame rates.

use glam::Vec2;

use crate::arena::{Arena, Handle};
use crate::body::Body;
use crate::fixture::BodyHandle;
use crate::island::SolverData;

mod constant_volume;
mod distance;
mod friction;
mod gear;
mod motor;
mod mouse;
mod prismatic;
mod pulley;
mod revolute;
mod rope;
mod weld;
mod wheel;

pub use constant_volume::{ConstantVolumeJoint, ConstantVolumeJointDef};
pub use distance::{DistanceJoint, DistanceJointDef};
pub use friction::{FrictionJoint, FrictionJointDef};
pub use gear::{GearJoint, GearJointDef};
pub use motor::{MotorJoint, MotorJointDef};
pub use mouse::{MouseJoint, MouseJointDef};
pub use prismatic::{PrismaticJoint, PrismaticJointDef};
pub use pulley::{PulleyJoint, PulleyJointDef};
pub use revolute::{RevoluteJoint, RevoluteJointDef};
pub use rope::{RopeJoint, RopeJointDef};
pub use weld::{WeldJoint, WeldJointDef};
pub use wheel::{WheelJoint, WheelJointDef};

/// Handle to a joint in the world.
pub type JointHandle = Handle<Joint>;

/// Limit-constraint activation state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LimitState {
    Inactive,
    AtLower,
    AtUpper,
    Equal,
}

/// Per-body data a joint solver needs, captured at init time.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BodyContext {
    /// Island index into the solver arrays.
    pub index: usize,
    /// Local center of mass.
    pub local_center: Vec2,
    /// Inverse mass.
    pub inv_mass: f32,
    /// Inverse rotational inertia.
    pub inv_i: f32,
}

impl BodyContext {
    pub(crate) fn of(bodies: &Arena<Body>, handle: BodyHandle) -> Self {
        let body = bodies.get(handle).expect("joint body missing");
        Self {
            index: body.island_index,
            local_center: body.sweep.local_center,
            inv_mass: body.inv_mass,
            inv_i: body.inv_inertia,
        }
    }
}

/// Blueprint for creating any joint.
pub enum JointDef {
    /// Fixed or soft separation between two anchors.
    Distance(DistanceJointDef),
    /// Pin joint with optional limit and motor.
    Revolute(RevoluteJointDef),
    /// Point-on-axis with optional limit and motor.
    Prismatic(PrismaticJointDef),
    /// Point-on-line with a suspension spring and motor.
    Wheel(WheelJointDef),
    /// Rigid union of two bodies.
    Weld(WeldJointDef),
    /// Top-down friction damper.
    Friction(FrictionJointDef),
    /// Drive toward a target relative transform.
    Motor(MotorJointDef),
    /// Soft drag toward a moving world target.
    Mouse(MouseJointDef),
    /// Ratio-coupled two-segment rope over ground anchors.
    Pulley(PulleyJointDef),
    /// Ratio coupling of two revolute/prismatic joints.
    Gear(GearJointDef),
    /// One-sided maximum-length limit.
    Rope(RopeJointDef),
    /// N-body enclosed-area conservation.
    ConstantVolume(ConstantVolumeJointDef),
}

/// Concrete joint behavior.
pub enum JointKind {
    /// See [`DistanceJoint`].
    Distance(DistanceJoint),
    /// See [`RevoluteJoint`].
    Revolute(RevoluteJoint),
    /// See [`PrismaticJoint`].
    Prismatic(PrismaticJoint),
    /// See [`WheelJoint`].
    Wheel(WheelJoint),
    /// See [`WeldJoint`].
    Weld(WeldJoint),
    /// See [`FrictionJoint`].
    Friction(FrictionJoint),
    /// See [`MotorJoint`].
    Motor(MotorJoint),
    /// See [`MouseJoint`].
    Mouse(MouseJoint),
    /// See [`PulleyJoint`].
    Pulley(PulleyJoint),
    /// See [`GearJoint`].
    Gear(GearJoint),
    /// See [`RopeJoint`].
    Rope(RopeJoint),
    /// See [`ConstantVolumeJoint`].
    ConstantVolume(ConstantVolumeJoint),
}

/// A constraint between bodies.
pub struct Joint {
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,
    pub(crate) collide_connected: bool,
    /// Transient marker used by island construction.
    pub(crate) island_flag: bool,
    pub(crate) kind: JointKind,
}

impl Joint {
    pub(crate) fn new(
        body_a: BodyHandle,
        body_b: BodyHandle,
        collide_connected: bool,
        kind: JointKind,
    ) -> Self {
        Self {
            body_a,
            body_b,
            collide_connected,
            island_flag: false,
            kind,
        }
    }

    /// First attached body.
    #[inline]
    #[must_use]
    pub fn body_a(&self) -> BodyHandle {
        self.body_a
    }

    /// Second attached body.
    #[inline]
    #[must_use]
    pub fn body_b(&self) -> BodyHandle {
        self.body_b
    }

    /// Is collision between the attached bodies allowed?
    #[inline]
    #[must_use]
    pub fn collide_connected(&self) -> bool {
        self.collide_connected
    }

    /// The concrete joint behavior.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &JointKind {
        &self.kind
    }

    /// Mutable access to the concrete behavior (motor targets, limits).
    #[inline]
    pub fn kind_mut(&mut self) -> &mut JointKind {
        &mut self.kind
    }

    /// World anchor point on body A.
    #[must_use]
    pub fn anchor_a(&self, bodies: &Arena<Body>) -> Vec2 {
        let body = bodies.get(self.body_a).expect("joint body missing");
        match &self.kind {
            JointKind::Distance(j) => body.world_point(j.local_anchor_a),
            JointKind::Revolute(j) => body.world_point(j.local_anchor_a),
            JointKind::Prismatic(j) => body.world_point(j.local_anchor_a),
            JointKind::Wheel(j) => body.world_point(j.local_anchor_a),
            JointKind::Weld(j) => body.world_point(j.local_anchor_a),
            JointKind::Friction(j) => body.world_point(j.local_anchor_a),
            JointKind::Motor(_) => body.position(),
            JointKind::Mouse(j) => j.target(),
            JointKind::Pulley(j) => body.world_point(j.local_anchor_a),
            JointKind::Gear(j) => body.world_point(j.local_anchor_a),
            JointKind::Rope(j) => body.world_point(j.local_anchor_a),
            // The blob has no single representative anchor.
            JointKind::ConstantVolume(_) => body.world_center(),
        }
    }

    /// World anchor point on body B.
    #[must_use]
    pub fn anchor_b(&self, bodies: &Arena<Body>) -> Vec2 {
        let body = bodies.get(self.body_b).expect("joint body missing");
        match &self.kind {
            JointKind::Distance(j) => body.world_point(j.local_anchor_b),
            JointKind::Revolute(j) => body.world_point(j.local_anchor_b),
            JointKind::Prismatic(j) => body.world_point(j.local_anchor_b),
            JointKind::Wheel(j) => body.world_point(j.local_anchor_b),
            JointKind::Weld(j) => body.world_point(j.local_anchor_b),
            JointKind::Friction(j) => body.world_point(j.local_anchor_b),
            JointKind::Motor(_) => body.position(),
            JointKind::Mouse(j) => body.world_point(j.local_anchor_b),
            JointKind::Pulley(j) => body.world_point(j.local_anchor_b),
            JointKind::Gear(j) => body.world_point(j.local_anchor_b),
            JointKind::Rope(j) => body.world_point(j.local_anchor_b),
            JointKind::ConstantVolume(_) => body.world_center(),
        }
    }

    /// Constraint reaction force at anchor B, in newtons.
    #[must_use]
    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        match &self.kind {
            JointKind::Distance(j) => j.reaction_force(inv_dt),
            JointKind::Revolute(j) => j.reaction_force(inv_dt),
            JointKind::Prismatic(j) => j.reaction_force(inv_dt),
            JointKind::Wheel(j) => j.reaction_force(inv_dt),
            JointKind::Weld(j) => j.reaction_force(inv_dt),
            JointKind::Friction(j) => j.reaction_force(inv_dt),
            JointKind::Motor(j) => j.reaction_force(inv_dt),
            JointKind::Mouse(j) => j.reaction_force(inv_dt),
            JointKind::Pulley(j) => j.reaction_force(inv_dt),
            JointKind::Gear(j) => j.reaction_force(inv_dt),
            JointKind::Rope(j) => j.reaction_force(inv_dt),
            JointKind::ConstantVolume(_) => Vec2::ZERO,
        }
    }

    /// Constraint reaction torque on body B, in newton-meters.
    #[must_use]
    pub fn reaction_torque(&self, inv_dt: f32) -> f32 {
        match &self.kind {
            JointKind::Distance(_) => 0.0,
            JointKind::Revolute(j) => j.reaction_torque(inv_dt),
            JointKind::Prismatic(j) => j.reaction_torque(inv_dt),
            JointKind::Wheel(j) => j.reaction_torque(inv_dt),
            JointKind::Weld(j) => j.reaction_torque(inv_dt),
            JointKind::Friction(j) => j.reaction_torque(inv_dt),
            JointKind::Motor(j) => j.reaction_torque(inv_dt),
            JointKind::Mouse(_) => 0.0,
            JointKind::Pulley(_) => 0.0,
            JointKind::Gear(j) => j.reaction_torque(inv_dt),
            JointKind::Rope(_) => 0.0,
            JointKind::ConstantVolume(_) => 0.0,
        }
    }

    pub(crate) fn init_velocity_constraints(
        &mut self,
        data: &mut SolverData,
        bodies: &Arena<Body>,
    ) {
        let a = BodyContext::of(bodies, self.body_a);
        let b = BodyContext::of(bodies, self.body_b);
        match &mut self.kind {
            JointKind::Distance(j) => j.init_velocity_constraints(data, a, b),
            JointKind::Revolute(j) => j.init_velocity_constraints(data, a, b),
            JointKind::Prismatic(j) => j.init_velocity_constraints(data, a, b),
            JointKind::Wheel(j) => j.init_velocity_constraints(data, a, b),
            JointKind::Weld(j) => j.init_velocity_constraints(data, a, b),
            JointKind::Friction(j) => j.init_velocity_constraints(data, a, b),
            JointKind::Motor(j) => j.init_velocity_constraints(data, a, b),
            JointKind::Mouse(j) => j.init_velocity_constraints(data, b),
            JointKind::Pulley(j) => j.init_velocity_constraints(data, a, b),
            JointKind::Gear(j) => j.init_velocity_constraints(data, bodies),
            JointKind::Rope(j) => j.init_velocity_constraints(data, a, b),
            JointKind::ConstantVolume(j) => j.init_velocity_constraints(data, bodies),
        }
    }

    pub(crate) fn solve_velocity_constraints(&mut self, data: &mut SolverData) {
        match &mut self.kind {
            JointKind::Distance(j) => j.solve_velocity_constraints(data),
            JointKind::Revolute(j) => j.solve_velocity_constraints(data),
            JointKind::Prismatic(j) => j.solve_velocity_constraints(data),
            JointKind::Wheel(j) => j.solve_velocity_constraints(data),
            JointKind::Weld(j) => j.solve_velocity_constraints(data),
            JointKind::Friction(j) => j.solve_velocity_constraints(data),
            JointKind::Motor(j) => j.solve_velocity_constraints(data),
            JointKind::Mouse(j) => j.solve_velocity_constraints(data),
            JointKind::Pulley(j) => j.solve_velocity_constraints(data),
            JointKind::Gear(j) => j.solve_velocity_constraints(data),
            JointKind::Rope(j) => j.solve_velocity_constraints(data),
            JointKind::ConstantVolume(j) => j.solve_velocity_constraints(data),
        }
    }

    pub(crate) fn solve_position_constraints(&mut self, data: &mut SolverData) -> bool {
        match &mut self.kind {
            JointKind::Distance(j) => j.solve_position_constraints(data),
            JointKind::Revolute(j) => j.solve_position_constraints(data),
            JointKind::Prismatic(j) => j.solve_position_constraints(data),
            JointKind::Wheel(j) => j.solve_position_constraints(data),
            JointKind::Weld(j) => j.solve_position_constraints(data),
            // Friction and motor joints have no positional target.
            JointKind::Friction(_) => true,
            JointKind::Motor(_) => true,
            JointKind::Mouse(_) => true,
            JointKind::Pulley(j) => j.solve_position_constraints(data),
            JointKind::Gear(j) => j.solve_position_constraints(data),
            JointKind::Rope(j) => j.solve_position_constraints(data),
            JointKind::ConstantVolume(j) => j.solve_position_constraints(data),
        }
    }
}
