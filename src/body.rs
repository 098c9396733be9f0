//! Rigid Bodies
//!
//! A body carries pose, velocity, mass, and the adjacency lists linking it
//! into the constraint graph (contacts and joints reference their endpoint
//! bodies; bodies list their incident edges for island traversal). Bodies
//! are created through the world, which owns the arena they live in;
//! operations that touch the broad-phase (moving, changing type,
//! adding/removing fixtures) are world methods.

use glam::Vec2;

use crate::arena::Arena;
use crate::fixture::{Fixture, FixtureHandle};
use crate::math::{cross_vv, Sweep, Transform};

pub use crate::fixture::BodyHandle;

/// Simulation role of a body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BodyType {
    /// Never moves; zero mass.
    #[default]
    Static,
    /// Moved by its velocity only; pushes dynamic bodies but is unaffected
    /// by forces or impacts.
    Kinematic,
    /// Fully simulated.
    Dynamic,
}

/// Blueprint for creating a body.
#[derive(Clone, Copy, Debug)]
pub struct BodyDef {
    /// Simulation role.
    pub body_type: BodyType,
    /// Initial world position of the body origin.
    pub position: Vec2,
    /// Initial angle in radians.
    pub angle: f32,
    /// Initial linear velocity.
    pub linear_velocity: Vec2,
    /// Initial angular velocity.
    pub angular_velocity: f32,
    /// Linear velocity damping (0 = none).
    pub linear_damping: f32,
    /// Angular velocity damping (0 = none).
    pub angular_damping: f32,
    /// May this body fall asleep?
    pub allow_sleep: bool,
    /// Start awake?
    pub awake: bool,
    /// Lock rotation (useful for characters).
    pub fixed_rotation: bool,
    /// Opt into continuous collision against other dynamic bodies.
    pub bullet: bool,
    /// Participate in simulation at all?
    pub enabled: bool,
    /// Scale on world gravity for this body.
    pub gravity_scale: f32,
}

impl Default for BodyDef {
    fn default() -> Self {
        Self {
            body_type: BodyType::Static,
            position: Vec2::ZERO,
            angle: 0.0,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            allow_sleep: true,
            awake: true,
            fixed_rotation: false,
            bullet: false,
            enabled: true,
            gravity_scale: 1.0,
        }
    }
}

impl BodyDef {
    /// A dynamic body at `position`.
    #[must_use]
    pub fn dynamic_at(position: Vec2) -> Self {
        Self {
            body_type: BodyType::Dynamic,
            position,
            ..Default::default()
        }
    }

    /// A static body at `position`.
    #[must_use]
    pub fn static_at(position: Vec2) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// A kinematic body at `position`.
    #[must_use]
    pub fn kinematic_at(position: Vec2) -> Self {
        Self {
            body_type: BodyType::Kinematic,
            position,
            ..Default::default()
        }
    }

    /// Flag as a bullet.
    #[must_use]
    pub fn bullet(mut self) -> Self {
        self.bullet = true;
        self
    }
}

/// One contact incident to a body, with the opposite endpoint cached for
/// graph traversal.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ContactEdge {
    /// The contact.
    pub contact: crate::contact::ContactHandle,
    /// The body on the other end.
    pub other: BodyHandle,
}

/// One joint incident to a body, with the opposite endpoint cached.
#[derive(Clone, Copy, Debug)]
pub(crate) struct JointEdge {
    /// The joint.
    pub joint: crate::joints::JointHandle,
    /// The body on the other end.
    pub other: BodyHandle,
    /// Cached copy of the joint's collide-connected flag, so the contact
    /// manager can veto pairs without touching the joint arena.
    pub collide_connected: bool,
}

/// A rigid body.
pub struct Body {
    pub(crate) body_type: BodyType,
    pub(crate) xf: Transform,
    pub(crate) sweep: Sweep,

    pub(crate) linear_velocity: Vec2,
    pub(crate) angular_velocity: f32,

    pub(crate) force: Vec2,
    pub(crate) torque: f32,

    pub(crate) mass: f32,
    pub(crate) inv_mass: f32,
    /// Rotational inertia about the center of mass.
    pub(crate) inertia: f32,
    pub(crate) inv_inertia: f32,

    pub(crate) linear_damping: f32,
    pub(crate) angular_damping: f32,
    pub(crate) gravity_scale: f32,

    pub(crate) sleep_time: f32,

    pub(crate) awake: bool,
    pub(crate) allow_sleep: bool,
    pub(crate) bullet: bool,
    pub(crate) fixed_rotation: bool,
    pub(crate) enabled: bool,
    /// Transient marker used by island construction.
    pub(crate) island_flag: bool,
    /// Transient solver slot, valid only while this body is in an island.
    pub(crate) island_index: usize,

    pub(crate) fixtures: Vec<FixtureHandle>,
    pub(crate) contact_edges: Vec<ContactEdge>,
    pub(crate) joint_edges: Vec<JointEdge>,
}

impl Body {
    pub(crate) fn new(def: &BodyDef) -> Self {
        let xf = Transform::new(def.position, def.angle);
        let sweep = Sweep {
            local_center: Vec2::ZERO,
            c0: def.position,
            c: def.position,
            a0: def.angle,
            a: def.angle,
            alpha0: 0.0,
        };
        let (mass, inv_mass) = if def.body_type == BodyType::Dynamic {
            (1.0, 1.0)
        } else {
            (0.0, 0.0)
        };
        Self {
            body_type: def.body_type,
            xf,
            sweep,
            linear_velocity: def.linear_velocity,
            angular_velocity: def.angular_velocity,
            force: Vec2::ZERO,
            torque: 0.0,
            mass,
            inv_mass,
            inertia: 0.0,
            inv_inertia: 0.0,
            linear_damping: def.linear_damping,
            angular_damping: def.angular_damping,
            gravity_scale: def.gravity_scale,
            sleep_time: 0.0,
            awake: def.awake,
            allow_sleep: def.allow_sleep,
            bullet: def.bullet,
            fixed_rotation: def.fixed_rotation,
            enabled: def.enabled,
            island_flag: false,
            island_index: 0,
            fixtures: Vec::new(),
            contact_edges: Vec::new(),
            joint_edges: Vec::new(),
        }
    }

    /// Simulation role.
    #[inline]
    #[must_use]
    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    /// World transform of the body origin.
    #[inline]
    #[must_use]
    pub fn transform(&self) -> Transform {
        self.xf
    }

    /// World position of the body origin.
    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.xf.p
    }

    /// Body angle in radians.
    #[inline]
    #[must_use]
    pub fn angle(&self) -> f32 {
        self.sweep.a
    }

    /// World position of the center of mass.
    #[inline]
    #[must_use]
    pub fn world_center(&self) -> Vec2 {
        self.sweep.c
    }

    /// Center of mass in body-local coordinates.
    #[inline]
    #[must_use]
    pub fn local_center(&self) -> Vec2 {
        self.sweep.local_center
    }

    /// Linear velocity of the center of mass.
    #[inline]
    #[must_use]
    pub fn linear_velocity(&self) -> Vec2 {
        self.linear_velocity
    }

    /// Set the linear velocity, waking the body when nonzero.
    pub fn set_linear_velocity(&mut self, v: Vec2) {
        if self.body_type == BodyType::Static {
            return;
        }
        if v.length_squared() > 0.0 {
            self.set_awake(true);
        }
        self.linear_velocity = v;
    }

    /// Angular velocity in radians/second.
    #[inline]
    #[must_use]
    pub fn angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    /// Set the angular velocity, waking the body when nonzero.
    pub fn set_angular_velocity(&mut self, w: f32) {
        if self.body_type == BodyType::Static {
            return;
        }
        if w * w > 0.0 {
            self.set_awake(true);
        }
        self.angular_velocity = w;
    }

    /// Mass in kilograms (0 for static/kinematic bodies).
    #[inline]
    #[must_use]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Rotational inertia about the body origin.
    #[must_use]
    pub fn inertia(&self) -> f32 {
        self.inertia + self.mass * self.sweep.local_center.length_squared()
    }

    /// Apply a force at a world point, waking the body.
    pub fn apply_force(&mut self, force: Vec2, point: Vec2) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        self.set_awake(true);
        self.force += force;
        self.torque += cross_vv(point - self.sweep.c, force);
    }

    /// Apply a force at the center of mass, waking the body.
    pub fn apply_force_to_center(&mut self, force: Vec2) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        self.set_awake(true);
        self.force += force;
    }

    /// Apply a torque, waking the body.
    pub fn apply_torque(&mut self, torque: f32) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        self.set_awake(true);
        self.torque += torque;
    }

    /// Apply a linear impulse at a world point, waking the body.
    pub fn apply_linear_impulse(&mut self, impulse: Vec2, point: Vec2) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        self.set_awake(true);
        self.linear_velocity += self.inv_mass * impulse;
        self.angular_velocity += self.inv_inertia * cross_vv(point - self.sweep.c, impulse);
    }

    /// Apply an angular impulse, waking the body.
    pub fn apply_angular_impulse(&mut self, impulse: f32) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        self.set_awake(true);
        self.angular_velocity += self.inv_inertia * impulse;
    }

    /// Wake or sleep the body. Sleeping zeroes velocities and accumulated
    /// forces.
    pub fn set_awake(&mut self, flag: bool) {
        if flag {
            if !self.awake {
                self.awake = true;
                self.sleep_time = 0.0;
            }
        } else {
            self.awake = false;
            self.sleep_time = 0.0;
            self.linear_velocity = Vec2::ZERO;
            self.angular_velocity = 0.0;
            self.force = Vec2::ZERO;
            self.torque = 0.0;
        }
    }

    /// Is the body awake?
    #[inline]
    #[must_use]
    pub fn is_awake(&self) -> bool {
        self.awake
    }

    /// Is the body enabled (participating in simulation)?
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Is continuous collision against dynamics enabled for this body?
    #[inline]
    #[must_use]
    pub fn is_bullet(&self) -> bool {
        self.bullet
    }

    /// Opt in or out of bullet behavior.
    pub fn set_bullet(&mut self, flag: bool) {
        self.bullet = flag;
    }

    /// May this body fall asleep?
    #[inline]
    #[must_use]
    pub fn is_sleep_allowed(&self) -> bool {
        self.allow_sleep
    }

    /// Allow or forbid sleeping; forbidding wakes the body.
    pub fn set_sleep_allowed(&mut self, flag: bool) {
        self.allow_sleep = flag;
        if !flag {
            self.set_awake(true);
        }
    }

    /// Fixtures attached to this body.
    #[inline]
    #[must_use]
    pub fn fixtures(&self) -> &[FixtureHandle] {
        &self.fixtures
    }

    /// Linear damping.
    #[inline]
    #[must_use]
    pub fn linear_damping(&self) -> f32 {
        self.linear_damping
    }

    /// Angular damping.
    #[inline]
    #[must_use]
    pub fn angular_damping(&self) -> f32 {
        self.angular_damping
    }

    /// Gravity scale.
    #[inline]
    #[must_use]
    pub fn gravity_scale(&self) -> f32 {
        self.gravity_scale
    }

    /// Set the gravity scale.
    pub fn set_gravity_scale(&mut self, scale: f32) {
        self.gravity_scale = scale;
    }

    /// Transform a body-local point to world coordinates.
    #[inline]
    #[must_use]
    pub fn world_point(&self, local: Vec2) -> Vec2 {
        self.xf.apply(local)
    }

    /// Rotate a body-local vector into world coordinates.
    #[inline]
    #[must_use]
    pub fn world_vector(&self, local: Vec2) -> Vec2 {
        self.xf.q.apply(local)
    }

    /// Transform a world point into body-local coordinates.
    #[inline]
    #[must_use]
    pub fn local_point(&self, world: Vec2) -> Vec2 {
        self.xf.apply_inverse(world)
    }

    /// Rotate a world vector into body-local coordinates.
    #[inline]
    #[must_use]
    pub fn local_vector(&self, world: Vec2) -> Vec2 {
        self.xf.q.apply_inverse(world)
    }

    /// Velocity of a world point rigidly attached to this body.
    #[must_use]
    pub fn velocity_at_world_point(&self, point: Vec2) -> Vec2 {
        self.linear_velocity + crate::math::cross_sv(self.angular_velocity, point - self.sweep.c)
    }

    /// Does a joint veto collision between this body and `other`?
    ///
    /// Also enforces that at least one endpoint must be dynamic for a
    /// contact to exist at all.
    #[must_use]
    pub(crate) fn should_collide(&self, other: &Body, other_handle: BodyHandle) -> bool {
        if self.body_type != BodyType::Dynamic && other.body_type != BodyType::Dynamic {
            return false;
        }
        for edge in &self.joint_edges {
            if edge.other == other_handle && !edge.collide_connected {
                return false;
            }
        }
        true
    }

    /// Recompute mass, center of mass, and inertia from the attached
    /// fixtures. A dynamic body with zero total fixture mass gets unit
    /// mass so it keeps responding to forces.
    pub(crate) fn reset_mass_data(&mut self, fixtures: &Arena<Fixture>) {
        self.mass = 0.0;
        self.inv_mass = 0.0;
        self.inertia = 0.0;
        self.inv_inertia = 0.0;
        self.sweep.local_center = Vec2::ZERO;

        if self.body_type != BodyType::Dynamic {
            self.sweep.c0 = self.xf.p;
            self.sweep.c = self.xf.p;
            self.sweep.a0 = self.sweep.a;
            return;
        }

        let mut local_center = Vec2::ZERO;
        for &fh in &self.fixtures {
            let fixture = fixtures.get(fh).expect("fixture arena out of sync");
            if fixture.density() == 0.0 {
                continue;
            }
            let md = fixture.mass_data();
            self.mass += md.mass;
            local_center += md.mass * md.center;
            self.inertia += md.inertia;
        }

        if self.mass > 0.0 {
            self.inv_mass = 1.0 / self.mass;
            local_center *= self.inv_mass;
        } else {
            self.mass = 1.0;
            self.inv_mass = 1.0;
        }

        if self.inertia > 0.0 && !self.fixed_rotation {
            // Shift inertia from the origin to the center of mass.
            self.inertia -= self.mass * local_center.length_squared();
            debug_assert!(self.inertia > 0.0);
            self.inv_inertia = 1.0 / self.inertia;
        } else {
            self.inertia = 0.0;
            self.inv_inertia = 0.0;
        }

        // Keep the world center of mass consistent with the new local one.
        let old_center = self.sweep.c;
        self.sweep.local_center = local_center;
        self.sweep.c = self.xf.apply(local_center);
        self.sweep.c0 = self.sweep.c;

        // Preserve the velocity field at the new center.
        self.linear_velocity +=
            crate::math::cross_sv(self.angular_velocity, self.sweep.c - old_center);
    }

    /// Rebuild the transform from the end-of-step sweep pose.
    pub(crate) fn synchronize_transform(&mut self) {
        let q = crate::math::Rot::new(self.sweep.a);
        self.xf.q = q;
        self.xf.p = self.sweep.c - q.apply(self.sweep.local_center);
    }

    /// Advance the sweep interval to `alpha` and adopt that pose.
    pub(crate) fn advance(&mut self, alpha: f32) {
        self.sweep.advance(alpha);
        self.sweep.c = self.sweep.c0;
        self.sweep.a = self.sweep.a0;
        self.synchronize_transform();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_ignores_forces() {
        let mut body = Body::new(&BodyDef::static_at(Vec2::ZERO));
        body.apply_force_to_center(Vec2::new(100.0, 0.0));
        body.apply_linear_impulse(Vec2::new(100.0, 0.0), Vec2::ZERO);
        assert_eq!(body.force, Vec2::ZERO);
        assert_eq!(body.linear_velocity, Vec2::ZERO);
    }

    #[test]
    fn test_sleep_zeroes_motion() {
        let mut body = Body::new(&BodyDef::dynamic_at(Vec2::ZERO));
        body.linear_velocity = Vec2::new(1.0, 2.0);
        body.angular_velocity = 3.0;
        body.set_awake(false);
        assert_eq!(body.linear_velocity, Vec2::ZERO);
        assert_eq!(body.angular_velocity, 0.0);
        assert!(!body.is_awake());
    }

    #[test]
    fn test_velocity_at_point() {
        let mut body = Body::new(&BodyDef::dynamic_at(Vec2::ZERO));
        body.angular_velocity = 1.0;
        let v = body.velocity_at_world_point(Vec2::new(1.0, 0.0));
        assert!((v - Vec2::new(0.0, 1.0)).length() < 1e-6);
    }
}
