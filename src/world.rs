//! The World
//!
//! Top-level orchestrator: owns the body/fixture/joint/contact arenas, the
//! broad-phase, the event buffer, and the step pipeline. One
//! [`World::step`] call runs, in order: deferred pair generation, the
//! narrow-phase contact refresh, the island solver over the discrete step,
//! and the continuous-collision (time-of-impact) loop.
//!
//! The world locks itself for the duration of a step; mutating entry
//! points fail fast with [`WorldError::Locked`] instead of corrupting
//! in-flight solver state. Events are buffered and drained by the caller
//! after the step, never delivered re-entrantly.

use glam::Vec2;

use crate::arena::Arena;
use crate::body::{Body, BodyDef, BodyType, JointEdge};
use crate::broad_phase::BroadPhase;
use crate::collision::{Aabb, RayCastInput};
use crate::contact::Contact;
use crate::distance::DistanceProxy;
use crate::error::WorldError;
use crate::event::{ContactEvent, EventCollector};
use crate::fixture::{BodyHandle, Fixture, FixtureDef, FixtureHandle};
use crate::island::{Island, TimeStep};
use crate::joints::{
    ConstantVolumeJoint, DistanceJointDef, GearJoint, Joint, JointDef, JointHandle, JointKind,
    MouseJoint,
};
use crate::math::{Rot, Transform};
use crate::profile::{Profile, Timer};
use crate::settings::{EPSILON, MAX_SUB_STEPS, MAX_TOI_CONTACTS};
use crate::toi::{time_of_impact, ToiInput, ToiState};

/// A 2D rigid-body world.
pub struct World {
    pub(crate) bodies: Arena<Body>,
    pub(crate) fixtures: Arena<Fixture>,
    pub(crate) joints: Arena<Joint>,
    pub(crate) contacts: Arena<Contact>,
    pub(crate) broad_phase: BroadPhase,
    pub(crate) events: EventCollector,

    island: Island,
    profile: Profile,

    gravity: Vec2,
    locked: bool,
    new_fixtures: bool,
    step_complete: bool,

    allow_sleeping: bool,
    warm_starting: bool,
    continuous_physics: bool,
    sub_stepping: bool,
    auto_clear_forces: bool,

    /// Previous step's inverse dt, for warm-start impulse rescaling.
    inv_dt0: f32,
}

impl World {
    /// Create an empty world with the given gravity.
    #[must_use]
    pub fn new(gravity: Vec2) -> Self {
        Self {
            bodies: Arena::new(),
            fixtures: Arena::new(),
            joints: Arena::new(),
            contacts: Arena::new(),
            broad_phase: BroadPhase::new(),
            events: EventCollector::new(),
            island: Island::new(),
            profile: Profile::default(),
            gravity,
            locked: false,
            new_fixtures: false,
            step_complete: true,
            allow_sleeping: true,
            warm_starting: true,
            continuous_physics: true,
            sub_stepping: false,
            auto_clear_forces: true,
            inv_dt0: 0.0,
        }
    }

    // ========================================================================
    // Body management
    // ========================================================================

    /// Create a body from a definition.
    pub fn create_body(&mut self, def: &BodyDef) -> Result<BodyHandle, WorldError> {
        if self.locked {
            return Err(WorldError::Locked);
        }
        Ok(self.bodies.insert(Body::new(def)))
    }

    /// Destroy a body, cascading through its joints, contacts, and
    /// fixtures. Touching contacts fire their end events.
    pub fn destroy_body(&mut self, handle: BodyHandle) -> Result<(), WorldError> {
        if self.locked {
            return Err(WorldError::Locked);
        }
        if !self.bodies.contains(handle) {
            return Err(WorldError::StaleHandle { kind: "body" });
        }

        // Joints first: their destruction may flag contacts we are about
        // to destroy anyway.
        while let Some(edge) = self
            .bodies
            .get(handle)
            .and_then(|b| b.joint_edges.first().copied())
        {
            self.destroy_joint(edge.joint)?;
        }

        while let Some(edge) = self
            .bodies
            .get(handle)
            .and_then(|b| b.contact_edges.first().copied())
        {
            self.destroy_contact(edge.contact);
        }

        let fixture_handles = self.bodies.get(handle).unwrap().fixtures.clone();
        for fh in fixture_handles {
            if let Some(fixture) = self.fixtures.get_mut(fh) {
                fixture.destroy_proxies(&mut self.broad_phase);
            }
            self.fixtures.remove(fh);
        }

        self.bodies.remove(handle);
        Ok(())
    }

    /// Borrow a body.
    #[must_use]
    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle)
    }

    /// Mutably borrow a body (velocities, forces, flags).
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(handle)
    }

    /// Iterate all bodies in world order.
    pub fn body_iter(&self) -> impl Iterator<Item = (BodyHandle, &Body)> {
        self.bodies.iter()
    }

    /// Teleport a body, resynchronizing its broad-phase proxies.
    pub fn set_transform(
        &mut self,
        handle: BodyHandle,
        position: Vec2,
        angle: f32,
    ) -> Result<(), WorldError> {
        if self.locked {
            return Err(WorldError::Locked);
        }
        let body = self
            .bodies
            .get_mut(handle)
            .ok_or(WorldError::StaleHandle { kind: "body" })?;

        body.xf = Transform::new(position, angle);
        body.sweep.c = body.xf.apply(body.sweep.local_center);
        body.sweep.a = angle;
        body.sweep.c0 = body.sweep.c;
        body.sweep.a0 = angle;

        let xf = body.xf;
        let fixtures = body.fixtures.clone();
        for fh in fixtures {
            if let Some(fixture) = self.fixtures.get_mut(fh) {
                fixture.synchronize(&mut self.broad_phase, xf, xf);
            }
        }
        Ok(())
    }

    /// Change a body's simulation role, rebuilding mass and contacts.
    pub fn set_body_type(
        &mut self,
        handle: BodyHandle,
        body_type: BodyType,
    ) -> Result<(), WorldError> {
        if self.locked {
            return Err(WorldError::Locked);
        }
        {
            let body = self
                .bodies
                .get_mut(handle)
                .ok_or(WorldError::StaleHandle { kind: "body" })?;
            if body.body_type == body_type {
                return Ok(());
            }
            body.body_type = body_type;
        }

        {
            let body = self.bodies.get_mut(handle).unwrap();
            body.reset_mass_data(&self.fixtures);
            if body_type == BodyType::Static {
                body.linear_velocity = Vec2::ZERO;
                body.angular_velocity = 0.0;
                body.sweep.a0 = body.sweep.a;
                body.sweep.c0 = body.sweep.c;
            }
            body.set_awake(true);
            body.force = Vec2::ZERO;
            body.torque = 0.0;
        }

        if self.bodies.get(handle).unwrap().body_type == BodyType::Static {
            self.synchronize_fixtures(handle);
        }

        // Existing contacts were built under the old type's rules.
        while let Some(edge) = self
            .bodies
            .get(handle)
            .and_then(|b| b.contact_edges.first().copied())
        {
            self.destroy_contact(edge.contact);
        }

        // Touch the proxies so the next step recreates valid pairs.
        let fixtures = self.bodies.get(handle).unwrap().fixtures.clone();
        for fh in fixtures {
            if let Some(fixture) = self.fixtures.get(fh) {
                fixture.touch_proxies(&mut self.broad_phase);
            }
        }
        self.new_fixtures = true;
        Ok(())
    }

    // ========================================================================
    // Fixture management
    // ========================================================================

    /// Attach a fixture to a body, registering its broad-phase proxies.
    pub fn create_fixture(
        &mut self,
        body: BodyHandle,
        def: &FixtureDef,
    ) -> Result<FixtureHandle, WorldError> {
        if self.locked {
            return Err(WorldError::Locked);
        }
        if !self.bodies.contains(body) {
            return Err(WorldError::StaleHandle { kind: "body" });
        }

        let handle = self.fixtures.insert(Fixture::new(def, body));

        let (xf, enabled) = {
            let b = self.bodies.get(body).unwrap();
            (b.transform(), b.is_enabled())
        };
        if enabled {
            let slot = handle.index() as u32;
            self.fixtures
                .get_mut(handle)
                .unwrap()
                .create_proxies(&mut self.broad_phase, xf, slot);
        }

        let body_ref = self.bodies.get_mut(body).unwrap();
        body_ref.fixtures.push(handle);
        if def.density > 0.0 {
            body_ref.reset_mass_data(&self.fixtures);
        }

        // New proxies may need new contacts before the next collide pass.
        self.new_fixtures = true;
        Ok(handle)
    }

    /// Detach and destroy a fixture, with its contacts.
    pub fn destroy_fixture(&mut self, handle: FixtureHandle) -> Result<(), WorldError> {
        if self.locked {
            return Err(WorldError::Locked);
        }
        let body = self
            .fixtures
            .get(handle)
            .ok_or(WorldError::StaleHandle { kind: "fixture" })?
            .body();

        // Destroy contacts that reference this fixture.
        let doomed: Vec<_> = self
            .bodies
            .get(body)
            .map(|b| {
                b.contact_edges
                    .iter()
                    .filter(|e| {
                        self.contacts
                            .get(e.contact)
                            .is_some_and(|c| c.fixture_a == handle || c.fixture_b == handle)
                    })
                    .map(|e| e.contact)
                    .collect()
            })
            .unwrap_or_default();
        for ch in doomed {
            self.destroy_contact(ch);
        }

        self.fixtures
            .get_mut(handle)
            .unwrap()
            .destroy_proxies(&mut self.broad_phase);
        self.fixtures.remove(handle);

        if let Some(b) = self.bodies.get_mut(body) {
            b.fixtures.retain(|&f| f != handle);
            b.reset_mass_data(&self.fixtures);
        }
        Ok(())
    }

    /// Borrow a fixture.
    #[must_use]
    pub fn fixture(&self, handle: FixtureHandle) -> Option<&Fixture> {
        self.fixtures.get(handle)
    }

    /// Replace a fixture's collision filter, re-evaluating its contacts.
    pub fn set_filter(
        &mut self,
        handle: FixtureHandle,
        filter: crate::fixture::Filter,
    ) -> Result<(), WorldError> {
        if self.locked {
            return Err(WorldError::Locked);
        }
        let body = {
            let fixture = self
                .fixtures
                .get_mut(handle)
                .ok_or(WorldError::StaleHandle { kind: "fixture" })?;
            fixture.filter = filter;
            fixture.body()
        };

        // Flag this fixture's contacts for re-filtering and re-run pair
        // generation over its proxies.
        let edges: Vec<_> = self
            .bodies
            .get(body)
            .map(|b| b.contact_edges.clone())
            .unwrap_or_default();
        for edge in edges {
            if let Some(contact) = self.contacts.get_mut(edge.contact) {
                if contact.fixture_a == handle || contact.fixture_b == handle {
                    contact.flag_for_filtering();
                }
            }
        }
        if let Some(fixture) = self.fixtures.get(handle) {
            fixture.touch_proxies(&mut self.broad_phase);
        }
        self.new_fixtures = true;
        Ok(())
    }

    // ========================================================================
    // Joint management
    // ========================================================================

    /// Create a joint from a definition.
    ///
    /// Fails while the world is stepping, for stale handles, for pairs
    /// with `body_a == body_b`, and for definitions whose structural
    /// requirements (gear links, blob size) are not met.
    pub fn create_joint(&mut self, def: JointDef) -> Result<JointHandle, WorldError> {
        if self.locked {
            return Err(WorldError::Locked);
        }

        let (body_a, body_b, collide_connected, kind) = match def {
            JointDef::Distance(d) => {
                self.validate_pair(d.body_a, d.body_b)?;
                (
                    d.body_a,
                    d.body_b,
                    d.collide_connected,
                    JointKind::Distance(crate::joints::DistanceJoint::new(&d)),
                )
            }
            JointDef::Revolute(d) => {
                self.validate_pair(d.body_a, d.body_b)?;
                (
                    d.body_a,
                    d.body_b,
                    d.collide_connected,
                    JointKind::Revolute(crate::joints::RevoluteJoint::new(&d)),
                )
            }
            JointDef::Prismatic(d) => {
                self.validate_pair(d.body_a, d.body_b)?;
                (
                    d.body_a,
                    d.body_b,
                    d.collide_connected,
                    JointKind::Prismatic(crate::joints::PrismaticJoint::new(&d)),
                )
            }
            JointDef::Wheel(d) => {
                self.validate_pair(d.body_a, d.body_b)?;
                (
                    d.body_a,
                    d.body_b,
                    d.collide_connected,
                    JointKind::Wheel(crate::joints::WheelJoint::new(&d)),
                )
            }
            JointDef::Weld(d) => {
                self.validate_pair(d.body_a, d.body_b)?;
                (
                    d.body_a,
                    d.body_b,
                    d.collide_connected,
                    JointKind::Weld(crate::joints::WeldJoint::new(&d)),
                )
            }
            JointDef::Friction(d) => {
                self.validate_pair(d.body_a, d.body_b)?;
                (
                    d.body_a,
                    d.body_b,
                    d.collide_connected,
                    JointKind::Friction(crate::joints::FrictionJoint::new(&d)),
                )
            }
            JointDef::Motor(d) => {
                self.validate_pair(d.body_a, d.body_b)?;
                (
                    d.body_a,
                    d.body_b,
                    d.collide_connected,
                    JointKind::Motor(crate::joints::MotorJoint::new(&d)),
                )
            }
            JointDef::Mouse(d) => {
                self.validate_pair(d.body_a, d.body_b)?;
                let local_anchor_b = self
                    .bodies
                    .get(d.body_b)
                    .unwrap()
                    .local_point(d.target);
                (
                    d.body_a,
                    d.body_b,
                    d.collide_connected,
                    JointKind::Mouse(MouseJoint::new(&d, local_anchor_b)),
                )
            }
            JointDef::Pulley(d) => {
                self.validate_pair(d.body_a, d.body_b)?;
                (
                    d.body_a,
                    d.body_b,
                    d.collide_connected,
                    JointKind::Pulley(crate::joints::PulleyJoint::new(&d)),
                )
            }
            JointDef::Rope(d) => {
                self.validate_pair(d.body_a, d.body_b)?;
                (
                    d.body_a,
                    d.body_b,
                    d.collide_connected,
                    JointKind::Rope(crate::joints::RopeJoint::new(&d)),
                )
            }
            JointDef::Gear(d) => {
                let (gear, body_a, body_b) = GearJoint::try_new(&d, &self.joints, &self.bodies)?;
                (body_a, body_b, false, JointKind::Gear(gear))
            }
            JointDef::ConstantVolume(d) => return self.create_constant_volume_joint(d),
        };

        Ok(self.link_joint(body_a, body_b, collide_connected, kind))
    }

    fn validate_pair(&self, body_a: BodyHandle, body_b: BodyHandle) -> Result<(), WorldError> {
        if !self.bodies.contains(body_a) || !self.bodies.contains(body_b) {
            return Err(WorldError::StaleHandle { kind: "body" });
        }
        if body_a == body_b {
            return Err(WorldError::InvalidJoint {
                reason: "joint endpoints must be distinct bodies",
            });
        }
        Ok(())
    }

    fn link_joint(
        &mut self,
        body_a: BodyHandle,
        body_b: BodyHandle,
        collide_connected: bool,
        kind: JointKind,
    ) -> JointHandle {
        let handle = self
            .joints
            .insert(Joint::new(body_a, body_b, collide_connected, kind));

        self.bodies.get_mut(body_a).unwrap().joint_edges.push(JointEdge {
            joint: handle,
            other: body_b,
            collide_connected,
        });
        self.bodies.get_mut(body_b).unwrap().joint_edges.push(JointEdge {
            joint: handle,
            other: body_a,
            collide_connected,
        });

        // Existing contacts between the pair must re-evaluate their right
        // to exist on the next step.
        if !collide_connected {
            self.flag_pair_contacts(body_a, body_b);
        }
        handle
    }

    fn flag_pair_contacts(&mut self, body_a: BodyHandle, body_b: BodyHandle) {
        let edges: Vec<_> = self
            .bodies
            .get(body_b)
            .map(|b| b.contact_edges.clone())
            .unwrap_or_default();
        for edge in edges {
            if edge.other == body_a {
                if let Some(contact) = self.contacts.get_mut(edge.contact) {
                    contact.flag_for_filtering();
                }
            }
        }
    }

    fn create_constant_volume_joint(
        &mut self,
        def: crate::joints::ConstantVolumeJointDef,
    ) -> Result<JointHandle, WorldError> {
        if def.bodies.len() < 3 {
            return Err(WorldError::InvalidJoint {
                reason: "constant-volume joints need at least three bodies",
            });
        }
        for &bh in &def.bodies {
            if !self.bodies.contains(bh) {
                return Err(WorldError::StaleHandle { kind: "body" });
            }
        }

        // Edge-length joints between consecutive ring bodies.
        let n = def.bodies.len();
        let mut distance_joints = Vec::with_capacity(n);
        for i in 0..n {
            let next = (i + 1) % n;
            let body_a = def.bodies[i];
            let body_b = def.bodies[next];
            let anchor_a = self.bodies.get(body_a).unwrap().world_center();
            let anchor_b = self.bodies.get(body_b).unwrap().world_center();
            let mut djd = DistanceJointDef::new(body_a, body_b);
            djd.local_anchor_a = self.bodies.get(body_a).unwrap().local_point(anchor_a);
            djd.local_anchor_b = self.bodies.get(body_b).unwrap().local_point(anchor_b);
            djd.length = anchor_a.distance(anchor_b);
            djd.frequency_hz = def.frequency_hz;
            djd.damping_ratio = def.damping_ratio;
            distance_joints.push(self.create_joint(JointDef::Distance(djd))?);
        }

        // Enclosed area at creation becomes the conserved target.
        let mut area = 0.0;
        for i in 0..n {
            let next = (i + 1) % n;
            let p_i = self.bodies.get(def.bodies[i]).unwrap().world_center();
            let p_next = self.bodies.get(def.bodies[next]).unwrap().world_center();
            area += p_i.x * p_next.y - p_next.x * p_i.y;
        }
        area *= 0.5;

        let mut blob = ConstantVolumeJoint::new(def.bodies.clone(), area);
        blob.set_distance_joints(distance_joints);

        let body_a = def.bodies[0];
        let body_b = def.bodies[1];
        Ok(self.link_joint(body_a, body_b, false, JointKind::ConstantVolume(blob)))
    }

    /// Destroy a joint, waking both bodies. Removing a collision-vetoing
    /// joint flags the pair's contacts for filter re-evaluation.
    pub fn destroy_joint(&mut self, handle: JointHandle) -> Result<(), WorldError> {
        if self.locked {
            return Err(WorldError::Locked);
        }
        if !self.joints.contains(handle) {
            return Err(WorldError::StaleHandle { kind: "joint" });
        }

        // A blob owns its internal edge joints.
        let internal: Vec<JointHandle> = match &self.joints.get(handle).unwrap().kind {
            JointKind::ConstantVolume(blob) => blob.distance_joints().to_vec(),
            _ => Vec::new(),
        };
        for dj in internal {
            if self.joints.contains(dj) {
                self.destroy_joint(dj)?;
            }
        }

        let joint = self.joints.get(handle).unwrap();
        let body_a = joint.body_a;
        let body_b = joint.body_b;
        let collide_connected = joint.collide_connected;

        if let Some(body) = self.bodies.get_mut(body_a) {
            body.joint_edges.retain(|e| e.joint != handle);
            body.set_awake(true);
        }
        if let Some(body) = self.bodies.get_mut(body_b) {
            body.joint_edges.retain(|e| e.joint != handle);
            body.set_awake(true);
        }

        self.joints.remove(handle);

        if !collide_connected {
            self.flag_pair_contacts(body_a, body_b);
        }
        Ok(())
    }

    /// Borrow a joint.
    #[must_use]
    pub fn joint(&self, handle: JointHandle) -> Option<&Joint> {
        self.joints.get(handle)
    }

    /// Mutably borrow a joint (motor targets, limits, mouse targets).
    pub fn joint_mut(&mut self, handle: JointHandle) -> Option<&mut Joint> {
        self.joints.get_mut(handle)
    }

    /// Iterate all joints in world order.
    pub fn joint_iter(&self) -> impl Iterator<Item = (JointHandle, &Joint)> {
        self.joints.iter()
    }

    /// Iterate all contacts in world order.
    pub fn contact_iter(&self) -> impl Iterator<Item = (crate::contact::ContactHandle, &Contact)> {
        self.contacts.iter()
    }

    // ========================================================================
    // Stepping
    // ========================================================================

    /// Advance the simulation by `dt` seconds.
    ///
    /// This is the only per-frame entry point: it performs collision
    /// detection, constraint solving, integration, and continuous
    /// collision, in that order.
    pub fn step(&mut self, dt: f32, velocity_iterations: usize, position_iterations: usize) {
        let step_timer = Timer::start();
        let mut phase_timer = Timer::start();

        // Fixtures created since the last step need contacts before the
        // narrow phase runs.
        if self.new_fixtures {
            self.find_new_contacts();
            self.new_fixtures = false;
        }

        self.locked = true;

        let step = TimeStep {
            dt,
            inv_dt: if dt > 0.0 { 1.0 / dt } else { 0.0 },
            dt_ratio: self.inv_dt0 * dt,
            velocity_iterations,
            position_iterations,
            warm_starting: self.warm_starting,
        };
        self.profile.step_init.record(phase_timer.elapsed_ms());

        // Narrow phase: refresh manifolds, destroy separated pairs.
        phase_timer.reset();
        self.collide();
        self.profile.collide.record(phase_timer.elapsed_ms());

        // Discrete solve.
        if self.step_complete && step.dt > 0.0 {
            phase_timer.reset();
            self.solve(step);
            self.profile.solve.record(phase_timer.elapsed_ms());
        }

        // Continuous collision.
        if self.continuous_physics && step.dt > 0.0 {
            phase_timer.reset();
            self.solve_toi(step);
            self.profile.solve_toi.record(phase_timer.elapsed_ms());
        }

        if step.dt > 0.0 {
            self.inv_dt0 = step.inv_dt;
        }

        if self.auto_clear_forces {
            self.clear_forces();
        }

        self.locked = false;
        self.profile.step.record(step_timer.elapsed_ms());
    }

    /// Zero all force/torque accumulators. Called automatically after each
    /// step unless auto-clearing is disabled for sub-stepped game loops.
    pub fn clear_forces(&mut self) {
        for (_, body) in self.bodies.iter_mut() {
            body.force = Vec2::ZERO;
            body.torque = 0.0;
        }
    }

    /// Build and solve islands over the awake constraint graph.
    fn solve(&mut self, step: TimeStep) {
        log::trace!(
            "solve: {} bodies, {} contacts, {} joints",
            self.bodies.len(),
            self.contacts.len(),
            self.joints.len()
        );

        // Clear traversal flags.
        for (_, body) in self.bodies.iter_mut() {
            body.island_flag = false;
        }
        for (_, contact) in self.contacts.iter_mut() {
            contact.island_flag = false;
        }
        for (_, joint) in self.joints.iter_mut() {
            joint.island_flag = false;
        }

        // Depth-first search over the constraint graph from every awake
        // non-static seed. Static bodies terminate traversal so islands
        // stay small.
        let seeds = self.bodies.handles();
        let mut stack: Vec<BodyHandle> = Vec::with_capacity(seeds.len());

        for seed in seeds {
            {
                let body = self.bodies.get(seed).unwrap();
                if body.island_flag
                    || !body.is_awake()
                    || !body.is_enabled()
                    || body.body_type() == BodyType::Static
                {
                    continue;
                }
            }

            self.island.clear();
            stack.clear();
            stack.push(seed);
            self.bodies.get_mut(seed).unwrap().island_flag = true;

            while let Some(bh) = stack.pop() {
                let body_type = {
                    let body = self.bodies.get_mut(bh).unwrap();
                    debug_assert!(body.is_enabled());
                    body.set_awake(true);
                    body.body_type()
                };
                self.island
                    .add_body(bh, self.bodies.get_mut(bh).unwrap());

                if body_type == BodyType::Static {
                    continue;
                }

                // Contact edges.
                for i in 0..self.bodies.get(bh).unwrap().contact_edges.len() {
                    let edge = self.bodies.get(bh).unwrap().contact_edges[i];
                    let contact = self.contacts.get_mut(edge.contact).unwrap();

                    if contact.island_flag || !contact.is_enabled() || !contact.is_touching() {
                        continue;
                    }

                    // Sensor overlaps report events but impose nothing.
                    let sensor_a = self
                        .fixtures
                        .get(contact.fixture_a)
                        .unwrap()
                        .is_sensor();
                    let sensor_b = self
                        .fixtures
                        .get(contact.fixture_b)
                        .unwrap()
                        .is_sensor();
                    if sensor_a || sensor_b {
                        continue;
                    }

                    contact.island_flag = true;
                    self.island.add_contact(edge.contact);

                    let other = edge.other;
                    if self.bodies.get(other).unwrap().island_flag {
                        continue;
                    }
                    stack.push(other);
                    self.bodies.get_mut(other).unwrap().island_flag = true;
                }

                // Joint edges.
                for i in 0..self.bodies.get(bh).unwrap().joint_edges.len() {
                    let edge = self.bodies.get(bh).unwrap().joint_edges[i];
                    let joint = self.joints.get_mut(edge.joint).unwrap();
                    if joint.island_flag {
                        continue;
                    }
                    let other = edge.other;
                    if !self.bodies.get(other).unwrap().is_enabled() {
                        continue;
                    }

                    joint.island_flag = true;
                    self.island.add_joint(edge.joint);

                    if self.bodies.get(other).unwrap().island_flag {
                        continue;
                    }
                    stack.push(other);
                    self.bodies.get_mut(other).unwrap().island_flag = true;
                }
            }

            self.island.solve(
                step,
                self.gravity,
                self.allow_sleeping,
                &mut self.bodies,
                &mut self.contacts,
                &mut self.joints,
                &self.fixtures,
            );

            // Static bodies may belong to several islands per step.
            for i in 0..self.island.bodies.len() {
                let bh = self.island.bodies[i];
                let body = self.bodies.get_mut(bh).unwrap();
                if body.body_type() == BodyType::Static {
                    body.island_flag = false;
                }
            }
        }

        // Push moved bodies to the broad-phase and find the contacts the
        // motion created.
        let broad_phase_timer = Timer::start();
        for bh in self.bodies.handles() {
            let body = self.bodies.get(bh).unwrap();
            if !body.island_flag || body.body_type() == BodyType::Static {
                continue;
            }
            self.synchronize_fixtures(bh);
        }
        self.find_new_contacts();
        self.profile.broad_phase.record(broad_phase_timer.elapsed_ms());
    }

    /// Push a body's swept AABBs into the broad-phase.
    fn synchronize_fixtures(&mut self, handle: BodyHandle) {
        let (xf1, xf2, fixtures) = {
            let body = self.bodies.get(handle).unwrap();
            let q = Rot::new(body.sweep.a0);
            let xf1 = Transform {
                p: body.sweep.c0 - q.apply(body.sweep.local_center),
                q,
            };
            (xf1, body.xf, body.fixtures.clone())
        };
        for fh in fixtures {
            if let Some(fixture) = self.fixtures.get_mut(fh) {
                fixture.synchronize(&mut self.broad_phase, xf1, xf2);
            }
        }
    }

    /// Continuous-collision loop: find the earliest missed impact, advance
    /// its pair, solve a restricted sub-step, repeat until the interval is
    /// exhausted (or one event, in sub-stepping mode).
    fn solve_toi(&mut self, step: TimeStep) {
        // A completed previous step starts the interval fresh.
        if self.step_complete {
            for (_, body) in self.bodies.iter_mut() {
                body.island_flag = false;
                body.sweep.alpha0 = 0.0;
            }
            for (_, contact) in self.contacts.iter_mut() {
                contact.toi_valid = false;
                contact.island_flag = false;
                contact.toi_count = 0;
                contact.toi = 1.0;
            }
        }

        loop {
            // Scan for the globally earliest impact.
            let mut min_contact = None;
            let mut min_alpha = 1.0_f32;

            for ch in self.contacts.handles() {
                let contact = self.contacts.get(ch).unwrap();
                if !contact.is_enabled() {
                    continue;
                }
                // A contact that already burned its sub-step budget waits
                // for the next full step.
                if contact.toi_count > MAX_SUB_STEPS {
                    continue;
                }

                let alpha = if contact.toi_valid {
                    contact.toi
                } else {
                    let fixture_a = contact.fixture_a;
                    let fixture_b = contact.fixture_b;
                    let child_a = contact.child_a;
                    let child_b = contact.child_b;
                    let body_a = contact.body_a;
                    let body_b = contact.body_b;

                    let fa = self.fixtures.get(fixture_a).unwrap();
                    let fb = self.fixtures.get(fixture_b).unwrap();
                    if fa.is_sensor() || fb.is_sensor() {
                        continue;
                    }

                    let (type_a, awake_a, bullet_a) = {
                        let b = self.bodies.get(body_a).unwrap();
                        (b.body_type(), b.is_awake(), b.is_bullet())
                    };
                    let (type_b, awake_b, bullet_b) = {
                        let b = self.bodies.get(body_b).unwrap();
                        (b.body_type(), b.is_awake(), b.is_bullet())
                    };
                    debug_assert!(
                        type_a == BodyType::Dynamic || type_b == BodyType::Dynamic
                    );

                    let active_a = awake_a && type_a != BodyType::Static;
                    let active_b = awake_b && type_b != BodyType::Static;
                    if !active_a && !active_b {
                        continue;
                    }

                    // Only bullets get continuous treatment against other
                    // dynamic bodies.
                    let collide_a = bullet_a || type_a != BodyType::Dynamic;
                    let collide_b = bullet_b || type_b != BodyType::Dynamic;
                    if !collide_a && !collide_b {
                        continue;
                    }

                    // Put both sweeps on the same interval start.
                    let alpha0_a = self.bodies.get(body_a).unwrap().sweep.alpha0;
                    let alpha0_b = self.bodies.get(body_b).unwrap().sweep.alpha0;
                    let alpha0 = alpha0_a.max(alpha0_b);
                    if alpha0_a < alpha0 {
                        self.bodies.get_mut(body_a).unwrap().sweep.advance(alpha0);
                    } else if alpha0_b < alpha0 {
                        self.bodies.get_mut(body_b).unwrap().sweep.advance(alpha0);
                    }
                    debug_assert!(alpha0 < 1.0);

                    let input = ToiInput {
                        proxy_a: DistanceProxy::new(fa.shape(), child_a),
                        proxy_b: DistanceProxy::new(fb.shape(), child_b),
                        sweep_a: self.bodies.get(body_a).unwrap().sweep,
                        sweep_b: self.bodies.get(body_b).unwrap().sweep,
                        t_max: 1.0,
                    };
                    let output = time_of_impact(&input);

                    // Map the fraction of the remaining interval back onto
                    // the whole step.
                    let alpha = if output.state == ToiState::Touching {
                        (alpha0 + (1.0 - alpha0) * output.t).min(1.0)
                    } else {
                        1.0
                    };
                    let contact = self.contacts.get_mut(ch).unwrap();
                    contact.toi = alpha;
                    contact.toi_valid = true;
                    alpha
                };

                if alpha < min_alpha {
                    min_contact = Some(ch);
                    min_alpha = alpha;
                }
            }

            let Some(ch) = min_contact else {
                self.step_complete = true;
                break;
            };
            if 1.0 - 10.0 * EPSILON < min_alpha {
                // No impact inside the interval: done.
                self.step_complete = true;
                break;
            }

            // Advance the two bodies of the earliest impact to it.
            let (body_a, body_b) = {
                let contact = self.contacts.get(ch).unwrap();
                (contact.body_a, contact.body_b)
            };
            let backup_a = self.bodies.get(body_a).unwrap().sweep;
            let backup_b = self.bodies.get(body_b).unwrap().sweep;

            self.bodies.get_mut(body_a).unwrap().advance(min_alpha);
            self.bodies.get_mut(body_b).unwrap().advance(min_alpha);

            // The advanced poses may have different contact points.
            {
                let contact = self.contacts.get_mut(ch).unwrap();
                contact.update(&self.fixtures, &mut self.bodies, &mut self.events);
                contact.toi_valid = false;
                contact.toi_count += 1;
            }

            // The conservative estimate can cry wolf; roll the advance back
            // and keep scanning.
            let (enabled, touching) = {
                let contact = self.contacts.get(ch).unwrap();
                (contact.is_enabled(), contact.is_touching())
            };
            if !enabled || !touching {
                self.contacts.get_mut(ch).unwrap().set_enabled(false);
                let ba = self.bodies.get_mut(body_a).unwrap();
                ba.sweep = backup_a;
                ba.synchronize_transform();
                let bb = self.bodies.get_mut(body_b).unwrap();
                bb.sweep = backup_b;
                bb.synchronize_transform();
                continue;
            }

            self.bodies.get_mut(body_a).unwrap().set_awake(true);
            self.bodies.get_mut(body_b).unwrap().set_awake(true);

            // Build the mini-island: the impact pair plus whatever is
            // already resting on either body.
            self.island.clear();
            self.island
                .add_body(body_a, self.bodies.get_mut(body_a).unwrap());
            self.island
                .add_body(body_b, self.bodies.get_mut(body_b).unwrap());
            self.island.add_contact(ch);

            self.bodies.get_mut(body_a).unwrap().island_flag = true;
            self.bodies.get_mut(body_b).unwrap().island_flag = true;
            self.contacts.get_mut(ch).unwrap().island_flag = true;

            for seed in [body_a, body_b] {
                if self.bodies.get(seed).unwrap().body_type() != BodyType::Dynamic {
                    continue;
                }
                for i in 0..self.bodies.get(seed).unwrap().contact_edges.len() {
                    if self.island.bodies.len() == 2 * MAX_TOI_CONTACTS {
                        break;
                    }
                    if self.island.contacts.len() == MAX_TOI_CONTACTS {
                        break;
                    }

                    let edge = self.bodies.get(seed).unwrap().contact_edges[i];
                    if self.contacts.get(edge.contact).unwrap().island_flag {
                        continue;
                    }

                    // Secondary contacts only against static, kinematic,
                    // or bullet bodies; dynamic-dynamic pairs wait for the
                    // discrete solver.
                    let other = edge.other;
                    {
                        let other_body = self.bodies.get(other).unwrap();
                        let seed_bullet = self.bodies.get(seed).unwrap().is_bullet();
                        if other_body.body_type() == BodyType::Dynamic
                            && !seed_bullet
                            && !other_body.is_bullet()
                        {
                            continue;
                        }
                    }

                    {
                        let contact = self.contacts.get(edge.contact).unwrap();
                        let sensor_a = self.fixtures.get(contact.fixture_a).unwrap().is_sensor();
                        let sensor_b = self.fixtures.get(contact.fixture_b).unwrap().is_sensor();
                        if sensor_a || sensor_b {
                            continue;
                        }
                    }

                    // Tentatively advance the other body; undone if the
                    // contact turns out not to matter.
                    let backup = self.bodies.get(other).unwrap().sweep;
                    if !self.bodies.get(other).unwrap().island_flag {
                        self.bodies.get_mut(other).unwrap().advance(min_alpha);
                    }

                    self.contacts.get_mut(edge.contact).unwrap().update(
                        &self.fixtures,
                        &mut self.bodies,
                        &mut self.events,
                    );

                    let (enabled, touching) = {
                        let contact = self.contacts.get(edge.contact).unwrap();
                        (contact.is_enabled(), contact.is_touching())
                    };
                    if !enabled || !touching {
                        let other_body = self.bodies.get_mut(other).unwrap();
                        if !other_body.island_flag {
                            other_body.sweep = backup;
                            other_body.synchronize_transform();
                        }
                        continue;
                    }

                    self.contacts.get_mut(edge.contact).unwrap().island_flag = true;
                    self.island.add_contact(edge.contact);

                    if self.bodies.get(other).unwrap().island_flag {
                        continue;
                    }
                    {
                        let other_body = self.bodies.get_mut(other).unwrap();
                        other_body.island_flag = true;
                        if other_body.body_type() != BodyType::Static {
                            other_body.set_awake(true);
                        }
                    }
                    self.island
                        .add_body(other, self.bodies.get_mut(other).unwrap());
                }
            }

            // One restricted sub-step over the remainder of the interval.
            let sub_dt = (1.0 - min_alpha) * step.dt;
            let sub_step = TimeStep {
                dt: sub_dt,
                inv_dt: if sub_dt > 0.0 { 1.0 / sub_dt } else { 0.0 },
                dt_ratio: 1.0,
                velocity_iterations: step.velocity_iterations,
                position_iterations: 20,
                warm_starting: false,
            };
            let toi_index_a = self.bodies.get(body_a).unwrap().island_index;
            let toi_index_b = self.bodies.get(body_b).unwrap().island_index;
            self.island.solve_toi(
                sub_step,
                toi_index_a,
                toi_index_b,
                &mut self.bodies,
                &mut self.contacts,
                &self.fixtures,
            );

            // Moved bodies invalidate every TOI they participate in, and
            // the broad-phase needs their new proxies before the next scan.
            for i in 0..self.island.bodies.len() {
                let bh = self.island.bodies[i];
                self.bodies.get_mut(bh).unwrap().island_flag = false;

                if self.bodies.get(bh).unwrap().body_type() != BodyType::Dynamic {
                    continue;
                }
                self.synchronize_fixtures(bh);

                for j in 0..self.bodies.get(bh).unwrap().contact_edges.len() {
                    let edge = self.bodies.get(bh).unwrap().contact_edges[j];
                    let contact = self.contacts.get_mut(edge.contact).unwrap();
                    contact.toi_valid = false;
                    contact.island_flag = false;
                }
            }

            // The advance may create or destroy contacts.
            self.find_new_contacts();

            if self.sub_stepping {
                self.step_complete = false;
                break;
            }
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Visit every fixture whose fat AABB overlaps `aabb`. Return false
    /// from the callback to stop.
    pub fn query_aabb(&self, aabb: &Aabb, mut callback: impl FnMut(FixtureHandle) -> bool) {
        self.broad_phase.query(aabb, |proxy| {
            let data = self.broad_phase.proxy_data(proxy);
            match self.fixtures.handle_at(data.fixture as usize) {
                Some(fh) => callback(fh),
                None => true,
            }
        });
    }

    /// Cast a segment through the world.
    ///
    /// For each fixture hit, the callback receives the fixture, the hit
    /// point, the surface normal, and the hit fraction, and returns a new
    /// maximum fraction: 0 terminates the cast, 1 continues unclipped, and
    /// the fraction itself finds the closest hit.
    pub fn ray_cast(
        &self,
        p1: Vec2,
        p2: Vec2,
        mut callback: impl FnMut(FixtureHandle, Vec2, Vec2, f32) -> f32,
    ) {
        let input = RayCastInput {
            p1,
            p2,
            max_fraction: 1.0,
        };
        self.broad_phase.ray_cast(&input, |sub_input, proxy| {
            let data = self.broad_phase.proxy_data(proxy);
            let Some(fh) = self.fixtures.handle_at(data.fixture as usize) else {
                return sub_input.max_fraction;
            };
            let fixture = self.fixtures.get(fh).unwrap();
            let body = self.bodies.get(fixture.body()).unwrap();

            match fixture
                .shape()
                .ray_cast(sub_input, body.transform(), data.child as usize)
            {
                Some(output) => {
                    let point = sub_input.p1 + output.fraction * (sub_input.p2 - sub_input.p1);
                    callback(fh, point, output.normal, output.fraction)
                }
                None => sub_input.max_fraction,
            }
        });
    }

    // ========================================================================
    // Toggles & diagnostics
    // ========================================================================

    /// The global gravity vector.
    #[inline]
    #[must_use]
    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    /// Change the global gravity vector.
    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = gravity;
    }

    /// Is automatic sleeping enabled?
    #[inline]
    #[must_use]
    pub fn is_sleeping_allowed(&self) -> bool {
        self.allow_sleeping
    }

    /// Enable/disable sleeping; disabling wakes every body.
    pub fn set_sleeping_allowed(&mut self, flag: bool) {
        if flag == self.allow_sleeping {
            return;
        }
        self.allow_sleeping = flag;
        if !flag {
            for (_, body) in self.bodies.iter_mut() {
                body.set_awake(true);
            }
        }
    }

    /// Is warm starting enabled?
    #[inline]
    #[must_use]
    pub fn is_warm_starting(&self) -> bool {
        self.warm_starting
    }

    /// Enable/disable warm starting (testing aid).
    pub fn set_warm_starting(&mut self, flag: bool) {
        self.warm_starting = flag;
    }

    /// Is continuous physics enabled?
    #[inline]
    #[must_use]
    pub fn is_continuous_physics(&self) -> bool {
        self.continuous_physics
    }

    /// Enable/disable the continuous-collision loop.
    pub fn set_continuous_physics(&mut self, flag: bool) {
        self.continuous_physics = flag;
    }

    /// Is single-event sub-stepping enabled?
    #[inline]
    #[must_use]
    pub fn is_sub_stepping(&self) -> bool {
        self.sub_stepping
    }

    /// Resolve at most one TOI event per step, deferring the rest.
    pub fn set_sub_stepping(&mut self, flag: bool) {
        self.sub_stepping = flag;
    }

    /// Are forces cleared automatically after each step?
    #[inline]
    #[must_use]
    pub fn is_auto_clearing_forces(&self) -> bool {
        self.auto_clear_forces
    }

    /// Control automatic force clearing.
    pub fn set_auto_clear_forces(&mut self, flag: bool) {
        self.auto_clear_forces = flag;
    }

    /// Take the contact events buffered since the last drain.
    pub fn drain_events(&mut self) -> Vec<ContactEvent> {
        self.events.drain()
    }

    /// Per-phase step timings.
    #[must_use]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Number of bodies.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of joints.
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Number of contacts (touching or not).
    #[must_use]
    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    /// Number of broad-phase proxies.
    #[must_use]
    pub fn proxy_count(&self) -> usize {
        self.broad_phase.proxy_count()
    }

    /// Broad-phase tree height.
    #[must_use]
    pub fn tree_height(&self) -> i32 {
        self.broad_phase.tree_height()
    }

    /// Broad-phase tree balance.
    #[must_use]
    pub fn tree_balance(&self) -> i32 {
        self.broad_phase.tree_balance()
    }

    /// Broad-phase tree quality (1.0 = tight).
    #[must_use]
    pub fn tree_quality(&self) -> f32 {
        self.broad_phase.tree_quality()
    }

    /// Is the world mid-step?
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}
