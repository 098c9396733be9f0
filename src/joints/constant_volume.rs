//! Constant-Volume Joint
//!
//! An N-body constraint (the one joint that is not a pair) holding the
//! area of the polygon traced by its bodies' centers constant, which reads
//! on screen as an incompressible soft blob. Edge lengths are kept by
//! internal distance joints between consecutive bodies (created alongside
//! this joint by the world); the area itself is one scalar constraint whose
//! Jacobian is the polygon's edge-normal field.

use glam::Vec2;

use crate::arena::Arena;
use crate::body::Body;
use crate::fixture::BodyHandle;
use crate::island::{Position, SolverData};
use crate::joints::JointHandle;
use crate::math::cross_vv;
use crate::settings::{LINEAR_SLOP, MAX_LINEAR_CORRECTION};

/// Blueprint for a [`ConstantVolumeJoint`].
#[derive(Clone, Debug)]
pub struct ConstantVolumeJointDef {
    /// The blob's bodies, in ring order. At least three.
    pub bodies: Vec<BodyHandle>,
    /// Spring frequency handed to the internal distance joints.
    pub frequency_hz: f32,
    /// Damping ratio handed to the internal distance joints.
    pub damping_ratio: f32,
}

impl ConstantVolumeJointDef {
    /// A blob over `bodies` with rigid edges.
    #[must_use]
    pub fn new(bodies: Vec<BodyHandle>) -> Self {
        Self {
            bodies,
            frequency_hz: 0.0,
            damping_ratio: 0.0,
        }
    }

    /// Soften the edge joints.
    #[must_use]
    pub fn with_spring(mut self, frequency_hz: f32, damping_ratio: f32) -> Self {
        self.frequency_hz = frequency_hz;
        self.damping_ratio = damping_ratio;
        self
    }
}

/// Enclosed-area conservation over a ring of bodies.
pub struct ConstantVolumeJoint {
    bodies: Vec<BodyHandle>,
    target_volume: f32,
    normals: Vec<Vec2>,
    impulse: f32,
    /// The edge-length joints owned by this blob, destroyed with it.
    distance_joints: Vec<JointHandle>,

    // Solver cache.
    indices: Vec<usize>,
    inv_masses: Vec<f32>,
    masses: Vec<f32>,
    deltas: Vec<Vec2>,
}

impl ConstantVolumeJoint {
    /// `target_volume` is the enclosed area at creation time.
    pub(crate) fn new(bodies: Vec<BodyHandle>, target_volume: f32) -> Self {
        let n = bodies.len();
        Self {
            bodies,
            target_volume,
            normals: vec![Vec2::ZERO; n],
            impulse: 0.0,
            distance_joints: Vec::new(),
            indices: vec![0; n],
            inv_masses: vec![0.0; n],
            masses: vec![0.0; n],
            deltas: vec![Vec2::ZERO; n],
        }
    }

    /// The blob's bodies, in ring order.
    #[must_use]
    pub fn bodies(&self) -> &[BodyHandle] {
        &self.bodies
    }

    /// Scale the target area (a factor above 1 inflates the blob).
    pub fn inflate(&mut self, factor: f32) {
        self.target_volume *= factor;
    }

    /// The target enclosed area.
    #[inline]
    #[must_use]
    pub fn target_volume(&self) -> f32 {
        self.target_volume
    }

    pub(crate) fn set_distance_joints(&mut self, joints: Vec<JointHandle>) {
        self.distance_joints = joints;
    }

    pub(crate) fn distance_joints(&self) -> &[JointHandle] {
        &self.distance_joints
    }

    /// Signed area of the ring at the given solver positions.
    fn solver_area(&self, positions: &[Position]) -> f32 {
        let n = self.bodies.len();
        let mut area = 0.0;
        for i in 0..n {
            let next = (i + 1) % n;
            let p_i = positions[self.indices[i]].c;
            let p_next = positions[self.indices[next]].c;
            area += p_i.x * p_next.y - p_next.x * p_i.y;
        }
        0.5 * area
    }

    fn constrain_edges(&mut self, positions: &mut [Position]) -> bool {
        let n = self.bodies.len();

        let mut perimeter = 0.0;
        for i in 0..n {
            let next = (i + 1) % n;
            let d = positions[self.indices[next]].c - positions[self.indices[i]].c;
            let mut dist = d.length();
            if dist < f32::EPSILON {
                dist = 1.0;
            }
            self.normals[i] = Vec2::new(d.y / dist, -d.x / dist);
            perimeter += dist;
        }

        let delta_area = self.target_volume - self.solver_area(positions);
        let to_extrude = 0.5 * delta_area / perimeter;

        let mut done = true;
        for i in 0..n {
            let next = (i + 1) % n;
            let mut delta = to_extrude * (self.normals[i] + self.normals[next]);
            let norm_sqr = delta.length_squared();
            if norm_sqr > MAX_LINEAR_CORRECTION * MAX_LINEAR_CORRECTION {
                delta *= MAX_LINEAR_CORRECTION / norm_sqr.sqrt();
            }
            if norm_sqr > LINEAR_SLOP * LINEAR_SLOP {
                done = false;
            }
            positions[self.indices[next]].c += delta;
        }
        done
    }

    pub(crate) fn init_velocity_constraints(
        &mut self,
        data: &mut SolverData,
        bodies: &Arena<Body>,
    ) {
        let n = self.bodies.len();
        for (i, &bh) in self.bodies.iter().enumerate() {
            let body = bodies.get(bh).expect("blob body missing");
            self.indices[i] = body.island_index;
            self.inv_masses[i] = body.inv_mass;
            self.masses[i] = body.mass;
        }

        for i in 0..n {
            let prev = if i == 0 { n - 1 } else { i - 1 };
            let next = (i + 1) % n;
            self.deltas[i] =
                data.positions[self.indices[next]].c - data.positions[self.indices[prev]].c;
        }

        if data.step.warm_starting {
            self.impulse *= data.step.dt_ratio;
            for i in 0..n {
                let v = &mut data.velocities[self.indices[i]].v;
                v.x += self.inv_masses[i] * self.deltas[i].y * 0.5 * self.impulse;
                v.y += self.inv_masses[i] * -self.deltas[i].x * 0.5 * self.impulse;
            }
        } else {
            self.impulse = 0.0;
        }
    }

    pub(crate) fn solve_velocity_constraints(&mut self, data: &mut SolverData) {
        let n = self.bodies.len();

        let mut cross_mass_sum = 0.0;
        let mut dot_mass_sum = 0.0;
        for i in 0..n {
            let prev = if i == 0 { n - 1 } else { i - 1 };
            let next = (i + 1) % n;
            self.deltas[i] =
                data.positions[self.indices[next]].c - data.positions[self.indices[prev]].c;

            dot_mass_sum += self.deltas[i].length_squared() / self.masses[i].max(f32::EPSILON);
            cross_mass_sum += cross_vv(data.velocities[self.indices[i]].v, self.deltas[i]);
        }

        if dot_mass_sum <= f32::EPSILON {
            log::warn!("constant-volume joint collapsed; skipping velocity solve this frame");
            return;
        }

        let lambda = -2.0 * cross_mass_sum / dot_mass_sum;
        self.impulse += lambda;

        for i in 0..n {
            let v = &mut data.velocities[self.indices[i]].v;
            v.x += self.inv_masses[i] * self.deltas[i].y * 0.5 * lambda;
            v.y += self.inv_masses[i] * -self.deltas[i].x * 0.5 * lambda;
        }
    }

    pub(crate) fn solve_position_constraints(&mut self, data: &mut SolverData) -> bool {
        self.constrain_edges(data.positions)
    }
}
