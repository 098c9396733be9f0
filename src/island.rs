//! Island Solver
//!
//! An island is the transient unit of simulation: the connected component
//! of awake bodies reachable through touching contacts and joints, solved
//! independently of the rest of the world. The island owns the
//! island-indexed position/velocity scratch arrays the constraint solvers
//! work on, so the solvers never touch two bodies through the arena at
//! once.
//!
//! Solve order per island: integrate velocities (gravity, forces, damping)
//! → warm start → velocity iterations (joints, then contacts) → integrate
//! positions with translation/rotation clamps → position iterations →
//! write back → sleep bookkeeping.

use glam::Vec2;

use crate::arena::Arena;
use crate::body::{Body, BodyHandle, BodyType};
use crate::contact::{Contact, ContactHandle};
use crate::contact_solver::ContactSolver;
use crate::fixture::Fixture;
use crate::joints::{Joint, JointHandle};
use crate::settings::{
    ANGULAR_SLEEP_TOLERANCE, LINEAR_SLEEP_TOLERANCE, MAX_ROTATION, MAX_ROTATION_SQUARED,
    MAX_TRANSLATION, MAX_TRANSLATION_SQUARED, TIME_TO_SLEEP,
};

/// Island-indexed pose of one body during a solve.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Position {
    /// Center of mass.
    pub c: Vec2,
    /// Angle.
    pub a: f32,
}

/// Island-indexed velocity of one body during a solve.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Velocity {
    /// Linear velocity.
    pub v: Vec2,
    /// Angular velocity.
    pub w: f32,
}

/// Per-step solver parameters.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TimeStep {
    /// Step length in seconds.
    pub dt: f32,
    /// Inverse step length (0 when `dt` is 0).
    pub inv_dt: f32,
    /// Ratio of this step's `inv_dt` to the previous step's, used to
    /// rescale warm-start impulses when the frame rate changes.
    pub dt_ratio: f32,
    /// Velocity solver iterations.
    pub velocity_iterations: usize,
    /// Position solver iterations.
    pub position_iterations: usize,
    /// Apply cached impulses before iterating?
    pub warm_starting: bool,
}

/// View of the island scratch state handed to joint solvers.
pub(crate) struct SolverData<'a> {
    pub step: TimeStep,
    pub positions: &'a mut [Position],
    pub velocities: &'a mut [Velocity],
}

/// Reusable island scratch buffers.
#[derive(Default)]
pub(crate) struct Island {
    pub bodies: Vec<BodyHandle>,
    pub contacts: Vec<ContactHandle>,
    pub joints: Vec<JointHandle>,
    pub positions: Vec<Position>,
    pub velocities: Vec<Velocity>,
}

impl Island {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset for a new island without releasing capacity.
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.contacts.clear();
        self.joints.clear();
        self.positions.clear();
        self.velocities.clear();
    }

    /// Add a body, assigning its transient island index.
    pub fn add_body(&mut self, handle: BodyHandle, body: &mut Body) {
        body.island_index = self.bodies.len();
        self.bodies.push(handle);
        self.positions.push(Position::default());
        self.velocities.push(Velocity::default());
    }

    pub fn add_contact(&mut self, handle: ContactHandle) {
        self.contacts.push(handle);
    }

    pub fn add_joint(&mut self, handle: JointHandle) {
        self.joints.push(handle);
    }

    /// Run the full discrete solve for this island.
    #[allow(clippy::too_many_arguments)]
    pub fn solve(
        &mut self,
        step: TimeStep,
        gravity: Vec2,
        allow_sleep: bool,
        bodies: &mut Arena<Body>,
        contacts: &mut Arena<Contact>,
        joints: &mut Arena<Joint>,
        fixtures: &Arena<Fixture>,
    ) {
        let h = step.dt;

        // Integrate velocities and snapshot state into island arrays.
        for (i, &bh) in self.bodies.iter().enumerate() {
            let body = bodies.get_mut(bh).expect("island body missing");

            body.sweep.c0 = body.sweep.c;
            body.sweep.a0 = body.sweep.a;

            let c = body.sweep.c;
            let a = body.sweep.a;
            let mut v = body.linear_velocity;
            let mut w = body.angular_velocity;

            if body.body_type == BodyType::Dynamic {
                v += h * (body.gravity_scale * gravity + body.inv_mass * body.force);
                w += h * body.inv_inertia * body.torque;

                // Solution of dv/dt = -damping * v as a one-step implicit
                // update; stable for any damping value.
                v *= 1.0 / (1.0 + h * body.linear_damping);
                w *= 1.0 / (1.0 + h * body.angular_damping);
            }

            self.positions[i] = Position { c, a };
            self.velocities[i] = Velocity { v, w };
        }

        let mut contact_solver = ContactSolver::new(step, &self.contacts, contacts, fixtures, bodies);
        contact_solver.initialize_velocity_constraints(&self.positions, &self.velocities, contacts);

        if step.warm_starting {
            contact_solver.warm_start(&mut self.velocities);
        }

        for &jh in &self.joints {
            let joint = joints.get_mut(jh).expect("island joint missing");
            let mut data = SolverData {
                step,
                positions: &mut self.positions,
                velocities: &mut self.velocities,
            };
            joint.init_velocity_constraints(&mut data, bodies);
        }

        for _ in 0..step.velocity_iterations {
            for &jh in &self.joints {
                let joint = joints.get_mut(jh).expect("island joint missing");
                let mut data = SolverData {
                    step,
                    positions: &mut self.positions,
                    velocities: &mut self.velocities,
                };
                joint.solve_velocity_constraints(&mut data);
            }
            contact_solver.solve_velocity_constraints(&mut self.velocities);
        }

        contact_solver.store_impulses(contacts);

        // Integrate positions, clamping runaway motion.
        for i in 0..self.bodies.len() {
            let mut c = self.positions[i].c;
            let mut a = self.positions[i].a;
            let mut v = self.velocities[i].v;
            let mut w = self.velocities[i].w;

            let translation = h * v;
            if translation.length_squared() > MAX_TRANSLATION_SQUARED {
                v *= MAX_TRANSLATION / translation.length();
            }
            let rotation = h * w;
            if rotation * rotation > MAX_ROTATION_SQUARED {
                w *= MAX_ROTATION / rotation.abs();
            }

            c += h * v;
            a += h * w;

            self.positions[i] = Position { c, a };
            self.velocities[i] = Velocity { v, w };
        }

        // Position phase.
        let mut position_solved = false;
        for _ in 0..step.position_iterations {
            let contacts_okay = contact_solver.solve_position_constraints(&mut self.positions);

            let mut joints_okay = true;
            for &jh in &self.joints {
                let joint = joints.get_mut(jh).expect("island joint missing");
                let mut data = SolverData {
                    step,
                    positions: &mut self.positions,
                    velocities: &mut self.velocities,
                };
                let joint_okay = joint.solve_position_constraints(&mut data);
                joints_okay = joints_okay && joint_okay;
            }

            if contacts_okay && joints_okay {
                position_solved = true;
                break;
            }
        }

        // Copy state back to the bodies.
        for (i, &bh) in self.bodies.iter().enumerate() {
            let body = bodies.get_mut(bh).expect("island body missing");
            body.sweep.c = self.positions[i].c;
            body.sweep.a = self.positions[i].a;
            body.linear_velocity = self.velocities[i].v;
            body.angular_velocity = self.velocities[i].w;
            body.synchronize_transform();
        }

        // Sleep management: the island sleeps as a unit.
        if allow_sleep {
            let mut min_sleep_time = f32::MAX;
            let lin_tol_sqr = LINEAR_SLEEP_TOLERANCE * LINEAR_SLEEP_TOLERANCE;
            let ang_tol_sqr = ANGULAR_SLEEP_TOLERANCE * ANGULAR_SLEEP_TOLERANCE;

            for &bh in &self.bodies {
                let body = bodies.get_mut(bh).expect("island body missing");
                if body.body_type == BodyType::Static {
                    continue;
                }
                if !body.allow_sleep
                    || body.angular_velocity * body.angular_velocity > ang_tol_sqr
                    || body.linear_velocity.length_squared() > lin_tol_sqr
                {
                    body.sleep_time = 0.0;
                    min_sleep_time = 0.0;
                } else {
                    body.sleep_time += h;
                    min_sleep_time = min_sleep_time.min(body.sleep_time);
                }
            }

            if min_sleep_time >= TIME_TO_SLEEP && position_solved {
                for &bh in &self.bodies {
                    let body = bodies.get_mut(bh).expect("island body missing");
                    body.set_awake(false);
                }
            }
        }
    }

    /// Restricted sub-step solve used by the continuous-collision loop.
    ///
    /// Position-corrects the island with the TOI Baumgarte factor (only the
    /// two seed bodies carry mass), re-anchors their sweeps at the
    /// corrected poses, then runs a velocity-only solve with no warm
    /// starting and integrates over the remaining sub-step.
    #[allow(clippy::too_many_arguments)]
    pub fn solve_toi(
        &mut self,
        sub_step: TimeStep,
        toi_index_a: usize,
        toi_index_b: usize,
        bodies: &mut Arena<Body>,
        contacts: &mut Arena<Contact>,
        fixtures: &Arena<Fixture>,
    ) {
        debug_assert!(toi_index_a < self.bodies.len());
        debug_assert!(toi_index_b < self.bodies.len());

        for (i, &bh) in self.bodies.iter().enumerate() {
            let body = bodies.get(bh).expect("island body missing");
            self.positions[i] = Position {
                c: body.sweep.c,
                a: body.sweep.a,
            };
            self.velocities[i] = Velocity {
                v: body.linear_velocity,
                w: body.angular_velocity,
            };
        }

        let mut contact_solver =
            ContactSolver::new(sub_step, &self.contacts, contacts, fixtures, bodies);

        for _ in 0..sub_step.position_iterations {
            if contact_solver.solve_toi_position_constraints(
                &mut self.positions,
                toi_index_a,
                toi_index_b,
            ) {
                break;
            }
        }

        // The corrected poses become the new sweep origin of the two
        // sub-stepped bodies; the remainder of the step integrates from
        // here.
        {
            let bh_a = self.bodies[toi_index_a];
            let body_a = bodies.get_mut(bh_a).expect("island body missing");
            body_a.sweep.c0 = self.positions[toi_index_a].c;
            body_a.sweep.a0 = self.positions[toi_index_a].a;
        }
        {
            let bh_b = self.bodies[toi_index_b];
            let body_b = bodies.get_mut(bh_b).expect("island body missing");
            body_b.sweep.c0 = self.positions[toi_index_b].c;
            body_b.sweep.a0 = self.positions[toi_index_b].a;
        }

        contact_solver.initialize_velocity_constraints(&self.positions, &self.velocities, contacts);

        // No warm starting: TOI impulses are large and would poison the
        // next discrete step's cache.
        for _ in 0..sub_step.velocity_iterations {
            contact_solver.solve_velocity_constraints(&mut self.velocities);
        }
        // Impulses are deliberately not stored back.

        let h = sub_step.dt;
        for (i, &bh) in self.bodies.iter().enumerate() {
            let mut c = self.positions[i].c;
            let mut a = self.positions[i].a;
            let mut v = self.velocities[i].v;
            let mut w = self.velocities[i].w;

            let translation = h * v;
            if translation.length_squared() > MAX_TRANSLATION_SQUARED {
                v *= MAX_TRANSLATION / translation.length();
            }
            let rotation = h * w;
            if rotation * rotation > MAX_ROTATION_SQUARED {
                w *= MAX_ROTATION / rotation.abs();
            }

            c += h * v;
            a += h * w;

            self.positions[i] = Position { c, a };
            self.velocities[i] = Velocity { v, w };

            let body = bodies.get_mut(bh).expect("island body missing");
            body.sweep.c = c;
            body.sweep.a = a;
            body.linear_velocity = v;
            body.angular_velocity = w;
            body.synchronize_transform();
        }
    }
}
