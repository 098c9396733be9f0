//! # impulse2d
//!
//! **2D rigid-body physics with an island-based sequential-impulse solver**
//!
//! A self-contained dynamics engine for game runtimes: bodies, shapes, and
//! constraints advanced in discrete steps, with warm-started iterative
//! contact/joint solving and continuous collision for fast bodies.
//!
//! ## Features
//!
//! | Subsystem | Description |
//! |-----------|-------------|
//! | **World** | One `step(dt, velocity_iterations, position_iterations)` entry point per frame |
//! | **Shapes** | Circle, convex polygon, edge, ghost-connected chain |
//! | **Broad-phase** | Incremental dynamic AABB tree with fat, predictive bounds |
//! | **Islands** | Connected components of the awake constraint graph, solved independently, slept as a unit |
//! | **Joints** | 12 constraint kinds dispatched through one closed enum |
//! | **Continuous collision** | Conservative-advancement TOI sub-stepping keeps bullets out of walls |
//!
//! ## Quick Start
//!
//! ```rust
//! use glam::Vec2;
//! use impulse2d::prelude::*;
//!
//! let mut world = World::new(Vec2::new(0.0, -10.0));
//!
//! // Static ground.
//! let ground = world.create_body(&BodyDef::static_at(Vec2::ZERO)).unwrap();
//! world
//!     .create_fixture(
//!         ground,
//!         &FixtureDef::new(Shape::Edge(Edge::new(
//!             Vec2::new(-40.0, 0.0),
//!             Vec2::new(40.0, 0.0),
//!         ))),
//!     )
//!     .unwrap();
//!
//! // A falling box.
//! let body = world
//!     .create_body(&BodyDef::dynamic_at(Vec2::new(0.0, 4.0)))
//!     .unwrap();
//! world
//!     .create_fixture(body, &FixtureDef::new(Shape::Polygon(Polygon::boxed(0.5, 0.5))))
//!     .unwrap();
//!
//! for _ in 0..60 {
//!     world.step(1.0 / 60.0, 8, 3);
//! }
//! assert!(world.body(body).unwrap().position().y < 4.0);
//! ```
//!
//! ## Units & conventions
//!
//! Meters, kilograms, seconds, radians; counter-clockwise angles. Tuning
//! constants live in [`settings`] and assume human-scale objects (roughly
//! 0.1–10 m).
//!
//! ## Threading
//!
//! Single-threaded by design: `step` takes `&mut World` and runs to
//! completion, so re-entrant mutation is unrepresentable. Given identical
//! inputs and iteration counts the solver is deterministic; islands are
//! traversed in stable arena order.

pub mod arena;
pub mod body;
pub mod broad_phase;
pub mod collision;
pub mod contact;
mod contact_manager;
mod contact_solver;
pub mod distance;
pub mod error;
pub mod event;
pub mod fixture;
mod island;
pub mod joints;
pub mod math;
pub mod narrow_phase;
pub mod profile;
pub mod settings;
pub mod shape;
pub mod toi;
pub mod world;

/// Convenient imports for typical use.
pub mod prelude {
    pub use crate::body::{Body, BodyDef, BodyHandle, BodyType};
    pub use crate::collision::Aabb;
    pub use crate::error::WorldError;
    pub use crate::event::{ContactEvent, ContactEventKind};
    pub use crate::fixture::{Filter, Fixture, FixtureDef, FixtureHandle};
    pub use crate::joints::{
        ConstantVolumeJointDef, DistanceJointDef, FrictionJointDef, GearJointDef, JointDef,
        JointHandle, JointKind, MotorJointDef, MouseJointDef, PrismaticJointDef, PulleyJointDef,
        RevoluteJointDef, RopeJointDef, WeldJointDef, WheelJointDef,
    };
    pub use crate::shape::{Chain, Circle, Edge, Polygon, Shape};
    pub use crate::world::World;
}

pub use prelude::*;
