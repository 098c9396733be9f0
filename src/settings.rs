//! Global Tuning Constants
//!
//! Length units are meters, masses kilograms, time seconds. The tolerances
//! here are chosen to be numerically significant but visually insignificant;
//! changing them shifts the stability/accuracy tradeoff of every solver in
//! the crate.

use core::f32::consts::PI;

/// Machine epsilon for `f32`.
pub const EPSILON: f32 = f32::EPSILON;

/// The maximum number of contact points between two convex shapes.
pub const MAX_MANIFOLD_POINTS: usize = 2;

/// The maximum number of vertices on a convex polygon.
pub const MAX_POLYGON_VERTICES: usize = 8;

/// Fattening applied to AABBs in the dynamic tree, letting proxies move a
/// small amount without a tree update. Meters.
pub const AABB_EXTENSION: f32 = 0.1;

/// Dimensionless multiplier on a proxy's displacement used to predictively
/// extend its fat AABB.
pub const AABB_MULTIPLIER: f32 = 2.0;

/// Collision and constraint tolerance for linear quantities. Meters.
pub const LINEAR_SLOP: f32 = 0.005;

/// Collision and constraint tolerance for angular quantities. Radians.
pub const ANGULAR_SLOP: f32 = 2.0 / 180.0 * PI;

/// The skin radius of polygon and edge shapes. Shrinking this below two
/// slops starves continuous collision of its working margin.
pub const POLYGON_RADIUS: f32 = 2.0 * LINEAR_SLOP;

/// Maximum number of continuous-collision sub-steps any one contact may
/// consume per step.
pub const MAX_SUB_STEPS: u32 = 8;

/// Maximum number of contacts admitted into a time-of-impact island.
pub const MAX_TOI_CONTACTS: usize = 32;

/// Relative normal velocity below which a collision is treated as
/// perfectly inelastic (no restitution applied).
pub const VELOCITY_THRESHOLD: f32 = 1.0;

/// Maximum linear position correction per iteration; prevents overshoot.
pub const MAX_LINEAR_CORRECTION: f32 = 0.2;

/// Maximum angular position correction per iteration; prevents overshoot.
pub const MAX_ANGULAR_CORRECTION: f32 = 8.0 / 180.0 * PI;

/// Maximum translation of a body per step. Meters.
pub const MAX_TRANSLATION: f32 = 2.0;

/// Squared [`MAX_TRANSLATION`].
pub const MAX_TRANSLATION_SQUARED: f32 = MAX_TRANSLATION * MAX_TRANSLATION;

/// Maximum rotation of a body per step. Radians.
pub const MAX_ROTATION: f32 = 0.5 * PI;

/// Squared [`MAX_ROTATION`].
pub const MAX_ROTATION_SQUARED: f32 = MAX_ROTATION * MAX_ROTATION;

/// Fraction of position error corrected per iteration in the discrete
/// position solver.
pub const BAUMGARTE: f32 = 0.2;

/// Fraction of position error corrected per iteration in the
/// time-of-impact position solver.
pub const TOI_BAUMGARTE: f32 = 0.75;

/// Seconds a body must stay below the sleep tolerances before it sleeps.
pub const TIME_TO_SLEEP: f32 = 0.5;

/// A body cannot sleep while its linear speed exceeds this. Meters/second.
pub const LINEAR_SLEEP_TOLERANCE: f32 = 0.01;

/// A body cannot sleep while its angular speed exceeds this. Radians/second.
pub const ANGULAR_SLEEP_TOLERANCE: f32 = 2.0 / 180.0 * PI;

/// Friction mixing law: geometric mean, so a frictionless surface stays
/// frictionless against anything.
#[inline]
#[must_use]
pub fn mix_friction(friction_a: f32, friction_b: f32) -> f32 {
    (friction_a * friction_b).sqrt()
}

/// Restitution mixing law: the bouncier surface wins.
#[inline]
#[must_use]
pub fn mix_restitution(restitution_a: f32, restitution_b: f32) -> f32 {
    restitution_a.max(restitution_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixing_laws() {
        assert_eq!(mix_friction(0.0, 1.0), 0.0);
        assert_eq!(mix_friction(0.25, 0.25), 0.25);
        assert_eq!(mix_restitution(0.2, 0.8), 0.8);
    }

    #[test]
    fn test_polygon_radius_covers_slop() {
        assert!(POLYGON_RADIUS > LINEAR_SLOP);
    }
}
