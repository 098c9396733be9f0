//! Physics Math Layer
//!
//! Rotation, transform, and sweep types layered on [`glam::Vec2`], plus the
//! small effective-mass matrices used by the constraint solvers.
//!
//! # Conventions
//!
//! - Angles are radians, counter-clockwise positive.
//! - `cross(scalar, vector)` and `cross(vector, scalar)` are the 2D
//!   embeddings of the 3D cross product with the scalar on the z axis.

use glam::Vec2;

/// 2D cross product of two vectors (z component of the 3D cross).
#[inline]
#[must_use]
pub fn cross_vv(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Cross product of a scalar (z axis) with a vector: `s × v = (-s·v.y, s·v.x)`.
#[inline]
#[must_use]
pub fn cross_sv(s: f32, v: Vec2) -> Vec2 {
    Vec2::new(-s * v.y, s * v.x)
}

/// Cross product of a vector with a scalar (z axis): `v × s = (s·v.y, -s·v.x)`.
#[inline]
#[must_use]
pub fn cross_vs(v: Vec2, s: f32) -> Vec2 {
    Vec2::new(s * v.y, -s * v.x)
}

// ============================================================================
// Rot — unit rotation
// ============================================================================

/// A rotation stored as (sin, cos) of its angle.
///
/// Cheaper to apply repeatedly than recomputing trigonometry from an angle,
/// and composes without drift inside a single step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rot {
    /// Sine of the angle.
    pub s: f32,
    /// Cosine of the angle.
    pub c: f32,
}

impl Rot {
    /// The identity rotation (angle 0).
    pub const IDENTITY: Self = Self { s: 0.0, c: 1.0 };

    /// Create from an angle in radians.
    #[inline]
    #[must_use]
    pub fn new(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self { s, c }
    }

    /// Recover the angle in radians.
    #[inline]
    #[must_use]
    pub fn angle(self) -> f32 {
        self.s.atan2(self.c)
    }

    /// The local x axis in world space.
    #[inline]
    #[must_use]
    pub fn x_axis(self) -> Vec2 {
        Vec2::new(self.c, self.s)
    }

    /// The local y axis in world space.
    #[inline]
    #[must_use]
    pub fn y_axis(self) -> Vec2 {
        Vec2::new(-self.s, self.c)
    }

    /// Rotate a vector.
    #[inline]
    #[must_use]
    pub fn apply(self, v: Vec2) -> Vec2 {
        Vec2::new(self.c * v.x - self.s * v.y, self.s * v.x + self.c * v.y)
    }

    /// Inverse-rotate a vector.
    #[inline]
    #[must_use]
    pub fn apply_inverse(self, v: Vec2) -> Vec2 {
        Vec2::new(self.c * v.x + self.s * v.y, -self.s * v.x + self.c * v.y)
    }

    /// Compose two rotations (`self * rhs` applies `rhs` first).
    #[inline]
    #[must_use]
    pub fn mul(self, rhs: Rot) -> Rot {
        Rot {
            s: self.s * rhs.c + self.c * rhs.s,
            c: self.c * rhs.c - self.s * rhs.s,
        }
    }

    /// Compose with the inverse of `self`: `self⁻¹ * rhs`.
    #[inline]
    #[must_use]
    pub fn mul_t(self, rhs: Rot) -> Rot {
        Rot {
            s: self.c * rhs.s - self.s * rhs.c,
            c: self.c * rhs.c + self.s * rhs.s,
        }
    }
}

// ============================================================================
// Transform — position + rotation
// ============================================================================

/// A rigid transform: rotation followed by translation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Translation.
    pub p: Vec2,
    /// Rotation.
    pub q: Rot,
}

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        p: Vec2::ZERO,
        q: Rot::IDENTITY,
    };

    /// Create from a position and an angle.
    #[inline]
    #[must_use]
    pub fn new(position: Vec2, angle: f32) -> Self {
        Self {
            p: position,
            q: Rot::new(angle),
        }
    }

    /// Transform a local point to world space.
    #[inline]
    #[must_use]
    pub fn apply(self, v: Vec2) -> Vec2 {
        self.q.apply(v) + self.p
    }

    /// Transform a world point to local space.
    #[inline]
    #[must_use]
    pub fn apply_inverse(self, v: Vec2) -> Vec2 {
        self.q.apply_inverse(v - self.p)
    }

    /// Relative transform `self⁻¹ * rhs`, mapping `rhs`'s local space into
    /// `self`'s local space.
    #[must_use]
    pub fn mul_t(self, rhs: Transform) -> Transform {
        Transform {
            p: self.q.apply_inverse(rhs.p - self.p),
            q: self.q.mul_t(rhs.q),
        }
    }
}

// ============================================================================
// Sweep — interpolated body motion
// ============================================================================

/// Describes the motion of a body's center of mass over a step interval.
///
/// Continuous collision interpolates between the pose at `alpha0` (stored in
/// `c0`/`a0`) and the end-of-step pose (`c`/`a`). The shape origin is offset
/// from the center of mass by `local_center`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Sweep {
    /// Center of mass in body-local coordinates.
    pub local_center: Vec2,
    /// World center at the start of the current interval.
    pub c0: Vec2,
    /// World center at the end of the step.
    pub c: Vec2,
    /// Angle at the start of the current interval.
    pub a0: f32,
    /// Angle at the end of the step.
    pub a: f32,
    /// Fraction of the step already consumed, in `[0, 1)`.
    pub alpha0: f32,
}

impl Sweep {
    /// Interpolated transform at `beta` within the remaining interval
    /// (`beta = 0` gives the `alpha0` pose, `beta = 1` the end pose).
    #[must_use]
    pub fn transform(&self, beta: f32) -> Transform {
        let c = self.c0.lerp(self.c, beta);
        let angle = (1.0 - beta) * self.a0 + beta * self.a;
        let q = Rot::new(angle);
        Transform {
            p: c - q.apply(self.local_center),
            q,
        }
    }

    /// Advance the interval start to `alpha`, re-anchoring `c0`/`a0`.
    ///
    /// `alpha` must lie in `[alpha0, 1)`.
    pub fn advance(&mut self, alpha: f32) {
        debug_assert!(self.alpha0 < 1.0);
        let beta = (alpha - self.alpha0) / (1.0 - self.alpha0);
        self.c0 += beta * (self.c - self.c0);
        self.a0 += beta * (self.a - self.a0);
        self.alpha0 = alpha;
    }

    /// Wrap the accumulated angle into `[-2π, 2π]` to keep trigonometry
    /// accurate over long runs. Applies the same shift to both endpoints.
    pub fn normalize(&mut self) {
        let two_pi = 2.0 * core::f32::consts::PI;
        let d = two_pi * (self.a0 / two_pi).floor();
        self.a0 -= d;
        self.a -= d;
    }
}

// ============================================================================
// Mat22 / Mat33 — effective-mass matrices
// ============================================================================

/// Column-major 2×2 matrix used for two-row constraint blocks.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Mat22 {
    /// First column.
    pub ex: Vec2,
    /// Second column.
    pub ey: Vec2,
}

impl Mat22 {
    /// Build from columns.
    #[inline]
    #[must_use]
    pub const fn new(ex: Vec2, ey: Vec2) -> Self {
        Self { ex, ey }
    }

    /// Matrix-vector product.
    #[inline]
    #[must_use]
    pub fn mul(self, v: Vec2) -> Vec2 {
        Vec2::new(
            self.ex.x * v.x + self.ey.x * v.y,
            self.ex.y * v.x + self.ey.y * v.y,
        )
    }

    /// Solve `A x = b`. A singular matrix yields a zero impulse rather than
    /// NaN, neutralizing the constraint for this iteration.
    #[must_use]
    pub fn solve(self, b: Vec2) -> Vec2 {
        let a11 = self.ex.x;
        let a12 = self.ey.x;
        let a21 = self.ex.y;
        let a22 = self.ey.y;
        let mut det = a11 * a22 - a12 * a21;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Vec2::new(det * (a22 * b.x - a12 * b.y), det * (a11 * b.y - a21 * b.x))
    }

    /// Inverse with the same singularity handling as [`Mat22::solve`].
    #[must_use]
    pub fn inverse(self) -> Mat22 {
        let a = self.ex.x;
        let b = self.ey.x;
        let c = self.ex.y;
        let d = self.ey.y;
        let mut det = a * d - b * c;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Mat22 {
            ex: Vec2::new(det * d, -det * c),
            ey: Vec2::new(-det * b, det * a),
        }
    }
}

/// Minimal 3-component vector for [`Mat33`] solves.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
}

impl Vec3 {
    /// All zeroes.
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Create from components.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Dot product.
    #[inline]
    #[must_use]
    pub fn dot(self, rhs: Self) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    /// Cross product.
    #[inline]
    #[must_use]
    pub fn cross(self, rhs: Self) -> Self {
        Self {
            x: self.y * rhs.z - self.z * rhs.y,
            y: self.z * rhs.x - self.x * rhs.z,
            z: self.x * rhs.y - self.y * rhs.x,
        }
    }
}

impl core::ops::Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl core::ops::Sub for Vec3 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl core::ops::Neg for Vec3 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// Column-major 3×3 matrix for three-row constraint blocks (point + angle).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Mat33 {
    /// First column.
    pub ex: Vec3,
    /// Second column.
    pub ey: Vec3,
    /// Third column.
    pub ez: Vec3,
}

impl Mat33 {
    /// Full matrix-vector product.
    #[inline]
    #[must_use]
    pub fn mul33(&self, v: Vec3) -> Vec3 {
        Vec3 {
            x: self.ex.x * v.x + self.ey.x * v.y + self.ez.x * v.z,
            y: self.ex.y * v.x + self.ey.y * v.y + self.ez.y * v.z,
            z: self.ex.z * v.x + self.ey.z * v.y + self.ez.z * v.z,
        }
    }

    /// Multiply a 2-vector by the upper-left 2×2 block.
    #[inline]
    #[must_use]
    pub fn mul22(&self, v: Vec2) -> Vec2 {
        Vec2::new(
            self.ex.x * v.x + self.ey.x * v.y,
            self.ex.y * v.x + self.ey.y * v.y,
        )
    }

    /// Solve the full 3×3 system `A x = b`.
    #[must_use]
    pub fn solve33(&self, b: Vec3) -> Vec3 {
        let mut det = self.ex.dot(self.ey.cross(self.ez));
        if det != 0.0 {
            det = 1.0 / det;
        }
        Vec3 {
            x: det * b.dot(self.ey.cross(self.ez)),
            y: det * self.ex.dot(b.cross(self.ez)),
            z: det * self.ex.dot(self.ey.cross(b)),
        }
    }

    /// Solve only the upper-left 2×2 block.
    #[must_use]
    pub fn solve22(&self, b: Vec2) -> Vec2 {
        let a11 = self.ex.x;
        let a12 = self.ey.x;
        let a21 = self.ex.y;
        let a22 = self.ey.y;
        let mut det = a11 * a22 - a12 * a21;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Vec2::new(det * (a22 * b.x - a12 * b.y), det * (a11 * b.y - a21 * b.x))
    }

    /// Inverse of the upper-left 2×2 block, zero elsewhere.
    #[must_use]
    pub fn get_inverse22(&self) -> Mat33 {
        let a = self.ex.x;
        let b = self.ey.x;
        let c = self.ex.y;
        let d = self.ey.y;
        let mut det = a * d - b * c;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Mat33 {
            ex: Vec3::new(det * d, -det * c, 0.0),
            ey: Vec3::new(-det * b, det * a, 0.0),
            ez: Vec3::ZERO,
        }
    }

    /// Symmetric full 3×3 inverse. Singular matrices invert to zero.
    #[must_use]
    pub fn get_sym_inverse33(&self) -> Mat33 {
        let mut det = self.ex.dot(self.ey.cross(self.ez));
        if det != 0.0 {
            det = 1.0 / det;
        }
        let a11 = self.ex.x;
        let a12 = self.ey.x;
        let a13 = self.ez.x;
        let a22 = self.ey.y;
        let a23 = self.ez.y;
        let a33 = self.ez.z;

        let ex_x = det * (a22 * a33 - a23 * a23);
        let ex_y = det * (a13 * a23 - a12 * a33);
        let ex_z = det * (a12 * a23 - a13 * a22);
        let ey_y = det * (a11 * a33 - a13 * a13);
        let ey_z = det * (a13 * a12 - a11 * a23);
        let ez_z = det * (a11 * a22 - a12 * a12);

        Mat33 {
            ex: Vec3::new(ex_x, ex_y, ex_z),
            ey: Vec3::new(ex_y, ey_y, ey_z),
            ez: Vec3::new(ex_z, ey_z, ez_z),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rot_roundtrip() {
        let q = Rot::new(0.7);
        assert_relative_eq!(q.angle(), 0.7, epsilon = 1e-6);
        let v = Vec2::new(3.0, -2.0);
        let back = q.apply_inverse(q.apply(v));
        assert_relative_eq!(back.x, v.x, epsilon = 1e-5);
        assert_relative_eq!(back.y, v.y, epsilon = 1e-5);
    }

    #[test]
    fn test_transform_roundtrip() {
        let xf = Transform::new(Vec2::new(1.0, 2.0), 0.5);
        let p = Vec2::new(-4.0, 7.0);
        let back = xf.apply_inverse(xf.apply(p));
        assert_relative_eq!(back.x, p.x, epsilon = 1e-5);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-5);
    }

    #[test]
    fn test_sweep_transform_endpoints() {
        let sweep = Sweep {
            local_center: Vec2::ZERO,
            c0: Vec2::new(0.0, 0.0),
            c: Vec2::new(10.0, 0.0),
            a0: 0.0,
            a: 1.0,
            alpha0: 0.0,
        };
        let start = sweep.transform(0.0);
        let end = sweep.transform(1.0);
        assert_relative_eq!(start.p.x, 0.0);
        assert_relative_eq!(end.p.x, 10.0);
        assert_relative_eq!(end.q.angle(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_sweep_advance() {
        let mut sweep = Sweep {
            local_center: Vec2::ZERO,
            c0: Vec2::ZERO,
            c: Vec2::new(8.0, 0.0),
            a0: 0.0,
            a: 0.0,
            alpha0: 0.0,
        };
        sweep.advance(0.5);
        assert_relative_eq!(sweep.c0.x, 4.0);
        assert_relative_eq!(sweep.alpha0, 0.5);
        // Midpoint of the remaining interval.
        let mid = sweep.transform(0.5);
        assert_relative_eq!(mid.p.x, 6.0);
    }

    #[test]
    fn test_mat22_solve() {
        let m = Mat22::new(Vec2::new(2.0, 1.0), Vec2::new(1.0, 3.0));
        let b = Vec2::new(5.0, 10.0);
        let x = m.solve(b);
        let back = m.mul(x);
        assert_relative_eq!(back.x, b.x, epsilon = 1e-5);
        assert_relative_eq!(back.y, b.y, epsilon = 1e-5);
    }

    #[test]
    fn test_mat22_singular_is_zero() {
        let m = Mat22::new(Vec2::new(1.0, 2.0), Vec2::new(2.0, 4.0));
        let x = m.solve(Vec2::new(1.0, 1.0));
        assert_eq!(x, Vec2::ZERO);
    }

    #[test]
    fn test_mat33_solve() {
        let m = Mat33 {
            ex: Vec3::new(4.0, 1.0, 0.5),
            ey: Vec3::new(1.0, 3.0, 0.2),
            ez: Vec3::new(0.5, 0.2, 2.0),
        };
        let b = Vec3::new(1.0, 2.0, 3.0);
        let x = m.solve33(b);
        let ax = Vec3::new(
            m.ex.x * x.x + m.ey.x * x.y + m.ez.x * x.z,
            m.ex.y * x.x + m.ey.y * x.y + m.ez.y * x.z,
            m.ex.z * x.x + m.ey.z * x.y + m.ez.z * x.z,
        );
        assert_relative_eq!(ax.x, b.x, epsilon = 1e-4);
        assert_relative_eq!(ax.y, b.y, epsilon = 1e-4);
        assert_relative_eq!(ax.z, b.z, epsilon = 1e-4);
    }

    #[test]
    fn test_cross_helpers() {
        let v = Vec2::new(1.0, 0.0);
        assert_eq!(cross_sv(1.0, v), Vec2::new(0.0, 1.0));
        assert_eq!(cross_vs(v, 1.0), Vec2::new(0.0, -1.0));
        assert_relative_eq!(cross_vv(Vec2::X, Vec2::Y), 1.0);
    }
}
