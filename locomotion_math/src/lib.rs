//! Horizontal-plane math shared by the locomotion crates.
//!
//! Frame convention: `+Y` is up, an unrotated body faces `-Z` and its right is `+X`.
//! Signed angles are positive when the target direction lies clockwise from the
//! source direction seen from above (a turn to the right).
#![forbid(unsafe_code)]

use rapier3d::math::{Rotation, Vector};
use rapier3d::prelude::Real;

const VECTOR_EQ_EPSILON_SQ: Real = 1.0e-10;
const NORMALIZE_EPSILON: Real = 1.0e-5;

pub fn up() -> Vector<Real> {
    Vector::y()
}

pub fn forward() -> Vector<Real> {
    Vector::new(0.0, 0.0, -1.0)
}

pub fn right() -> Vector<Real> {
    Vector::x()
}

/// Forward axis of `rotation`.
pub fn rotated_forward(rotation: &Rotation<Real>) -> Vector<Real> {
    rotation * forward()
}

/// Right axis of `rotation`.
pub fn rotated_right(rotation: &Rotation<Real>) -> Vector<Real> {
    rotation * right()
}

pub fn flatten(v: Vector<Real>) -> Vector<Real> {
    Vector::new(v.x, 0.0, v.z)
}

/// Zeroes `y` and normalizes; tiny vectors collapse to zero.
pub fn flat_normalized(v: Vector<Real>) -> Vector<Real> {
    normalized_or_zero(flatten(v))
}

pub fn normalized_or_zero(v: Vector<Real>) -> Vector<Real> {
    let len = v.norm();
    if len > NORMALIZE_EPSILON {
        v / len
    } else {
        Vector::zeros()
    }
}

/// Approximate vector equality, tolerant to float noise.
pub fn approx_eq(a: Vector<Real>, b: Vector<Real>) -> bool {
    (a - b).norm_squared() < VECTOR_EQ_EPSILON_SQ
}

/// Unsigned angle in degrees, `0` when either vector is degenerate.
pub fn angle_deg(from: Vector<Real>, to: Vector<Real>) -> Real {
    let denom = (from.norm_squared() * to.norm_squared()).sqrt();
    if denom < 1.0e-15 {
        return 0.0;
    }
    let dot = (from.dot(&to) / denom).clamp(-1.0, 1.0);
    dot.acos().to_degrees()
}

/// Signed angle in degrees around the world up axis, in `(-180, 180]`.
pub fn signed_angle_deg(from: Vector<Real>, to: Vector<Real>) -> Real {
    let unsigned = angle_deg(from, to);
    let clockwise = -from.cross(&to).dot(&up());
    if clockwise >= 0.0 {
        unsigned
    } else {
        -unsigned
    }
}

/// Signed angle from `from` to `to`, exactly `0` when they match.
pub fn direction_difference_deg(from: Vector<Real>, to: Vector<Real>) -> Real {
    if approx_eq(from, to) {
        0.0
    } else {
        signed_angle_deg(from, to)
    }
}

/// Rotation whose forward axis points along `direction`; `None` for zero input.
pub fn look_rotation(direction: Vector<Real>) -> Option<Rotation<Real>> {
    let dir = normalized_or_zero(direction);
    if dir == Vector::zeros() {
        return None;
    }
    let mut reference_up = up();
    if dir.cross(&reference_up).norm_squared() <= 1.0e-8 {
        reference_up = Vector::z();
    }
    Some(Rotation::face_towards(&-dir, &reference_up))
}

/// Rotation about the up axis facing `yaw` radians clockwise from `-Z`.
pub fn yaw_rotation(yaw: Real) -> Rotation<Real> {
    Rotation::from_axis_angle(&Vector::y_axis(), -yaw)
}

/// Spherical interpolation with `t` clamped to `[0, 1]`.
pub fn slerp(from: &Rotation<Real>, to: &Rotation<Real>, t: Real) -> Rotation<Real> {
    let t = t.clamp(0.0, 1.0);
    from.try_slerp(to, t, 1.0e-6).unwrap_or(*to)
}

/// Linear interpolation with `t` clamped to `[0, 1]`.
pub fn lerp(a: Real, b: Real, t: Real) -> Real {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Hermite smooth-step between `from` and `to`, `t` clamped to `[0, 1]`.
pub fn smooth_step(from: Real, to: Real, t: Real) -> Real {
    let t = t.clamp(0.0, 1.0);
    let t = -2.0 * t * t * t + 3.0 * t * t;
    to * t + from * (1.0 - t)
}

pub fn move_towards(current: Real, target: Real, max_delta: Real) -> Real {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}

/// Rounds to three decimals.
pub fn round3(value: Real) -> Real {
    (value * 1000.0).round() / 1000.0
}

/// Maps a `0..360` euler angle onto `-180..180`.
pub fn wrap_signed_deg(angle: Real) -> Real {
    if angle > 180.0 {
        angle - 360.0
    } else {
        angle
    }
}
