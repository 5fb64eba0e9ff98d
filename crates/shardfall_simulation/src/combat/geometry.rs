//! 2D geometry helpers for the resolvers.
//!
//! Per-frame combat code never faults on bad vectors: degenerate input is
//! corrected to a canonical axis instead of producing NaN.

use bevy::math::Vec2;

/// Fallback for zero-length or non-finite directions.
pub const CANONICAL_AXIS: Vec2 = Vec2::X;

const DIRECTION_EPSILON: f32 = 1e-6;

/// Normalizes `v`, falling back to [`CANONICAL_AXIS`].
pub fn safe_direction(v: Vec2) -> Vec2 {
    let length_sq = v.length_squared();
    if !length_sq.is_finite() || length_sq <= DIRECTION_EPSILON * DIRECTION_EPSILON {
        CANONICAL_AXIS
    } else {
        v / length_sq.sqrt()
    }
}

/// Rotates `v` counter-clockwise by `angle` radians.
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    Vec2::from_angle(angle).rotate(v)
}

/// Signed angle from `from` to `to` in `(-PI, PI]`, counter-clockwise positive.
pub fn signed_angle(from: Vec2, to: Vec2) -> f32 {
    from.perp_dot(to).atan2(from.dot(to))
}

/// Mirror reflection `d' = d - 2(d·n)n` with both vectors normalized first.
pub fn reflect(direction: Vec2, normal: Vec2) -> Vec2 {
    let d = safe_direction(direction);
    let n = safe_direction(normal);
    safe_direction(d - 2.0 * d.dot(n) * n)
}

/// Rotates `from` toward `to` by at most `max_angle` radians.
pub fn rotate_toward(from: Vec2, to: Vec2, max_angle: f32) -> Vec2 {
    let from = safe_direction(from);
    let delta = signed_angle(from, safe_direction(to));
    let step = delta.clamp(-max_angle.abs(), max_angle.abs());
    rotate(from, step)
}
