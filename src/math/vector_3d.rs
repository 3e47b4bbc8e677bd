use std::f64::consts::TAU;

use super::{Point3, Vector3};

/// Normalizes `v` in place and returns its previous length.
///
/// Vectors too short to normalize are set to zero and `0.0` is returned.
pub fn normalize_or_zero(v: &mut Vector3) -> f64 {
    let len = v.norm();
    if len > 1e-35 {
        *v /= len;
        len
    } else {
        *v = Vector3::zeros();
        0.0
    }
}

/// Removes the component of `v` along the unit vector `axis`.
///
/// Returns the removed component, `dot(v, axis)` before projection.
pub fn remove_component(v: &mut Vector3, axis: &Vector3) -> f64 {
    let d = v.dot(axis);
    *v -= axis * d;
    d
}

/// Angle in `[0, 2π)` that rotates `reference` onto `n` around `axis`.
///
/// Both inputs are unit vectors perpendicular to `axis`. The unsigned angle is
/// mirrored to `2π - angle` whenever `n × reference` points along `axis`.
#[must_use]
pub fn signed_angle_on_axis(n: &Vector3, reference: &Vector3, axis: &Vector3) -> f64 {
    let angle = n.dot(reference).clamp(-1.0, 1.0).acos();
    if n.cross(reference).dot(axis) >= 0.0 {
        TAU - angle
    } else {
        angle
    }
}

/// Returns the value closest to `value` whose magnitude is at least `epsilon`.
///
/// Zero maps to `+epsilon`.
#[must_use]
pub fn clamp_nonzero(value: f64, epsilon: f64) -> f64 {
    if value < 0.0 {
        value.min(-epsilon)
    } else {
        value.max(epsilon)
    }
}

/// Interior angle at `at` between the directions towards `prev` and `next`.
#[must_use]
pub fn corner_angle(prev: &Point3, at: &Point3, next: &Point3) -> f64 {
    let a = prev - at;
    let b = next - at;
    let denom = a.norm() * b.norm();
    if denom <= f64::MIN_POSITIVE {
        return 0.0;
    }
    (a.dot(&b) / denom).clamp(-1.0, 1.0).acos()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::TOLERANCE;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn v(x: f64, y: f64, z: f64) -> Vector3 {
        Vector3::new(x, y, z)
    }

    #[test]
    fn normalize_returns_length() {
        let mut a = v(3.0, 0.0, 4.0);
        let len = normalize_or_zero(&mut a);
        assert!((len - 5.0).abs() < TOLERANCE);
        assert!((a.norm() - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn normalize_zero_vector_stays_zero() {
        let mut a = Vector3::zeros();
        assert!(normalize_or_zero(&mut a).abs() < TOLERANCE);
        assert_eq!(a, Vector3::zeros());
    }

    #[test]
    fn remove_component_along_axis() {
        let mut a = v(1.0, 2.0, 3.0);
        let d = remove_component(&mut a, &v(0.0, 0.0, 1.0));
        assert!((d - 3.0).abs() < TOLERANCE);
        assert!(a.z.abs() < TOLERANCE);
        assert!((a.y - 2.0).abs() < TOLERANCE);
    }

    #[test]
    fn signed_angle_quarter_turns() {
        let axis = v(0.0, 0.0, 1.0);
        let reference = v(1.0, 0.0, 0.0);
        let ccw = signed_angle_on_axis(&v(0.0, 1.0, 0.0), &reference, &axis);
        let cw = signed_angle_on_axis(&v(0.0, -1.0, 0.0), &reference, &axis);
        assert!((ccw - FRAC_PI_2).abs() < 1e-9);
        assert!((cw - 3.0 * FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn signed_angle_of_same_direction_wraps_to_full_turn() {
        let axis = v(0.0, 0.0, 1.0);
        let a = v(1.0, 0.0, 0.0);
        assert!((signed_angle_on_axis(&a, &a, &axis) - TAU).abs() < 1e-9);
    }

    #[test]
    fn signed_angle_of_opposite_direction_is_half_turn() {
        let axis = v(0.0, 0.0, 1.0);
        let a = v(1.0, 0.0, 0.0);
        let angle = signed_angle_on_axis(&-a, &a, &axis);
        assert!((angle - PI).abs() < 1e-9);
    }

    #[test]
    fn clamp_nonzero_keeps_sign() {
        assert!((clamp_nonzero(0.0, 1e-5) - 1e-5).abs() < TOLERANCE);
        assert!((clamp_nonzero(-1e-7, 1e-5) + 1e-5).abs() < TOLERANCE);
        assert!((clamp_nonzero(0.3, 1e-5) - 0.3).abs() < TOLERANCE);
    }

    #[test]
    fn corner_angle_of_square_corner() {
        let angle = corner_angle(&p(1.0, 0.0, 0.0), &p(0.0, 0.0, 0.0), &p(0.0, 1.0, 0.0));
        assert!((angle - FRAC_PI_2).abs() < 1e-9);
        let straight = corner_angle(&p(-1.0, 0.0, 0.0), &p(0.0, 0.0, 0.0), &p(2.0, 0.0, 0.0));
        assert!((straight - PI).abs() < 1e-9);
    }

    #[test]
    fn corner_angle_degenerate_is_zero() {
        let o = p(0.0, 0.0, 0.0);
        assert!(corner_angle(&o, &o, &p(1.0, 0.0, 0.0)).abs() < TOLERANCE);
    }
}
