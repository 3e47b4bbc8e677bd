use super::{Point3, Vector3};

/// Newell normal of a polygon, unnormalized.
///
/// Its length is twice the polygon area. Works for non-planar and concave
/// polygons since every edge contributes independently.
#[must_use]
pub fn newell_normal<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Vector3 {
    let points: Vec<&Point3> = points.into_iter().collect();
    let n = points.len();
    let mut normal = Vector3::zeros();
    for i in 0..n {
        let cur = points[i];
        let next = points[(i + 1) % n];
        normal.x += (cur.y - next.y) * (cur.z + next.z);
        normal.y += (cur.z - next.z) * (cur.x + next.x);
        normal.z += (cur.x - next.x) * (cur.y + next.y);
    }
    normal
}

/// Unit normal of a polygon, or the zero vector when the polygon has no area.
#[must_use]
pub fn polygon_normal<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Vector3 {
    let normal = newell_normal(points);
    let len = normal.norm();
    if len > f64::MIN_POSITIVE {
        normal / len
    } else {
        Vector3::zeros()
    }
}

/// Compute the area of a 3D polygon.
#[must_use]
pub fn polygon_area_3d(points: &[Point3]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    0.5 * newell_normal(points).norm()
}

/// Centroid (vertex average) of a point set.
#[must_use]
pub fn centroid(points: &[Point3]) -> Option<Point3> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    #[allow(clippy::cast_precision_loss)]
    let n = points.len() as f64;
    Some(Point3::from(sum / n))
}
