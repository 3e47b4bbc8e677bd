use crate::error::{OperationError, Result};
use crate::math::Point3;
use crate::mesh::Mesh;

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3,
    /// Maximum corner of the bounding box.
    pub max: Point3,
}

/// Computes the axis-aligned bounding box of a mesh's vertices.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoundingBox;

impl BoundingBox {
    /// Creates a new `BoundingBox` query.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Executes the query, returning the AABB.
    ///
    /// # Errors
    ///
    /// Returns an error if the mesh has no vertices.
    pub fn execute(&self, mesh: &Mesh) -> Result<Aabb> {
        let mut points = mesh.positions.iter();
        let first = points
            .next()
            .ok_or_else(|| OperationError::InvalidInput("mesh has no vertices".into()))?;
        let mut aabb = Aabb {
            min: *first,
            max: *first,
        };
        for p in points {
            aabb.min = aabb.min.inf(p);
            aabb.max = aabb.max.sup(p);
        }
        Ok(aabb)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::operations::creation::MakeBox;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn box_bounds() {
        let mesh = MakeBox::new(p(-1.0, 0.0, 2.0), p(1.0, 3.0, 4.0))
            .execute()
            .unwrap();
        let aabb = BoundingBox::new().execute(&mesh).unwrap();
        assert!((aabb.min - p(-1.0, 0.0, 2.0)).norm() < 1e-12);
        assert!((aabb.max - p(1.0, 3.0, 4.0)).norm() < 1e-12);
    }

    #[test]
    fn empty_mesh_is_an_error() {
        assert!(BoundingBox::new().execute(&Mesh::new()).is_err());
    }
}
