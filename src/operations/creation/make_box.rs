use crate::error::{OperationError, Result};
use crate::math::Point3;
use crate::mesh::Mesh;

use super::MakeMesh;

/// Creates a closed box of six outward-facing quads from two corner points.
pub struct MakeBox {
    min_corner: Point3,
    max_corner: Point3,
}

impl MakeBox {
    /// Creates a new `MakeBox` operation.
    #[must_use]
    pub fn new(min_corner: Point3, max_corner: Point3) -> Self {
        Self {
            min_corner,
            max_corner,
        }
    }

    /// Executes the operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the box has zero or negative extent on any axis.
    pub fn execute(&self) -> Result<Mesh> {
        let (lo, hi) = (self.min_corner, self.max_corner);
        if hi.x <= lo.x || hi.y <= lo.y || hi.z <= lo.z {
            return Err(OperationError::InvalidInput(
                "max corner must exceed min corner on every axis".into(),
            )
            .into());
        }

        let points = vec![
            Point3::new(lo.x, lo.y, lo.z),
            Point3::new(hi.x, lo.y, lo.z),
            Point3::new(hi.x, hi.y, lo.z),
            Point3::new(lo.x, hi.y, lo.z),
            Point3::new(lo.x, lo.y, hi.z),
            Point3::new(hi.x, lo.y, hi.z),
            Point3::new(hi.x, hi.y, hi.z),
            Point3::new(lo.x, hi.y, hi.z),
        ];
        let faces = vec![
            vec![0, 3, 2, 1], // bottom (-Z)
            vec![4, 5, 6, 7], // top (+Z)
            vec![0, 1, 5, 4], // front (-Y)
            vec![1, 2, 6, 5], // right (+X)
            vec![2, 3, 7, 6], // back (+Y)
            vec![3, 0, 4, 7], // left (-X)
        ];

        MakeMesh::new(points, faces).execute()
    }
}
