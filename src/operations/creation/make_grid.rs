use crate::error::{OperationError, Result};
use crate::math::Point3;
use crate::mesh::Mesh;

use super::MakeMesh;

/// Creates a flat grid of quads in the XY plane, normals along +Z.
pub struct MakeGrid {
    cells_x: usize,
    cells_y: usize,
    size_x: f64,
    size_y: f64,
}

impl MakeGrid {
    /// Creates a new `MakeGrid` operation spanning `[0, size_x] × [0, size_y]`.
    #[must_use]
    pub fn new(cells_x: usize, cells_y: usize, size_x: f64, size_y: f64) -> Self {
        Self {
            cells_x,
            cells_y,
            size_x,
            size_y,
        }
    }

    /// Executes the operation.
    ///
    /// # Errors
    ///
    /// Returns an error if either cell count is zero or a size is not
    /// positive.
    #[allow(clippy::cast_precision_loss)]
    pub fn execute(&self) -> Result<Mesh> {
        if self.cells_x == 0 || self.cells_y == 0 {
            return Err(OperationError::InvalidInput("grid needs at least one cell".into()).into());
        }
        if self.size_x <= 0.0 || self.size_y <= 0.0 {
            return Err(OperationError::InvalidInput("grid size must be positive".into()).into());
        }

        let row = self.cells_x + 1;
        let mut points = Vec::with_capacity(row * (self.cells_y + 1));
        for j in 0..=self.cells_y {
            for i in 0..=self.cells_x {
                points.push(Point3::new(
                    self.size_x * i as f64 / self.cells_x as f64,
                    self.size_y * j as f64 / self.cells_y as f64,
                    0.0,
                ));
            }
        }

        let mut faces = Vec::with_capacity(self.cells_x * self.cells_y);
        for j in 0..self.cells_y {
            for i in 0..self.cells_x {
                let a = j * row + i;
                faces.push(vec![a, a + 1, a + 1 + row, a + row]);
            }
        }

        MakeMesh::new(points, faces).execute()
    }
}
