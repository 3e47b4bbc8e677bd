use crate::error::Result;
use crate::mesh::Mesh;
use crate::tessellation::Triangulate;

/// Computes the signed volume enclosed by a mesh.
///
/// Triangulates the polygons and sums `(1/6) * v0 . (v1 x v2)` over all
/// triangles. Outward-facing closed meshes give a positive volume; inverted
/// ones give a negative volume. Shells made of an outer and an inner surface
/// yield the volume between them.
#[derive(Debug, Default, Clone, Copy)]
pub struct Volume;

impl Volume {
    /// Creates a new `Volume` query.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Executes the query, returning the signed volume.
    ///
    /// # Errors
    ///
    /// Returns an error if the mesh cannot be triangulated.
    pub fn execute(&self, mesh: &Mesh) -> Result<f64> {
        let tri = Triangulate::new().execute(mesh)?;
        let mut signed_volume = 0.0;
        for t in &tri.indices {
            let v0 = tri.vertices[t[0] as usize].coords;
            let v1 = tri.vertices[t[1] as usize].coords;
            let v2 = tri.vertices[t[2] as usize].coords;
            signed_volume += v0.dot(&v1.cross(&v2));
        }
        Ok(signed_volume / 6.0)
    }
}
