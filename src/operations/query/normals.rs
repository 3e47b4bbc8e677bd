use crate::error::Result;
use crate::math::polygon_3d::newell_normal;
use crate::math::Vector3;
use crate::mesh::Mesh;

/// Computes a unit normal per polygon (zero for polygons without area).
#[derive(Debug, Default, Clone, Copy)]
pub struct FaceNormals;

impl FaceNormals {
    /// Creates a new `FaceNormals` query.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Executes the query.
    ///
    /// # Errors
    ///
    /// Returns an error if the mesh is invalid.
    pub fn execute(&self, mesh: &Mesh) -> Result<Vec<Vector3>> {
        mesh.validate()?;
        Ok((0..mesh.polygon_count())
            .map(|i| mesh.polygon_normal(i))
            .collect())
    }
}

/// Computes area-weighted unit vertex normals.
///
/// Vertices not used by any polygon get the zero vector.
#[derive(Debug, Default, Clone, Copy)]
pub struct VertexNormals;

impl VertexNormals {
    /// Creates a new `VertexNormals` query.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Executes the query.
    ///
    /// # Errors
    ///
    /// Returns an error if the mesh is invalid.
    pub fn execute(&self, mesh: &Mesh) -> Result<Vec<Vector3>> {
        mesh.validate()?;
        let mut normals = vec![Vector3::zeros(); mesh.vertex_count()];
        for i in 0..mesh.polygon_count() {
            let corners = mesh.polygon_corners(i);
            let n = newell_normal(corners.iter().map(|c| &mesh.positions[c.vert]));
            for c in corners {
                normals[c.vert] += n;
            }
        }
        for n in &mut normals {
            let len = n.norm();
            if len > f64::MIN_POSITIVE {
                *n /= len;
            }
        }
        Ok(normals)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::operations::creation::{MakeBox, MakeGrid};

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn grid_vertex_normals_point_up() {
        let mesh = MakeGrid::new(2, 2, 2.0, 2.0).execute().unwrap();
        for n in VertexNormals::new().execute(&mesh).unwrap() {
            assert!((n.z - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn box_corner_normal_is_diagonal() {
        let mesh = MakeBox::new(p(-1.0, -1.0, -1.0), p(1.0, 1.0, 1.0))
            .execute()
            .unwrap();
        let normals = VertexNormals::new().execute(&mesh).unwrap();
        let expected = Vector3::new(1.0, 1.0, 1.0).normalize();
        assert!((normals[6] - expected).norm() < 1e-12);
    }

    #[test]
    fn face_normals_match_polygon_count() {
        let mesh = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute()
            .unwrap();
        let normals = FaceNormals::new().execute(&mesh).unwrap();
        assert_eq!(normals.len(), 6);
        assert!((normals[1].z - 1.0).abs() < 1e-12);
    }
}
