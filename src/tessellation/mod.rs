mod triangulate;

pub use triangulate::Triangulate;

use crate::math::{Point3, Vector3};

/// A triangle mesh approximation of a polygon mesh.
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Vertex normals.
    pub normals: Vec<Vector3>,
    /// Triangle indices (each triple defines a triangle).
    pub indices: Vec<[u32; 3]>,
    /// Source polygon of every triangle.
    pub polygons: Vec<usize>,
}

impl TriangleMesh {
    /// Number of triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }
}
