use crate::error::Result;
use crate::mesh::Mesh;

/// How many polygons use each edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeUsageReport {
    /// Polygon count per edge.
    pub polygons_per_edge: Vec<usize>,
    /// Edges used by no polygon.
    pub loose: usize,
    /// Edges used by exactly one polygon.
    pub boundary: usize,
    /// Edges used by exactly two polygons.
    pub manifold: usize,
    /// Edges used by more than two polygons.
    pub non_manifold: usize,
}

impl EdgeUsageReport {
    /// `true` if every edge borders exactly two polygons.
    #[must_use]
    pub fn is_closed_manifold(&self) -> bool {
        self.loose == 0 && self.boundary == 0 && self.non_manifold == 0
    }
}

/// Counts polygon usage per edge.
#[derive(Debug, Default, Clone, Copy)]
pub struct EdgeUsage;

impl EdgeUsage {
    /// Creates a new `EdgeUsage` query.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Executes the query.
    ///
    /// # Errors
    ///
    /// Returns an error if the mesh is invalid.
    pub fn execute(&self, mesh: &Mesh) -> Result<EdgeUsageReport> {
        mesh.validate()?;
        let mut report = EdgeUsageReport {
            polygons_per_edge: vec![0; mesh.edge_count()],
            ..EdgeUsageReport::default()
        };
        for corner in &mesh.corners {
            report.polygons_per_edge[corner.edge] += 1;
        }
        for &count in &report.polygons_per_edge {
            match count {
                0 => report.loose += 1,
                1 => report.boundary += 1,
                2 => report.manifold += 1,
                _ => report.non_manifold += 1,
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::operations::creation::{MakeBox, MakeGrid, MakeMesh};

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn box_is_closed() {
        let mesh = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute()
            .unwrap();
        let report = EdgeUsage::new().execute(&mesh).unwrap();
        assert!(report.is_closed_manifold());
        assert_eq!(report.manifold, 12);
    }

    #[test]
    fn grid_has_boundary() {
        let mesh = MakeGrid::new(2, 1, 2.0, 1.0).execute().unwrap();
        let report = EdgeUsage::new().execute(&mesh).unwrap();
        assert_eq!(report.boundary, 6);
        assert_eq!(report.manifold, 1);
    }

    #[test]
    fn fin_is_non_manifold() {
        let mesh = MakeMesh::new(
            vec![
                p(0.0, 0.0, 0.0),
                p(0.0, 0.0, 1.0),
                p(1.0, 0.0, 0.0),
                p(-1.0, 0.0, 0.0),
                p(0.0, 1.0, 0.0),
            ],
            vec![vec![0, 1, 2], vec![1, 0, 3], vec![0, 1, 4]],
        )
        .execute()
        .unwrap();
        let report = EdgeUsage::new().execute(&mesh).unwrap();
        assert_eq!(report.non_manifold, 1);
        assert!(!report.is_closed_manifold());
    }
}
