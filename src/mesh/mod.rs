pub mod edge;
pub mod polygon;
pub mod vertex_groups;

pub use edge::{Edge, EdgeFlags};
pub use polygon::{Corner, PolyFlags, Polygon};
pub use vertex_groups::{VertexGroups, VertexWeights};

use crate::error::MeshError;
use crate::math::polygon_3d::polygon_normal;
use crate::math::{Point3, Vector3};

/// An indexed polygon mesh.
///
/// Polygons own contiguous corner runs; each corner names its vertex and the
/// edge leading to the next corner. Optional float layers carry per-element
/// crease and bevel weights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions.
    pub positions: Vec<Point3>,
    /// Edges.
    pub edges: Vec<Edge>,
    /// Polygons.
    pub polygons: Vec<Polygon>,
    /// Polygon corners.
    pub corners: Vec<Corner>,
    /// Per-vertex crease, `[0, 1]`.
    pub vertex_crease: Option<Vec<f64>>,
    /// Per-vertex bevel weight, `[0, 1]`.
    pub vertex_bevel_weight: Option<Vec<f64>>,
    /// Per-edge crease, `[0, 1]`.
    pub edge_crease: Option<Vec<f64>>,
    /// Per-edge bevel weight, `[0, 1]`.
    pub edge_bevel_weight: Option<Vec<f64>>,
    /// Vertex group weights.
    pub vertex_groups: Option<VertexGroups>,
}

impl Mesh {
    /// Creates an empty mesh.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    #[must_use]
    pub fn corner_count(&self) -> usize {
        self.corners.len()
    }

    /// The corners of polygon `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range or the polygon's corner run exceeds
    /// the corner array; [`Mesh::validate`] rules both out.
    #[must_use]
    pub fn polygon_corners(&self, index: usize) -> &[Corner] {
        &self.corners[self.polygons[index].corners()]
    }

    /// Vertex positions of polygon `index` in winding order.
    #[must_use]
    pub fn polygon_positions(&self, index: usize) -> Vec<Point3> {
        self.polygon_corners(index)
            .iter()
            .map(|c| self.positions[c.vert])
            .collect()
    }

    /// Unit normal of polygon `index`, zero if the polygon has no area.
    #[must_use]
    pub fn polygon_normal(&self, index: usize) -> Vector3 {
        polygon_normal(
            self.polygon_corners(index)
                .iter()
                .map(|c| &self.positions[c.vert]),
        )
    }

    /// Checks that every index is in range, every polygon has at least
    /// 3 corners, every corner edge joins its corner to the next corner, and
    /// every attribute layer matches its domain size.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> Result<(), MeshError> {
        let verts = self.positions.len();
        for edge in &self.edges {
            for &v in &edge.verts {
                if v >= verts {
                    return Err(MeshError::IndexOutOfRange {
                        element: "vertex",
                        index: v,
                        len: verts,
                    });
                }
            }
        }

        for (index, poly) in self.polygons.iter().enumerate() {
            if poly.loop_len < 3 {
                return Err(MeshError::DegeneratePolygon {
                    polygon: index,
                    corners: poly.loop_len,
                });
            }
            let end = poly.loop_start + poly.loop_len;
            if end > self.corners.len() {
                return Err(MeshError::IndexOutOfRange {
                    element: "corner",
                    index: end - 1,
                    len: self.corners.len(),
                });
            }
            for offset in 0..poly.loop_len {
                let corner_index = poly.loop_start + offset;
                let corner = self.corners[corner_index];
                let next = self.corners[poly.loop_start + (offset + 1) % poly.loop_len];
                if corner.vert >= verts {
                    return Err(MeshError::IndexOutOfRange {
                        element: "vertex",
                        index: corner.vert,
                        len: verts,
                    });
                }
                let Some(edge) = self.edges.get(corner.edge) else {
                    return Err(MeshError::IndexOutOfRange {
                        element: "edge",
                        index: corner.edge,
                        len: self.edges.len(),
                    });
                };
                if !edge.same_endpoints(&Edge::new(corner.vert, next.vert)) {
                    return Err(MeshError::BrokenCornerEdge {
                        corner: corner_index,
                        edge: corner.edge,
                    });
                }
            }
        }

        check_layer("vertex crease", self.vertex_crease.as_deref(), verts)?;
        check_layer(
            "vertex bevel weight",
            self.vertex_bevel_weight.as_deref(),
            verts,
        )?;
        check_layer("edge crease", self.edge_crease.as_deref(), self.edges.len())?;
        check_layer(
            "edge bevel weight",
            self.edge_bevel_weight.as_deref(),
            self.edges.len(),
        )?;
        if let Some(groups) = &self.vertex_groups {
            if groups.vertex_count() != verts {
                return Err(MeshError::LayerLength {
                    layer: "vertex groups",
                    expected: verts,
                    actual: groups.vertex_count(),
                });
            }
        }
        Ok(())
    }
}

fn check_layer(layer: &'static str, values: Option<&[f64]>, expected: usize) -> Result<(), MeshError> {
    match values {
        Some(values) if values.len() != expected => Err(MeshError::LayerLength {
            layer,
            expected,
            actual: values.len(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn triangle() -> Mesh {
        Mesh {
            positions: vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)],
            edges: vec![Edge::new(0, 1), Edge::new(1, 2), Edge::new(2, 0)],
            polygons: vec![Polygon::new(0, 3)],
            corners: vec![Corner::new(0, 0), Corner::new(1, 1), Corner::new(2, 2)],
            ..Mesh::default()
        }
    }

    #[test]
    fn valid_triangle_passes() {
        let mesh = triangle();
        mesh.validate().unwrap();
        assert_eq!(mesh.polygon_corners(0).len(), 3);
        assert!((mesh.polygon_normal(0).z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn broken_corner_edge_is_rejected() {
        let mut mesh = triangle();
        mesh.corners[0].edge = 1;
        assert!(matches!(
            mesh.validate(),
            Err(MeshError::BrokenCornerEdge { corner: 0, edge: 1 })
        ));
    }

    #[test]
    fn two_corner_polygon_is_rejected() {
        let mut mesh = triangle();
        mesh.polygons[0].loop_len = 2;
        assert!(matches!(
            mesh.validate(),
            Err(MeshError::DegeneratePolygon { .. })
        ));
    }

    #[test]
    fn layer_length_mismatch_is_rejected() {
        let mut mesh = triangle();
        mesh.edge_crease = Some(vec![0.0; 2]);
        assert!(matches!(
            mesh.validate(),
            Err(MeshError::LayerLength { expected: 3, actual: 2, .. })
        ));
    }

    #[test]
    fn out_of_range_vertex_is_rejected() {
        let mut mesh = triangle();
        mesh.edges[2].verts[0] = 9;
        assert!(matches!(
            mesh.validate(),
            Err(MeshError::IndexOutOfRange { element: "vertex", index: 9, .. })
        ));
    }
}
