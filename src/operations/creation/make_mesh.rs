use hashbrown::HashMap;

use crate::error::{OperationError, Result};
use crate::math::Point3;
use crate::mesh::{Corner, Edge, Mesh, Polygon};

/// Builds a mesh from positions and polygon vertex lists.
///
/// Edges are derived from consecutive polygon vertices and shared between
/// polygons that use the same vertex pair, in first-use order.
pub struct MakeMesh {
    points: Vec<Point3>,
    faces: Vec<Vec<usize>>,
    materials: Option<Vec<i32>>,
}

impl MakeMesh {
    /// Creates a new `MakeMesh` operation.
    #[must_use]
    pub fn new(points: Vec<Point3>, faces: Vec<Vec<usize>>) -> Self {
        Self {
            points,
            faces,
            materials: None,
        }
    }

    /// Assigns one material index per face.
    #[must_use]
    pub fn with_materials(mut self, materials: Vec<i32>) -> Self {
        self.materials = Some(materials);
        self
    }

    /// Executes the operation.
    ///
    /// # Errors
    ///
    /// Returns an error if a face has fewer than 3 vertices, repeats a vertex
    /// consecutively, references a missing point, or if the material list
    /// length does not match the face count.
    pub fn execute(&self) -> Result<Mesh> {
        if let Some(materials) = &self.materials {
            if materials.len() != self.faces.len() {
                return Err(OperationError::InvalidInput(format!(
                    "{} materials for {} faces",
                    materials.len(),
                    self.faces.len()
                ))
                .into());
            }
        }

        let mut mesh = Mesh {
            positions: self.points.clone(),
            ..Mesh::default()
        };
        let mut edge_lookup: HashMap<(usize, usize), usize> = HashMap::new();

        for (face_index, face) in self.faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(OperationError::InvalidInput(format!(
                    "face {face_index} has {} vertices",
                    face.len()
                ))
                .into());
            }
            let loop_start = mesh.corners.len();
            for (k, &v) in face.iter().enumerate() {
                let next = face[(k + 1) % face.len()];
                if v >= self.points.len() || next >= self.points.len() {
                    return Err(OperationError::InvalidInput(format!(
                        "face {face_index} references vertex {} of {}",
                        v.max(next),
                        self.points.len()
                    ))
                    .into());
                }
                if v == next {
                    return Err(OperationError::InvalidInput(format!(
                        "face {face_index} repeats vertex {v}"
                    ))
                    .into());
                }
                let key = (v.min(next), v.max(next));
                let edge = *edge_lookup.entry(key).or_insert_with(|| {
                    mesh.edges.push(Edge::new(v, next));
                    mesh.edges.len() - 1
                });
                mesh.corners.push(Corner::new(v, edge));
            }
            let mut polygon = Polygon::new(loop_start, face.len());
            if let Some(materials) = &self.materials {
                polygon.material_index = materials[face_index];
            }
            mesh.polygons.push(polygon);
        }

        mesh.validate()?;
        Ok(mesh)
    }
}
