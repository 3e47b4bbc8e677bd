use std::collections::VecDeque;

use hashbrown::HashMap;
use spade::handles::{FixedFaceHandle, FixedVertexHandle, InnerTag};
use spade::{ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2, Triangulation};

use crate::error::{Result, TessellationError};
use crate::math::polygon_3d::polygon_normal;
use crate::math::{Point3, Vector3};
use crate::mesh::Mesh;
use crate::operations::query::VertexNormals;

use super::TriangleMesh;

/// Splits every polygon of a mesh into triangles.
///
/// Triangles keep the polygon's winding and reuse the mesh vertices. Polygons
/// with more than three corners are projected onto their Newell plane and
/// triangulated with a constrained Delaunay triangulation.
#[derive(Debug, Default, Clone, Copy)]
pub struct Triangulate;

impl Triangulate {
    /// Creates a new `Triangulate` operation.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Executes the tessellation.
    ///
    /// # Errors
    ///
    /// Returns an error if the mesh is invalid or a polygon cannot be
    /// inserted into the triangulation.
    #[allow(clippy::cast_possible_truncation)]
    pub fn execute(&self, mesh: &Mesh) -> Result<TriangleMesh> {
        mesh.validate()?;

        let mut out = TriangleMesh {
            vertices: mesh.positions.clone(),
            normals: VertexNormals::new().execute(mesh)?,
            indices: Vec::with_capacity(mesh.corner_count()),
            polygons: Vec::with_capacity(mesh.corner_count()),
        };

        for index in 0..mesh.polygon_count() {
            let verts: Vec<usize> = mesh.polygon_corners(index).iter().map(|c| c.vert).collect();
            let points: Vec<Point3> = verts.iter().map(|&v| mesh.positions[v]).collect();
            let triangles = if verts.len() == 3 {
                vec![[0, 1, 2]]
            } else {
                triangulate_polygon(&points)?
            };
            for tri in triangles {
                out.indices.push([
                    verts[tri[0]] as u32,
                    verts[tri[1]] as u32,
                    verts[tri[2]] as u32,
                ]);
                out.polygons.push(index);
            }
        }

        Ok(out)
    }
}

/// Triangulates one polygon, returning triangles as local corner indices.
fn triangulate_polygon(points: &[Point3]) -> Result<Vec<[usize; 3]>> {
    let normal = polygon_normal(points);
    if normal.norm_squared() < 0.5 {
        return Ok(fan(points.len()));
    }
    let u_dir = perpendicular(&normal);
    let v_dir = normal.cross(&u_dir);
    let origin = points[0];

    let mut cdt = ConstrainedDelaunayTriangulation::<SpadePoint2<f64>>::new();
    let mut handles = Vec::with_capacity(points.len());
    let mut local: HashMap<usize, usize> = HashMap::new();
    for (i, p) in points.iter().enumerate() {
        let d = p - origin;
        let h = cdt
            .insert(SpadePoint2::new(d.dot(&u_dir), d.dot(&v_dir)))
            .map_err(|e: InsertionError| TessellationError::Failed(format!("CDT insert: {e}")))?;
        local.entry(h.index()).or_insert(i);
        handles.push(h);
    }
    if local.len() < 3 {
        return Ok(fan(points.len()));
    }

    if !insert_boundary(&mut cdt, &handles) {
        return Ok(fan(points.len()));
    }

    let interior = classify_interior_faces(&cdt);
    let mut triangles = Vec::with_capacity(points.len() - 2);
    for face in cdt.inner_faces() {
        if !interior[face.fix().index()] {
            continue;
        }
        let mut tri = [0usize; 3];
        for (k, vh) in face.vertices().iter().enumerate() {
            tri[k] = local.get(&vh.fix().index()).copied().ok_or_else(|| {
                TessellationError::Failed("triangulation produced a foreign vertex".into())
            })?;
        }
        triangles.push(tri);
    }
    Ok(triangles)
}

/// Constrains the polygon boundary. Returns `false` if a boundary edge would
/// cross an existing constraint (self-intersecting polygon).
fn insert_boundary(
    cdt: &mut ConstrainedDelaunayTriangulation<SpadePoint2<f64>>,
    handles: &[FixedVertexHandle],
) -> bool {
    for i in 0..handles.len() {
        let from = handles[i];
        let to = handles[(i + 1) % handles.len()];
        if from == to {
            continue;
        }
        if !cdt.can_add_constraint(from, to) {
            return false;
        }
        cdt.add_constraint(from, to);
    }
    true
}

/// Marks the inner faces of the CDT that lie inside the constrained boundary.
///
/// Flood-fills from the faces touching the convex hull; crossing a constraint
/// edge flips inside/outside.
fn classify_interior_faces(cdt: &ConstrainedDelaunayTriangulation<SpadePoint2<f64>>) -> Vec<bool> {
    let mut depth: Vec<Option<u32>> = vec![None; cdt.num_all_faces()];
    let mut queue: VecDeque<(FixedFaceHandle<InnerTag>, u32)> = VecDeque::new();
    let outer = cdt.outer_face().fix();

    for edge in cdt.directed_edges() {
        if edge.face().fix() != outer {
            continue;
        }
        if let Some(inner) = edge.rev().face().as_inner() {
            let idx = inner.fix().index();
            if depth[idx].is_some() {
                continue;
            }
            let d = u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
            depth[idx] = Some(d);
            queue.push_back((inner.fix(), d));
        }
    }

    while let Some((face_fix, d)) = queue.pop_front() {
        for edge in cdt.face(face_fix).adjacent_edges() {
            if let Some(neighbor) = edge.rev().face().as_inner() {
                let idx = neighbor.fix().index();
                if depth[idx].is_some() {
                    continue;
                }
                let nd = d + u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
                depth[idx] = Some(nd);
                queue.push_back((neighbor.fix(), nd));
            }
        }
    }

    depth.into_iter().map(|d| d.is_some_and(|d| d % 2 == 1)).collect()
}

fn fan(len: usize) -> Vec<[usize; 3]> {
    (1..len.saturating_sub(1)).map(|k| [0, k, k + 1]).collect()
}

/// A unit vector perpendicular to the unit vector `n`.
fn perpendicular(n: &Vector3) -> Vector3 {
    let axis = if n.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let u = axis - n * n.dot(&axis);
    u.normalize()
}
