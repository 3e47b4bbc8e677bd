use tracing::debug;

use crate::math::{Point3, Vector3};
use crate::mesh::Mesh;

use super::merge_map::VertexMergeMap;
use super::store::{count, ElementCounts};

/// A polygon using an edge, and whether it walks the edge backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjacentFace {
    pub polygon: usize,
    pub reversed: bool,
}

/// Polygons around an edge. Lists are shared by edges that were folded into
/// each other after welding.
#[derive(Debug, Clone, Default)]
pub struct FaceList {
    pub faces: Vec<AdjacentFace>,
    /// Number of edges referencing this list.
    pub used: u32,
}

/// Welded connectivity of the input mesh.
#[derive(Debug)]
pub struct Adjacency {
    pub merge: VertexMergeMap,
    /// Positions after welding, indexed by original vertex.
    pub co: Vec<Point3>,
    /// Unit face normals, with an axis fallback for faces without area.
    pub face_normals: Vec<Vector3>,
    /// Faces whose normal is a fallback.
    pub null_faces: Vec<bool>,
    /// Welded edge lengths.
    pub edge_lengths: Vec<f64>,
    lists: Vec<FaceList>,
    edge_list: Vec<Option<usize>>,
    /// Usable face count per edge; `0` drops the edge.
    pub edge_face_count: Vec<usize>,
    /// Edges per canonical vertex.
    pub vert_edges: Vec<Vec<usize>>,
    /// Running prediction of the output size.
    pub counts: ElementCounts,
}

impl Adjacency {
    /// Runs the complete adjacency stage: face lists, welding, removal of
    /// collapsed faces, folding of duplicate edges and duplicate-face removal.
    pub fn build(mesh: &Mesh, merge_tolerance: f64, do_shell: bool) -> Self {
        let mut adj = Self::from_mesh(mesh, do_shell);
        adj.weld(mesh, merge_tolerance, do_shell);
        adj.remove_collapsed_faces(mesh, do_shell);
        adj.link_vertex_edges(mesh, do_shell);
        adj.remove_duplicate_faces(mesh, do_shell);
        debug!(
            welded = adj.merge.len() - (0..adj.merge.len()).filter(|&v| adj.merge.is_canonical(v)).count(),
            edges = adj.edge_face_count.iter().filter(|&&c| c > 0).count(),
            "solidify adjacency built"
        );
        adj
    }

    fn from_mesh(mesh: &Mesh, do_shell: bool) -> Self {
        let mut counts = ElementCounts::default();
        let mut face_normals = Vec::with_capacity(mesh.polygon_count());
        let mut null_faces = vec![false; mesh.polygon_count()];
        for (i, poly) in mesh.polygons.iter().enumerate() {
            let mut n = mesh.polygon_normal(i);
            if n.norm_squared() < 0.5 {
                let edge = mesh.edges[mesh.corners[poly.loop_start].edge];
                let dir = mesh.positions[edge.verts[1]] - mesh.positions[edge.verts[0]];
                n = if dir.z.abs() < dir.y.abs() {
                    Vector3::z()
                } else {
                    Vector3::y()
                };
                null_faces[i] = true;
            }
            face_normals.push(n);
            if do_shell {
                counts.polys += 2;
                counts.loops += 2 * count(poly.loop_len);
            }
        }

        let mut lists: Vec<FaceList> = Vec::new();
        let mut edge_list = vec![None; mesh.edge_count()];
        let mut edge_face_count = vec![0; mesh.edge_count()];
        for (i, poly) in mesh.polygons.iter().enumerate() {
            for corner in &mesh.corners[poly.corners()] {
                let face = AdjacentFace {
                    polygon: i,
                    reversed: mesh.edges[corner.edge].verts[1] != corner.vert,
                };
                let list = *edge_list[corner.edge].get_or_insert_with(|| {
                    lists.push(FaceList {
                        faces: Vec::new(),
                        used: 1,
                    });
                    lists.len() - 1
                });
                lists[list].faces.push(face);
                edge_face_count[corner.edge] += 1;
            }
        }

        Self {
            merge: VertexMergeMap::new(mesh.vertex_count()),
            co: mesh.positions.clone(),
            face_normals,
            null_faces,
            edge_lengths: vec![0.0; mesh.edge_count()],
            lists,
            edge_list,
            edge_face_count,
            vert_edges: vec![Vec::new(); mesh.vertex_count()],
            counts,
        }
    }

    /// The face list of `edge`, if it still has one.
    pub fn faces(&self, edge: usize) -> Option<&[AdjacentFace]> {
        self.edge_list[edge].map(|l| self.lists[l].faces.as_slice())
    }

    /// Identifier of the face list of `edge`; equal ids mean a shared list.
    pub fn list_id(&self, edge: usize) -> Option<usize> {
        self.edge_list[edge]
    }

    /// Canonical endpoints of `edge`.
    pub fn welded(&self, mesh: &Mesh, edge: usize) -> [usize; 2] {
        let e = mesh.edges[edge].verts;
        [self.merge.canonical(e[0]), self.merge.canonical(e[1])]
    }

    /// Corner of `polygon` whose vertex welds into `vertex`.
    pub fn corner_of(&self, mesh: &Mesh, polygon: usize, vertex: usize) -> Option<usize> {
        mesh.polygons[polygon]
            .corners()
            .find(|&c| self.merge.canonical(mesh.corners[c].vert) == vertex)
    }

    fn drop_list(&mut self, edge: usize, do_shell: bool) {
        if do_shell {
            self.counts.loops -= 2 * count(self.edge_face_count[edge]);
        }
        self.edge_face_count[edge] = 0;
        self.edge_list[edge] = None;
    }

    /// Welds the endpoints of every edge shorter than `tolerance`, unless
    /// that would collapse more than two corner transitions of any face.
    fn weld(&mut self, mesh: &Mesh, tolerance: f64, do_shell: bool) {
        let tolerance_sq = tolerance * tolerance;
        let mut vert_faces: Vec<Vec<usize>> = vec![Vec::new(); mesh.vertex_count()];
        for (i, poly) in mesh.polygons.iter().enumerate() {
            for corner in &mesh.corners[poly.corners()] {
                vert_faces[corner.vert].push(i);
            }
        }

        for i in 0..mesh.edge_count() {
            if self.edge_face_count[i] == 0 {
                continue;
            }
            let [mut v1, mut v2] = self.welded(mesh, i);
            if v1 == v2 {
                continue;
            }
            if v2 < v1 {
                std::mem::swap(&mut v1, &mut v2);
            }
            let dir = self.co[v2] - self.co[v1];
            let len_sq = dir.norm_squared();
            if len_sq > tolerance_sq {
                self.edge_lengths[i] = len_sq.sqrt();
                continue;
            }
            if !self.can_merge(mesh, &vert_faces, v1, v2) {
                self.edge_lengths[i] = 0.0;
                continue;
            }
            self.edge_lengths[i] = len_sq;
            #[allow(clippy::cast_precision_loss)]
            let weight = (self.merge.absorbed(v2) + 1) as f64
                / (self.merge.absorbed(v1) + self.merge.absorbed(v2) + 2) as f64;
            self.co[v1] += dir * weight;
            self.merge.merge(v1, v2);
            self.drop_list(i, do_shell);
        }
    }

    /// Simulates welding `v1` and `v2` on every face touching either class.
    fn can_merge(&self, mesh: &Mesh, vert_faces: &[Vec<usize>], v1: usize, v2: usize) -> bool {
        let inside = |v: usize| {
            let c = self.merge.canonical(mesh.corners[v].vert);
            c == v1 || c == v2
        };
        self.merge
            .members(v1)
            .iter()
            .chain(self.merge.members(v2))
            .flat_map(|&m| &vert_faces[m])
            .all(|&face| {
                let range = mesh.polygons[face].corners();
                let mut changes = 0;
                let mut cur = range.end - 1;
                for next in range {
                    changes += usize::from(inside(cur) != inside(next));
                    if changes > 2 {
                        return false;
                    }
                    cur = next;
                }
                true
            })
    }

    /// Drops edges collapsed by welding.
    fn remove_collapsed_faces(&mut self, mesh: &Mesh, do_shell: bool) {
        let mut singular = vec![false; mesh.polygon_count()];
        let mut singular_faces = 0usize;
        for i in 0..mesh.edge_count() {
            let [v1, v2] = self.welded(mesh, i);
            let Some(list) = self.edge_list[i] else {
                continue;
            };
            if v1 != v2 {
                continue;
            }
            for face in &self.lists[list].faces {
                if singular[face.polygon] {
                    continue;
                }
                if mesh
                    .polygon_corners(face.polygon)
                    .iter()
                    .all(|c| self.merge.canonical(c.vert) == v1)
                {
                    singular[face.polygon] = true;
                    singular_faces += 1;
                    if do_shell {
                        self.counts.polys -= 2;
                    }
                }
            }
            self.drop_list(i, do_shell);
        }
        if singular_faces > 0 {
            debug!(faces = singular_faces, "faces collapsed to a point");
        }
    }

    /// Builds the edge lists per vertex, folding an edge into an earlier edge
    /// between the same welded vertices.
    fn link_vertex_edges(&mut self, mesh: &Mesh, do_shell: bool) {
        for i in 0..mesh.edge_count() {
            if self.edge_face_count[i] == 0 {
                continue;
            }
            let vs = self.welded(mesh, i);
            let mut duplicate: Option<(usize, bool)> = None;
            for j in 0..2 {
                let other = vs[1 - j];
                let found = self.vert_edges[vs[j]].iter().find_map(|&e| {
                    let [a, b] = self.welded(mesh, e);
                    if a == other {
                        Some((e, j == 0))
                    } else if b == other {
                        Some((e, j == 1))
                    } else {
                        None
                    }
                });
                if let Some(found) = found {
                    if j == 1 {
                        self.vert_edges[vs[0]].pop();
                    }
                    duplicate = Some(found);
                    break;
                }
                self.vert_edges[vs[j]].push(i);
            }
            if let Some((keeper, reversed)) = duplicate {
                self.fold_edge(i, keeper, reversed, do_shell);
            }
        }
    }

    /// Merges the face list of `invalid` into the list of `keeper`. Faces
    /// present in both are removed.
    fn fold_edge(&mut self, invalid: usize, keeper: usize, reversed: bool, do_shell: bool) {
        let (Some(keep_list), Some(drop_list)) = (self.edge_list[keeper], self.edge_list[invalid]) else {
            return;
        };
        if keep_list == drop_list {
            return;
        }
        let keep_faces = std::mem::take(&mut self.lists[keep_list].faces);
        let drop_faces = std::mem::take(&mut self.lists[drop_list].faces);
        let shared = keep_faces
            .iter()
            .filter(|f| drop_faces.iter().any(|d| d.polygon == f.polygon))
            .count();
        if do_shell {
            self.counts.polys -= 2 * count(shared);
            self.counts.loops -= 4 * count(shared);
        }
        let mut merged: Vec<AdjacentFace> = keep_faces
            .iter()
            .filter(|f| !drop_faces.iter().any(|d| d.polygon == f.polygon))
            .copied()
            .collect();
        merged.extend(
            drop_faces
                .iter()
                .filter(|d| !keep_faces.iter().any(|f| f.polygon == d.polygon))
                .map(|d| AdjacentFace {
                    polygon: d.polygon,
                    reversed: d.reversed != reversed,
                }),
        );
        self.edge_face_count[invalid] = 0;
        self.edge_face_count[keeper] = merged.len();
        self.lists[keep_list].faces = merged;
        self.lists[keep_list].used += self.lists[drop_list].used;
        self.edge_list[invalid] = Some(keep_list);
    }

    /// Removes one of every pair of polygons with the same welded vertex
    /// cycle, in either winding. Only polygons sharing an edge are compared.
    fn remove_duplicate_faces(&mut self, mesh: &Mesh, do_shell: bool) {
        let mut removed = 0usize;
        for i in 0..mesh.edge_count() {
            if self.edge_face_count[i] == 0 {
                continue;
            }
            let Some(list) = self.edge_list[i] else {
                continue;
            };
            let mut j = 0;
            while j < self.lists[list].faces.len() {
                let face_j = self.lists[list].faces[j];
                let duplicate = self.lists[list].faces[j + 1..]
                    .iter()
                    .any(|face_k| self.same_cycle(mesh, face_j, *face_k));
                if duplicate {
                    self.discard_face(mesh, face_j.polygon, do_shell);
                    removed += 1;
                    if self.lists[list]
                        .faces
                        .get(j)
                        .is_some_and(|f| f.polygon == face_j.polygon)
                    {
                        j += 1;
                    }
                } else {
                    j += 1;
                }
            }
        }
        if removed > 0 {
            debug!(faces = removed, "duplicate faces removed");
        }
    }

    fn same_cycle(&self, mesh: &Mesh, a: AdjacentFace, b: AdjacentFace) -> bool {
        let ca = mesh.polygon_corners(a.polygon);
        let cb = mesh.polygon_corners(b.polygon);
        let n = ca.len();
        if cb.len() != n {
            return false;
        }
        let first = self.merge.canonical(ca[0].vert);
        let Some(l) = cb.iter().position(|c| self.merge.canonical(c.vert) == first) else {
            return false;
        };
        let reversed = a.reversed != b.reversed;
        (0..n).all(|m| {
            let k = if reversed { (l + n - m) % n } else { (l + m) % n };
            self.merge.canonical(ca[m].vert) == self.merge.canonical(cb[k].vert)
        })
    }

    fn discard_face(&mut self, mesh: &Mesh, polygon: usize, do_shell: bool) {
        let mut del_loops = 0i64;
        for corner in mesh.polygon_corners(polygon) {
            let e = corner.edge;
            let Some(list) = self.edge_list[e] else {
                continue;
            };
            let faces = &mut self.lists[list].faces;
            let Some(pos) = faces.iter().position(|f| f.polygon == polygon) else {
                continue;
            };
            faces.remove(pos);
            if self.edge_face_count[e] > 0 {
                self.edge_face_count[e] -= 1;
                if self.edge_face_count[e] == 0 {
                    self.lists[list].used -= 1;
                    self.edge_list[e] = None;
                }
            } else if self.lists[list].used > 1 {
                if let Some(n) = (0..self.edge_list.len())
                    .find(|&n| self.edge_list[n] == Some(list) && self.edge_face_count[n] > 0)
                {
                    self.edge_face_count[n] -= 1;
                    if self.edge_face_count[n] == 0 {
                        self.lists[list].used -= 1;
                        self.edge_list[n] = None;
                    }
                }
            }
            del_loops += 1;
        }
        if do_shell {
            self.counts.polys -= 2;
            self.counts.loops -= 2 * del_loops;
        }
    }
}
