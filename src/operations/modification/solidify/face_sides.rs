use std::f64::consts::TAU;

use tracing::debug;

use crate::math::vector_3d::{normalize_or_zero, remove_component, signed_angle_on_axis};
use crate::math::{Vector3, SOLVER_EPSILON};
use crate::mesh::Mesh;

use super::adjacency::Adjacency;
use super::params::Resolved;
use super::store::{count, ElementCounts, FaceSide, FaceSideId, NewEdge, SolidifyStore};

/// Creates both sides of every polygon and the side-passes of every usable
/// edge, ordered by angle around the edge.
pub fn build_face_sides(
    mesh: &Mesh,
    adj: &Adjacency,
    resolved: &Resolved,
    store: &mut SolidifyStore,
    counts: &mut ElementCounts,
) {
    store.sides = mesh
        .polygons
        .iter()
        .enumerate()
        .flat_map(|(i, poly)| {
            [false, true].map(|reversed| FaceSide {
                polygon: i,
                reversed,
                links: vec![None; poly.loop_len],
            })
        })
        .collect();
    store.edge_lists = vec![Vec::new(); mesh.edge_count()];
    store.edge_owner = vec![None; mesh.edge_count()];

    let mut non_manifold = 0usize;
    for i in 0..mesh.edge_count() {
        if adj.edge_face_count[i] == 0 {
            continue;
        }
        let Some(faces) = adj.faces(i).filter(|f| !f.is_empty()) else {
            continue;
        };
        let edgedir = edge_direction(mesh, adj, i);
        let adj_len = faces.len();

        let mut sorted: Vec<(f64, FaceSideId)> = Vec::with_capacity(adj_len);
        let new_edges_len = if adj_len > 1 {
            if adj_len > 2 {
                non_manifold += 1;
            }
            let mut ref_nor = Vector3::zeros();
            for (j, face) in faces.iter().enumerate() {
                let mut nor = if face.reversed {
                    -adj.face_normals[face.polygon]
                } else {
                    adj.face_normals[face.polygon]
                };
                let mut d = 1.0;
                if mesh.polygons[face.polygon].loop_len > 3 {
                    d = remove_component(&mut nor, &edgedir);
                    d = if d == 0.0 { 1.0 } else { normalize_or_zero(&mut nor) };
                }
                let angle = if d == 0.0 {
                    0.0
                } else if j == 0 {
                    ref_nor = nor;
                    0.0
                } else {
                    -signed_angle_on_axis(&nor, &ref_nor, &edgedir)
                };
                sorted.push((angle, FaceSideId::new(face.polygon, face.reversed)));
            }
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
            adj_len
        } else {
            sorted.push((0.0, FaceSideId::new(faces[0].polygon, faces[0].reversed)));
            if resolved.do_rim {
                counts.loops += 2;
                counts.polys += 1;
            }
            2
        };

        let wanted = resolved.do_shell || (adj_len == 1 && resolved.do_rim);
        let list_id = adj.list_id(i);
        let mut list = Vec::with_capacity(new_edges_len);
        for j in 0..new_edges_len {
            let (faces, angle) = if adj_len > 1 {
                let next = (j + 1) % adj_len;
                let mut angle = sorted[next].0 - sorted[j].0;
                if angle < 0.0 {
                    angle += TAU;
                }
                ([Some(sorted[j].1), Some(sorted[next].1.opposite())], angle)
            } else {
                let side = if j == 0 { sorted[0].1 } else { sorted[0].1.opposite() };
                ([Some(side), None], 0.0)
            };
            let id = store.new_edges.insert(NewEdge {
                old_edge: i,
                faces,
                groups: [None, None],
                angle,
                wanted,
                output: None,
            });
            list.push(id);
            for side in faces.into_iter().flatten() {
                let polygon = side.polygon();
                let side = &mut store.sides[side.index()];
                for (l, corner) in mesh.polygon_corners(polygon).iter().enumerate() {
                    if adj.list_id(corner.edge) == list_id {
                        if corner.edge != i && store.edge_owner[corner.edge].is_none() {
                            store.edge_owner[corner.edge] = Some(i);
                        }
                        side.links[l] = Some(id);
                        break;
                    }
                }
            }
        }
        store.edge_lists[i] = list;
        store.edge_owner[i] = Some(i);
        if wanted {
            counts.edges += count(new_edges_len);
        }
    }
    debug!(
        side_passes = store.new_edges.len(),
        non_manifold_edges = non_manifold,
        "face sides linked"
    );
}

/// Unit direction from the first to the second welded endpoint of `edge`.
///
/// Collapsed edges borrow the direction from their neighbouring edges.
fn edge_direction(mesh: &Mesh, adj: &Adjacency, edge: usize) -> Vector3 {
    let [v1, v2] = adj.welded(mesh, edge);
    let len = adj.edge_lengths[edge];
    if len > SOLVER_EPSILON {
        return (adj.co[v2] - adj.co[v1]) / len;
    }
    let pos = adj.co[v2];
    let around = |v: usize| -> Vector3 {
        adj.vert_edges[v]
            .iter()
            .filter(|&&e| adj.edge_face_count[e] > 0 && e != edge)
            .map(|&e| {
                let verts = mesh.edges[e].verts;
                let other = if adj.merge.canonical(verts[0]) == v {
                    verts[1]
                } else {
                    verts[0]
                };
                adj.co[adj.merge.canonical(other)] - pos
            })
            .sum()
    };
    let mut dir = around(v2) - around(v1);
    if normalize_or_zero(&mut dir) == 0.0 {
        dir = Vector3::z();
    }
    dir
}
