use std::f64::consts::FRAC_PI_2;

use tracing::trace;

use crate::math::vector_3d::{corner_angle, normalize_or_zero};
use crate::math::{Matrix3, Vector3, SOLVER_EPSILON};
use crate::mesh::{Mesh, VertexGroups, VertexWeights};

use super::adjacency::Adjacency;
use super::params::{BoundaryMode, OffsetMode, Resolved, SolidifyParams};
use super::store::{EdgeGroup, FaceSideId, SolidifyStore};

/// Dot product above which a third constraint may be relaxed for the
/// boundary fix.
const BOUNDARY_FIX_THRESHOLD: f64 = 0.7;

/// Per-vertex thickness scaling from the configured vertex group.
#[derive(Debug, Clone, Copy)]
pub struct Thinning<'a> {
    group: Option<(&'a VertexGroups, usize)>,
    invert: bool,
    factor: f64,
}

impl<'a> Thinning<'a> {
    pub fn new(mesh: &'a Mesh, params: &SolidifyParams) -> Self {
        let group = params.vertex_group.as_deref().and_then(|name| {
            let groups = mesh.vertex_groups.as_ref()?;
            Some((groups, groups.group_index(name)?))
        });
        Self {
            group,
            invert: params.invert_vertex_group,
            factor: params.vertex_group_factor,
        }
    }

    pub fn is_active(&self) -> bool {
        self.group.is_some()
    }

    fn weight(&self, vertex: usize) -> f64 {
        let Some((groups, index)) = self.group else {
            return 1.0;
        };
        let w = groups.weight(vertex, index);
        if self.invert {
            1.0 - w
        } else {
            w
        }
    }

    fn scale(&self, weight: f64) -> f64 {
        self.factor + weight * (1.0 - self.factor)
    }

    /// Scalar applied to the offset of `vertex`.
    pub fn vertex_scalar(&self, vertex: usize) -> f64 {
        if self.group.is_some() {
            self.scale(self.weight(vertex))
        } else {
            1.0
        }
    }

    /// Per-polygon scalar from the thinnest corner of each polygon.
    pub fn face_weights(&self, mesh: &Mesh) -> Vec<f64> {
        (0..mesh.polygon_count())
            .map(|p| {
                let w = mesh
                    .polygon_corners(p)
                    .iter()
                    .map(|c| self.weight(c.vert))
                    .fold(1.0, f64::min);
                self.scale(w)
            })
            .collect()
    }
}

/// Computes the offset position of every fan.
pub fn place_fans(
    mesh: &Mesh,
    adj: &Adjacency,
    params: &SolidifyParams,
    resolved: &Resolved,
    store: &mut SolidifyStore,
) {
    let thinning = Thinning::new(mesh, params);
    let face_weights =
        (params.flat_faces && thinning.is_active()).then(|| thinning.face_weights(mesh));
    let solver = FanSolver {
        mesh,
        adj,
        params,
        resolved,
        thinning,
        face_weights: face_weights.as_deref(),
    };

    for i in 0..store.vertex_groups.len() {
        for k in 0..store.vertex_groups[i].len() {
            let gid = store.vertex_groups[i][k];
            let g = &store.groups[gid];
            let (co, no) = if g.is_singularity {
                (adj.co[i], Vector3::zeros())
            } else {
                let no = solver.offset(store, g, i);
                (adj.co[i] + no, no)
            };
            trace!(vertex = i, x = co.x, y = co.y, z = co.z, "fan placed");
            let g = &mut store.groups[gid];
            g.co = co;
            g.no = no;
        }
    }
}

struct FanSolver<'a> {
    mesh: &'a Mesh,
    adj: &'a Adjacency,
    params: &'a SolidifyParams,
    resolved: &'a Resolved,
    thinning: Thinning<'a>,
    face_weights: Option<&'a [f64]>,
}

/// Offset direction found by a solver, plus what the boundary fix may use.
struct Solution {
    nor: Vector3,
    move_nor: Vector3,
    disable_boundary_fix: bool,
    approximate_free_direction: bool,
}

impl FanSolver<'_> {
    /// Offset vector of fan `g` of vertex `i`, scaled and clamped.
    fn offset(&self, store: &SolidifyStore, g: &EdgeGroup, i: usize) -> Vector3 {
        let disable_boundary_fix = self.params.boundary_mode == BoundaryMode::None
            || g.is_orig_closed
            || g.split != 0;
        let sides = self.contributing_sides(store, g);
        let mut sol = match self.params.offset_mode {
            OffsetMode::Constraints => self.constraints(&sides, g, disable_boundary_fix),
            OffsetMode::Fixed | OffsetMode::Even => self.averaged(&sides, g, i, disable_boundary_fix),
        };

        if sol.approximate_free_direction {
            self.approximate_free_direction(store, g, i, &mut sol);
        }
        if !sol.disable_boundary_fix {
            self.fix_boundary(store, g, i, &mut sol);
        }

        let mut scalar = if self.face_weights.is_some() {
            1.0
        } else {
            self.thinning.vertex_scalar(i)
        };
        if !self.resolved.do_clamp {
            return sol.nor * scalar;
        }
        let min_length = self.min_edge_length(store, g);
        scalar *= self.clamp_scalar(g, store, min_length);
        let mut nor = sol.nor * scalar;
        if let Some(limit) = self.clamp_limit(store, g, min_length) {
            let len = nor.norm();
            if len > limit {
                nor *= limit / len;
            }
        }
        nor
    }

    /// Face sides seen by the fan, skipping every other pass of a cycle
    /// since consecutive passes share a side.
    fn contributing_sides(&self, store: &SolidifyStore, g: &EdgeGroup) -> Vec<FaceSideId> {
        let len = g.edges.len();
        let cycle = (g.is_orig_closed && g.split == 0) || g.is_even_split;
        let mut first_edge: Option<[Option<FaceSideId>; 2]> = None;
        let mut sides = Vec::with_capacity(len + 1);
        for (k, &e) in g.edges.iter().enumerate() {
            if k & 1 == 1 && (cycle || k != len - 1) {
                continue;
            }
            let faces = store.new_edges[e].faces;
            for face in faces.into_iter().flatten() {
                if first_edge.map_or(true, |fe| fe[0] != Some(face) && fe[1] != Some(face)) {
                    sides.push(face);
                }
            }
            if (cycle && k == 0) || (!cycle && k + 3 >= len) {
                first_edge = Some(faces);
            }
        }
        sides
    }

    fn face_weight(&self, side: FaceSideId) -> f64 {
        self.face_weights.map_or(1.0, |w| w[side.polygon()])
    }

    /// Intersects the offset planes of the surrounding faces.
    fn constraints(&self, sides: &[FaceSideId], g: &EdgeGroup, disable: bool) -> Solution {
        let mut sol = Solution {
            nor: Vector3::zeros(),
            move_nor: Vector3::zeros(),
            disable_boundary_fix: disable,
            approximate_free_direction: false,
        };
        let mut planes: Vec<(Vector3, f64)> = Vec::with_capacity(sides.len());
        let mut fallback = (Vector3::zeros(), 0.0);
        for &side in sides {
            let ofs = self.face_weight(side)
                * if side.reversed() {
                    self.resolved.ofs_back_clamped
                } else {
                    self.resolved.ofs_front_clamped
                };
            let n = self.adj.face_normals[side.polygon()];
            let n = if side.reversed() { -n } else { n };
            if self.adj.null_faces[side.polygon()] {
                fallback = (n, ofs);
            } else {
                planes.push((n, ofs));
            }
        }

        if planes.len() > 2 {
            order_most_different(&mut planes);
        }
        merge_parallel_planes(&mut planes);

        match planes.len() {
            0 => {
                sol.nor = fallback.0 * fallback.1;
                sol.disable_boundary_fix = true;
            }
            1 => {
                sol.nor = planes[0].0 * planes[0].1;
                if g.edges.len() > 2 {
                    sol.disable_boundary_fix = true;
                    sol.approximate_free_direction = true;
                }
            }
            2 | 3 => {
                let (n0, o0) = planes[0];
                let (n1, o1) = planes[1];
                let q = n0.dot(&n1);
                let d = 1.0 - q * q;
                let mut move_nor = n0.cross(&n1);
                normalize_or_zero(&mut move_nor);
                let (a, b) = if d > SOLVER_EPSILON * 10.0 && q < self.resolved.stop_explosion {
                    ((o0 - o1 * q) / d, (o1 - o0 * q) / d)
                } else {
                    let d = 1.0 / (q.abs() + 1.0);
                    (o0 * d, o1 * d)
                };
                let mut nor = n0 * a + n1 * b;
                if let Some(&(n2, o2)) = planes.get(2) {
                    let d = n2.dot(&move_nor);
                    if d.abs() > 0.02 {
                        let tmp = nor - n2 * o2;
                        nor -= move_nor * (n2.dot(&tmp) / d);
                        if d.abs() > 1.0 - BOUNDARY_FIX_THRESHOLD {
                            sol.disable_boundary_fix = true;
                        }
                    }
                }
                sol.nor = nor;
                sol.move_nor = move_nor;
            }
            _ => {
                let mut m = Matrix3::identity() * 5e-5;
                let mut rhs = Vector3::zeros();
                for (n, o) in &planes {
                    m += n * n.transpose();
                    rhs += n * *o;
                }
                sol.nor = m.try_inverse().map_or_else(Vector3::zeros, |inv| inv * rhs);
                if !sol.disable_boundary_fix {
                    let greatest_angle_cos = planes[..2]
                        .iter()
                        .flat_map(|(a, _)| planes[2..].iter().map(move |(b, _)| a.dot(b)))
                        .fold(1.0, f64::min);
                    if greatest_angle_cos > BOUNDARY_FIX_THRESHOLD {
                        sol.approximate_free_direction = true;
                    } else {
                        sol.disable_boundary_fix = true;
                    }
                }
            }
        }
        sol
    }

    /// Averages the face normals, weighted by corner angle in even mode.
    fn averaged(&self, sides: &[FaceSideId], g: &EdgeGroup, i: usize, disable: bool) -> Solution {
        let even = self.params.offset_mode == OffsetMode::Even;
        let mut total_angle = 0.0;
        let mut total_angle_back = 0.0;
        let mut nor = Vector3::zeros();
        let mut nor_back = Vector3::zeros();
        let mut has_front = false;
        let mut has_back = false;

        for &side in sides {
            let ofs = self.face_weight(side)
                * if side.reversed() {
                    -self.resolved.ofs_back_clamped
                } else {
                    self.resolved.ofs_front_clamped
                };
            let angle = if even {
                let angle = self.corner_angle_at(side.polygon(), i);
                if side.reversed() {
                    total_angle_back += angle * ofs * ofs;
                } else {
                    total_angle += angle * ofs * ofs;
                }
                angle
            } else {
                if side.reversed() {
                    total_angle_back += 1.0;
                } else {
                    total_angle += 1.0;
                }
                1.0
            };
            let face_nor = self.adj.face_normals[side.polygon()] * (angle * ofs);
            if side.reversed() {
                nor_back += face_nor;
                has_back = true;
            } else {
                nor += face_nor;
                has_front = true;
            }
        }

        if even {
            if has_front {
                let len_sq = nor.norm_squared();
                if len_sq > SOLVER_EPSILON {
                    nor *= total_angle / len_sq;
                }
            }
            if has_back {
                let len_sq = nor_back.norm_squared();
                if len_sq > SOLVER_EPSILON {
                    nor_back *= total_angle_back / len_sq;
                }
                if !has_front {
                    nor = nor_back;
                }
            }
            if has_front && has_back {
                let nor_len = nor.norm();
                let back_len = nor_back.norm();
                let mut q = nor.dot(&nor_back);
                if q.abs() > SOLVER_EPSILON {
                    q /= nor_len * back_len;
                }
                let d = 1.0 - q * q;
                if d > SOLVER_EPSILON {
                    if nor_len > SOLVER_EPSILON {
                        nor *= (1.0 - back_len * q / nor_len) / d;
                    }
                    if back_len > SOLVER_EPSILON {
                        nor_back *= (1.0 - nor_len * q / back_len) / d;
                    }
                    nor += nor_back;
                } else {
                    nor = (nor + nor_back) * 0.5;
                }
            }
        } else {
            if has_front && total_angle > SOLVER_EPSILON {
                nor /= total_angle;
            }
            if has_back && total_angle_back > SOLVER_EPSILON {
                nor += nor_back / total_angle_back;
                if has_front && total_angle > SOLVER_EPSILON {
                    nor *= 0.5;
                }
            }
        }

        let use_fix = !disable && g.edges.len() > 2;
        Solution {
            nor,
            move_nor: Vector3::zeros(),
            disable_boundary_fix: !use_fix,
            approximate_free_direction: use_fix,
        }
    }

    fn corner_angle_at(&self, polygon: usize, i: usize) -> f64 {
        let range = self.mesh.polygons[polygon].corners();
        let Some(corner) = self.adj.corner_of(self.mesh, polygon, i) else {
            return 0.0;
        };
        let len = range.len();
        let offset = corner - range.start;
        let vert = |o: usize| {
            let v = self.mesh.corners[range.start + o % len].vert;
            self.adj.co[self.adj.merge.canonical(v)]
        };
        corner_angle(&vert(offset + len - 1), &self.adj.co[i], &vert(offset + 1))
    }

    /// Direction of an original endpoint of `edge` away from `i`.
    fn edge_vector(&self, edge: usize, i: usize) -> Vector3 {
        let [a, b] = self.mesh.edges[edge].verts;
        let other = if self.adj.merge.canonical(a) == i { b } else { a };
        self.adj.co[self.adj.merge.canonical(other)] - self.adj.co[i]
    }

    /// Uses the inner edges of an open fan as the free move direction.
    fn approximate_free_direction(&self, store: &SolidifyStore, g: &EdgeGroup, i: usize, sol: &mut Solution) {
        let len = g.edges.len();
        if len <= 2 {
            sol.disable_boundary_fix = true;
            return;
        }
        for &e in &g.edges[1..len - 1] {
            sol.move_nor += self.edge_vector(store.new_edges[e].old_edge, i);
        }
        sol.disable_boundary_fix = normalize_or_zero(&mut sol.move_nor) == 0.0;
    }

    /// Slides the offset along the free direction until it lies on the
    /// boundary constraint plane.
    fn fix_boundary(&self, store: &SolidifyStore, g: &EdgeGroup, i: usize, sol: &mut Solution) {
        let (Some(&first), Some(&last)) = (g.edges.first(), g.edges.last()) else {
            return;
        };
        let first = &store.new_edges[first];
        let last = &store.new_edges[last];
        let e0 = self.edge_vector(first.old_edge, i);
        let e1 = self.edge_vector(last.old_edge, i);
        let mut constr_nor = if self.params.boundary_mode == BoundaryMode::Flat {
            e0.cross(&e1)
        } else {
            let side_normal = |side: Option<FaceSideId>| {
                side.map_or_else(Vector3::zeros, |s| {
                    let n = self.adj.face_normals[s.polygon()];
                    if s.reversed() {
                        -n
                    } else {
                        n
                    }
                })
            };
            let mut n0 = e0.cross(&side_normal(first.faces[0]));
            let mut n1 = side_normal(last.faces[0]).cross(&e1);
            normalize_or_zero(&mut n0);
            normalize_or_zero(&mut n1);
            n0 + n1
        };
        normalize_or_zero(&mut constr_nor);
        let d = constr_nor.dot(&sol.move_nor);
        if d.abs() > 0.1 {
            sol.nor -= sol.move_nor * (constr_nor.dot(&sol.nor) / d);
        }
    }

    fn min_edge_length(&self, store: &SolidifyStore, g: &EdgeGroup) -> f64 {
        g.edges
            .iter()
            .map(|&e| self.adj.edge_lengths[store.new_edges[e].old_edge])
            .fold(f64::INFINITY, f64::min)
    }

    /// Largest dihedral angle around the fan, at least a right angle.
    fn max_angle(store: &SolidifyStore, g: &EdgeGroup) -> f64 {
        g.edges
            .iter()
            .map(|&e| store.new_edges[e].angle)
            .fold(FRAC_PI_2, f64::max)
    }

    /// Scalar shrinking thick offsets on short edges, relative to the
    /// clamped thickness.
    fn clamp_scalar(&self, g: &EdgeGroup, store: &SolidifyStore, min_length: f64) -> f64 {
        let offset = self.resolved.clamp_length;
        if self.params.angle_clamp {
            if g.edges.len() <= 2 {
                return 1.0;
            }
            let cos_ang = (Self::max_angle(store, g) * 0.5).cos();
            if cos_ang > 0.0 {
                let max_off = min_length * 0.5 / cos_ang;
                if max_off < offset * 0.5 {
                    return max_off / offset * 2.0;
                }
            }
            1.0
        } else if min_length < offset {
            min_length / offset
        } else {
            1.0
        }
    }

    /// Hard bound on the offset length: `clamp` times half the shortest
    /// edge of the fan, or the angle-derived distance in angle mode.
    fn clamp_limit(&self, store: &SolidifyStore, g: &EdgeGroup, min_length: f64) -> Option<f64> {
        let clamp = self.params.clamp;
        if !self.params.angle_clamp {
            return Some(clamp * min_length * 0.5);
        }
        if g.edges.len() <= 2 {
            return None;
        }
        let cos_ang = (Self::max_angle(store, g) * 0.5).cos();
        (cos_ang > 0.0).then(|| clamp * min_length * 0.5 / cos_ang)
    }
}

/// Moves the two most opposed planes to the front, followed by the plane
/// least aligned with either of them.
fn order_most_different(planes: &mut [(Vector3, f64)]) {
    let mut min_p = 2.0;
    let (mut min_n0, mut min_n1) = (0, 0);
    for k in 0..planes.len() {
        for m in k + 1..planes.len() {
            let p = planes[k].0.dot(&planes[m].0);
            if p < min_p {
                min_p = p;
                min_n0 = k;
                min_n1 = m;
            }
        }
    }
    if min_n1 != 0 {
        planes.swap(min_n0, 0);
        planes.swap(min_n1, 1);
    } else {
        planes.swap(min_n0, 1);
    }

    let mut min_p = 1.0;
    let mut third = 2;
    for k in 2..planes.len() {
        let max_p = planes[0].0.dot(&planes[k].0).max(planes[1].0.dot(&planes[k].0));
        if max_p <= min_p {
            min_p = max_p;
            third = k;
        }
    }
    planes.swap(third, 2);
}

/// Averages nearly parallel planes until at most two remain or every pair
/// differs by more than the merge threshold.
fn merge_parallel_planes(planes: &mut Vec<(Vector3, f64)>) {
    while planes.len() > 2 {
        let (mut best_n0, mut best_n1) = (0, 0);
        let mut best_p = -1.0;
        let mut best_ofs_diff = 0.0;
        for k in 0..planes.len() {
            for m in k + 1..planes.len() {
                let p = planes[m].0.dot(&planes[k].0);
                let ofs_diff = (planes[m].1 - planes[k].1).abs();
                if p > best_p + SOLVER_EPSILON || (p >= best_p && ofs_diff < best_ofs_diff) {
                    best_p = p;
                    best_ofs_diff = ofs_diff;
                    best_n0 = k;
                    best_n1 = m;
                }
            }
        }
        if best_p < 0.98 {
            break;
        }
        let (n1, o1) = planes.remove(best_n1);
        let (n0, o0) = &mut planes[best_n0];
        *n0 += n1;
        normalize_or_zero(n0);
        *o0 = (*o0 + o1) * 0.5;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn plane(x: f64, y: f64, z: f64, ofs: f64) -> (Vector3, f64) {
        (Vector3::new(x, y, z).normalize(), ofs)
    }

    #[test]
    fn most_opposed_planes_come_first() {
        let mut planes = vec![
            plane(0.0, 0.0, 1.0, 0.1),
            plane(0.0, 0.1, 1.0, 0.1),
            plane(0.0, 0.0, -1.0, 0.1),
            plane(1.0, 0.0, 0.0, 0.1),
        ];
        order_most_different(&mut planes);
        assert!(planes[0].0.dot(&planes[1].0) < -0.99);
        assert!((planes[2].0.x - 1.0).abs() < 1e-12);
    }

    #[test]
    fn parallel_planes_are_averaged() {
        let mut planes = vec![
            plane(0.0, 0.0, 1.0, 0.1),
            plane(0.0, 0.01, 1.0, 0.3),
            plane(1.0, 0.0, 0.0, 0.1),
        ];
        merge_parallel_planes(&mut planes);
        assert_eq!(planes.len(), 2);
        assert!((planes[0].1 - 0.2).abs() < 1e-12);
        assert!((planes[0].0.norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn distinct_planes_are_kept() {
        let mut planes = vec![
            plane(0.0, 0.0, 1.0, 0.1),
            plane(0.0, 1.0, 0.0, 0.1),
            plane(1.0, 0.0, 0.0, 0.1),
        ];
        merge_parallel_planes(&mut planes);
        assert_eq!(planes.len(), 3);
    }
}
