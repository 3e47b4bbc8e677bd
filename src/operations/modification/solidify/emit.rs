use std::f64::consts::PI;

use hashbrown::HashMap;
use tracing::{debug, warn};

use crate::math::{Point3, SOLVER_EPSILON};
use crate::mesh::{Corner, Edge, Mesh, Polygon, VertexGroups, VertexWeights};

use super::adjacency::Adjacency;
use super::output::{PolygonKind, Provenance, SolidifyOutput, SolidifyWarning, SourceMap};
use super::params::{Resolved, SolidifyParams};
use super::store::{count, EdgeGroupId, ElementCounts, NewEdgeId, SolidifyStore};

/// Growing output arrays plus their attribute layers.
struct Builder {
    positions: Vec<Point3>,
    edges: Vec<Edge>,
    edge_crease: Option<Vec<f64>>,
    edge_bevel: Option<Vec<f64>>,
    polygons: Vec<Polygon>,
    corners: Vec<Corner>,
    sources: SourceMap,
    shell_verts: Vec<usize>,
    rim_verts: Vec<usize>,
    /// Boundary edge closing each open fan.
    open_face_edges: HashMap<EdgeGroupId, usize>,
    warnings: Vec<SolidifyWarning>,
}

impl Builder {
    fn warn(&mut self, warning: SolidifyWarning) {
        warn!(%warning, "solidify");
        self.warnings.push(warning);
    }

    /// Writes edge `index`, growing the arrays when it lies past the end.
    fn set_edge(&mut self, index: usize, edge: Edge, source: Provenance) {
        if index >= self.edges.len() {
            self.edges.resize(index + 1, Edge::new(0, 0));
            self.sources.edges.resize(index + 1, source);
            for layer in [&mut self.edge_crease, &mut self.edge_bevel].into_iter().flatten() {
                layer.resize(index + 1, 0.0);
            }
        }
        self.edges[index] = edge;
        self.sources.edges[index] = source;
    }

    fn set_crease(&mut self, index: usize, value: f64) {
        if let Some(layer) = self.edge_crease.as_mut() {
            layer[index] = value;
        }
    }

    fn set_bevel(&mut self, index: usize, value: f64) {
        if let Some(layer) = self.edge_bevel.as_mut() {
            layer[index] = value;
        }
    }

    fn bevel(&self, index: usize) -> f64 {
        self.edge_bevel.as_ref().map_or(0.0, |l| l[index])
    }

    fn begin_polygon(&mut self, template: &Polygon, index: usize, material: i32, kind: PolygonKind) {
        self.polygons.push(Polygon {
            loop_start: self.corners.len(),
            loop_len: 0,
            material_index: material,
            flags: template.flags,
        });
        self.sources.polygons.push(Provenance::Template(index));
        self.sources.polygon_kinds.push(kind);
    }

    fn push_corner(&mut self, vert: usize, edge: usize, source: usize) {
        self.corners.push(Corner::new(vert, edge));
        self.sources.corners.push(source);
        if let Some(poly) = self.polygons.last_mut() {
            poly.loop_len += 1;
        }
    }

    /// Makes every loop consistent after emission on ambiguous topology.
    ///
    /// Repeated consecutive vertices are dropped, corners whose edge does not
    /// join them to the next corner are pointed at the right edge (created
    /// when missing), and polygons left with fewer than 3 corners are
    /// removed. Returns the number of corners changed and polygons removed.
    fn repair_loops(&mut self) -> (usize, usize) {
        let vert_count = self.positions.len();
        let key = |a: usize, b: usize| if a < b { (a, b) } else { (b, a) };
        let mut lookup: HashMap<(usize, usize), usize> = HashMap::with_capacity(self.edges.len());
        for (index, edge) in self.edges.iter().enumerate() {
            lookup.entry(key(edge.verts[0], edge.verts[1])).or_insert(index);
        }

        let polygons = std::mem::take(&mut self.polygons);
        let corners = std::mem::take(&mut self.corners);
        let corner_sources = std::mem::take(&mut self.sources.corners);
        let polygon_sources = std::mem::take(&mut self.sources.polygons);
        let kinds = std::mem::take(&mut self.sources.polygon_kinds);
        let mut fixed = 0usize;
        let mut removed = 0usize;

        for ((mut poly, source), kind) in polygons.into_iter().zip(polygon_sources).zip(kinds) {
            let run = poly.corners();
            let len = run.len();
            let kept: Vec<usize> = run
                .clone()
                .filter(|&c| {
                    let next = run.start + (c - run.start + 1) % len;
                    corners[c].vert != corners[next].vert
                })
                .collect();
            fixed += len - kept.len();
            if kept.len() < 3 || kept.iter().any(|&c| corners[c].vert >= vert_count) {
                removed += 1;
                continue;
            }

            poly.loop_start = self.corners.len();
            poly.loop_len = kept.len();
            for (k, &c) in kept.iter().enumerate() {
                let vert = corners[c].vert;
                let next = corners[kept[(k + 1) % kept.len()]].vert;
                let mut edge = corners[c].edge;
                let joined = self
                    .edges
                    .get(edge)
                    .is_some_and(|e| e.same_endpoints(&Edge::new(vert, next)));
                if !joined {
                    fixed += 1;
                    edge = match lookup.get(&key(vert, next)) {
                        Some(&existing) => existing,
                        None => {
                            let index = self.edges.len();
                            let template = self.sources.edges.get(edge).map_or(0, |p| p.index());
                            self.set_edge(index, Edge::new(vert, next), Provenance::Template(template));
                            lookup.insert(key(vert, next), index);
                            index
                        }
                    };
                }
                self.corners.push(Corner::new(vert, edge));
                self.sources.corners.push(corner_sources.get(c).copied().unwrap_or(0));
            }
            self.polygons.push(poly);
            self.sources.polygons.push(source);
            self.sources.polygon_kinds.push(kind);
        }
        if vert_count == 0 {
            self.edges.clear();
            self.sources.edges.clear();
            for layer in [&mut self.edge_crease, &mut self.edge_bevel].into_iter().flatten() {
                layer.clear();
            }
        }
        (fixed, removed)
    }
}

/// Shared read-only state of the emission passes.
struct Emitter<'a> {
    mesh: &'a Mesh,
    adj: &'a Adjacency,
    resolved: &'a Resolved,
    params: &'a SolidifyParams,
    store: &'a SolidifyStore,
}

/// Writes the output mesh from the placed fans.
pub fn emit(
    mesh: &Mesh,
    adj: &Adjacency,
    params: &SolidifyParams,
    resolved: &Resolved,
    store: &mut SolidifyStore,
    mut counts: ElementCounts,
    has_singularities: bool,
) -> SolidifyOutput {
    let singular_pairs = if has_singularities {
        dedup_singular_edges(mesh, adj, resolved, store, &mut counts)
    } else {
        Vec::new()
    };

    let with_edge_crease = mesh.vertex_crease.is_some() || mesh.edge_crease.is_some();
    let with_edge_bevel = mesh.edge_bevel_weight.is_some()
        || params.bevel_convex != 0.0
        || mesh.vertex_bevel_weight.is_some();
    let mut out = Builder {
        positions: Vec::new(),
        edges: Vec::new(),
        edge_crease: with_edge_crease.then(Vec::new),
        edge_bevel: with_edge_bevel.then(Vec::new),
        polygons: Vec::new(),
        corners: Vec::new(),
        sources: SourceMap::default(),
        shell_verts: Vec::new(),
        rim_verts: Vec::new(),
        open_face_edges: HashMap::new(),
        warnings: Vec::new(),
    };

    let outputs = collect_outputs(mesh, adj, resolved, store, &singular_pairs);
    for &(id, output) in &outputs {
        store.new_edges[id].output = Some(output);
    }
    write_vertices(store, &mut out);

    let em = Emitter {
        mesh,
        adj,
        resolved,
        params,
        store,
    };
    em.write_pass_edges(&singular_pairs, &outputs, &mut out);
    em.write_boundaries(&mut out);
    if resolved.do_rim {
        em.write_rims(&mut out);
    }
    if resolved.do_shell {
        em.write_shells(&mut out);
    }

    for (element, predicted, written) in [
        ("vertices", counts.verts, count(out.positions.len())),
        ("edges", counts.edges, count(out.edges.len())),
        ("faces", counts.polys, count(out.polygons.len())),
        ("loops", counts.loops, count(out.corners.len())),
    ] {
        if predicted != written {
            out.warn(SolidifyWarning::SizeMismatch {
                element,
                predicted,
                written,
            });
        }
    }
    let (corners, polygons) = out.repair_loops();
    if corners > 0 || polygons > 0 {
        out.warn(SolidifyWarning::RepairedLoops { corners, polygons });
    }
    if !out.positions.is_empty() && out.polygons.is_empty() {
        out.warn(SolidifyWarning::FacesNeeded);
    }

    em.finish(out)
}

/// Output vertices of an edge between two singular fans. Slot `j` of the
/// output edges belongs to pair `j`.
type SingularPair = [Option<usize>; 2];

/// Keeps one output edge per pair of singular output vertices and corrects
/// the predicted sizes for the duplicates.
fn dedup_singular_edges(
    mesh: &Mesh,
    adj: &Adjacency,
    resolved: &Resolved,
    store: &SolidifyStore,
    counts: &mut ElementCounts,
) -> Vec<SingularPair> {
    let mut pairs: Vec<SingularPair> = Vec::new();
    for i in 0..mesh.edge_count() {
        if !(resolved.do_shell || adj.edge_face_count[i] == 1) {
            continue;
        }
        let Some(list) = store.owned_list(i) else {
            continue;
        };
        for &e in list {
            if !store.is_singular(e) {
                continue;
            }
            let [v1, v2] = store.end_verts(e);
            if find_pair(&pairs, v1, v2).is_some() {
                counts.edges -= 1;
            } else {
                pairs.push([v1, v2]);
                if adj.edge_face_count[i] == 1 && resolved.do_rim {
                    counts.loops -= 2;
                    counts.polys -= 1;
                }
            }
        }
    }
    debug!(singular_edges = pairs.len(), "singular edges merged");
    pairs
}

fn find_pair(pairs: &[SingularPair], v1: Option<usize>, v2: Option<usize>) -> Option<usize> {
    pairs
        .iter()
        .position(|p| (p[0] == v1 && p[1] == v2) || (p[0] == v2 && p[1] == v1))
}

fn write_vertices(store: &SolidifyStore, out: &mut Builder) {
    for (i, groups) in store.vertex_groups.iter().enumerate() {
        for &gid in groups {
            let g = &store.groups[gid];
            let Some(v) = g.new_vert else {
                continue;
            };
            if v >= out.positions.len() {
                out.positions.resize(v + 1, Point3::origin());
                out.sources.vertices.resize(v + 1, i);
            }
            out.positions[v] = g.co;
            out.sources.vertices[v] = i;
        }
    }
}

/// Assigns the output edge index of every wanted pass, in the same order
/// [`Emitter::write_pass_edges`] writes them.
fn collect_outputs(
    mesh: &Mesh,
    adj: &Adjacency,
    resolved: &Resolved,
    store: &SolidifyStore,
    singular_pairs: &[SingularPair],
) -> Vec<(NewEdgeId, usize)> {
    let mut outputs = Vec::new();
    let mut edge_index = singular_pairs.len();
    for_each_wanted_pass(mesh, adj, resolved, store, |e| {
        let insert = if store.is_singular(e) {
            let [v1, v2] = store.end_verts(e);
            find_pair(singular_pairs, v1, v2)
        } else {
            None
        };
        let insert = insert.unwrap_or_else(|| {
            edge_index += 1;
            edge_index - 1
        });
        outputs.push((e, insert));
    });
    outputs
}

fn for_each_wanted_pass(
    mesh: &Mesh,
    adj: &Adjacency,
    resolved: &Resolved,
    store: &SolidifyStore,
    mut f: impl FnMut(NewEdgeId),
) {
    for i in 0..mesh.edge_count() {
        if !(resolved.do_shell || adj.edge_face_count[i] == 1) {
            continue;
        }
        let Some(list) = store.owned_list(i) else {
            continue;
        };
        for &e in list {
            if store.new_edges[e].wanted {
                f(e);
            }
        }
    }
}

impl Emitter<'_> {
    fn input_crease(&self, edge: usize) -> f64 {
        self.mesh.edge_crease.as_ref().map_or(0.0, |l| l[edge])
    }

    fn input_bevel(&self, edge: usize) -> f64 {
        self.mesh.edge_bevel_weight.as_ref().map_or(0.0, |l| l[edge])
    }

    fn vert_or_warn(&self, v: Option<usize>, edge: usize, out: &mut Builder) -> usize {
        v.unwrap_or_else(|| {
            out.warn(SolidifyWarning::UnplacedVertex { edge });
            0
        })
    }

    /// One output edge per wanted side-pass, with crease and bevel weight
    /// carried from the input edge.
    fn write_pass_edges(&self, singular_pairs: &[SingularPair], outputs: &[(NewEdgeId, usize)], out: &mut Builder) {
        let store = self.store;
        for (slot, pair) in singular_pairs.iter().enumerate() {
            let edge = Edge::new(pair[0].unwrap_or(0), pair[1].unwrap_or(0));
            out.set_edge(slot, edge, Provenance::Template(0));
        }
        let bevel_convex = self.params.bevel_convex;
        for &(e, insert) in outputs {
            let ne = &store.new_edges[e];
            let [v1, v2] = store.end_verts(e);
            let v1 = self.vert_or_warn(v1, ne.old_edge, out);
            let v2 = self.vert_or_warn(v2, ne.old_edge, out);
            let mut edge = Edge::new(v1, v2);
            edge.flags = self.mesh.edges[ne.old_edge].flags;
            out.set_edge(insert, edge, Provenance::Original(ne.old_edge));
            out.set_crease(insert, self.input_crease(ne.old_edge));
            let mut bevel = self.input_bevel(ne.old_edge);
            if bevel_convex != 0.0 && ne.faces[1].is_some() {
                let delta = if ne.angle > PI + SOLVER_EPSILON {
                    bevel_convex.clamp(0.0, 1.0)
                } else if ne.angle < PI - SOLVER_EPSILON {
                    bevel_convex.clamp(-1.0, 0.0)
                } else {
                    0.0
                };
                bevel = (bevel + delta).clamp(0.0, 1.0);
            }
            out.set_bevel(insert, bevel);
        }
    }

    fn is_boundary_group(&self, gid: EdgeGroupId) -> bool {
        let g = &self.store.groups[gid];
        (self.resolved.do_rim && !g.is_orig_closed) || (self.resolved.do_shell && g.split != 0)
    }

    /// Crease and bevel weight a fan hands to the boundary edges next to it.
    fn group_weights(&self, gid: EdgeGroupId, out: &Builder) -> (f64, f64) {
        let store = self.store;
        let g = &store.groups[gid];
        let old = |k: usize| store.new_edges[g.edges[k]].old_edge;
        let len = g.edges.len();
        let mut max_crease = 0.0;
        let mut max_bevel = 0.0_f64;
        if len == 2 {
            if self.mesh.edge_crease.is_some() {
                max_crease = self.input_crease(old(0)).min(self.input_crease(old(1)));
            }
        } else if len > 2 {
            for k in 1..len - 1 {
                max_crease = f64::max(max_crease, self.input_crease(old(k)));
                if let Some(output) = store.new_edges[g.edges[k]].output {
                    max_bevel = max_bevel.max(out.bevel(output));
                }
            }
        }
        let open_bevel = if len > 0 && self.mesh.edge_bevel_weight.is_some() {
            self.input_bevel(old(0)).min(self.input_bevel(old(len - 1)))
        } else {
            0.0
        };
        if open_bevel > 0.0 {
            max_bevel = open_bevel.min(max_bevel);
        } else if self.params.bevel_convex < 0.0 {
            max_bevel = 0.0;
        }
        (max_crease, max_bevel)
    }

    /// Boundary edges between consecutive open fans of each vertex, closed
    /// into an N-gon when three or more fans share a topology group.
    fn write_boundaries(&self, out: &mut Builder) {
        let store = self.store;
        for (i, ids) in store.vertex_groups.iter().enumerate() {
            let mv_crease = self.mesh.vertex_crease.as_ref().map_or(0.0, |l| l[i]);
            let mv_bevel = self.mesh.vertex_bevel_weight.as_ref().map_or(0.0, |l| l[i]);
            let mut j = 0usize;
            let mut topo_start = 0usize;
            let mut first: Option<(EdgeGroupId, f64, f64)> = None;
            let mut last: Option<(EdgeGroupId, f64, f64)> = None;
            for (idx, &gid) in ids.iter().enumerate() {
                let g = &store.groups[gid];
                if self.is_boundary_group(gid) {
                    let (max_crease, max_bevel) = self.group_weights(gid, out);
                    match (first, last) {
                        (None, _) => first = Some((gid, max_crease, max_bevel)),
                        (Some(_), Some((last_g, last_crease, last_bevel))) => {
                            out.open_face_edges.insert(last_g, out.edges.len());
                            self.push_boundary_edge(
                                out,
                                last_g,
                                g.new_vert,
                                mv_crease.max(last_crease.min(max_crease)),
                                mv_bevel.max(last_bevel.min(max_bevel)),
                            );
                        }
                        (Some(_), None) => {}
                    }
                    last = Some((gid, max_crease, max_bevel));
                    j += 1;
                }

                let topo_end = ids
                    .get(idx + 1)
                    .map_or(true, |&next| store.groups[next].topo_group != g.topo_group);
                if !topo_end {
                    continue;
                }
                if let (Some((first_g, first_crease, first_bevel)), Some((last_g, last_crease, last_bevel))) =
                    (first, last)
                {
                    if j == 2 {
                        out.open_face_edges.insert(last_g, out.edges.len() - 1);
                    } else if j > 2 {
                        out.open_face_edges.insert(last_g, out.edges.len());
                        self.push_boundary_edge(
                            out,
                            last_g,
                            store.groups[first_g].new_vert,
                            mv_crease.max(last_crease.min(first_crease)),
                            mv_bevel.max(last_bevel.min(first_bevel)),
                        );
                        self.write_closure(out, i, &ids[topo_start..=idx], j, gid);
                    }
                }
                j = 0;
                first = None;
                last = None;
                topo_start = idx + 1;
            }
        }
    }

    fn push_boundary_edge(
        &self,
        out: &mut Builder,
        from: EdgeGroupId,
        to: Option<usize>,
        crease: f64,
        bevel: f64,
    ) {
        let store = self.store;
        let g = &store.groups[from];
        let template = g.edges.first().map_or(0, |&e| store.new_edges[e].old_edge);
        let v1 = self.vert_or_warn(g.new_vert, template, out);
        let v2 = self.vert_or_warn(to, template, out);
        let mut edge = Edge::new(v1, v2);
        edge.flags = self.mesh.edges[template].flags;
        let index = out.edges.len();
        out.set_edge(index, edge, Provenance::Template(template));
        out.set_crease(index, crease);
        out.set_bevel(index, bevel);
    }

    fn material_of(&self, polygon: usize) -> i32 {
        self.mesh.polygons[polygon].material_index
    }

    /// N-gon joining the `j` boundary fans of one topology group, using the
    /// last `j` boundary edges written.
    fn write_closure(&self, out: &mut Builder, i: usize, topo: &[EdgeGroupId], j: usize, current: EdgeGroupId) {
        let store = self.store;
        let boundary: Vec<EdgeGroupId> = topo
            .iter()
            .copied()
            .filter(|&gid| self.is_boundary_group(gid))
            .take(j)
            .collect();

        // Majority material over the far faces of each fan.
        let mut most_mat = 0;
        let mut most_face = 0;
        let mut most_count = 0;
        for l in 0..self.resolved.material_slots {
            let mut hits = 0;
            let mut face = 0;
            for &gid in &boundary {
                let g = &store.groups[gid];
                let (Some(&first), Some(&last)) = (g.edges.first(), g.edges.last()) else {
                    continue;
                };
                if let Some(side) = store.new_edges[first].faces[0] {
                    if self.material_of(side.polygon()) == l {
                        face = side.polygon();
                        hits += 1;
                    }
                }
                let le = &store.new_edges[last];
                let far = le.faces[1].or(le.faces[0]);
                if let Some(side) = far {
                    if self.material_of(side.polygon()) == l {
                        face = side.polygon();
                        hits += 1;
                    }
                }
            }
            if hits > most_count {
                most_mat = l;
                most_face = face;
                most_count = hits;
            }
        }

        let g = &store.groups[current];
        let rim_offset = if g.is_orig_closed || !self.resolved.do_rim {
            0
        } else {
            self.resolved.rim_material_offset
        };
        let material = self.resolved.material(most_mat, rim_offset);
        out.begin_polygon(&self.mesh.polygons[most_face], most_face, material, PolygonKind::Closure);

        let corner_sources: Vec<usize> = boundary
            .iter()
            .map(|&gid| {
                let g = &store.groups[gid];
                g.edges
                    .first()
                    .and_then(|&e| store.new_edges[e].faces[0])
                    .and_then(|side| self.adj.corner_of(self.mesh, side.polygon(), i))
                    .unwrap_or(0)
            })
            .collect();

        let edge_index = out.edges.len();
        if self.resolved.do_flip {
            for k in 1..=j {
                let e = edge_index - k;
                let source = corner_sources.get(j - k).copied().unwrap_or(0);
                out.push_corner(out.edges[e].verts[1], e, source);
            }
        } else {
            for k in 0..j {
                let e = edge_index - j + k;
                let source = corner_sources.get(k).copied().unwrap_or(0);
                out.push_corner(out.edges[e].verts[0], e, source);
            }
        }
    }

    fn open_edge(&self, out: &Builder, e: NewEdgeId, end: usize) -> Option<usize> {
        let gid = self.store.new_edges[e].groups[end]?;
        out.open_face_edges.get(&gid).copied()
    }

    /// Open edge of `primary` at `end` when it touches `vertex`, otherwise
    /// the one of `secondary`.
    fn rim_side_edge(
        &self,
        out: &mut Builder,
        primary: NewEdgeId,
        secondary: NewEdgeId,
        end: usize,
        vertex: usize,
        source_vertex: usize,
    ) -> usize {
        let chosen = match self.open_edge(out, primary, end) {
            Some(open) if out.edges.get(open).is_some_and(|edge| edge.contains(vertex)) => Some(open),
            _ => self.open_edge(out, secondary, end),
        };
        chosen.unwrap_or_else(|| {
            out.warn(SolidifyWarning::MissingBoundaryEdge { vertex: source_vertex });
            0
        })
    }

    /// One quad per open input edge, joining the two sides of the shell.
    fn write_rims(&self, out: &mut Builder) {
        let store = self.store;
        for i in 0..self.mesh.edge_count() {
            if self.adj.edge_face_count[i] != 1 {
                continue;
            }
            let Some(&[e1, e2, ..]) = store.owned_list(i) else {
                continue;
            };
            let singular_end =
                |end: usize| [e1, e2].iter().all(|&e| store.group_of(e, end).is_some_and(|g| g.is_singularity));
            let v1_singularity = singular_end(0);
            let v2_singularity = singular_end(1);
            if v1_singularity && v2_singularity {
                continue;
            }
            let Some(side) = store.new_edges[e1].faces[0] else {
                continue;
            };
            let polygon = side.polygon();
            let material = self
                .resolved
                .material(self.material_of(polygon), self.resolved.rim_material_offset);
            out.begin_polygon(&self.mesh.polygons[polygon], polygon, material, PolygonKind::Rim);

            let [old_v1, old_v2] = self.adj.welded(self.mesh, store.new_edges[e1].old_edge);
            let mut loop1 = self.mesh.polygons[polygon].loop_start;
            let mut loop2 = loop1;
            for c in self.mesh.polygons[polygon].corners() {
                let v = self.adj.merge.canonical(self.mesh.corners[c].vert);
                if v == old_v1 {
                    loop1 = c;
                } else if v == old_v2 {
                    loop2 = c;
                }
            }

            let edge_of = |out: &mut Builder, e: NewEdgeId| -> (usize, [usize; 2]) {
                match store.new_edges[e].output {
                    Some(index) if index < out.edges.len() => (index, out.edges[index].verts),
                    _ => {
                        out.warn(SolidifyWarning::MissingBoundaryEdge { vertex: old_v1 });
                        (0, [0, 0])
                    }
                }
            };
            let (out1, verts1) = edge_of(out, e1);
            let (out2, verts2) = edge_of(out, e2);

            let mut emitted = Vec::with_capacity(4);
            if self.resolved.do_flip {
                if !v1_singularity {
                    let edge = self.rim_side_edge(out, e1, e2, 0, verts2[0], old_v1);
                    out.push_corner(verts1[0], edge, loop1);
                    emitted.push(verts1[0]);
                }
                out.push_corner(verts2[0], out2, loop1);
                emitted.push(verts2[0]);
                if !v2_singularity {
                    let edge = self.rim_side_edge(out, e2, e1, 1, verts1[1], old_v2);
                    out.push_corner(verts2[1], edge, loop2);
                    emitted.push(verts2[1]);
                }
                out.push_corner(verts1[1], out1, loop2);
                emitted.push(verts1[1]);
            } else {
                out.push_corner(verts1[0], out1, loop1);
                emitted.push(verts1[0]);
                if !v2_singularity {
                    let edge = self.rim_side_edge(out, e1, e2, 1, verts2[1], old_v2);
                    out.push_corner(verts1[1], edge, loop2);
                    emitted.push(verts1[1]);
                }
                out.push_corner(verts2[1], out2, loop2);
                emitted.push(verts2[1]);
                if !v1_singularity {
                    let edge = self.rim_side_edge(out, e2, e1, 0, verts1[0], old_v1);
                    out.push_corner(verts2[0], edge, loop1);
                    emitted.push(verts2[0]);
                }
            }
            out.rim_verts.extend(emitted);
        }
    }

    /// Offset copies of both sides of every input polygon.
    fn write_shells(&self, out: &mut Builder) {
        let store = self.store;
        let canonical = |v: usize| self.adj.merge.canonical(v);
        let mut face_loops: Vec<usize> = Vec::new();
        let mut face_verts: Vec<usize> = Vec::new();
        let mut face_edges: Vec<Option<usize>> = Vec::new();

        for fr in &store.sides {
            let loop_start = self.mesh.polygons[fr.polygon].loop_start;
            let usable = |l: &Option<NewEdgeId>| l.is_some_and(|e| store.new_edges[e].output.is_some());
            let Some(total) = fr.links.iter().rposition(usable).map(|p| p + 1) else {
                continue;
            };
            let corner_vert = |j: usize| canonical(self.mesh.corners[loop_start + j].vert);

            face_loops.clear();
            face_verts.clear();
            face_edges.clear();
            let Some(mut prior) = fr.links[total - 1] else {
                continue;
            };
            let mut prior_flip =
                usize::from(canonical(self.mesh.edges[store.new_edges[prior].old_edge].verts[0]) == corner_vert(total - 1));
            let mut valid_edges = 0;

            for j in 0..total {
                let Some(e) = fr.links[j] else {
                    continue;
                };
                let ne = &store.new_edges[e];
                let Some(output) = ne.output else {
                    continue;
                };
                valid_edges += 1;
                let old = self.mesh.edges[ne.old_edge].verts;
                let flip = usize::from(canonical(old[1]) == corner_vert(j));
                let [a, b] = store.end_verts(e);
                let ends = [a, b];
                let new_v1 = self.vert_or_warn(ends[flip], ne.old_edge, out);
                let new_v2 = self.vert_or_warn(ends[1 - flip], ne.old_edge, out);

                if face_verts.last() != Some(&new_v1) {
                    face_loops.push(loop_start + j);
                    face_edges.push(if fr.reversed {
                        self.open_edge(out, prior, prior_flip)
                    } else {
                        self.open_edge(out, e, flip)
                    });
                    face_verts.push(new_v1);
                }
                prior = e;
                prior_flip = 1 - flip;
                if j + 1 < total || face_verts.first() != Some(&new_v2) {
                    face_loops.push(loop_start + (j + 1) % total);
                    face_edges.push(Some(output));
                    face_verts.push(new_v2);
                } else if let Some(first) = face_edges.first_mut() {
                    *first = Some(output);
                }
            }

            let k = face_verts.len();
            if k <= 2 || valid_edges <= 2 {
                continue;
            }
            let back_facing = fr.reversed != self.resolved.do_flip;
            let offset = if back_facing {
                self.resolved.material_offset
            } else {
                0
            };
            let material = self.resolved.material(self.material_of(fr.polygon), offset);
            out.begin_polygon(
                &self.mesh.polygons[fr.polygon],
                fr.polygon,
                material,
                PolygonKind::Shell { back: fr.reversed },
            );
            let edge_at = |out: &mut Builder, l: usize| {
                face_edges[l].unwrap_or_else(|| {
                    out.warn(SolidifyWarning::MissingBoundaryEdge {
                        vertex: canonical(self.mesh.corners[face_loops[l]].vert),
                    });
                    0
                })
            };
            if back_facing {
                for l in (0..k).rev() {
                    let edge = edge_at(out, l);
                    out.push_corner(face_verts[l], edge, face_loops[l]);
                    out.shell_verts.push(face_verts[l]);
                }
            } else {
                let mut l = k - 1;
                for next_l in 0..k {
                    let edge = edge_at(out, next_l);
                    out.push_corner(face_verts[l], edge, face_loops[l]);
                    l = next_l;
                }
            }
        }
    }

    /// Assembles the mesh and its attribute layers.
    fn finish(&self, out: Builder) -> SolidifyOutput {
        let Builder {
            positions,
            edges,
            edge_crease,
            edge_bevel,
            polygons,
            corners,
            sources,
            shell_verts,
            rim_verts,
            warnings,
            ..
        } = out;
        let remap = |layer: &Option<Vec<f64>>| {
            layer
                .as_ref()
                .map(|l| sources.vertices.iter().map(|&v| l[v]).collect::<Vec<f64>>())
        };
        let vertex_crease = if self.resolved.do_rim {
            None
        } else {
            remap(&self.mesh.vertex_crease)
        };
        let vertex_bevel_weight = remap(&self.mesh.vertex_bevel_weight);
        let vertex_groups = self.mesh.vertex_groups.as_ref().map(|groups| {
            let mut remapped = groups.remapped(&sources.vertices);
            mark_group(&mut remapped, self.params.shell_vertex_group.as_deref(), &shell_verts);
            mark_group(&mut remapped, self.params.rim_vertex_group.as_deref(), &rim_verts);
            remapped
        });

        let mesh = Mesh {
            positions,
            edges,
            polygons,
            corners,
            vertex_crease,
            vertex_bevel_weight,
            edge_crease,
            edge_bevel_weight: edge_bevel,
            vertex_groups,
        };
        debug!(
            vertices = mesh.vertex_count(),
            edges = mesh.edge_count(),
            polygons = mesh.polygon_count(),
            corners = mesh.corner_count(),
            "solidify output written"
        );
        SolidifyOutput {
            mesh,
            sources,
            warnings,
        }
    }
}

/// Sets weight 1 in the group called `name` for every vertex in `verts`.
/// Groups missing from the input are left alone.
fn mark_group(groups: &mut VertexGroups, name: Option<&str>, verts: &[usize]) {
    let Some(index) = name.and_then(|n| groups.group_index(n)) else {
        return;
    };
    for &v in verts {
        groups.set_weight(v, index, 1.0);
    }
}
