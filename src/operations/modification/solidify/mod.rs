mod adjacency;
mod emit;
mod face_sides;
mod fans;
mod merge_map;
mod offset;
mod output;
mod params;
mod store;

pub use merge_map::VertexMergeMap;
pub use output::{PolygonKind, Provenance, SolidifyOutput, SolidifyWarning, SourceMap};
pub use params::{BoundaryMode, OffsetMode, SolidifyParams};

use tracing::{info, warn};

use crate::error::Result;
use crate::mesh::Mesh;

use adjacency::Adjacency;
use params::Resolved;
use store::SolidifyStore;

/// Gives a polygon mesh thickness, including meshes with edges shared by
/// more than two polygons.
///
/// Every polygon gets a front and a back side. The sides around each vertex
/// are grouped into fans; each fan becomes one output vertex, offset so that
/// the adjacent sides keep the requested distance. Open boundaries are closed
/// with rim quads, and branching boundaries with closure polygons.
#[derive(Debug, Clone)]
pub struct Solidify {
    params: SolidifyParams,
}

impl Solidify {
    /// Creates a new `Solidify` operation.
    #[must_use]
    pub fn new(params: SolidifyParams) -> Self {
        Self { params }
    }

    #[must_use]
    pub fn params(&self) -> &SolidifyParams {
        &self.params
    }

    /// Executes the operation.
    ///
    /// A mesh with vertices but no polygons is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are out of range or the mesh is
    /// invalid. Problems found while building the shell are reported as
    /// [`SolidifyOutput::warnings`] instead.
    pub fn execute(&self, mesh: &Mesh) -> Result<SolidifyOutput> {
        self.params.validate()?;
        mesh.validate()?;

        if mesh.polygon_count() == 0 && mesh.vertex_count() != 0 {
            return Ok(SolidifyOutput {
                mesh: mesh.clone(),
                sources: SourceMap::identity(mesh),
                warnings: Vec::new(),
            });
        }

        let resolved = Resolved::new(&self.params);
        let adj = Adjacency::build(mesh, self.params.merge_tolerance, resolved.do_shell);
        let mut counts = adj.counts;
        let mut store = SolidifyStore::default();

        face_sides::build_face_sides(mesh, &adj, &resolved, &mut store, &mut counts);
        let fans = fans::build_fans(mesh, &adj, &resolved, &mut store, &mut counts);

        let mut warnings = Vec::new();
        for group in store.groups.values() {
            if !group.is_singularity && group.edges.len() < 2 {
                let warning = SolidifyWarning::UndersizedFan {
                    vertex: group.vertex,
                    edges: group.edges.len(),
                };
                warn!("{warning}");
                warnings.push(warning);
            }
        }

        offset::place_fans(mesh, &adj, &self.params, &resolved, &mut store);
        let mut output = emit::emit(
            mesh,
            &adj,
            &self.params,
            &resolved,
            &mut store,
            counts,
            fans.has_singularities,
        );
        warnings.append(&mut output.warnings);
        output.warnings = warnings;

        info!(
            vertices = output.mesh.vertex_count(),
            edges = output.mesh.edge_count(),
            polygons = output.mesh.polygon_count(),
            warnings = output.warnings.len(),
            "solidify finished"
        );
        Ok(output)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::{Point3, Vector3};
    use crate::mesh::{VertexGroups, VertexWeights};
    use crate::operations::creation::{MakeBox, MakeGrid, MakeMesh};
    use crate::operations::query::{EdgeUsage, Volume};
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn kinds(out: &SolidifyOutput, kind: PolygonKind) -> usize {
        out.sources.polygon_kinds.iter().filter(|&&k| k == kind).count()
    }

    #[test]
    fn single_quad_becomes_a_slab() {
        let mesh = MakeGrid::new(1, 1, 1.0, 1.0).execute().unwrap();
        let params = SolidifyParams::new(0.1).with_offset_factor(0.0);
        let out = Solidify::new(params).execute(&mesh).unwrap();

        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
        assert_eq!(out.mesh.vertex_count(), 8);
        assert_eq!(out.mesh.edge_count(), 12);
        assert_eq!(out.mesh.polygon_count(), 6);
        assert_eq!(out.mesh.corner_count(), 24);
        out.mesh.validate().unwrap();
        for v in &out.mesh.positions {
            assert!(v.z.abs() < 1e-4 || (v.z - 0.1).abs() < 1e-4, "z = {}", v.z);
        }
        assert_eq!(kinds(&out, PolygonKind::Rim), 4);
        assert_eq!(kinds(&out, PolygonKind::Shell { back: false }), 1);
        assert_eq!(kinds(&out, PolygonKind::Shell { back: true }), 1);
        assert!(EdgeUsage::new().execute(&out.mesh).unwrap().is_closed_manifold());
    }

    #[test]
    fn slab_volume_matches_thickness() {
        let mesh = MakeGrid::new(1, 1, 1.0, 1.0).execute().unwrap();
        let params = SolidifyParams::new(0.1).with_offset_factor(0.0);
        let out = Solidify::new(params).execute(&mesh).unwrap();
        let volume = Volume::new().execute(&out.mesh).unwrap();
        assert_relative_eq!(volume.abs(), 0.1, epsilon = 1e-3);
    }

    #[test]
    fn two_quads_get_six_rims() {
        let mesh = MakeGrid::new(2, 1, 2.0, 1.0).execute().unwrap();
        let out = Solidify::new(SolidifyParams::new(0.1)).execute(&mesh).unwrap();

        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
        assert_eq!(kinds(&out, PolygonKind::Rim), 6);
        assert_eq!(out.mesh.vertex_count(), 12);
        assert_eq!(out.mesh.polygon_count(), 10);
        out.mesh.validate().unwrap();
        assert!(EdgeUsage::new().execute(&out.mesh).unwrap().is_closed_manifold());
    }

    #[test]
    fn triangle_welded_to_a_point_emits_nothing() {
        let mesh = MakeMesh::new(
            vec![p(0.0, 0.0, 0.0), p(0.01, 0.0, 0.0), p(0.0, 0.01, 0.0)],
            vec![vec![0, 1, 2]],
        )
        .execute()
        .unwrap();
        let params = SolidifyParams::new(0.1).with_merge_tolerance(1.0);
        let out = Solidify::new(params).execute(&mesh).unwrap();

        assert_eq!(out.mesh.polygon_count(), 0);
        assert!(!out.warnings.contains(&SolidifyWarning::FacesNeeded));
    }

    #[test]
    fn three_face_fin_keeps_fans_complete() {
        // Three quads sharing the edge 0-1.
        let mesh = MakeMesh::new(
            vec![
                p(0.0, 0.0, 0.0),
                p(0.0, 0.0, 1.0),
                p(1.0, 0.0, 0.0),
                p(1.0, 0.0, 1.0),
                p(-0.5, 0.8, 0.0),
                p(-0.5, 0.8, 1.0),
                p(-0.5, -0.8, 0.0),
                p(-0.5, -0.8, 1.0),
            ],
            vec![vec![0, 2, 3, 1], vec![0, 1, 5, 4], vec![0, 6, 7, 1]],
        )
        .execute()
        .unwrap();
        let out = Solidify::new(SolidifyParams::new(0.05)).execute(&mesh).unwrap();

        assert!(
            !out
                .warnings
                .iter()
                .any(|w| matches!(w, SolidifyWarning::UndersizedFan { .. })),
            "{:?}",
            out.warnings
        );
        assert!(!out
            .warnings
            .iter()
            .any(|w| matches!(w, SolidifyWarning::SizeMismatch { .. })));
        out.mesh.validate().unwrap();
        assert_eq!(kinds(&out, PolygonKind::Shell { back: false }), 3);
        assert_eq!(kinds(&out, PolygonKind::Shell { back: true }), 3);
        assert!(kinds(&out, PolygonKind::Closure) > 0);
    }

    #[test]
    fn closed_box_gives_two_closed_shells() {
        let mesh = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute()
            .unwrap();
        let params = SolidifyParams::new(0.1).with_rim(false);
        let out = Solidify::new(params).execute(&mesh).unwrap();

        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
        assert_eq!(out.mesh.vertex_count(), 16);
        assert_eq!(out.mesh.polygon_count(), 12);
        assert_eq!(kinds(&out, PolygonKind::Rim), 0);
        assert!(EdgeUsage::new().execute(&out.mesh).unwrap().is_closed_manifold());
    }

    #[test]
    fn duplicate_reversed_face_collapses() {
        let mesh = MakeMesh::new(
            vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)],
            vec![vec![0, 1, 2], vec![0, 2, 1]],
        )
        .execute()
        .unwrap();
        let out = Solidify::new(SolidifyParams::new(0.1)).execute(&mesh).unwrap();

        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
        assert_eq!(out.mesh.vertex_count(), 6);
        assert_eq!(kinds(&out, PolygonKind::Rim), 3);
        assert_eq!(out.mesh.polygon_count(), 5);
    }

    #[test]
    fn materials_are_offset_and_clamped() {
        let mesh = MakeGrid::new(1, 1, 1.0, 1.0).execute().unwrap();
        let params = SolidifyParams::new(0.1).with_materials(2, 1, 5);
        let out = Solidify::new(params).execute(&mesh).unwrap();

        for (poly, kind) in out.mesh.polygons.iter().zip(&out.sources.polygon_kinds) {
            match kind {
                PolygonKind::Shell { back: false } => assert_eq!(poly.material_index, 0),
                PolygonKind::Shell { back: true } | PolygonKind::Rim => {
                    assert_eq!(poly.material_index, 1);
                }
                PolygonKind::Closure => {}
            }
        }
    }

    #[test]
    fn single_material_slot_ignores_offsets() {
        let mesh = MakeGrid::new(1, 1, 1.0, 1.0).execute().unwrap();
        let params = SolidifyParams::new(0.1).with_materials(1, 3, 3);
        let out = Solidify::new(params).execute(&mesh).unwrap();
        assert!(out.mesh.polygons.iter().all(|poly| poly.material_index == 0));
    }

    /// Half the shortest input edge at `vertex`.
    fn half_shortest_edge(mesh: &Mesh, vertex: usize) -> f64 {
        mesh.edges
            .iter()
            .filter(|e| e.contains(vertex))
            .map(|e| (mesh.positions[e.verts[0]] - mesh.positions[e.verts[1]]).norm())
            .fold(f64::INFINITY, f64::min)
            * 0.5
    }

    fn displacements(mesh: &Mesh, out: &SolidifyOutput) -> Vec<(usize, f64)> {
        out.mesh
            .positions
            .iter()
            .zip(&out.sources.vertices)
            .map(|(v, &src)| (src, (v - mesh.positions[src]).norm()))
            .collect()
    }

    #[test]
    fn clamped_offsets_stay_within_half_edge() {
        // Edges far shorter than the thickness.
        let meshes = [
            MakeGrid::new(3, 3, 1.0, 1.0).execute().unwrap(),
            MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)).execute().unwrap(),
        ];
        for mesh in &meshes {
            for mode in [OffsetMode::Fixed, OffsetMode::Even, OffsetMode::Constraints] {
                for factor in [0.0, 0.5, 1.0] {
                    let params = SolidifyParams::new(2.0)
                        .with_offset_factor(factor)
                        .with_offset_mode(mode)
                        .with_clamp(1.0, false);
                    let out = Solidify::new(params).execute(mesh).unwrap();
                    for (src, moved) in displacements(mesh, &out) {
                        let bound = half_shortest_edge(mesh, src);
                        assert!(
                            moved <= bound + 1e-9,
                            "{mode:?} f={factor}: vertex {src} moved {moved} > {bound}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn clamp_factor_scales_the_bound() {
        let mesh = MakeGrid::new(3, 3, 1.0, 1.0).execute().unwrap();
        let params = SolidifyParams::new(2.0)
            .with_offset_factor(0.0)
            .with_clamp(0.5, false);
        let out = Solidify::new(params).execute(&mesh).unwrap();
        let moved = displacements(&mesh, &out);
        assert!(moved.iter().all(|&(src, d)| d <= 0.5 * half_shortest_edge(&mesh, src) + 1e-9));
        assert!(moved.iter().any(|&(_, d)| d > 0.05));
    }

    #[test]
    fn angle_clamp_follows_the_sharpest_edge() {
        // Every box fan has right angles on one side and reflex angles on
        // the other; only the right-angled side is limited.
        let mesh = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)).execute().unwrap();
        let params = SolidifyParams::new(2.0)
            .with_offset_factor(0.5)
            .with_clamp(1.0, true);
        let out = Solidify::new(params).execute(&mesh).unwrap();

        let free = 3.0_f64.sqrt();
        let limit = 0.5 / std::f64::consts::FRAC_PI_4.cos();
        let moved = displacements(&mesh, &out);
        assert!(moved.iter().all(|&(_, d)| (d - free).abs() < 1e-6 || d <= limit + 1e-9));
        assert_eq!(moved.iter().filter(|&&(_, d)| (d - free).abs() < 1e-6).count(), 8);
        assert_eq!(moved.iter().filter(|&&(_, d)| (d - limit).abs() < 1e-6).count(), 8);
    }

    #[test]
    fn even_mode_keeps_full_thickness_at_corners() {
        let mesh = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)).execute().unwrap();
        let furthest = |mode| {
            let params = SolidifyParams::new(0.1)
                .with_offset_factor(0.0)
                .with_offset_mode(mode)
                .with_rim(false);
            let out = Solidify::new(params).execute(&mesh).unwrap();
            displacements(&mesh, &out)
                .into_iter()
                .map(|(_, d)| d)
                .fold(0.0, f64::max)
        };
        assert_relative_eq!(furthest(OffsetMode::Even), 0.1 * 3.0_f64.sqrt(), epsilon = 1e-9);
        assert_relative_eq!(furthest(OffsetMode::Constraints), 0.1 * 3.0_f64.sqrt(), epsilon = 1e-9);
        assert_relative_eq!(furthest(OffsetMode::Fixed), 0.1 / 3.0_f64.sqrt(), epsilon = 1e-9);
    }

    /// Two quads folded at a right angle along the y axis, with skewed far
    /// edges so the boundary planes are not parallel to the fold.
    fn skewed_fold() -> Mesh {
        MakeMesh::new(
            vec![
                p(0.0, 0.0, 0.0),
                p(1.0, 0.3, 0.0),
                p(1.0, 1.3, 0.0),
                p(0.0, 1.0, 0.0),
                p(0.0, 1.3, 1.0),
                p(0.0, 0.3, 1.0),
            ],
            vec![vec![0, 1, 2, 3], vec![0, 3, 4, 5]],
        )
        .execute()
        .unwrap()
    }

    /// Offsets of the output vertices made from input vertex 0.
    fn corner_offsets(mesh: &Mesh, mode: BoundaryMode) -> Vec<Vector3> {
        let params = SolidifyParams::new(0.1).with_boundary_mode(mode);
        let out = Solidify::new(params).execute(mesh).unwrap();
        out.mesh.validate().unwrap();
        let mut offsets: Vec<_> = out
            .mesh
            .positions
            .iter()
            .zip(&out.sources.vertices)
            .filter(|(_, &src)| src == 0)
            .map(|(v, _)| v - mesh.positions[0])
            .collect();
        offsets.sort_by(|a, b| a.x.total_cmp(&b.x));
        offsets
    }

    #[test]
    fn boundary_modes_slide_along_the_fold() {
        let mesh = skewed_fold();
        let none = corner_offsets(&mesh, BoundaryMode::None);
        let flat = corner_offsets(&mesh, BoundaryMode::Flat);
        let blended = corner_offsets(&mesh, BoundaryMode::Blended);
        assert_eq!(none.len(), 2);

        // Plane of the two boundary edges at vertex 0.
        let edge_plane = Vector3::new(1.0, 0.3, 0.0).cross(&Vector3::new(0.0, 0.3, 1.0));
        for ((n, f), b) in none.iter().zip(&flat).zip(&blended) {
            assert!(n.y.abs() < 1e-9, "uncorrected offset left the fold plane: {n}");
            assert_relative_eq!(n.x.abs(), 0.05, epsilon = 1e-9);
            assert_relative_eq!(n.z.abs(), 0.05, epsilon = 1e-9);

            assert!(f.dot(&edge_plane).abs() < 1e-9, "{f}");
            assert_relative_eq!(f.y.abs(), 0.03, epsilon = 1e-9);
            assert_relative_eq!(f.x, n.x, epsilon = 1e-9);
            assert_relative_eq!(f.z, n.z, epsilon = 1e-9);

            assert!(b.y.abs() > 1e-4, "{b}");
            assert_relative_eq!(b.x, n.x, epsilon = 1e-9);
            assert_relative_eq!(b.z, n.z, epsilon = 1e-9);
        }
    }

    #[test]
    fn bevel_convex_shifts_shell_edges() {
        let mut mesh = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)).execute().unwrap();
        let count_at = |layer: &[f64], value: f64| layer.iter().filter(|&&b| (b - value).abs() < 1e-9).count();

        let params = SolidifyParams::new(0.1).with_rim(false).with_bevel_convex(0.5);
        let out = Solidify::new(params.clone()).execute(&mesh).unwrap();
        let bevel = out.mesh.edge_bevel_weight.as_deref().unwrap();
        assert_eq!(bevel.len(), 24);
        assert_eq!(count_at(bevel, 0.5), 12);
        assert_eq!(count_at(bevel, 0.0), 12);

        mesh.edge_bevel_weight = Some(vec![0.75; mesh.edge_count()]);
        let out = Solidify::new(params.with_bevel_convex(-0.5)).execute(&mesh).unwrap();
        let bevel = out.mesh.edge_bevel_weight.as_deref().unwrap();
        assert_eq!(count_at(bevel, 0.75), 12);
        assert_eq!(count_at(bevel, 0.25), 12);
    }

    #[test]
    fn creases_carry_to_shell_and_rim_edges() {
        let mut mesh = MakeGrid::new(1, 1, 1.0, 1.0).execute().unwrap();
        let creases = vec![0.2, 0.4, 0.6, 0.8];
        mesh.edge_crease = Some(creases.clone());
        let out = Solidify::new(SolidifyParams::new(0.1)).execute(&mesh).unwrap();
        let layer = out.mesh.edge_crease.as_deref().unwrap();
        assert_eq!(layer.len(), out.mesh.edge_count());

        let mut rim_sides = 0;
        for (index, edge) in out.mesh.edges.iter().enumerate() {
            let [a, b] = edge.verts.map(|v| out.sources.vertices[v]);
            match out.sources.edges[index] {
                Provenance::Original(e) => assert!((layer[index] - creases[e]).abs() < 1e-12),
                Provenance::Template(_) => {
                    assert_eq!(a, b);
                    let lowest = mesh
                        .edges
                        .iter()
                        .zip(&creases)
                        .filter(|(e, _)| e.contains(a))
                        .map(|(_, &c)| c)
                        .fold(1.0, f64::min);
                    assert!((layer[index] - lowest).abs() < 1e-12);
                    rim_sides += 1;
                }
            }
        }
        assert_eq!(rim_sides, 4);
    }

    fn weighted_strip() -> Mesh {
        // Vertices with x < 1.5 weigh 1, the rest 0.
        let mut mesh = MakeGrid::new(2, 1, 2.0, 1.0).execute().unwrap();
        let mut groups = VertexGroups::new(mesh.vertex_count());
        let thick = groups.add_group("thick");
        for (v, pos) in mesh.positions.iter().enumerate() {
            if pos.x < 1.5 {
                groups.set_weight(v, thick, 1.0);
            }
        }
        mesh.vertex_groups = Some(groups);
        mesh
    }

    fn top_at(mesh: &Mesh, out: &SolidifyOutput, x: f64) -> f64 {
        out.mesh
            .positions
            .iter()
            .zip(&out.sources.vertices)
            .filter(|(_, &src)| (mesh.positions[src].x - x).abs() < 1e-9)
            .map(|(v, _)| v.z)
            .fold(f64::MIN, f64::max)
    }

    #[test]
    fn flat_faces_use_the_thinnest_corner() {
        let mesh = weighted_strip();
        let params = SolidifyParams::new(0.1)
            .with_offset_factor(0.0)
            .with_offset_mode(OffsetMode::Fixed)
            .with_vertex_group("thick", false, 0.0);

        let smooth = Solidify::new(params.clone()).execute(&mesh).unwrap();
        assert_relative_eq!(top_at(&mesh, &smooth, 1.0), 0.1, epsilon = 1e-4);

        let flat = Solidify::new(params.with_flat_faces(true)).execute(&mesh).unwrap();
        assert_relative_eq!(top_at(&mesh, &flat, 0.0), 0.1, epsilon = 1e-4);
        assert_relative_eq!(top_at(&mesh, &flat, 1.0), 0.05, epsilon = 1e-4);
        assert!(top_at(&mesh, &flat, 2.0) < 1e-4);
    }

    #[test]
    fn inverted_vertex_group_thins_the_weighted_side() {
        let mesh = weighted_strip();
        let params = SolidifyParams::new(0.1)
            .with_offset_factor(0.0)
            .with_offset_mode(OffsetMode::Fixed)
            .with_vertex_group("thick", true, 0.0);
        let out = Solidify::new(params).execute(&mesh).unwrap();
        assert!(top_at(&mesh, &out, 0.0) < 1e-4);
        assert!(top_at(&mesh, &out, 1.0) < 1e-4);
        assert_relative_eq!(top_at(&mesh, &out, 2.0), 0.1, epsilon = 1e-4);
    }

    #[test]
    fn overlapping_faces_still_give_a_valid_mesh() {
        // Faces sharing most of their edges in both directions.
        let mesh = MakeMesh::new(
            vec![
                p(0.0, 0.0, 0.0),
                p(0.1, 0.2, 0.0),
                p(1.0, 0.1, 0.3),
                p(0.9, 1.1, 0.1),
                p(0.2, 0.8, 0.7),
                p(0.6, -0.4, 0.5),
            ],
            vec![
                vec![2, 1, 5],
                vec![1, 2, 4],
                vec![1, 4, 3, 2],
                vec![4, 5, 2],
                vec![1, 4, 2, 3],
                vec![5, 4, 1, 2],
            ],
        )
        .execute()
        .unwrap();
        for mode in [OffsetMode::Fixed, OffsetMode::Even, OffsetMode::Constraints] {
            for shell in [true, false] {
                let params = SolidifyParams::new(0.1).with_offset_mode(mode).with_shell(shell);
                let out = Solidify::new(params).execute(&mesh).unwrap();
                out.mesh.validate().unwrap();
                assert_eq!(out.sources.polygons.len(), out.mesh.polygon_count());
                assert_eq!(out.sources.corners.len(), out.mesh.corner_count());
                assert_eq!(out.sources.edges.len(), out.mesh.edge_count());
            }
        }
    }

    #[test]
    fn flip_swaps_offset_side() {
        let mesh = MakeGrid::new(1, 1, 1.0, 1.0).execute().unwrap();
        let params = SolidifyParams::new(-0.1).with_offset_factor(0.0);
        let out = Solidify::new(params).execute(&mesh).unwrap();
        assert!(out.mesh.positions.iter().any(|v| (v.z + 0.1).abs() < 1e-4));
        assert!(out.mesh.positions.iter().all(|v| v.z < 1e-4));
    }

    #[test]
    fn shell_only_skips_rims() {
        let mesh = MakeGrid::new(1, 1, 1.0, 1.0).execute().unwrap();
        let params = SolidifyParams::new(0.1).with_shell(false);
        let out = Solidify::new(params).execute(&mesh).unwrap();
        assert_eq!(out.mesh.polygon_count(), 4);
        assert_eq!(kinds(&out, PolygonKind::Rim), 4);
    }

    #[test]
    fn vertex_group_thins_the_shell() {
        let mut mesh = MakeGrid::new(1, 1, 1.0, 1.0).execute().unwrap();
        let mut groups = VertexGroups::new(mesh.vertex_count());
        let thick = groups.add_group("thick");
        groups.set_weight(0, thick, 1.0);
        groups.set_weight(1, thick, 1.0);
        mesh.vertex_groups = Some(groups);

        let params = SolidifyParams::new(0.1)
            .with_offset_factor(0.0)
            .with_offset_mode(OffsetMode::Fixed)
            .with_vertex_group("thick", false, 0.0);
        let out = Solidify::new(params).execute(&mesh).unwrap();
        let max_z = out
            .mesh
            .positions
            .iter()
            .zip(&out.sources.vertices)
            .filter(|(_, &src)| src == 2 || src == 3)
            .map(|(v, _)| v.z)
            .fold(f64::MIN, f64::max);
        assert!(max_z < 1e-4, "unweighted vertices moved to {max_z}");
    }

    #[test]
    fn shell_and_rim_groups_are_marked() {
        let mut mesh = MakeGrid::new(1, 1, 1.0, 1.0).execute().unwrap();
        let mut groups = VertexGroups::new(mesh.vertex_count());
        groups.add_group("shell");
        groups.add_group("rim");
        mesh.vertex_groups = Some(groups);
        let params = SolidifyParams::new(0.1)
            .with_shell_vertex_group("shell")
            .with_rim_vertex_group("rim");
        let out = Solidify::new(params).execute(&mesh).unwrap();
        let groups = out.mesh.vertex_groups.as_ref().unwrap();
        let rim = groups.group_index("rim").unwrap();
        assert!((0..out.mesh.vertex_count()).all(|v| groups.weight(v, rim) == 1.0));
        let shell = groups.group_index("shell").unwrap();
        let marked = (0..out.mesh.vertex_count())
            .filter(|&v| groups.weight(v, shell) == 1.0)
            .count();
        assert_eq!(marked, 4);
    }

    #[test]
    fn loose_vertices_pass_through() {
        let mesh = Mesh {
            positions: vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0)],
            ..Mesh::new()
        };
        let out = Solidify::new(SolidifyParams::new(0.1)).execute(&mesh).unwrap();
        assert_eq!(out.mesh, mesh);
        assert_eq!(out.sources.vertices, vec![0, 1]);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let mesh = MakeGrid::new(1, 1, 1.0, 1.0).execute().unwrap();
        let params = SolidifyParams::new(0.1).with_offset_factor(2.0);
        assert!(Solidify::new(params).execute(&mesh).is_err());
    }
}
