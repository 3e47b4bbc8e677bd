use tracing::debug;

use crate::mesh::Mesh;

use super::adjacency::Adjacency;
use super::params::Resolved;
use super::store::{EdgeGroup, EdgeGroupId, ElementCounts, FaceSideId, NewEdgeId, SolidifyStore};

/// Summary of the fan stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct FanSummary {
    pub groups: usize,
    pub split_groups: usize,
    pub has_singularities: bool,
}

/// Groups the side-passes around every vertex into fans, splits fans that
/// revisit an original edge, assigns output vertices and predicts the
/// boundary geometry.
pub fn build_fans(
    mesh: &Mesh,
    adj: &Adjacency,
    resolved: &Resolved,
    store: &mut SolidifyStore,
    counts: &mut ElementCounts,
) -> FanSummary {
    let mut summary = FanSummary::default();
    let mut next_vert = 0usize;
    store.vertex_groups = vec![Vec::new(); mesh.vertex_count()];

    for i in 0..mesh.vertex_count() {
        if adj.vert_edges[i].len() < 2 {
            continue;
        }
        let unassigned: Vec<NewEdgeId> = adj.vert_edges[i]
            .iter()
            .filter_map(|&e| store.list(e))
            .flatten()
            .copied()
            .collect();
        let (groups, contains_long_groups) = group_fans(mesh, adj, store, i, unassigned);
        let groups = if contains_long_groups {
            split_fans(store, groups, &mut summary)
        } else {
            groups
        };
        summary.groups += groups.len();
        let ids: Vec<EdgeGroupId> = groups.into_iter().map(|g| store.groups.insert(g)).collect();
        count_vertex(mesh, adj, resolved, store, i, &ids, &mut next_vert, counts);
        store.vertex_groups[i] = ids;
    }
    counts.verts = super::store::count(next_vert);

    debug!(
        groups = summary.groups,
        split = summary.split_groups,
        singular = summary.has_singularities,
        "edge fans grouped"
    );
    summary
}

/// Walks the side-passes around vertex `i`, chaining passes that share a
/// face side. Returns the fans and whether any has more than three passes.
fn group_fans(
    mesh: &Mesh,
    adj: &Adjacency,
    store: &SolidifyStore,
    i: usize,
    mut unassigned: Vec<NewEdgeId>,
) -> (Vec<EdgeGroup>, bool) {
    let total = unassigned.len();
    let mut slots: Vec<Option<NewEdgeId>> = unassigned.drain(..).map(Some).collect();
    let mut groups: Vec<EdgeGroup> = Vec::with_capacity(total / 2 + 1);
    let mut contains_long_groups = false;
    let mut topo_groups = 0u32;
    let mut assigned = 0usize;
    let mut track: [Option<FaceSideId>; 2] = [None, None];
    let mut last_open_edge_track: Option<FaceSideId> = None;

    while assigned < total {
        let mut found: Option<(usize, NewEdgeId)> = None;
        let mut insert_at_start = false;
        let group_count = groups.len();
        let starting = groups.last().map(|g| g.edges.is_empty());
        if let (Some(true), Some(group)) = (starting, groups.last_mut()) {
            // Start the next fan, preferring the open continuation of the last one.
            let mut pick = slots.iter().enumerate().find_map(|(j, slot)| {
                let e = (*slot)?;
                let ne = &store.new_edges[e];
                match last_open_edge_track {
                    Some(track) if ne.faces[0] != Some(track) || ne.faces[1].is_some() => None,
                    _ => Some((j, e)),
                }
            });
            if pick.is_none() && last_open_edge_track.is_some() {
                topo_groups += 1;
                last_open_edge_track = None;
                group.topo_group += 1;
                pick = slots.iter().enumerate().find_map(|(j, slot)| slot.map(|e| (j, e)));
            } else if last_open_edge_track.is_none() && group_count > 1 {
                topo_groups += 1;
                group.topo_group += 1;
            }
            let Some((j, e)) = pick else {
                break;
            };
            found = Some((j, e));
            let ne = &store.new_edges[e];
            if last_open_edge_track.is_none()
                && adj.merge.canonical(mesh.edges[ne.old_edge].verts[0]) == i
            {
                track = ne.faces;
                if ne.faces[1].is_none() {
                    last_open_edge_track = ne.faces[0].map(FaceSideId::opposite);
                }
            } else {
                track = [ne.faces[1], ne.faces[0]];
            }
        } else if let (Some(false), Some(group)) = (starting, groups.last_mut()) {
            for (j, slot) in slots.iter().enumerate() {
                let Some(e) = *slot else {
                    continue;
                };
                let ne = &store.new_edges[e];
                if ne.faces[0] == track[1] {
                    track[1] = ne.faces[1];
                    if ne.faces[1].is_none() {
                        group.is_orig_closed = false;
                        last_open_edge_track = ne.faces[0].map(FaceSideId::opposite);
                    }
                } else if ne.faces[0] == track[0] {
                    insert_at_start = true;
                    track[0] = ne.faces[1];
                    if ne.faces[1].is_none() {
                        group.is_orig_closed = false;
                    }
                } else if ne.faces[1].is_some() && ne.faces[1] == track[1] {
                    track[1] = ne.faces[0];
                } else if ne.faces[1].is_some() && ne.faces[1] == track[0] {
                    insert_at_start = true;
                    track[0] = ne.faces[0];
                } else {
                    continue;
                }
                found = Some((j, e));
                break;
            }
        }

        match (found, groups.last_mut()) {
            (Some((j, e)), Some(group)) => {
                slots[j] = None;
                assigned += 1;
                if insert_at_start {
                    group.edges.insert(0, e);
                } else {
                    group.edges.push(e);
                }
                if group
                    .edges
                    .last()
                    .is_some_and(|&last| store.new_edges[last].faces[1].is_some())
                {
                    last_open_edge_track = None;
                }
                if group.edges.len() > 3 {
                    contains_long_groups = true;
                }
            }
            _ => {
                groups.push(EdgeGroup::new(i, topo_groups));
                track = [None, None];
            }
        }
    }
    groups.retain(|g| !g.edges.is_empty());
    (groups, contains_long_groups)
}

/// One group cut out of a fan: `edges[start..end]`, wrapping past the end
/// of the fan when `start > end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Piece {
    start: usize,
    end: usize,
    split: u32,
    is_even_split: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct SplitPlan {
    pieces: Vec<Piece>,
    singular: bool,
}

/// Finds the cut points of a fan whose passes revisit the same original
/// edges. A cut lands halfway between the first unique pass after a run of
/// revisited passes and the next revisited pass.
fn plan_split(old_edges: &[usize], closed: bool) -> Option<SplitPlan> {
    let n = old_edges.len();
    let mut doubles = vec![false; n];
    for k in 0..n {
        for l in k + 1..n {
            if old_edges[k] == old_edges[l] {
                doubles[k] = true;
                doubles[l] = true;
            }
        }
    }
    if !doubles.contains(&true) {
        return None;
    }

    let mut plan = SplitPlan::default();
    let mut unique_start: Option<usize> = None;
    let mut first_unique_end: Option<usize> = None;
    let mut last_split: Option<usize> = None;
    let mut first_split: Option<usize> = None;
    let mut first_even_split = false;
    let mut real_k = 0usize;
    while real_k < n
        || (closed
            && real_k < 4 * n
            && (real_k <= first_unique_end.unwrap_or(0) + n || first_split != last_split))
    {
        let k = real_k % n;
        if !doubles[k] {
            if first_unique_end.is_some() && unique_start.is_none() {
                unique_start = Some(real_k);
            }
        } else if first_unique_end.is_none() {
            first_unique_end = Some(k);
        } else if let Some(start) = unique_start {
            let split = ((start + real_k + 1) / 2) % n;
            let is_even_split = (start + real_k) & 1 == 1;
            if let Some(last) = last_split {
                plan.pieces.push(Piece {
                    start: last,
                    end: split,
                    split: piece_number(plan.pieces.len() + 1 + usize::from(!closed)),
                    is_even_split,
                });
            }
            last_split = Some(split);
            if first_split.is_none() {
                first_split = Some(split);
                first_even_split = is_even_split;
            }
            unique_start = None;
        }
        real_k += 1;
    }

    if let (Some(first), Some(last)) = (first_split, last_split) {
        if !closed {
            let inner = plan.pieces.len();
            plan.pieces.insert(
                0,
                Piece {
                    start: 0,
                    end: first,
                    split: 1,
                    is_even_split: first_even_split,
                },
            );
            plan.pieces.push(Piece {
                start: last,
                end: n,
                split: piece_number(inner + 2),
                is_even_split: false,
            });
        }
    }
    plan.singular = first_unique_end.is_some() && plan.pieces.is_empty();
    Some(plan)
}

fn piece_number(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn split_fans(store: &SolidifyStore, groups: Vec<EdgeGroup>, summary: &mut FanSummary) -> Vec<EdgeGroup> {
    let mut out = Vec::with_capacity(groups.len());
    for mut g in groups {
        if g.edges.len() <= 3 {
            out.push(g);
            continue;
        }
        let old_edges: Vec<usize> = g.edges.iter().map(|&e| store.new_edges[e].old_edge).collect();
        let Some(plan) = plan_split(&old_edges, g.is_orig_closed) else {
            out.push(g);
            continue;
        };
        if plan.pieces.is_empty() {
            if plan.singular {
                g.is_singularity = true;
                summary.has_singularities = true;
            }
            out.push(g);
            continue;
        }
        summary.split_groups += plan.pieces.len();
        for piece in plan.pieces {
            let edges = if piece.start > piece.end {
                g.edges[piece.start..]
                    .iter()
                    .chain(&g.edges[..piece.end])
                    .copied()
                    .collect()
            } else {
                g.edges[piece.start..piece.end].to_vec()
            };
            out.push(EdgeGroup::split_from(&g, edges, piece.split, piece.is_even_split));
        }
    }
    out
}

/// Links the passes of vertex `i` to their fans, numbers the new vertices
/// and adds the boundary edges, loops and closing faces to `counts`.
#[allow(clippy::too_many_arguments)]
fn count_vertex(
    mesh: &Mesh,
    adj: &Adjacency,
    resolved: &Resolved,
    store: &mut SolidifyStore,
    i: usize,
    ids: &[EdgeGroupId],
    next_vert: &mut usize,
    counts: &mut ElementCounts,
) {
    let (do_shell, do_rim) = (resolved.do_shell, resolved.do_rim);
    let mut new_verts = 0i64;
    let mut contains_open_splits = false;
    let mut open_edges = 0i64;
    let mut contains_splits = 0i64;
    let mut last_added = 0u32;
    let mut first_added = 0u32;
    let mut first_set = false;

    for (idx, &gid) in ids.iter().enumerate() {
        for k in 0..store.groups[gid].edges.len() {
            let e = store.groups[gid].edges[k];
            let old = mesh.edges[store.new_edges[e].old_edge].verts;
            let flip = usize::from(adj.merge.canonical(old[1]) == i);
            store.new_edges[e].groups[flip] = Some(gid);
        }
        let g = &mut store.groups[gid];
        let mut added = 0u32;
        if do_shell || (do_rim && !g.is_orig_closed) {
            g.new_vert = Some(*next_vert);
            *next_vert += 1;
            if do_rim || (do_shell && g.split != 0) {
                new_verts += 1;
                contains_splits += i64::from(g.split != 0);
                contains_open_splits |= g.split != 0 && !g.is_orig_closed;
                added = g.split;
            }
        }
        open_edges += i64::from(added < last_added);
        if !first_set {
            first_set = true;
            first_added = added;
        }
        last_added = added;

        let topo_group = g.topo_group;
        let topo_end = ids
            .get(idx + 1)
            .map_or(true, |&next| store.groups[next].topo_group != topo_group);
        if topo_end {
            if new_verts > 2 {
                counts.polys += 1;
                counts.edges += new_verts;
                open_edges += i64::from(first_added < last_added);
                open_edges -= i64::from(open_edges != 0 && !contains_open_splits);
                counts.loops += if do_shell && do_rim {
                    new_verts * 2
                } else if do_shell {
                    new_verts * 2 - open_edges
                } else {
                    new_verts * 2 + open_edges - contains_splits
                };
            } else if new_verts == 2 {
                counts.edges += 1;
                counts.loops += 2 - i64::from(!(do_rim && do_shell) && contains_open_splits);
            }
            new_verts = 0;
            contains_open_splits = false;
            contains_splits = 0;
            open_edges = 0;
            last_added = 0;
            first_added = 0;
            first_set = false;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn fan_without_revisits_is_not_split() {
        assert_eq!(plan_split(&[0, 1, 2, 3], true), None);
    }

    #[test]
    fn closed_fan_splits_between_revisits() {
        // Two unique runs separated by revisited edges 7 and 9.
        let plan = plan_split(&[7, 1, 2, 9, 7, 3, 4, 9], true).unwrap();
        assert!(!plan.singular);
        assert_eq!(plan.pieces.len(), 2);
        let covered: usize = plan
            .pieces
            .iter()
            .map(|p| if p.start > p.end { p.end + 8 - p.start } else { p.end - p.start })
            .sum();
        assert_eq!(covered, 8);
        assert_eq!(plan.pieces[0].split, 1);
        assert_eq!(plan.pieces[1].split, 2);
    }

    #[test]
    fn open_fan_keeps_both_ends() {
        let plan = plan_split(&[0, 5, 1, 5, 2], false).unwrap();
        let first = plan.pieces.first().unwrap();
        let last = plan.pieces.last().unwrap();
        assert_eq!(first.start, 0);
        assert_eq!(first.split, 1);
        assert_eq!(last.end, 5);
        assert!(!last.is_even_split);
    }

    #[test]
    fn closed_fan_with_single_cut_is_singular() {
        let plan = plan_split(&[3, 3, 1, 2], true).unwrap();
        assert!(plan.pieces.is_empty());
        assert!(plan.singular);
    }
}
