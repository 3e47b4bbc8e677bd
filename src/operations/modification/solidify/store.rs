use slotmap::SlotMap;

use crate::math::{Point3, Vector3};

slotmap::new_key_type! {
    /// Identifier of one side-pass of an original edge.
    pub struct NewEdgeId;
}

slotmap::new_key_type! {
    /// Identifier of an edge fan around an original vertex.
    pub struct EdgeGroupId;
}

/// One oriented side of an original polygon.
///
/// Side `2p` is the front of polygon `p` and side `2p + 1` its back, so the
/// opposite side is found by flipping the lowest bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceSideId(usize);

impl FaceSideId {
    #[must_use]
    pub fn new(polygon: usize, reversed: bool) -> Self {
        Self(polygon * 2 + usize::from(reversed))
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }

    #[must_use]
    pub fn polygon(self) -> usize {
        self.0 / 2
    }

    #[must_use]
    pub fn reversed(self) -> bool {
        self.0 & 1 == 1
    }

    #[must_use]
    pub fn opposite(self) -> Self {
        Self(self.0 ^ 1)
    }
}

/// Per-corner links of a face side to the side-passes representing its edges.
#[derive(Debug, Clone)]
pub struct FaceSide {
    pub polygon: usize,
    pub reversed: bool,
    pub links: Vec<Option<NewEdgeId>>,
}

/// One side-pass of an original edge, between two consecutive face sides
/// around the edge. Boundary edges pair a side with nothing.
#[derive(Debug, Clone)]
pub struct NewEdge {
    pub old_edge: usize,
    pub faces: [Option<FaceSideId>; 2],
    /// Fans at the edge's first and second original vertex.
    pub groups: [Option<EdgeGroupId>; 2],
    /// Angle between the two face sides around the edge, `[0, 2π)`.
    pub angle: f64,
    /// Whether the pass becomes an output edge.
    pub wanted: bool,
    /// Output edge index once emitted.
    pub output: Option<usize>,
}

/// An ordered fan of side-passes around one original vertex.
#[derive(Debug, Clone)]
pub struct EdgeGroup {
    pub vertex: usize,
    pub edges: Vec<NewEdgeId>,
    pub is_orig_closed: bool,
    pub is_even_split: bool,
    /// Position among the groups produced by splitting a fan, `0` if unsplit.
    pub split: u32,
    pub is_singularity: bool,
    pub topo_group: u32,
    pub co: Point3,
    pub no: Vector3,
    pub new_vert: Option<usize>,
}

impl EdgeGroup {
    pub fn new(vertex: usize, topo_group: u32) -> Self {
        Self {
            vertex,
            edges: Vec::new(),
            is_orig_closed: true,
            is_even_split: false,
            split: 0,
            is_singularity: false,
            topo_group,
            co: Point3::origin(),
            no: Vector3::zeros(),
            new_vert: None,
        }
    }

    /// A group carved out of `parent` by a fan split.
    pub fn split_from(parent: &EdgeGroup, edges: Vec<NewEdgeId>, split: u32, is_even_split: bool) -> Self {
        Self {
            edges,
            is_orig_closed: parent.is_orig_closed,
            is_even_split,
            split,
            ..Self::new(parent.vertex, parent.topo_group)
        }
    }
}

/// Predicted or written output sizes.
///
/// Signed so that the decrements of the analysis pass never wrap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElementCounts {
    pub verts: i64,
    pub edges: i64,
    pub loops: i64,
    pub polys: i64,
}

/// Converts an element count for use in [`ElementCounts`].
pub fn count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Arena owning the face sides, side-passes and fans of one invocation.
#[derive(Debug, Default)]
pub struct SolidifyStore {
    pub sides: Vec<FaceSide>,
    pub new_edges: SlotMap<NewEdgeId, NewEdge>,
    pub groups: SlotMap<EdgeGroupId, EdgeGroup>,
    /// Side-pass list per original edge, keyed by the edge that created it.
    pub edge_lists: Vec<Vec<NewEdgeId>>,
    /// The edge whose list each original edge uses.
    pub edge_owner: Vec<Option<usize>>,
    /// Fans per original vertex, in construction order.
    pub vertex_groups: Vec<Vec<EdgeGroupId>>,
}

impl SolidifyStore {
    /// Side-passes created for `edge`, if `edge` owns its list.
    pub fn owned_list(&self, edge: usize) -> Option<&[NewEdgeId]> {
        match self.edge_owner[edge] {
            Some(owner) if owner == edge => Some(&self.edge_lists[edge]),
            _ => None,
        }
    }

    /// Side-passes used by `edge`, owned or shared.
    pub fn list(&self, edge: usize) -> Option<&[NewEdgeId]> {
        self.edge_owner[edge].map(|owner| self.edge_lists[owner].as_slice())
    }

    pub fn group_of(&self, edge: NewEdgeId, end: usize) -> Option<&EdgeGroup> {
        self.new_edges[edge].groups[end].and_then(|g| self.groups.get(g))
    }

    /// `true` if both ends of the pass are singular fans.
    pub fn is_singular(&self, edge: NewEdgeId) -> bool {
        matches!(
            (self.group_of(edge, 0), self.group_of(edge, 1)),
            (Some(a), Some(b)) if a.is_singularity && b.is_singularity
        )
    }

    /// Output vertices at the two ends of the pass.
    pub fn end_verts(&self, edge: NewEdgeId) -> [Option<usize>; 2] {
        [
            self.group_of(edge, 0).and_then(|g| g.new_vert),
            self.group_of(edge, 1).and_then(|g| g.new_vert),
        ]
    }
}
