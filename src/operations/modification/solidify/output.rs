use thiserror::Error;

use crate::mesh::Mesh;

/// Input element an output element copies its attributes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// A direct counterpart of the input element.
    Original(usize),
    /// Generated geometry using the input element only as an attribute template.
    Template(usize),
}

impl Provenance {
    /// Index of the input element.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Original(i) | Self::Template(i) => i,
        }
    }
}

/// What produced an output polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonKind {
    /// An offset copy of an input polygon; `back` is the reversed side.
    Shell { back: bool },
    /// A quad joining the two shell sides along an open edge.
    Rim,
    /// An N-gon closing a branching boundary around one vertex.
    Closure,
}

/// Attribute pass-through for every output element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMap {
    /// Input vertex of each output vertex.
    pub vertices: Vec<usize>,
    pub edges: Vec<Provenance>,
    pub polygons: Vec<Provenance>,
    /// Input corner of each output corner.
    pub corners: Vec<usize>,
    pub polygon_kinds: Vec<PolygonKind>,
}

impl SourceMap {
    /// The map of a mesh passed through unchanged.
    #[must_use]
    pub fn identity(mesh: &Mesh) -> Self {
        Self {
            vertices: (0..mesh.vertex_count()).collect(),
            edges: (0..mesh.edge_count()).map(Provenance::Original).collect(),
            polygons: (0..mesh.polygon_count()).map(Provenance::Original).collect(),
            corners: (0..mesh.corner_count()).collect(),
            polygon_kinds: vec![PolygonKind::Shell { back: false }; mesh.polygon_count()],
        }
    }
}

/// Non-fatal problems found while building the shell.
///
/// The mesh is still produced; any warning other than
/// [`SolidifyWarning::FacesNeeded`] points at an internal inconsistency.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolidifyWarning {
    #[error("internal error: {element} array wrong size: {written} instead of {predicted}")]
    SizeMismatch {
        element: &'static str,
        predicted: i64,
        written: i64,
    },

    #[error("faces needed for useful output")]
    FacesNeeded,

    #[error("edge fan at vertex {vertex} has only {edges} edge(s)")]
    UndersizedFan { vertex: usize, edges: usize },

    #[error("boundary edge at vertex {vertex} was never created, using edge 0")]
    MissingBoundaryEdge { vertex: usize },

    #[error("side of input edge {edge} has no output vertex, using vertex 0")]
    UnplacedVertex { edge: usize },

    #[error("repaired {corners} corner(s) and removed {polygons} polygon(s) with inconsistent loops")]
    RepairedLoops { corners: usize, polygons: usize },
}

/// Result of [`Solidify`](super::Solidify).
#[derive(Debug, Clone, PartialEq)]
pub struct SolidifyOutput {
    pub mesh: Mesh,
    pub sources: SourceMap,
    pub warnings: Vec<SolidifyWarning>,
}
