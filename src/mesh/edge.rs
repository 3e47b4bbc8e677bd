use bitflags::bitflags;

bitflags! {
    /// Per-edge flag bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EdgeFlags: u8 {
        /// Edge is a UV seam.
        const SEAM = 1 << 0;
        /// Edge is rendered sharp.
        const SHARP = 1 << 1;
    }
}

/// An undirected edge between two vertices.
///
/// The order of `verts` is not semantically meaningful but is preserved, since
/// corners record which direction they traverse an edge in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// The two vertex indices.
    pub verts: [usize; 2],
    /// Flag bits.
    pub flags: EdgeFlags,
}

impl Edge {
    /// Creates an unflagged edge.
    #[must_use]
    pub fn new(v0: usize, v1: usize) -> Self {
        Self {
            verts: [v0, v1],
            flags: EdgeFlags::empty(),
        }
    }

    /// Returns `true` if `vertex` is one of the endpoints.
    #[must_use]
    pub fn contains(&self, vertex: usize) -> bool {
        self.verts[0] == vertex || self.verts[1] == vertex
    }

    /// Returns the endpoint opposite to `vertex`.
    ///
    /// If `vertex` is not an endpoint, the first endpoint is returned.
    #[must_use]
    pub fn other(&self, vertex: usize) -> usize {
        if self.verts[0] == vertex {
            self.verts[1]
        } else {
            self.verts[0]
        }
    }

    /// Returns `true` if both edges join the same pair of vertices.
    #[must_use]
    pub fn same_endpoints(&self, other: &Edge) -> bool {
        (self.verts[0] == other.verts[0] && self.verts[1] == other.verts[1])
            || (self.verts[0] == other.verts[1] && self.verts[1] == other.verts[0])
    }
}
