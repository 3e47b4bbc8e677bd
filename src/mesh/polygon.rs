use std::ops::Range;

use bitflags::bitflags;

bitflags! {
    /// Per-polygon flag bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PolyFlags: u8 {
        /// Polygon is shaded smooth.
        const SMOOTH = 1 << 0;
    }
}

/// A polygon, stored as a contiguous run of corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Polygon {
    /// Index of the first corner.
    pub loop_start: usize,
    /// Number of corners.
    pub loop_len: usize,
    /// Material slot.
    pub material_index: i32,
    /// Flag bits.
    pub flags: PolyFlags,
}

impl Polygon {
    /// Creates a polygon with material 0 and no flags.
    #[must_use]
    pub fn new(loop_start: usize, loop_len: usize) -> Self {
        Self {
            loop_start,
            loop_len,
            material_index: 0,
            flags: PolyFlags::empty(),
        }
    }

    /// The corner index range of this polygon.
    #[must_use]
    pub fn corners(&self) -> Range<usize> {
        self.loop_start..self.loop_start + self.loop_len
    }
}

/// A polygon corner.
///
/// `edge` joins `vert` to the vertex of the next corner in winding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Corner {
    /// Vertex index.
    pub vert: usize,
    /// Edge index.
    pub edge: usize,
}

impl Corner {
    #[must_use]
    pub fn new(vert: usize, edge: usize) -> Self {
        Self { vert, edge }
    }
}
