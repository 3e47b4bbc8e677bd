pub mod solidify;

pub use solidify::{
    BoundaryMode, OffsetMode, PolygonKind, Provenance, Solidify, SolidifyOutput, SolidifyParams,
    SolidifyWarning, SourceMap, VertexMergeMap,
};
