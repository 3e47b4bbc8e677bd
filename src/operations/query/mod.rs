mod bounding_box;
mod edge_usage;
mod normals;
mod volume;

pub use bounding_box::{Aabb, BoundingBox};
pub use edge_usage::{EdgeUsage, EdgeUsageReport};
pub use normals::{FaceNormals, VertexNormals};
pub use volume::Volume;
