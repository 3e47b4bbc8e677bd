pub mod polygon_3d;
pub mod vector_3d;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// 3x3 matrix type.
pub type Matrix3 = nalgebra::Matrix3<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Threshold used by the solver heuristics (single-precision machine epsilon).
pub const SOLVER_EPSILON: f64 = 1.192_092_9e-7;
