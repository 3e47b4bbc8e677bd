use thiserror::Error;

/// Top-level error type for the Solidus mesh kernel.
#[derive(Debug, Error)]
pub enum SolidusError {
    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error(transparent)]
    Tessellation(#[from] TessellationError),
}

/// Errors raised when a mesh does not describe valid connectivity.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("{element} index {index} is out of range (len {len})")]
    IndexOutOfRange {
        element: &'static str,
        index: usize,
        len: usize,
    },

    #[error("polygon {polygon} has {corners} corners, at least 3 are required")]
    DegeneratePolygon { polygon: usize, corners: usize },

    #[error("corner {corner} references edge {edge}, which does not join the corner to the next one")]
    BrokenCornerEdge { corner: usize, edge: usize },

    #[error("{layer} layer has {actual} values, expected {expected}")]
    LayerLength {
        layer: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Errors related to mesh operations.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Errors related to tessellation.
#[derive(Debug, Error)]
pub enum TessellationError {
    #[error("tessellation failed: {0}")]
    Failed(String),
}

/// Convenience type alias for results using [`SolidusError`].
pub type Result<T> = std::result::Result<T, SolidusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_errors_convert_into_top_level_error() {
        let err: SolidusError = MeshError::DegeneratePolygon {
            polygon: 3,
            corners: 2,
        }
        .into();
        assert!(matches!(err, SolidusError::Mesh(_)));
        assert_eq!(
            err.to_string(),
            "polygon 3 has 2 corners, at least 3 are required"
        );
    }

    #[test]
    fn operation_error_message() {
        let err: SolidusError = OperationError::InvalidInput("thickness is NaN".into()).into();
        assert_eq!(err.to_string(), "invalid input: thickness is NaN");
    }
}
