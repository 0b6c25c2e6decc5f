use thiserror::Error;

/// Errors raised by kernel operations.
#[derive(Debug, Clone, Error)]
pub enum KernelError {
    /// The requested cluster/search tolerance is too large relative to the
    /// extent of the geometries; the intersection result would be meaningless.
    #[error("cluster tolerance {tolerance} too large for extent {extent}")]
    ClusterToleranceTooLarge { tolerance: f64, extent: f64 },

    #[error("operation requires a non-empty geometry")]
    EmptyGeometry,

    #[error("vertex index {index} out of range (part has {count} vertices)")]
    VertexIndexOutOfRange { index: usize, count: usize },

    #[error("segment index {index} out of range (part has {count} segments)")]
    SegmentIndexOutOfRange { index: usize, count: usize },

    #[error("degenerate geometry: {0}")]
    Degenerate(String),
}
