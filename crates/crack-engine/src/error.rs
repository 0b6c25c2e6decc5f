use thiserror::Error;

use crack_core::CrackError;
use geom_kernel::KernelError;

/// Errors from orchestration and materialization.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Crack(#[from] CrackError),

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    /// An accepted crack point could not be located on the geometry it was
    /// computed for. Fatal for the current feature.
    #[error("no vertex or segment found at ({x}, {y}) during materialization")]
    VertexNotFound { x: f64, y: f64 },
}
