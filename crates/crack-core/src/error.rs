use thiserror::Error;

use geom_kernel::KernelError;

/// Errors from crack-point computation.
#[derive(Debug, Error)]
pub enum CrackError {
    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("source geometry is empty")]
    EmptySource,

    #[error("target geometry is empty")]
    EmptyTarget,
}
