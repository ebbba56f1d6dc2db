/// Domain-level errors shared across the workspace.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Calibration error: {0}")]
    Calibration(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}
