use thiserror::Error;

/// Failure taxonomy for the capture-to-recommendation pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid capture payload: {0}")]
    InvalidImageInput(String),

    #[error("emotion model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("video search unavailable: {0}")]
    SearchUnavailable(String),

    #[error("not enough songs in bucket: wanted {wanted}, found {available}")]
    InsufficientData { wanted: usize, available: usize },
}
