use thiserror::Error;

/// Errors raised while producing canonical encodings
#[derive(Error, Debug)]
pub enum CanonicalError {
    #[error("JSON encode failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Common Result type alias
pub type CommonResult<T> = Result<T, CanonicalError>;
