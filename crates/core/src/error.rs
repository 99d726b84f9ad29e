use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid data: {0}")]
    InvalidData(String),
}
