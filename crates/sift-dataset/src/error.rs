use thiserror::Error;

pub type DatasetResult<T> = std::result::Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("invalid split config: {0}")]
    InvalidConfig(String),

    #[error("dataset is empty; cannot split")]
    Empty,

    #[error("row {index} has no usable '{field}' value")]
    MissingField { index: usize, field: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
