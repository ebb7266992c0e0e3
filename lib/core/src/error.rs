use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("CSV parse error: {0}")]
    Parse(String),

    #[error("Table has no columns")]
    EmptyTable,

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Errors that leave the session unusable until the backend is fixed
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ModelUnavailable(_))
    }
}
