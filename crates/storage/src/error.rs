use thiserror::Error;

use sweeply_recurrence::traits::RepositoryError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("{0}")]
    Other(String),
}

impl From<StoreError> for RepositoryError {
    /// IO failures are transient (retryable); a record that fails to
    /// serialize or deserialize is permanent.
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Io(e) => RepositoryError::Transient(e.to_string()),
            other => RepositoryError::Permanent(other.to_string()),
        }
    }
}
