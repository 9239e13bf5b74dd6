use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("Unauthenticated: no actor is signed in")]
    Unauthenticated,

    #[error("Operation already in progress: {0}")]
    OperationInProgress(String),

    #[error("Remote write failed: {0}")]
    RemoteWriteFailed(String),

    #[error("Remote read failed: {0}")]
    RemoteReadFailed(String),

    #[error("Cache I/O failed: {0}")]
    CacheIoFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AppError {
    /// 同一キーへの書き込みが進行中であることを示すエラーか
    pub fn is_contention(&self) -> bool {
        matches!(self, AppError::OperationInProgress(_))
    }

    pub fn in_progress(key: impl Into<String>) -> Self {
        AppError::OperationInProgress(key.into())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::CacheIoFailed(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
