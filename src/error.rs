use thiserror::Error;

use crate::models::UserId;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("no profile for user {0}")]
    NotFound(UserId),

    /// The ledger is in a state its own writes can never produce.
    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("chat channel failure: {0}")]
    Channel(String),
}

impl AppError {
    /// Transient failures leave the session where it was; the user may retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Storage(_) | AppError::Channel(_))
    }
}
