//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] ledger_persistence::PersistenceError),
}

pub type AppResult<T> = Result<T, AppError>;
