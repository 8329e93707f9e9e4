//! Repository Module
//!
//! Free async functions over `SqlitePool` or an open transaction.
//! Functions that take `&mut Transaction` never commit; the caller owns the unit of work.

pub mod buyer;
pub mod notification;
pub mod order;
pub mod payment_event;
pub mod product;
pub mod stock;

use shared::error::{AppError, ErrorCode};
use thiserror::Error;

/// Open SQLite transaction
pub type Tx<'a> = sqlx::Transaction<'a, sqlx::Sqlite>;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    /// 写锁等待超时 (SQLITE_BUSY) 或连接池耗尽
    #[error("Database busy: {0}")]
    Busy(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepoError::NotFound(err.to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Duplicate(db.message().to_string())
            }
            sqlx::Error::Database(db) if db.is_check_violation() => {
                RepoError::Validation(db.message().to_string())
            }
            sqlx::Error::Database(db) if matches!(db.code().as_deref(), Some("5") | Some("6")) => {
                RepoError::Busy(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut => RepoError::Busy("connection pool timed out".into()),
            _ => RepoError::Database(err.to_string()),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::not_found(msg),
            RepoError::Duplicate(msg) => AppError::with_message(ErrorCode::AlreadyExists, msg),
            RepoError::Validation(msg) => AppError::validation(msg),
            RepoError::Database(msg) => AppError::database(msg),
            RepoError::Busy(msg) => AppError::busy(msg),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
