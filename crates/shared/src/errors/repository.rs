use sqlx::Error as SqlxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Sqlx(#[from] SqlxError),

    #[error("Record not found")]
    NotFound,

    /// Unique key already taken, e.g. a second order for one payment id.
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

impl RepositoryError {
    /// Maps a unique violation on insert to `AlreadyExists`.
    pub fn on_insert(err: SqlxError, describe: impl FnOnce() -> String) -> Self {
        match err {
            SqlxError::Database(db) if db.is_unique_violation() => {
                RepositoryError::AlreadyExists(describe())
            }
            other => RepositoryError::Sqlx(other),
        }
    }
}
