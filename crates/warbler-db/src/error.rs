use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// A uniqueness, not-null, check or foreign-key constraint rejected the write.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// A row the current transaction just wrote or expects is not there.
    #[error("missing row: {0}")]
    Missing(String),

    #[error("sqlite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("database lock poisoned: {0}")]
    Poisoned(String),
}

impl DbError {
    pub fn is_integrity(&self) -> bool {
        matches!(self, DbError::Integrity(_))
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, msg)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                DbError::Integrity(msg.clone().unwrap_or_else(|| err.to_string()))
            }
            _ => DbError::Sqlite(err),
        }
    }
}
