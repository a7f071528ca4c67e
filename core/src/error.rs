use thiserror::Error;

/// Failures surfaced by the nutrition store.
///
/// Only a duplicate food name is classified; every other persistence failure
/// carries the underlying message unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Food '{0}' already exists in database")]
    DuplicateFood(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StoreError {
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateFood(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// True when `err` is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
