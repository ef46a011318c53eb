// src/common/db_utils.rs

use crate::common::error::AppError;

/// True when the error is a unique-constraint violation reported by Postgres.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db_err| db_err.is_unique_violation())
        .unwrap_or(false)
}

/// Maps a unique violation to `on_conflict`, everything else to `DatabaseError`.
pub fn map_unique(err: sqlx::Error, on_conflict: impl FnOnce() -> AppError) -> AppError {
    if is_unique_violation(&err) {
        on_conflict()
    } else {
        AppError::DatabaseError(err)
    }
}
