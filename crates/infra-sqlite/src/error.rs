// sqlx::Error -> AppError mapping

use courier_core::error::AppError;

/// Convert sqlx::Error to AppError with structured information
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            // SQLite error codes: https://www.sqlite.org/rescode.html
            Some(code) => match code.as_ref() {
                "2067" | "1555" => AppError::Queue(format!(
                    "Unique constraint violation: {} ({})",
                    db_err.message(),
                    code
                )),
                "5" => AppError::Queue(format!(
                    "Database locked (SQLITE_BUSY): {}",
                    db_err.message()
                )),
                "13" => AppError::Queue(format!("Database full: {}", db_err.message())),
                other => AppError::Queue(format!(
                    "Database error [{}]: {}",
                    other,
                    db_err.message()
                )),
            },
            None => AppError::Queue(format!("Database error: {}", db_err.message())),
        },
        sqlx::Error::RowNotFound => AppError::Queue("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => AppError::Queue(format!("Column not found: {}", col)),
        sqlx::Error::PoolTimedOut => AppError::Queue("Connection pool timed out".to_string()),
        _ => AppError::Queue(err.to_string()),
    }
}
