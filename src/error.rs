use sea_orm::{DbErr, RuntimeErr, SqlErr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Referential integrity violation: {0}")]
    ReferentialIntegrity(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Transient database error: {0}")]
    Transient(DbErr),

    #[error("ORM error: {0}")]
    OrmError(DbErr),

    #[error("Invalid mapping: {0}")]
    Mapping(String),

    #[error("Sequence repair failed for {table}: {source}")]
    SequenceRepair {
        table: String,
        #[source]
        source: DbErr,
    },

    #[error("Internal Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Only connectivity-class failures are worth retrying, and only by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Transient(_))
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::ForeignKeyConstraintViolation(msg)) => {
                return AppError::ReferentialIntegrity(msg);
            }
            Some(SqlErr::UniqueConstraintViolation(msg)) => return AppError::Conflict(msg),
            _ => {}
        }
        if is_transient(&err) {
            AppError::Transient(err)
        } else {
            AppError::OrmError(err)
        }
    }
}

impl From<sea_orm::sea_query::error::Error> for AppError {
    fn from(err: sea_orm::sea_query::error::Error) -> Self {
        AppError::Internal(anyhow::anyhow!("statement build failed: {err}"))
    }
}

fn is_transient(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) => true,
        DbErr::Conn(RuntimeErr::SqlxError(e))
        | DbErr::Exec(RuntimeErr::SqlxError(e))
        | DbErr::Query(RuntimeErr::SqlxError(e)) => is_transient_sqlx(e),
        _ => false,
    }
}

fn is_transient_sqlx(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => db.code().is_some_and(|code| is_transient_sqlstate(&code)),
        _ => false,
    }
}

/// Connection exceptions, serialization failures, deadlocks and admin shutdowns.
fn is_transient_sqlstate(code: &str) -> bool {
    code.starts_with("08") || matches!(code, "40001" | "40P01" | "57P01" | "57P02" | "57P03")
}

pub type AppResult<T> = Result<T, AppError>;
