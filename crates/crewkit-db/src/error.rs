//! Database-specific error types and conversions.

use std::time::Duration;

use crewkit_core::error::CollabError;

/// Bounded timeout applied to every store operation.
pub(crate) const OP_TIMEOUT: Duration = Duration::from_secs(5);

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("query failed: {0}")]
    Query(String),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("store operation timed out")]
    Timeout,
}

impl From<DbError> for CollabError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CollabError::NotFound { entity, id },
            DbError::Conflict { message } => CollabError::Conflict { message },
            DbError::Timeout => CollabError::Transient(err.to_string()),
            other => CollabError::Database(other.to_string()),
        }
    }
}

/// Await a store operation under [`OP_TIMEOUT`], surfacing elapse as
/// the retryable [`DbError::Timeout`].
pub(crate) async fn timed<T, F>(fut: F) -> Result<T, DbError>
where
    F: IntoFuture<Output = Result<T, surrealdb::Error>>,
{
    match tokio::time::timeout(OP_TIMEOUT, fut).await {
        Ok(result) => result.map_err(DbError::from),
        Err(_) => Err(DbError::Timeout),
    }
}

/// Map a statement-check failure, turning a UNIQUE index violation into
/// the given conflict message.
pub(crate) fn check_failure(err: surrealdb::Error, unique_conflict: &str) -> DbError {
    let text = err.to_string();
    if text.contains("already contains") {
        DbError::Conflict {
            message: unique_conflict.into(),
        }
    } else {
        DbError::Query(text)
    }
}
