use thiserror::Error;

use forgedesk_core::DomainError;

/// Failures raised by a storage backend.
///
/// Domain rule violations never appear here; they travel as [`DomainError`]
/// inside [`EngineError::Domain`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write (Postgres `23505`).
    #[error("conflicting write: {0}")]
    Conflict(String),

    /// A constraint other than uniqueness rejected the write.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// A stored value could not be decoded into its domain type.
    #[error("failed to decode stored row: {0}")]
    Decode(String),

    /// The backend is closed or unreachable.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Error returned by every engine operation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    /// The domain error, if this is one.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            EngineError::Domain(err) => Some(err),
            EngineError::Store(_) => None,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Map SQLx errors to `StoreError`.
///
/// | SQLx error | Postgres code | StoreError |
/// |---|---|---|
/// | Database (unique violation) | `23505` | `Conflict` |
/// | Database (foreign key / check) | `23503`, `23514` | `Constraint` |
/// | Database (other) | any | `Backend` |
/// | PoolClosed, PoolTimedOut, Io | n/a | `Unavailable` |
/// | ColumnDecode, Decode, RowNotFound | n/a | `Decode` |
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") | Some("23514") => StoreError::Constraint(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool unavailable in {}", operation))
        }
        sqlx::Error::Io(io) => StoreError::Unavailable(format!("io error in {}: {}", operation, io)),
        sqlx::Error::RowNotFound => {
            StoreError::Decode(format!("unexpected row not found in {}", operation))
        }
        err @ (sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_)) => {
            StoreError::Decode(format!("{} in {}", err, operation))
        }
        other => StoreError::Backend(format!("sqlx error in {}: {}", operation, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_pass_through_unchanged() {
        let err: EngineError = DomainError::integrity("stock would go negative").into();
        assert_eq!(
            err.as_domain(),
            Some(&DomainError::Integrity("stock would go negative".into()))
        );
        assert_eq!(err.to_string(), "integrity violation: stock would go negative");
    }

    #[test]
    fn pool_closed_is_unavailable() {
        match map_sqlx_error("begin", sqlx::Error::PoolClosed) {
            StoreError::Unavailable(msg) if msg.contains("begin") => {}
            other => panic!("Expected Unavailable, got {other:?}"),
        }
    }
}
