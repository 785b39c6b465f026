use naoty_core::error::CoreError;

/// Failure of a storage-backed operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Domain rule violation, propagated unchanged.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Whether retrying the whole operation could succeed.
    ///
    /// Pool exhaustion, dropped connections, serialization failures (40001)
    /// and deadlocks (40P01). Domain errors are never transient.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Core(_) => false,
            StoreError::Database(err) => match err {
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
                sqlx::Error::Database(db) => {
                    matches!(db.code().as_deref(), Some("40001") | Some("40P01"))
                }
                _ => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_are_not_transient() {
        let err = StoreError::from(CoreError::InvalidAction("no".into()));
        assert!(!err.is_transient());
    }

    #[test]
    fn pool_timeout_is_transient() {
        assert!(StoreError::from(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!StoreError::from(sqlx::Error::RowNotFound).is_transient());
    }
}
