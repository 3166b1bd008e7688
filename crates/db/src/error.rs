use herald_core::error::CoreError;

/// Datastore failure, classified so callers can tell "not found" and
/// "constraint violation" apart from infrastructure faults.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    /// Unique constraint violation; carries the constraint name.
    #[error("Duplicate value violates unique constraint: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(ref db_err) if db_err.code().as_deref() == Some("23505") => {
                StoreError::Conflict(db_err.constraint().unwrap_or("unknown").to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(constraint) => CoreError::Conflict(format!(
                "Duplicate value violates unique constraint: {constraint}"
            )),
            other => CoreError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn row_not_found_is_classified() {
        assert_matches!(StoreError::from(sqlx::Error::RowNotFound), StoreError::NotFound);
    }

    #[test]
    fn infrastructure_errors_stay_database_errors() {
        assert_matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Database(sqlx::Error::PoolTimedOut)
        );
    }

    #[test]
    fn conflict_maps_to_core_conflict() {
        let core: CoreError = StoreError::Conflict("uq_members_email".into()).into();
        assert_matches!(core, CoreError::Conflict(msg) if msg.contains("uq_members_email"));
    }

    #[test]
    fn database_error_maps_to_core_internal() {
        let core: CoreError = StoreError::Database(sqlx::Error::PoolClosed).into();
        assert_matches!(core, CoreError::Internal(_));
    }
}
