use blog_auth_api::store_codes;

/// Repository layer errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Connection pool error: {0}")]
    PoolError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),
    #[error("Foreign key constraint violation: {0}")]
    ForeignKeyViolation(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl RepositoryError {
    /// Stable code of the failure, reported to API callers in
    /// `ErrorResponse::details`.
    pub fn code(&self) -> &'static str {
        match self {
            RepositoryError::PoolError(_) => store_codes::UNREACHABLE,
            RepositoryError::NotFound(_) => store_codes::RECORD_NOT_FOUND,
            RepositoryError::UniqueViolation(_) => store_codes::UNIQUE_VIOLATION,
            RepositoryError::ForeignKeyViolation(_) => store_codes::FOREIGN_KEY_VIOLATION,
            RepositoryError::DatabaseError(_) => store_codes::QUERY_FAILED,
        }
    }
}

impl From<diesel::result::Error> for RepositoryError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};

        match err {
            Error::NotFound => RepositoryError::NotFound("Record not found".to_string()),
            Error::DatabaseError(kind, info) => {
                let message = info.message().to_string();
                match kind {
                    DatabaseErrorKind::UniqueViolation => RepositoryError::UniqueViolation(message),
                    DatabaseErrorKind::ForeignKeyViolation => {
                        RepositoryError::ForeignKeyViolation(message)
                    }
                    DatabaseErrorKind::ClosedConnection => RepositoryError::PoolError(message),
                    _ => RepositoryError::DatabaseError(message),
                }
            }
            _ => RepositoryError::DatabaseError(err.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for RepositoryError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        RepositoryError::PoolError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error};

    struct Info(&'static str);

    impl DatabaseErrorInformation for Info {
        fn message(&self) -> &str {
            self.0
        }
        fn details(&self) -> Option<&str> {
            None
        }
        fn hint(&self) -> Option<&str> {
            None
        }
        fn table_name(&self) -> Option<&str> {
            Some("users")
        }
        fn column_name(&self) -> Option<&str> {
            None
        }
        fn constraint_name(&self) -> Option<&str> {
            Some("users_email_key")
        }
        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    fn db_error(kind: DatabaseErrorKind) -> Error {
        Error::DatabaseError(kind, Box::new(Info("duplicate key value")))
    }

    #[test]
    fn unique_violation_maps_to_p2002() {
        let err = RepositoryError::from(db_error(DatabaseErrorKind::UniqueViolation));
        assert!(matches!(err, RepositoryError::UniqueViolation(_)));
        assert_eq!(err.code(), "P2002");
    }

    #[test]
    fn foreign_key_violation_maps_to_p2003() {
        let err = RepositoryError::from(db_error(DatabaseErrorKind::ForeignKeyViolation));
        assert_eq!(err.code(), "P2003");
    }

    #[test]
    fn diesel_not_found_maps_to_p2025() {
        let err = RepositoryError::from(Error::NotFound);
        assert_eq!(err.code(), "P2025");
        assert_eq!(err.to_string(), "Not found: Record not found");
    }
}
