use std::fmt;

/// Errors raised by the data and storage collaborators.
///
/// Uses `String` for external error details to keep `Clone` + `Eq`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BackendError {
    /// Record not found by id within a model collection.
    RecordNotFound { model: String, id: String },
    /// Pre-write validation failed for a specific field.
    ValidationFailed { field: String, reason: String },
    /// Connection or transport-level error.
    ConnectionError { message: String },
    /// File storage could not read or write an object.
    StorageError { location: String, message: String },
    /// Internal or unexpected error.
    Internal { message: String },
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RecordNotFound { model, id } => {
                write!(f, "record '{id}' not found in model '{model}'")
            }
            Self::ValidationFailed { field, reason } => {
                write!(f, "validation failed for field '{field}': {reason}")
            }
            Self::ConnectionError { message } => {
                write!(f, "backend connection error: {message}")
            }
            Self::StorageError { location, message } => {
                write!(f, "storage error at '{location}': {message}")
            }
            Self::Internal { message } => {
                write!(f, "internal backend error: {message}")
            }
        }
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_not_found_display() {
        let err = BackendError::RecordNotFound {
            model: "test".into(),
            id: "abc123".into(),
        };
        assert_eq!(err.to_string(), "record 'abc123' not found in model 'test'");
    }

    #[test]
    fn validation_failed_display() {
        let err = BackendError::ValidationFailed {
            field: "id".into(),
            reason: "cannot be changed".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'id'"));
        assert!(msg.contains("cannot be changed"));
    }

    #[test]
    fn storage_error_display() {
        let err = BackendError::StorageError {
            location: "/tmp/uploads/a.png".into(),
            message: "permission denied".into(),
        };
        assert!(err.to_string().contains("/tmp/uploads/a.png"));
    }

    #[test]
    fn connection_and_internal_display() {
        let conn = BackendError::ConnectionError {
            message: "connection refused".into(),
        };
        assert!(conn.to_string().contains("connection refused"));
        let internal = BackendError::Internal {
            message: "unexpected null".into(),
        };
        assert!(internal.to_string().contains("unexpected null"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BackendError>();
    }
}
