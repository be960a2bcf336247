//! Store error types

use thiserror::Error;

/// Errors raised by a `HealthStore`
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Export XML could not be parsed
    #[error("XML error: {0}")]
    Xml(String),

    /// Export archive could not be read
    #[error("Archive error: {0}")]
    Archive(String),

    /// Archive holds no `export.xml`
    #[error("No export.xml found in {0}")]
    MissingExport(String),

    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    /// The store rejected or failed a query
    #[error("Query failed: {0}")]
    Query(String),

    /// Health data is not available on this store
    #[error("Health data unavailable")]
    Unavailable,

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),
}

impl From<quick_xml::Error> for StoreError {
    fn from(err: quick_xml::Error) -> Self {
        StoreError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for StoreError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        StoreError::Xml(err.to_string())
    }
}

impl From<zip::result::ZipError> for StoreError {
    fn from(err: zip::result::ZipError) -> Self {
        StoreError::Archive(err.to_string())
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::AuthorizationDenied("heart_rate".to_string());
        assert_eq!(err.to_string(), "Authorization denied: heart_rate");
        assert_eq!(StoreError::Unavailable.to_string(), "Health data unavailable");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let store_err: StoreError = io_err.into();
        assert!(matches!(store_err, StoreError::Io(_)));
    }
}
