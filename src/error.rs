use thiserror::Error;

/// Main error type for Ancesta
#[derive(Error, Debug)]
pub enum AncestaError {
    /// Relationship-cache database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Knowledge-graph source communication errors
    #[error("Source error: {0}")]
    Source(String),

    /// Root lookup yielded no data at all
    #[error("Person not found: {0}")]
    PersonNotFound(String),

    /// Graph snapshot (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using AncestaError
pub type Result<T> = std::result::Result<T, AncestaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AncestaError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_error_from_rusqlite() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: AncestaError = rusqlite_err.into();
        assert!(matches!(err, AncestaError::Database(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AncestaError = io_err.into();
        assert!(matches!(err, AncestaError::Io(_)));
    }

    #[test]
    fn test_person_not_found_display() {
        let err = AncestaError::PersonNotFound("WD-Q9682".to_string());
        assert!(err.to_string().contains("WD-Q9682"));
    }
}
