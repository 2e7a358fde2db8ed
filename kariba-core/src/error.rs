//! Error types for the Kariba wind analysis tooling

use thiserror::Error;

/// Core error type for configuration and project plumbing
#[derive(Error, Debug)]
pub enum KaribaError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Dotted key did not resolve to a value
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Child process could not be spawned or reported failure
    #[error("Process error: {0}")]
    Process(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for Kariba operations
pub type Result<T> = std::result::Result<T, KaribaError>;

impl From<serde_json::Error> for KaribaError {
    fn from(err: serde_json::Error) -> Self {
        KaribaError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for KaribaError {
    fn from(err: serde_yaml::Error) -> Self {
        KaribaError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{ not json").unwrap_err();
        let err: KaribaError = json_err.into();

        match err {
            KaribaError::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_serde_yaml_error_conversion() {
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>("key: [unclosed").unwrap_err();
        let err: KaribaError = yaml_err.into();

        assert!(matches!(err, KaribaError::Serialization(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: KaribaError = io_err.into();

        match err {
            KaribaError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::PermissionDenied),
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_error_display() {
        let err = KaribaError::Config("bad tree".to_string());
        assert_eq!(format!("{}", err), "Configuration error: bad tree");

        let err = KaribaError::KeyNotFound("paths.output.maps".to_string());
        assert_eq!(format!("{}", err), "Key not found: paths.output.maps");

        let err = KaribaError::InvalidInput("start after end".to_string());
        assert_eq!(format!("{}", err), "Invalid input: start after end");
    }
}
