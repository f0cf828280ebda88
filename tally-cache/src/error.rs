//! Error types for Tally

use thiserror::Error;

/// Result type alias for Tally operations
pub type Result<T> = std::result::Result<T, TallyError>;

/// Tally error types
///
/// A missing key is not an error: lookups return `Option::None` instead.
#[derive(Error, Debug)]
pub enum TallyError {
    /// Backend unreachable (connect failure, timeout). Never retried.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Backend rejected a command
    #[error("Server error: {0}")]
    Server(String),

    /// Stored value cannot be used by the requested operation
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Key holds a different kind of entry (scalar vs list)
    #[error("WRONGTYPE operation against a key holding the wrong kind of value: {0}")]
    WrongType(String),

    /// Backend reply could not be interpreted
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid backend URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// HTTP error other than a connectivity failure
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for TallyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::Connection(err.to_string())
        } else {
            Self::Http(err)
        }
    }
}

impl From<serde_yaml::Error> for TallyError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl TallyError {
    /// Whether the backend could not be reached at all
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TallyError::Connection("refused".to_string());
        assert_eq!(err.to_string(), "Connection error: refused");
        assert!(err.is_connection());

        let err = TallyError::WrongType("Cache.store".to_string());
        assert!(err.to_string().starts_with("WRONGTYPE"));
        assert!(!err.is_connection());
    }

    #[test]
    fn test_yaml_error_maps_to_config() {
        let yaml_err = serde_yaml::from_str::<u32>("not: [a number").unwrap_err();
        let err: TallyError = yaml_err.into();
        assert!(matches!(err, TallyError::Config(_)));
    }
}
