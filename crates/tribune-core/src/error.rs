use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed classification of provider, transport and local-storage failures.
///
/// Every service maps its failures onto one of these kinds so callers can
/// pick a remediation message without inspecting raw HTTP statuses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Transport failure or unreachable host.
    NetworkError,
    /// The provider rejected the credentials.
    InvalidApiKey,
    /// The provider rate/quota limit was hit.
    QuotaExceeded,
    /// Any other non-success provider response.
    ApiError,
    /// Local state read/write failure.
    CacheError,
    /// Unclassified failure.
    UnknownError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::InvalidApiKey => "INVALID_API_KEY",
            ErrorKind::QuotaExceeded => "QUOTA_EXCEEDED",
            ErrorKind::ApiError => "API_ERROR",
            ErrorKind::CacheError => "CACHE_ERROR",
            ErrorKind::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified provider failure carrying the provider's own message.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkError, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownError, message)
    }
}

/// Top-level error type for Tribune.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for TribuneError` where `?` must cross crates.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TribuneError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl TribuneError {
    /// Map this error onto the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TribuneError::Storage(_) | TribuneError::Serialization(_) => ErrorKind::CacheError,
            TribuneError::Io(_) => ErrorKind::CacheError,
            TribuneError::Provider(e) => e.kind,
            TribuneError::Config(_) => ErrorKind::UnknownError,
        }
    }
}

impl From<toml::de::Error> for TribuneError {
    fn from(err: toml::de::Error) -> Self {
        TribuneError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for TribuneError {
    fn from(err: serde_json::Error) -> Self {
        TribuneError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Tribune operations.
pub type Result<T> = std::result::Result<T, TribuneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TribuneError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_error_kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorKind::QuotaExceeded).unwrap();
        assert_eq!(json, "\"QUOTA_EXCEEDED\"");
        let kind: ErrorKind = serde_json::from_str("\"INVALID_API_KEY\"").unwrap();
        assert_eq!(kind, ErrorKind::InvalidApiKey);
    }

    #[test]
    fn test_error_kind_display_matches_as_str() {
        for kind in [
            ErrorKind::NetworkError,
            ErrorKind::InvalidApiKey,
            ErrorKind::QuotaExceeded,
            ErrorKind::ApiError,
            ErrorKind::CacheError,
            ErrorKind::UnknownError,
        ] {
            assert_eq!(kind.to_string(), kind.as_str());
        }
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::new(ErrorKind::ApiError, "backend exploded");
        assert_eq!(err.to_string(), "API_ERROR: backend exploded");
    }

    #[test]
    fn test_provider_error_converts_and_keeps_kind() {
        let err: TribuneError = ProviderError::network("connection refused").into();
        assert!(matches!(err, TribuneError::Provider(_)));
        assert_eq!(err.kind(), ErrorKind::NetworkError);
    }

    #[test]
    fn test_storage_errors_map_to_cache_error() {
        assert_eq!(
            TribuneError::Storage("disk full".into()).kind(),
            ErrorKind::CacheError
        );
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(TribuneError::from(io).kind(), ErrorKind::CacheError);
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let tribune_err: TribuneError = err.unwrap_err().into();
        assert!(matches!(tribune_err, TribuneError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let tribune_err: TribuneError = err.unwrap_err().into();
        assert!(matches!(tribune_err, TribuneError::Serialization(_)));
    }
}
