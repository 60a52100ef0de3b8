//! Error types for the message pipeline.

use tribune_core::error::{ProviderError, TribuneError};

/// Errors surfaced by the orchestrator to its caller.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("unknown video: {0}")]
    UnknownVideo(String),
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("storage error: {0}")]
    StorageError(String),
}

impl From<TribuneError> for ChatError {
    fn from(err: TribuneError) -> Self {
        match err {
            TribuneError::Provider(e) => ChatError::Provider(e),
            other => ChatError::StorageError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tribune_core::error::ErrorKind;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::EmptyMessage.to_string(), "message cannot be empty");
        assert_eq!(
            ChatError::MessageTooLong(2000).to_string(),
            "message exceeds maximum length of 2000 characters"
        );
        assert_eq!(
            ChatError::UnknownVideo("abc".to_string()).to_string(),
            "unknown video: abc"
        );
    }

    #[test]
    fn test_from_tribune_error() {
        let err: ChatError = TribuneError::Storage("disk full".to_string()).into();
        assert!(matches!(err, ChatError::StorageError(_)));
        assert!(err.to_string().contains("disk full"));

        let err: ChatError =
            TribuneError::Provider(ProviderError::new(ErrorKind::QuotaExceeded, "quota")).into();
        match err {
            ChatError::Provider(e) => assert_eq!(e.kind, ErrorKind::QuotaExceeded),
            other => panic!("unexpected {:?}", other),
        }
    }
}
