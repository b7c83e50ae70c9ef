//! Error types for email challenge dispatch.

use std::fmt;

/// Errors that can occur when asking the identity service to send an email.
///
/// None of them are retried here; the caller owns the retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// The request body could not be serialized.
    Encode(String),

    /// The request could not be built or the HTTP exchange failed.
    Transport(String),

    /// The OTP response was not valid JSON or lacked `otpId`.
    Decode(String),

    /// The cancellation token fired before the exchange completed.
    Cancelled,
}

impl fmt::Display for EmailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode(msg) => write!(f, "Failed to marshal json: {}", msg),
            Self::Transport(msg) => write!(f, "Email challenge request failed: {}", msg),
            Self::Decode(msg) => write!(f, "Failed to decode response body: {}", msg),
            Self::Cancelled => write!(f, "Email challenge request was cancelled"),
        }
    }
}

impl std::error::Error for EmailError {}

impl EmailError {
    /// Whether the failure happened before or during the network exchange.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Encode(_) | Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_error_display() {
        let err = EmailError::Transport("connection refused".to_string());
        assert_eq!(
            err.to_string(),
            "Email challenge request failed: connection refused"
        );

        let err = EmailError::Decode("missing field `otpId`".to_string());
        assert_eq!(
            err.to_string(),
            "Failed to decode response body: missing field `otpId`"
        );

        assert_eq!(
            EmailError::Cancelled.to_string(),
            "Email challenge request was cancelled"
        );
    }

    #[test]
    fn test_email_error_is_transport() {
        assert!(EmailError::Encode("x".to_string()).is_transport());
        assert!(EmailError::Transport("x".to_string()).is_transport());
        assert!(!EmailError::Decode("x".to_string()).is_transport());
        assert!(!EmailError::Cancelled.is_transport());
    }
}
