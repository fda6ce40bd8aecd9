//! Error types for OAuth session operations

/// Errors from OAuth session operations.
///
/// `ExchangeFailed` and `RefreshFailed` carry the identity provider's
/// status and body text verbatim so the operator can see the actual
/// rejection reason.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no refresh token held, re-login required")]
    NoRefreshToken,

    #[error("authorization code exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("identity provider request timed out: {0}")]
    NetworkTimeout(String),
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, AuthError>;
