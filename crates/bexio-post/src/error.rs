//! Error types for identifier resolution and entry submission

/// Errors from resolving a raw account or currency value.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("'{0}' is neither a mapped code nor a numeric identifier")]
    NotAnIdentifier(String),

    #[error("identifier {0} must be positive")]
    NonPositive(i64),
}

/// Errors from one submission attempt.
///
/// None of these are fatal to the process: each ends a single
/// submission, and the session and mappings persist for the next one.
/// `RemoteRejected` carries the remote status and body verbatim because
/// operators need the tenant-specific validation message to correct
/// their input.
#[derive(Debug, thiserror::Error)]
pub enum PostError {
    #[error("account '{0}' could not be resolved (code or ID)")]
    UnresolvedAccount(String),

    #[error("currency '{0}' could not be resolved (code or ID)")]
    UnresolvedCurrency(String),

    #[error("'{0}' is not a valid posting date (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("amount {0} must be non-negative")]
    InvalidAmount(f64),

    #[error("currency factor {0} must be positive")]
    InvalidCurrencyFactor(f64),

    #[error("not authorized: re-login required")]
    Unauthorized,

    #[error("rate limited by the accounting API (429), resubmit later")]
    RateLimited,

    #[error("accounting API rejected the request ({status}): {body}")]
    RemoteRejected { status: u16, body: String },

    #[error("accounting API request timed out: {0}")]
    NetworkTimeout(String),

    #[error("accounting API unreachable: {0}")]
    Network(String),
}

impl From<bexio_auth::AuthError> for PostError {
    /// An auth failure mid-submission means the session could not be
    /// (re-)validated; anything short of a timeout requires re-login.
    fn from(err: bexio_auth::AuthError) -> Self {
        match err {
            bexio_auth::AuthError::NetworkTimeout(msg) => PostError::NetworkTimeout(msg),
            _ => PostError::Unauthorized,
        }
    }
}

/// Result alias for submission operations.
pub type Result<T> = std::result::Result<T, PostError>;
