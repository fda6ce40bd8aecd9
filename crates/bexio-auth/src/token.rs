//! Token response parsing and expiry bookkeeping
//!
//! The identity provider returns `expires_in` as a delta in seconds.
//! `TokenSet` converts this to an absolute instant at issue time, minus
//! a 30-second safety margin, so a token is treated as expired slightly
//! before the provider would reject it. Request-time 401s can still
//! occur and are handled by the posting client's single retry.

use std::time::{Duration, Instant};

use serde::Deserialize;

/// Safety margin subtracted from the declared token lifetime.
pub const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Lifetime assumed when the provider omits `expires_in`.
const DEFAULT_EXPIRES_IN: u64 = 3600;

/// Response from the token endpoint for both exchange and refresh.
///
/// `refresh_token` is optional: a refresh-grant response may omit it,
/// in which case the previously held refresh token stays valid.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires (delta, not absolute)
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    DEFAULT_EXPIRES_IN
}

/// The current access/refresh token pair with its computed expiry.
///
/// Replaced whole on every successful exchange or refresh, never
/// patched field by field, so a reader can never observe a token from
/// one grant paired with the expiry of another.
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Instant,
}

impl TokenSet {
    /// Build a token set from a token endpoint response, issued now.
    pub fn from_response(response: TokenResponse) -> Self {
        Self::issued_at(response, Instant::now())
    }

    /// Build a token set issued at an explicit instant.
    ///
    /// `expires_at = issued + expires_in − EXPIRY_MARGIN`. A declared
    /// lifetime shorter than the margin yields an already-expired set.
    pub fn issued_at(response: TokenResponse, issued: Instant) -> Self {
        let lifetime =
            Duration::from_secs(response.expires_in).saturating_sub(EXPIRY_MARGIN);
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at: issued + lifetime,
        }
    }

    /// Whether the access token is still usable right now.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Instant::now())
    }

    /// Whether the access token is usable at `now` (strictly before expiry).
    pub fn is_valid_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(expires_in: u64) -> TokenResponse {
        TokenResponse {
            access_token: "at_abc".into(),
            refresh_token: Some("rt_def".into()),
            expires_in,
        }
    }

    #[test]
    fn token_response_deserializes() {
        let json = r#"{"access_token":"at_abc","refresh_token":"rt_def","expires_in":3600}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "at_abc");
        assert_eq!(token.refresh_token.as_deref(), Some("rt_def"));
        assert_eq!(token.expires_in, 3600);
    }

    #[test]
    fn missing_refresh_token_and_expiry_use_defaults() {
        let json = r#"{"access_token":"at_abc"}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert!(token.refresh_token.is_none());
        assert_eq!(token.expires_in, 3600);
    }

    #[test]
    fn expiry_honors_thirty_second_margin() {
        let issued = Instant::now();
        let set = TokenSet::issued_at(response(3600), issued);

        // 3600s lifetime minus 30s margin: valid at +3569, expired at +3571
        assert!(set.is_valid_at(issued + Duration::from_secs(3569)));
        assert!(!set.is_valid_at(issued + Duration::from_secs(3571)));
    }

    #[test]
    fn expiry_is_strict() {
        let issued = Instant::now();
        let set = TokenSet::issued_at(response(3600), issued);
        assert!(!set.is_valid_at(issued + Duration::from_secs(3570)));
    }

    #[test]
    fn lifetime_shorter_than_margin_is_already_expired() {
        let issued = Instant::now();
        let set = TokenSet::issued_at(response(10), issued);
        assert!(!set.is_valid_at(issued));
    }
}
