//! OAuth session manager
//!
//! Owns the token store and performs the two token endpoint grants:
//! authorization-code exchange (after the login redirect) and refresh.
//! One `Session` belongs to one logical user; tokens and credentials
//! are never shared process-wide.
//!
//! Refresh is serialized behind a mutex: bexio may hand out single-use
//! refresh tokens, so two submissions racing into `ensure_valid` must
//! not both spend the same refresh token.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use common::Secret;

use crate::constants::{AUTHORIZE_ENDPOINT, SCOPES, TOKEN_ENDPOINT};
use crate::error::{AuthError, Result};
use crate::store::TokenStore;
use crate::token::{TokenResponse, TokenSet};

/// Timeout for token endpoint calls.
const TOKEN_TIMEOUT: Duration = Duration::from_secs(30);

/// OAuth client registration, supplied at startup and never mutated.
pub struct Credentials {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub redirect_uri: String,
}

/// Identity provider endpoint pair.
///
/// Defaults to the public bexio realm; overridable for tests and
/// non-production tenants.
#[derive(Debug, Clone)]
pub struct AuthEndpoints {
    pub authorize_url: String,
    pub token_url: String,
}

impl Default for AuthEndpoints {
    fn default() -> Self {
        Self {
            authorize_url: AUTHORIZE_ENDPOINT.into(),
            token_url: TOKEN_ENDPOINT.into(),
        }
    }
}

/// Authenticated session against the bexio identity provider.
pub struct Session {
    credentials: Credentials,
    endpoints: AuthEndpoints,
    store: TokenStore,
    refresh_lock: Mutex<()>,
    http: reqwest::Client,
}

impl Session {
    /// Create a session with no tokens yet.
    pub fn new(credentials: Credentials, endpoints: AuthEndpoints, http: reqwest::Client) -> Self {
        Self {
            credentials,
            endpoints,
            store: TokenStore::new(),
            refresh_lock: Mutex::new(()),
            http,
        }
    }

    /// Build the authorization URL the user visits to log in.
    ///
    /// Includes a fresh random `state` value for CSRF protection; the
    /// identity provider returns it unchanged in the callback.
    pub fn login_url(&self) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            self.endpoints.authorize_url,
            urlencoded(&self.credentials.client_id),
            urlencoded(&self.credentials.redirect_uri),
            urlencoded(SCOPES),
            generate_state(),
        )
    }

    /// Exchange a one-time authorization code for tokens.
    ///
    /// Codes are single-use, so a failed exchange is never retried.
    /// On success the token store is replaced with the new pair.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet> {
        let response = self
            .http
            .post(&self.endpoints.token_url)
            .timeout(TOKEN_TIMEOUT)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.credentials.redirect_uri.as_str()),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.expose().as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AuthError::NetworkTimeout(format!("token exchange: {e}"))
                } else {
                    AuthError::ExchangeFailed(format!("token exchange request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(AuthError::ExchangeFailed(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token_response = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthError::ExchangeFailed(format!("invalid token response: {e}")))?;

        let tokens = TokenSet::from_response(token_response);
        self.store.set(tokens.clone()).await;
        info!("authorization code exchanged, session established");
        Ok(tokens)
    }

    /// Whether a token set is held and still valid.
    pub async fn is_valid(&self) -> bool {
        match self.store.get().await {
            Some(tokens) => tokens.is_valid(),
            None => false,
        }
    }

    /// Return a valid token set, refreshing first if needed.
    pub async fn ensure_valid(&self) -> Result<TokenSet> {
        if let Some(tokens) = self.store.get().await {
            if tokens.is_valid() {
                return Ok(tokens);
            }
        }

        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited for the lock
        if let Some(tokens) = self.store.get().await {
            if tokens.is_valid() {
                debug!("token refreshed by concurrent caller, reusing");
                return Ok(tokens);
            }
        }
        self.refresh_inner().await
    }

    /// Force a refresh-token grant, replacing the stored token set.
    ///
    /// On failure the prior token set is left intact so the caller can
    /// prompt re-login instead of silently losing session state.
    pub async fn refresh(&self) -> Result<TokenSet> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_inner().await
    }

    /// Drop the session's tokens (logout).
    pub async fn logout(&self) {
        self.store.clear().await;
    }

    async fn refresh_inner(&self) -> Result<TokenSet> {
        let current = self.store.get().await;
        let refresh_token = current
            .as_ref()
            .and_then(|t| t.refresh_token.clone())
            .ok_or(AuthError::NoRefreshToken)?;

        let response = self
            .http
            .post(&self.endpoints.token_url)
            .timeout(TOKEN_TIMEOUT)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.expose().as_str()),
                ("redirect_uri", self.credentials.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AuthError::NetworkTimeout(format!("token refresh: {e}"))
                } else {
                    AuthError::RefreshFailed(format!("token refresh request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            warn!(status = status.as_u16(), "token refresh rejected");
            return Err(AuthError::RefreshFailed(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token_response = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthError::RefreshFailed(format!("invalid refresh response: {e}")))?;

        // Some providers omit the refresh token on refresh; the one we
        // just used then stays valid for the next renewal.
        let mut tokens = TokenSet::from_response(token_response);
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token);
        }

        self.store.set(tokens.clone()).await;
        info!("access token refreshed");
        Ok(tokens)
    }
}

/// Generate an opaque anti-CSRF state value.
fn generate_state() -> String {
    let mut bytes = [0u8; 12];
    rand::rng().fill(&mut bytes);
    format!("anti-csrf-{}", URL_SAFE_NO_PAD.encode(bytes))
}

/// Minimal URL encoding for query parameter values.
/// Only encodes characters that would break URL parameter parsing.
fn urlencoded(s: &str) -> String {
    s.replace(' ', "%20")
        .replace(':', "%3A")
        .replace('/', "%2F")
}
