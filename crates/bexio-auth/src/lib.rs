//! bexio OAuth2/OIDC session management
//!
//! Provides the authorization-code and refresh-token grants against the
//! bexio identity provider, plus the in-memory token store that tracks
//! the current access/refresh pair and its expiry. This crate is a
//! standalone library with no dependency on any front end — it can be
//! driven from a web handler, a CLI, or tests.
//!
//! Session flow:
//! 1. Front end sends the user to `Session::login_url()`
//! 2. Identity provider redirects back with a one-time code
//! 3. Front end calls `Session::exchange_code()` with that code
//! 4. API calls obtain a bearer token via `Session::ensure_valid()`
//! 5. Expired tokens are renewed via `Session::refresh()`, serialized
//!    so concurrent callers never double-spend a refresh token

pub mod constants;
pub mod error;
pub mod session;
pub mod store;
pub mod token;

pub use constants::*;
pub use error::{AuthError, Result};
pub use session::{AuthEndpoints, Credentials, Session};
pub use store::TokenStore;
pub use token::{TokenResponse, TokenSet};
