//! bexio OAuth and API endpoint constants
//!
//! These identify the public bexio identity provider (Keycloak realm)
//! and API hosts. They are not secrets — the actual secrets (client
//! secret, access/refresh tokens) live in the process configuration and
//! the token store.

/// Authorization endpoint of the bexio identity provider
pub const AUTHORIZE_ENDPOINT: &str =
    "https://auth.bexio.com/realms/bexio/protocol/openid-connect/auth";

/// Token endpoint for code exchange and token refresh
pub const TOKEN_ENDPOINT: &str =
    "https://auth.bexio.com/realms/bexio/protocol/openid-connect/token";

/// Base URL of the bexio API, version 2 (chart of accounts)
pub const API_V2_BASE: &str = "https://api.bexio.com/2.0";

/// Base URL of the bexio API, version 3 (accounting manual entries)
pub const API_V3_BASE: &str = "https://api.bexio.com/3.0";

/// OIDC scopes requested during login.
/// `offline_access` is required to receive a refresh token.
pub const SCOPES: &str = "openid profile email offline_access company_profile";
