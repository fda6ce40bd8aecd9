//! HTTP surface over the posting core
//!
//! The handlers only gather input and shape output; all session,
//! resolution, and retry logic lives in the library crates. Errors map
//! to statuses the operator can act on, with remote rejection bodies
//! passed through verbatim.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{info, warn};

use bexio_auth::{AuthError, Session};
use bexio_post::{EntryInput, MappingResolver, PostError, PostingClient};

/// Shared application state accessible from all handlers.
///
/// One session, one resolver, one client: the service hosts a single
/// logical user session (per-identity state is never process-global
/// beyond that one session).
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Session>,
    pub client: Arc<PostingClient>,
    pub resolver: Arc<Mutex<MappingResolver>>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "authenticated": state.session.is_valid().await,
    }))
}

/// Send the user to the identity provider's login page.
pub async fn login(State(state): State<AppState>) -> Redirect {
    Redirect::temporary(&state.session.login_url())
}

/// OAuth redirect target: exchange the one-time code for tokens.
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let Some(code) = params.code else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "missing code parameter"})),
        )
            .into_response();
    };

    match state.session.exchange_code(&code).await {
        Ok(_) => {
            info!("login completed");
            Json(json!({"status": "logged in"})).into_response()
        }
        Err(err) => {
            warn!(error = %err, "code exchange failed");
            (auth_error_status(&err), Json(json!({"error": err.to_string()}))).into_response()
        }
    }
}

/// Submit one manual entry.
pub async fn submit_entry(
    State(state): State<AppState>,
    Json(input): Json<EntryInput>,
) -> Response {
    let resolver = state.resolver.lock().await;
    match state.client.submit(&input, &resolver).await {
        Ok(result) => Json(result).into_response(),
        Err(err) => post_error_response(err),
    }
}

/// Merge pasted account mapping text (text/plain body).
pub async fn update_account_mappings(State(state): State<AppState>, body: String) -> Response {
    let mut resolver = state.resolver.lock().await;
    let (merged, rejected) = resolver.update_accounts(&body);
    Json(json!({"merged": merged, "rejected": rejected})).into_response()
}

/// Merge pasted currency mapping text (text/plain body).
pub async fn update_currency_mappings(State(state): State<AppState>, body: String) -> Response {
    let mut resolver = state.resolver.lock().await;
    let (merged, rejected) = resolver.update_currencies(&body);
    Json(json!({"merged": merged, "rejected": rejected})).into_response()
}

/// Load the chart of accounts into the account mapping.
pub async fn autoload_accounts(State(state): State<AppState>) -> Response {
    let mut resolver = state.resolver.lock().await;
    match state.client.load_account_mapping(&mut resolver).await {
        Ok(merged) => Json(json!({"merged": merged})).into_response(),
        Err(err) => post_error_response(err),
    }
}

fn auth_error_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::NetworkTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn post_error_response(err: PostError) -> Response {
    let (status, body) = match &err {
        PostError::UnresolvedAccount(_)
        | PostError::UnresolvedCurrency(_)
        | PostError::InvalidDate(_)
        | PostError::InvalidAmount(_)
        | PostError::InvalidCurrencyFactor(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, json!({"error": err.to_string()}))
        }
        PostError::Unauthorized => (StatusCode::UNAUTHORIZED, json!({"error": err.to_string()})),
        PostError::RateLimited => {
            (StatusCode::TOO_MANY_REQUESTS, json!({"error": err.to_string()}))
        }
        PostError::RemoteRejected { status, body } => (
            StatusCode::BAD_GATEWAY,
            json!({
                "error": "accounting API rejected the request",
                "remote_status": status,
                "remote_body": body,
            }),
        ),
        PostError::NetworkTimeout(_) => {
            (StatusCode::GATEWAY_TIMEOUT, json!({"error": err.to_string()}))
        }
        PostError::Network(_) => (StatusCode::BAD_GATEWAY, json!({"error": err.to_string()})),
    };
    (status, Json(body)).into_response()
}
