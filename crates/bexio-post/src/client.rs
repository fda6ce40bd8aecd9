//! Posting client for the bexio accounting API
//!
//! Issues the create-entry call through an authenticated `Session` and
//! applies the recovery policy:
//! - 401: refresh the token once and reissue the identical request; a
//!   second 401 is fatal for the submission (re-login required)
//! - 429: surfaced immediately with no automatic retry, so the operator
//!   decides whether to resubmit — blind retry of a non-idempotent
//!   financial write risks duplicate postings
//! - any other non-success status: surfaced verbatim with the body
//!
//! A failed submission is discarded; nothing transitions back to
//! building. The caller resubmits with corrected input.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info, warn};

use bexio_auth::Session;
use bexio_auth::constants::{API_V2_BASE, API_V3_BASE};

use crate::error::{PostError, Result};
use crate::mapping::MappingResolver;
use crate::model::{
    CurrencyMode, EntryInput, MANUAL_SINGLE_ENTRY, PostingEntry, PostingRequest, PostingResult,
};

/// Accounting API base URLs.
///
/// Defaults to the public bexio hosts; overridable for tests.
#[derive(Debug, Clone)]
pub struct ApiEndpoints {
    pub v2_base: String,
    pub v3_base: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            v2_base: API_V2_BASE.into(),
            v3_base: API_V3_BASE.into(),
        }
    }
}

/// Bounded timeouts for accounting API calls.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Create-entry and chart-of-accounts calls
    pub entry: Duration,
    /// Reference-number lookup
    pub lookup: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            entry: Duration::from_secs(30),
            lookup: Duration::from_secs(15),
        }
    }
}

/// Client for submitting manual entries on behalf of one session.
pub struct PostingClient {
    session: Arc<Session>,
    endpoints: ApiEndpoints,
    currency_mode: CurrencyMode,
    timeouts: Timeouts,
    http: reqwest::Client,
}

impl PostingClient {
    /// Create a posting client bound to an authenticated session.
    pub fn new(
        session: Arc<Session>,
        endpoints: ApiEndpoints,
        currency_mode: CurrencyMode,
        http: reqwest::Client,
    ) -> Self {
        Self {
            session,
            endpoints,
            currency_mode,
            timeouts: Timeouts::default(),
            http,
        }
    }

    /// Override the default 30s/15s timeouts.
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Submit one raw entry: resolve identifiers, normalize the date,
    /// fetch a reference number if requested, and create the entry.
    pub async fn submit(
        &self,
        input: &EntryInput,
        resolver: &MappingResolver,
    ) -> Result<PostingResult> {
        // Negated comparisons so NaN fails both checks
        if !(input.amount >= 0.0) {
            return Err(PostError::InvalidAmount(input.amount));
        }
        if !(input.currency_factor > 0.0) {
            return Err(PostError::InvalidCurrencyFactor(input.currency_factor));
        }

        let debit = resolver
            .resolve_account(&input.debit)
            .map_err(|_| PostError::UnresolvedAccount(input.debit.trim().to_string()))?;
        let credit = resolver
            .resolve_account(&input.credit)
            .map_err(|_| PostError::UnresolvedAccount(input.credit.trim().to_string()))?;

        let raw_currency = input.currency.trim();
        let (currency, currency_id) = if raw_currency.is_empty() {
            (None, None)
        } else {
            match self.currency_mode {
                CurrencyMode::Code => (Some(raw_currency.to_string()), None),
                CurrencyMode::Id => {
                    let id = resolver
                        .resolve_currency(raw_currency)
                        .map_err(|_| PostError::UnresolvedCurrency(raw_currency.to_string()))?;
                    (None, Some(id))
                }
            }
        };

        let date = input.date.normalize()?;

        let explicit_ref = input
            .reference_nr
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        let reference_nr = match explicit_ref {
            Some(r) => Some(r),
            None if input.auto_reference => self.next_ref_nr().await?,
            None => None,
        };

        let request = PostingRequest {
            entry_type: MANUAL_SINGLE_ENTRY,
            date,
            entries: vec![PostingEntry {
                debit_account_id: debit,
                credit_account_id: credit,
                amount: input.amount,
                description: input.description.clone(),
                currency,
                currency_id,
                currency_factor: (input.currency_factor != 1.0).then_some(input.currency_factor),
            }],
            reference_nr,
        };

        self.create_entry(&request).await
    }

    /// Issue the create-entry call, recovering from one expired-token 401.
    async fn create_entry(&self, request: &PostingRequest) -> Result<PostingResult> {
        let tokens = self.session.ensure_valid().await?;
        let mut response = self.post_entry(&tokens.access_token, request).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            // The token can expire right at POST despite the expiry
            // margin. Refresh and reissue the identical request once.
            warn!("create entry returned 401, refreshing token for one retry");
            let tokens = self.session.refresh().await?;
            response = self.post_entry(&tokens.access_token, request).await?;
        }

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED => Err(PostError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => Err(PostError::RateLimited),
            s if s.is_success() => {
                info!(status = s.as_u16(), "manual entry created");
                response
                    .json::<PostingResult>()
                    .await
                    .map_err(|e| PostError::Network(format!("invalid create response: {e}")))
            }
            s => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| String::from("<no body>"));
                Err(PostError::RemoteRejected {
                    status: s.as_u16(),
                    body,
                })
            }
        }
    }

    async fn post_entry(
        &self,
        access_token: &str,
        request: &PostingRequest,
    ) -> Result<reqwest::Response> {
        self.http
            .post(format!("{}/accounting/manual_entries", self.endpoints.v3_base))
            .bearer_auth(access_token)
            .timeout(self.timeouts.entry)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error("create entry", e))
    }

    /// Fetch the provider's next free reference number.
    ///
    /// A missing or empty `next_ref_nr` field means "no reference
    /// number", not an error.
    pub async fn next_ref_nr(&self) -> Result<Option<String>> {
        #[derive(Deserialize)]
        struct NextRef {
            #[serde(default)]
            next_ref_nr: Option<String>,
        }

        let tokens = self.session.ensure_valid().await?;
        let response = self
            .http
            .get(format!(
                "{}/accounting/manual_entries/next_ref_nr",
                self.endpoints.v3_base
            ))
            .bearer_auth(&tokens.access_token)
            .timeout(self.timeouts.lookup)
            .send()
            .await
            .map_err(|e| transport_error("next_ref_nr lookup", e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(PostError::Unauthorized);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(PostError::RemoteRejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed = response
            .json::<NextRef>()
            .await
            .map_err(|e| PostError::Network(format!("invalid next_ref_nr response: {e}")))?;

        Ok(parsed
            .next_ref_nr
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty()))
    }

    /// Load the chart of accounts and merge `number → id` pairs into
    /// the resolver. Rows without an account number are skipped.
    /// Returns the number of merged entries.
    pub async fn load_account_mapping(&self, resolver: &mut MappingResolver) -> Result<usize> {
        #[derive(Deserialize)]
        struct AccountRow {
            id: i64,
            #[serde(default)]
            no: Option<String>,
        }

        let tokens = self.session.ensure_valid().await?;
        let response = self
            .http
            .get(format!("{}/account", self.endpoints.v2_base))
            .bearer_auth(&tokens.access_token)
            .timeout(self.timeouts.entry)
            .send()
            .await
            .map_err(|e| transport_error("chart of accounts", e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(PostError::Unauthorized);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(PostError::RemoteRejected {
                status: status.as_u16(),
                body,
            });
        }

        let rows = response
            .json::<Vec<AccountRow>>()
            .await
            .map_err(|e| PostError::Network(format!("invalid chart of accounts: {e}")))?;

        let merged = resolver.merge_accounts(rows.into_iter().filter_map(|row| {
            row.no
                .map(|no| no.trim().to_string())
                .filter(|no| !no.is_empty())
                .map(|no| (no, row.id))
        }));
        debug!(merged, "chart of accounts loaded");
        Ok(merged)
    }
}

fn transport_error(context: &str, err: reqwest::Error) -> PostError {
    if err.is_timeout() {
        PostError::NetworkTimeout(format!("{context}: {err}"))
    } else {
        PostError::Network(format!("{context}: {err}"))
    }
}
