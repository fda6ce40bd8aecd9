//! Wire types for the bexio v3 `manual_entries` resource

use serde::{Deserialize, Serialize};

use crate::date::PostingDate;

/// Entry type tag for a single debit/credit posting.
pub const MANUAL_SINGLE_ENTRY: &str = "manual_single_entry";

/// How the currency of a posting is transmitted.
///
/// bexio tenants differ: newer v3 tenants take a `currency` code
/// string, others require a numeric `currency_id`. The mode is chosen
/// explicitly at client construction; exactly one of the two fields
/// ever appears in a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrencyMode {
    /// Send the currency code string as entered (default)
    #[default]
    Code,
    /// Resolve the code through the currency mapping and send the ID
    Id,
}

/// One raw user submission, exactly as gathered by the front end.
///
/// Accounts and currency may be human codes or raw numeric IDs; the
/// submit pipeline resolves them. Never persisted beyond one request.
#[derive(Debug, Deserialize)]
pub struct EntryInput {
    pub date: PostingDate,
    #[serde(default)]
    pub description: String,
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_currency_factor")]
    pub currency_factor: f64,
    pub debit: String,
    pub credit: String,
    /// Fetch the provider's next reference number when none is given
    #[serde(default)]
    pub auto_reference: bool,
    #[serde(default)]
    pub reference_nr: Option<String>,
}

fn default_currency() -> String {
    "CHF".to_string()
}

fn default_currency_factor() -> f64 {
    1.0
}

/// One resolved debit/credit line of a posting request.
#[derive(Debug, Clone, Serialize)]
pub struct PostingEntry {
    pub debit_account_id: i64,
    pub credit_account_id: i64,
    pub amount: f64,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_id: Option<i64>,
    /// Sent only when it differs from the base-rate 1.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_factor: Option<f64>,
}

/// The full create-entry request body.
#[derive(Debug, Clone, Serialize)]
pub struct PostingRequest {
    #[serde(rename = "type")]
    pub entry_type: &'static str,
    pub date: String,
    pub entries: Vec<PostingEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_nr: Option<String>,
}

/// The created entry representation returned by the API, passed back
/// verbatim so the front end can display tenant-specific fields.
pub type PostingResult = serde_json::Value;
