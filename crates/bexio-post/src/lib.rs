//! Resilient posting pipeline for bexio manual entries
//!
//! Takes a raw user submission (account codes or IDs, amount, date in
//! several separator conventions), resolves it against user-maintained
//! identifier mappings, builds the bexio v3 `manual_entries` body, and
//! issues the create call through an authenticated session. Expired
//! tokens are recovered transparently exactly once per submission;
//! rate limits are surfaced to the operator instead of retried, since
//! a posting is not an idempotent write.
//!
//! Submission pipeline:
//! 1. `MappingResolver` turns debit/credit codes into account IDs
//! 2. The posting date is normalized to strict `YYYY-MM-DD`
//! 3. An automatic reference number is fetched when requested
//! 4. `PostingClient` sends the entry, refreshing on a single 401

pub mod client;
pub mod date;
pub mod error;
pub mod mapping;
pub mod model;

pub use client::{ApiEndpoints, PostingClient, Timeouts};
pub use date::PostingDate;
pub use error::{PostError, ResolveError};
pub use mapping::{MappingResolver, RejectedLine, parse_mapping_text};
pub use model::{CurrencyMode, EntryInput, PostingEntry, PostingRequest, PostingResult};
