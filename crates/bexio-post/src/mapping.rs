//! User-maintained identifier mappings
//!
//! Operators paste mapping tables ("1020 = 77") by hand, so parsing is
//! line-by-line with partial success: a single typo rejects that line
//! and keeps the rest. Account keys are matched verbatim; currency keys
//! are upper-cased both at ingestion and at lookup.
//!
//! A value absent from the mapping is still usable when it already is a
//! raw positive numeric identifier, matching how the bexio API accepts
//! either form.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::error::ResolveError;

/// Characters that may separate the two tokens of a mapping line.
const SEPARATORS: &[char] = &['=', ':', ',', ';'];

/// Comment marker for mapping text.
const COMMENT_MARKER: char = '#';

/// A mapping line that could not be parsed, reported back to the
/// operator with its 1-based line number and original text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedLine {
    pub line: usize,
    pub text: String,
}

/// Parse mapping text into `(code, id)` pairs plus rejected lines.
///
/// Blank lines and `#` comments are skipped. Every remaining line must
/// split into exactly two non-empty tokens on `=`, `:`, `,`, `;` or
/// whitespace, with a positive integer as the second token. Accepted
/// plus rejected always accounts for every non-blank non-comment line.
pub fn parse_mapping_text(text: &str) -> (Vec<(String, i64)>, Vec<RejectedLine>) {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(COMMENT_MARKER) {
            continue;
        }

        let tokens: Vec<&str> = trimmed
            .split(|c: char| SEPARATORS.contains(&c) || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .collect();

        let parsed = match tokens.as_slice() {
            [key, value] => value.parse::<i64>().ok().filter(|id| *id > 0).map(|id| (*key, id)),
            _ => None,
        };

        match parsed {
            Some((key, id)) => accepted.push((key.to_string(), id)),
            None => rejected.push(RejectedLine {
                line: index + 1,
                text: line.to_string(),
            }),
        }
    }

    (accepted, rejected)
}

/// Per-session account and currency code mappings.
///
/// Updates are additive: new entries merge into the existing maps and
/// later entries override the same key.
#[derive(Debug, Default)]
pub struct MappingResolver {
    accounts: HashMap<String, i64>,
    currencies: HashMap<String, i64>,
}

impl MappingResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge pasted account mapping text; returns the number of merged
    /// entries and the lines that were rejected.
    pub fn update_accounts(&mut self, text: &str) -> (usize, Vec<RejectedLine>) {
        let (accepted, rejected) = parse_mapping_text(text);
        let merged = accepted.len();
        self.accounts.extend(accepted);
        debug!(merged, rejected = rejected.len(), "account mapping updated");
        (merged, rejected)
    }

    /// Merge pasted currency mapping text; keys are upper-cased so
    /// lookups are case-insensitive.
    pub fn update_currencies(&mut self, text: &str) -> (usize, Vec<RejectedLine>) {
        let (accepted, rejected) = parse_mapping_text(text);
        let merged = accepted.len();
        self.currencies
            .extend(accepted.into_iter().map(|(k, v)| (k.to_uppercase(), v)));
        debug!(merged, rejected = rejected.len(), "currency mapping updated");
        (merged, rejected)
    }

    /// Merge already-validated account pairs (chart-of-accounts
    /// auto-mapping); returns the number merged.
    pub fn merge_accounts(&mut self, entries: impl IntoIterator<Item = (String, i64)>) -> usize {
        let before = self.accounts.len();
        let mut merged = 0;
        for (key, id) in entries {
            self.accounts.insert(key, id);
            merged += 1;
        }
        debug!(merged, total = before + merged, "chart accounts merged");
        merged
    }

    /// Number of known account codes.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Resolve a raw account value: mapped code first (verbatim key),
    /// then raw positive integer.
    pub fn resolve_account(&self, raw: &str) -> Result<i64, ResolveError> {
        let trimmed = raw.trim();
        if let Some(id) = self.accounts.get(trimmed) {
            return Ok(*id);
        }
        parse_raw_id(trimmed)
    }

    /// Resolve a raw currency value: mapped code first (upper-cased
    /// key), then raw positive integer.
    pub fn resolve_currency(&self, raw: &str) -> Result<i64, ResolveError> {
        let trimmed = raw.trim();
        if let Some(id) = self.currencies.get(&trimmed.to_uppercase()) {
            return Ok(*id);
        }
        parse_raw_id(trimmed)
    }
}

fn parse_raw_id(raw: &str) -> Result<i64, ResolveError> {
    let id = raw
        .parse::<i64>()
        .map_err(|_| ResolveError::NotAnIdentifier(raw.to_string()))?;
    if id <= 0 {
        return Err(ResolveError::NonPositive(id));
    }
    Ok(id)
}
