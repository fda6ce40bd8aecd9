//! Posting date normalization
//!
//! Accepts either a structured calendar date or an operator-typed
//! string. Strings may use `/`, `.` or `-` separators; after
//! normalizing to `-` they must match strict `YYYY-MM-DD` and name a
//! real calendar day.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{PostError, Result};

/// A posting date as supplied by the caller.
///
/// Deserializes from a plain string: valid `YYYY-MM-DD` input becomes
/// `Calendar`, anything else stays `Text` and is validated at
/// submission time.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PostingDate {
    Calendar(NaiveDate),
    Text(String),
}

impl PostingDate {
    /// Normalize to the strict `YYYY-MM-DD` form the API requires.
    pub fn normalize(&self) -> Result<String> {
        match self {
            PostingDate::Calendar(date) => Ok(date.format("%Y-%m-%d").to_string()),
            PostingDate::Text(raw) => normalize_date_text(raw),
        }
    }
}

impl From<NaiveDate> for PostingDate {
    fn from(date: NaiveDate) -> Self {
        PostingDate::Calendar(date)
    }
}

impl From<&str> for PostingDate {
    fn from(raw: &str) -> Self {
        PostingDate::Text(raw.to_string())
    }
}

fn normalize_date_text(raw: &str) -> Result<String> {
    let cleaned = raw.trim().replace(['/', '.'], "-");

    // Strict shape first: four-two-two digits. `%Y-%m-%d` alone would
    // also accept one-digit months, which the API rejects.
    let shape_ok = cleaned.len() == 10
        && cleaned.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shape_ok {
        return Err(PostError::InvalidDate(raw.to_string()));
    }

    NaiveDate::parse_from_str(&cleaned, "%Y-%m-%d")
        .map_err(|_| PostError::InvalidDate(raw.to_string()))?;
    Ok(cleaned)
}
