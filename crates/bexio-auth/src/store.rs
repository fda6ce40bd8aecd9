//! In-memory token store
//!
//! Holds the current `TokenSet` for one logical user session. Tokens
//! live for the process lifetime only; there is no on-disk persistence.
//! A tokio Mutex guards the slot so `set` replaces the whole value
//! atomically — a reader never observes a half-updated token/expiry
//! pair when submissions and refreshes interleave.

use tokio::sync::Mutex;

use crate::token::TokenSet;

/// Process-local holder for the current token pair.
#[derive(Default)]
pub struct TokenStore {
    state: Mutex<Option<TokenSet>>,
}

impl TokenStore {
    /// Create an empty store (no session yet).
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a clone of the current token set, if any.
    pub async fn get(&self) -> Option<TokenSet> {
        let state = self.state.lock().await;
        state.clone()
    }

    /// Replace the stored token set.
    pub async fn set(&self, tokens: TokenSet) {
        let mut state = self.state.lock().await;
        *state = Some(tokens);
    }

    /// Drop the stored token set (logout / permanent refresh failure).
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        *state = None;
    }
}
