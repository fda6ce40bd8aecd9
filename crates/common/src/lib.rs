//! Shared types for the bexio entry poster

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
