//! Error types for the CLI.

use carpecarb_lookup::{LookupError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl CliError {
    /// Text shown on the terminal. Lookup failures use their end-user
    /// message; the detailed cause goes to the log.
    pub fn user_message(&self) -> String {
        match self {
            Self::Lookup(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
