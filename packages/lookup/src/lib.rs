//! CarpeCarb lookup - carbohydrate lookups against a chat-completion API.
//!
//! Turns a natural-language food description into validated
//! [`FoodItem`]s by prompting a language model and extracting the JSON
//! embedded in its reply.
//!
//! # Example
//!
//! ```
//! use carpecarb_lookup::sanitize::{sanitize, SanitizedInput};
//!
//! assert_eq!(sanitize("  Big\tMac\n"), "Big Mac");
//! assert!(SanitizedInput::new("a").is_err());
//! ```
//!
//! # Architecture
//!
//! Data flows strictly downward through these modules:
//!
//! - [`sanitize`]: input validation and normalisation
//! - [`prompt`]: system/user messages per [`Mode`]
//! - [`client`]: HTTP transport with status classification and retries
//! - [`extract`]: locating and validating the JSON payload in the reply
//! - [`service`]: orchestration, the only entry point callers need
//!
//! Supporting modules: [`config`], [`error`], [`types`] and [`store`]
//! (the running total callers report results into).

pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod prompt;
pub mod sanitize;
pub mod service;
pub mod store;
pub mod types;

pub use client::{CompletionClient, PerplexityClient, RawReply, RetryPolicy};
#[cfg(any(test, feature = "test-utils"))]
pub use client::test_support::MockCompletionClient;
pub use config::LookupConfig;
pub use error::{Disposition, ErrorKind, LookupError, Result};
pub use service::LookupService;
pub use store::{CarbLog, FoodReporter, JsonFileStore, LoggedItem, StoreError};
pub use types::{FoodItem, LookupResult, Mode};
