//! CarpeCarb CLI - look up carbohydrate counts and keep a running daily total.
//!
//! ```bash
//! carpecarb lookup "Big Mac and medium fries"
//! carpecarb log "two slices of pepperoni pizza"
//! carpecarb total
//! ```

pub mod cli;
pub mod error;

pub use error::{CliError, Result};
