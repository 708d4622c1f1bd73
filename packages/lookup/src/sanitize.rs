//! Input validation and normalisation before anything reaches the prompt.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{LookupError, Result};

/// Minimum accepted input length, in characters.
pub const MIN_INPUT_CHARS: usize = 2;

/// Maximum accepted input length, in characters.
pub const MAX_INPUT_CHARS: usize = 100;

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Normalise raw user text into a prompt-safe string.
///
/// Control whitespace becomes a single space, NUL characters are dropped,
/// typographic apostrophes become ASCII, whitespace runs collapse and the
/// result is trimmed. Never fails and never lengthens its input.
///
/// # Examples
/// ```
/// use carpecarb_lookup::sanitize::sanitize;
///
/// assert_eq!(sanitize("  Big\tMac\n"), "Big Mac");
/// assert_eq!(sanitize("Wendy\u{2019}s  Frosty"), "Wendy's Frosty");
/// ```
pub fn sanitize(raw: &str) -> String {
    let replaced: String = raw
        .trim()
        .chars()
        .filter(|&c| c != '\0')
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            '\u{2019}' => '\'',
            other => other,
        })
        .collect();

    WHITESPACE_RUN
        .replace_all(&replaced, " ")
        .trim()
        .to_string()
}

/// Input that passed length validation and sanitisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedInput(String);

impl SanitizedInput {
    /// Validate and sanitise raw input.
    ///
    /// The trimmed original and the sanitised result must both be between
    /// [`MIN_INPUT_CHARS`] and [`MAX_INPUT_CHARS`] characters long.
    pub fn new(raw: &str) -> Result<Self> {
        check_length(raw.trim())?;
        let sanitized = sanitize(raw);
        check_length(&sanitized)?;
        Ok(Self(sanitized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SanitizedInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn check_length(text: &str) -> Result<()> {
    let len = text.chars().count();
    if len < MIN_INPUT_CHARS || len > MAX_INPUT_CHARS {
        return Err(LookupError::InvalidArgument(format!(
            "input must be {MIN_INPUT_CHARS}-{MAX_INPUT_CHARS} characters"
        )));
    }
    Ok(())
}
