//! Extraction of the JSON payload embedded in the model's free-text reply.

use serde::Deserialize;
use serde_json::Value;

use crate::client::RawReply;
use crate::error::{LookupError, Result};
use crate::types::{FoodItem, LookupResult, Mode};

/// Outcome of searching free text for an embedded JSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Parsed(Value),
    /// No bracketed span of the wanted kind exists.
    NoMatch,
    /// Spans exist, but none parsed into an acceptable value.
    Invalid(String),
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    citations: Option<Vec<Value>>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct RawFoodItem {
    name: Option<String>,
    carbs: Option<f64>,
    #[serde(default)]
    details: Option<String>,
}

/// Turn a successful upstream reply into a validated result.
pub fn extract(reply: &RawReply, mode: Mode) -> Result<LookupResult> {
    let envelope: ChatCompletionResponse = serde_json::from_str(&reply.body)
        .map_err(|e| LookupError::Parse(format!("invalid API response: {e}")))?;

    let content = envelope
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| LookupError::Parse("invalid API response: no message content".into()))?;

    let citations: Vec<String> = envelope
        .citations
        .unwrap_or_default()
        .into_iter()
        .filter_map(|c| match c {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect();

    let value = match locate_payload(content.trim(), mode) {
        Extraction::Parsed(value) => value,
        Extraction::NoMatch => {
            return Err(LookupError::Parse(format!(
                "no JSON {} found in reply",
                payload_name(mode)
            )))
        }
        Extraction::Invalid(reason) => return Err(LookupError::Parse(reason)),
    };

    match mode {
        Mode::Multi => {
            let items = validate_items(value)?;
            Ok(LookupResult::Multi { items, citations })
        }
        Mode::Single => {
            let item = validate_item(value).map_err(LookupError::Parse)?;
            Ok(LookupResult::Single { item, citations })
        }
    }
}

fn payload_name(mode: Mode) -> &'static str {
    match mode {
        Mode::Multi => "array",
        Mode::Single => "object",
    }
}

/// Find the payload for `mode` inside free text.
///
/// Multi mode wants an array whose elements are all objects (an empty
/// array counts); single mode wants an object.
pub fn locate_payload(text: &str, mode: Mode) -> Extraction {
    match mode {
        Mode::Multi => locate_json(text, b'[', b']', |v| {
            v.as_array()
                .is_some_and(|items| items.iter().all(Value::is_object))
        }),
        Mode::Single => locate_json(text, b'{', b'}', Value::is_object),
    }
}

/// Return the first balanced `open`..`close` span that parses and is
/// accepted by `accept`.
///
/// Brackets inside JSON strings are ignored. A closed span that fails is
/// skipped as a whole, so nested values of a rejected candidate are never
/// considered on their own. An opener that never closes is stepped over,
/// since a balanced payload may still follow it.
pub fn locate_json(text: &str, open: u8, close: u8, accept: impl Fn(&Value) -> bool) -> Extraction {
    let bytes = text.as_bytes();
    let mut search_from = 0;
    let mut first_failure: Option<String> = None;

    while let Some(offset) = bytes[search_from..].iter().position(|&b| b == open) {
        let start = search_from + offset;
        let Some(end) = balanced_end(bytes, start, open, close) else {
            first_failure.get_or_insert_with(|| "unterminated JSON in reply".to_string());
            search_from = start + 1;
            continue;
        };

        // `open` and `close` are ASCII, so both indices are char boundaries.
        match serde_json::from_str::<Value>(&text[start..=end]) {
            Ok(value) if accept(&value) => return Extraction::Parsed(value),
            Ok(_) => {
                first_failure
                    .get_or_insert_with(|| "JSON in reply has an unexpected shape".to_string());
            }
            Err(e) => {
                first_failure.get_or_insert_with(|| format!("malformed JSON in reply: {e}"));
            }
        }
        search_from = end + 1;
    }

    match first_failure {
        Some(reason) => Extraction::Invalid(reason),
        None => Extraction::NoMatch,
    }
}

fn balanced_end(bytes: &[u8], start: usize, open: u8, close: u8) -> Option<usize> {
    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, &byte) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        if byte == b'"' {
            in_string = true;
        } else if byte == open {
            depth += 1;
        } else if byte == close {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Some(idx);
            }
        }
    }
    None
}

fn validate_items(value: Value) -> Result<Vec<FoodItem>> {
    let Value::Array(elements) = value else {
        return Err(LookupError::Parse("expected a JSON array of food items".into()));
    };

    elements
        .into_iter()
        .enumerate()
        .map(|(idx, element)| {
            validate_item(element).map_err(|reason| LookupError::Parse(format!("item {idx}: {reason}")))
        })
        .collect()
}

fn validate_item(value: Value) -> std::result::Result<FoodItem, String> {
    if !value.is_object() {
        return Err("expected a JSON object".into());
    }
    let raw: RawFoodItem = serde_json::from_value(value).map_err(|e| e.to_string())?;

    let name = raw
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or("missing name")?;

    let carbs = raw.carbs.ok_or("missing numeric carbs")?;
    if !carbs.is_finite() || carbs < 0.0 {
        return Err(format!("carbs must be a non-negative number, got {carbs}"));
    }

    let details = raw.details.filter(|d| !d.trim().is_empty());

    Ok(FoodItem {
        name,
        carbs,
        details,
    })
}
