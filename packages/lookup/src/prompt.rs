use crate::client::{ChatMessage, CompletionRequest, Role};
use crate::sanitize::SanitizedInput;
use crate::types::Mode;

const SYSTEM_MULTI: &str = include_str!("../prompts/system_multi.txt");
const SYSTEM_SINGLE: &str = include_str!("../prompts/system_single.txt");

/// Completion budget for a multi-item reply: several JSON objects, no prose.
pub const MULTI_MAX_TOKENS: u32 = 600;

/// Completion budget for a single JSON object.
pub const SINGLE_MAX_TOKENS: u32 = 300;

/// Sampling temperature for every lookup.
pub const TEMPERATURE: f64 = 0.0;

/// The system/user message pair sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessages {
    pub system: String,
    pub user: String,
}

impl PromptMessages {
    /// Messages in wire order.
    pub fn to_chat_messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage {
                role: Role::System,
                content: self.system.clone(),
            },
            ChatMessage {
                role: Role::User,
                content: self.user.clone(),
            },
        ]
    }
}

/// Build the system prompt for a mode.
pub fn build_system_prompt(mode: Mode) -> &'static str {
    match mode {
        Mode::Multi => SYSTEM_MULTI.trim(),
        Mode::Single => SYSTEM_SINGLE.trim(),
    }
}

/// Build the message pair for a sanitised input.
///
/// The user message is the sanitised text itself in both modes; the
/// extraction contract lives entirely in the system message.
pub fn build_prompt(input: &SanitizedInput, mode: Mode) -> PromptMessages {
    PromptMessages {
        system: build_system_prompt(mode).to_string(),
        user: input.as_str().to_string(),
    }
}

pub fn max_tokens(mode: Mode) -> u32 {
    match mode {
        Mode::Multi => MULTI_MAX_TOKENS,
        Mode::Single => SINGLE_MAX_TOKENS,
    }
}

/// Build the full completion request for a sanitised input.
pub fn build_request(input: &SanitizedInput, mode: Mode) -> CompletionRequest {
    CompletionRequest {
        messages: build_prompt(input, mode),
        max_tokens: max_tokens(mode),
        temperature: TEMPERATURE,
    }
}
