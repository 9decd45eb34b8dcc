//! Chat response types: the non-streaming wire body and the terminal record.

use crate::{ChatMessage, Error, ErrorInfo, Role, tool::ToolCall};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Message content in a completion response
///
/// Used for both streaming deltas and non-streaming response messages.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Delta {
    /// The role of the message author
    pub role: Option<Role>,

    /// The content of the message
    pub content: Option<String>,

    /// Tool calls made by the model
    pub tool_calls: Option<Vec<ToolCall>>,

    /// Some deployments report the finish reason on the message itself
    pub finish_reason: Option<CompactString>,
}

/// A non-streaming chat completion body
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// A unique identifier for the chat completion
    #[serde(default)]
    pub id: String,

    /// The object type
    #[serde(default)]
    pub object: String,

    /// Unix timestamp (in seconds) of when the response was created
    #[serde(default)]
    pub created: u64,

    /// The model used for the completion
    #[serde(default)]
    pub model: String,

    /// The list of completion choices
    pub choices: Vec<Choice>,

    /// Token usage statistics
    pub usage: Usage,
}

impl Response {
    /// Decode a response body.
    pub fn parse(body: &str) -> Result<Self, Error> {
        serde_json::from_str(body).map_err(Into::into)
    }

    /// Get the first message from the response
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }

    /// Get the reason the model stopped generating
    pub fn reason(&self) -> Option<&str> {
        let choice = self.choices.first()?;
        choice
            .finish_reason
            .as_deref()
            .or(choice.message.finish_reason.as_deref())
    }

    /// Convert into the terminal record.
    ///
    /// Fails when the body carries no choice to read from.
    pub fn into_chat_response(self) -> Result<ChatResponse, Error> {
        let finish_reason = self.reason().map(CompactString::from);
        let Some(choice) = self.choices.into_iter().next() else {
            return Err(Error::Parse("response contains no choices".into()));
        };

        Ok(ChatResponse {
            success: true,
            content: choice.message.content.unwrap_or_default(),
            finish_reason,
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
            usage: self.usage,
            error: None,
        })
    }
}

/// A completion choice in a non-streaming response
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    /// The index of this choice in the list
    #[serde(default)]
    pub index: u32,

    /// The generated message
    pub message: Delta,

    /// The reason the model stopped generating
    #[serde(default)]
    pub finish_reason: Option<CompactString>,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Usage {
    /// Number of tokens in the prompt
    pub prompt_tokens: u32,

    /// Number of tokens in the completion
    pub completion_tokens: u32,

    /// Total number of tokens used
    pub total_tokens: u32,
}

/// The terminal record of a chat request.
///
/// Built once, either from a non-streaming body or from a finished
/// stream, and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChatResponse {
    /// Whether the request succeeded
    pub success: bool,

    /// The assistant's reply
    pub content: String,

    /// Why the model stopped generating
    pub finish_reason: Option<CompactString>,

    /// Tool calls requested by the model
    pub tool_calls: Vec<ToolCall>,

    /// Token usage statistics
    pub usage: Usage,

    /// The failure, when `success` is false
    pub error: Option<ErrorInfo>,
}

impl ChatResponse {
    /// A failed record carrying the error.
    pub fn failed(error: &Error) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// The assistant message to record in the conversation history.
    pub fn message(&self) -> ChatMessage {
        ChatMessage::assistant(self.content.clone())
    }
}
