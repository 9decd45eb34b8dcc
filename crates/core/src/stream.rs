//! Streaming frames.
//!
//! A streaming body is a sequence of `\n`-delimited lines. Each non-empty
//! line is either a JSON chunk carrying an incremental delta or the
//! `[DONE]` sentinel. Lines may carry an SSE `data:` prefix.

use crate::{Usage, response::Delta, tool::ToolCall};
use compact_str::CompactString;
use serde::Deserialize;

/// The sentinel line that ends a stream.
pub const DONE: &str = "[DONE]";

/// SSE fields other than `data:` that carry no frame.
const SSE_FIELDS: [&str; 3] = ["event:", "id:", "retry:"];

/// One decoded line of a streaming body.
#[derive(Debug, Clone)]
pub enum Frame {
    /// An incremental delta.
    Delta(StreamChunk),
    /// The end-of-stream sentinel.
    Done,
}

impl Frame {
    /// Decode a single line (without its trailing delimiter).
    ///
    /// Returns `Ok(None)` for lines that carry no frame: blanks, SSE
    /// comments and SSE `event:`, `id:` or `retry:` fields.
    pub fn decode(line: &str) -> Result<Option<Self>, serde_json::Error> {
        let mut data = line.trim();
        if let Some(rest) = data.strip_prefix("data:") {
            data = rest.trim();
        } else if SSE_FIELDS.iter().any(|field| data.starts_with(field)) {
            return Ok(None);
        }
        if data.is_empty() || data.starts_with(':') {
            return Ok(None);
        }
        if data == DONE {
            return Ok(Some(Self::Done));
        }
        serde_json::from_str(data).map(|chunk| Some(Self::Delta(chunk)))
    }
}

/// A streaming chat completion chunk
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamChunk {
    /// A unique identifier for the chat completion
    #[serde(default)]
    pub id: String,

    /// The model used for the completion
    #[serde(default)]
    pub model: String,

    /// The list of completion choices (with delta content)
    #[serde(default)]
    pub choices: Vec<StreamChoice>,

    /// Token usage statistics (usually only in the final chunk)
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl StreamChunk {
    /// Get the content of the first choice
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// Get the tool call fragments of the first choice
    pub fn tool_calls(&self) -> Option<&[ToolCall]> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.tool_calls.as_deref())
    }

    /// Get the reason the model stopped generating
    pub fn reason(&self) -> Option<&str> {
        let choice = self.choices.first()?;
        choice
            .finish_reason
            .as_deref()
            .or(choice.delta.finish_reason.as_deref())
    }
}

/// A choice inside a streaming chunk
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamChoice {
    /// The index of this choice in the list
    #[serde(default)]
    pub index: u32,

    /// The incremental message fragment
    #[serde(default, alias = "message")]
    pub delta: Delta,

    /// The reason the model stopped generating
    #[serde(default)]
    pub finish_reason: Option<CompactString>,
}
