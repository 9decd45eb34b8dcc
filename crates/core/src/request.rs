//! Chat request body.

use crate::ChatMessage;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Per-turn options for a chat request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChatOptions {
    /// Sampling temperature, clamped to `0.0..=2.0` on use.
    pub temperature: f32,

    /// Completion token limit; `None` means no limit.
    pub max_tokens: Option<u32>,

    /// Whether to request a line-delimited streaming response.
    pub stream: bool,
}

impl ChatOptions {
    /// Options for a streaming request.
    pub fn streaming() -> Self {
        Self {
            stream: true,
            ..Self::default()
        }
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the completion token limit.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            stream: false,
        }
    }
}

/// The JSON body POSTed to the chat endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatRequest {
    /// The model to use.
    pub model: CompactString,

    /// The conversation messages.
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature.
    pub temperature: f32,

    /// Whether the response is streamed.
    pub stream: bool,

    /// Completion token limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Constrains the reply to a JSON document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<Value>,
}

impl ChatRequest {
    /// Build a request body from messages and options.
    pub fn new(
        model: impl Into<CompactString>,
        messages: Vec<ChatMessage>,
        options: &ChatOptions,
    ) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: options.temperature.clamp(0.0, 2.0),
            stream: options.stream,
            max_tokens: options.max_tokens.filter(|n| *n > 0),
            response_format: None,
        }
    }

    /// Ask for a reply matching a JSON schema.
    ///
    /// A schema that is already a `response_format` object (it has a
    /// `"type"` of `json_schema` or `json_object`) is sent as is.
    pub fn with_schema(mut self, schema: Value) -> Self {
        let wrapped = matches!(
            schema.get("type").and_then(Value::as_str),
            Some("json_schema" | "json_object")
        );
        self.response_format = Some(if wrapped {
            schema
        } else {
            json!({
                "type": "json_schema",
                "json_schema": { "name": "structured_output", "schema": schema },
            })
        });
        self
    }
}
