//! Core types for the PlayKit AI SDK.
//!
//! Holds the chat data model (`ChatMessage`, `ConversationHistory`), the
//! wire types exchanged with the PlayKit endpoints, the error taxonomy and
//! the [`Accumulator`] that turns a growing line-delimited response body
//! into content deltas. Nothing in this crate performs I/O.

pub use {
    accumulator::{Accumulator, Progress},
    error::{Error, ErrorInfo, Result},
    history::ConversationHistory,
    image::{GeneratedImage, ImageOptions, ImageRequest, ImageResponse},
    message::{ChatMessage, Role},
    request::{ChatOptions, ChatRequest, DEFAULT_TEMPERATURE},
    response::{ChatResponse, Choice, Response, Usage},
    stream::{Frame, StreamChoice, StreamChunk},
    tool::{FunctionCall, ToolCall},
    transcription::{TranscriptionResult, TranscriptionSegment},
};

pub mod accumulator;
mod error;
mod history;
pub mod image;
mod message;
mod request;
pub mod response;
pub mod stream;
mod tool;
pub mod transcription;
