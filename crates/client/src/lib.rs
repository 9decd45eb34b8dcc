//! PlayKit AI clients.
//!
//! [`ChatClient`] streams chat completions through the accumulator in
//! `playkit-core`; [`ImageClient`] and [`TranscriptionClient`] are one-shot
//! request/response clients. All of them talk to the service through a
//! [`Transport`], with [`HttpTransport`] as the reqwest implementation.

pub use {
    chat::{ChatClient, Phase, RequestHandle},
    config::{ClientConfig, DEFAULT_BASE_URL, ModelDefaults, StaticToken, TokenProvider},
    http::HttpTransport,
    image::ImageClient,
    listener::{ChatEvent, ChatListener},
    transcription::TranscriptionClient,
    transport::{Body, Completion, FilePart, HttpRequest, Transport, TransportEvent},
};

mod chat;
pub mod config;
mod http;
mod image;
mod listener;
mod slot;
mod transcription;
pub mod transport;
