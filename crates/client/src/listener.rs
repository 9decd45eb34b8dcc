//! Chat event subscription.

use pcore::{ChatResponse, ErrorInfo};
use serde_json::Value;
use tokio::sync::mpsc;

/// An event emitted by a [`ChatClient`](crate::ChatClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// A content fragment decoded from one stream frame.
    Delta(String),
    /// The request finished successfully. Emitted once per request.
    Completed(ChatResponse),
    /// A structured request finished with a valid JSON document.
    Structured(Value),
    /// The request failed, was rejected by the server, or was cancelled.
    /// Emitted once per request.
    Failed(ErrorInfo),
}

/// Receives chat events. Every method defaults to a no-op.
///
/// Listeners run on the task driving the request, after the client's
/// internal lock is released, so they may call back into the client.
pub trait ChatListener: Send + Sync {
    /// A streamed content fragment.
    fn on_delta(&self, _delta: &str) {}

    /// The terminal success record.
    fn on_complete(&self, _response: &ChatResponse) {}

    /// The JSON document of a structured request.
    fn on_structured(&self, _value: &Value) {}

    /// The terminal failure.
    fn on_error(&self, _error: &ErrorInfo) {}
}

impl ChatEvent {
    /// Route this event to the matching listener method.
    pub fn dispatch(&self, listener: &dyn ChatListener) {
        match self {
            Self::Delta(delta) => listener.on_delta(delta),
            Self::Completed(response) => listener.on_complete(response),
            Self::Structured(value) => listener.on_structured(value),
            Self::Failed(error) => listener.on_error(error),
        }
    }
}

impl ChatListener for mpsc::UnboundedSender<ChatEvent> {
    fn on_delta(&self, delta: &str) {
        let _ = self.send(ChatEvent::Delta(delta.to_owned()));
    }

    fn on_complete(&self, response: &ChatResponse) {
        let _ = self.send(ChatEvent::Completed(response.clone()));
    }

    fn on_structured(&self, value: &Value) {
        let _ = self.send(ChatEvent::Structured(value.clone()));
    }

    fn on_error(&self, error: &ErrorInfo) {
        let _ = self.send(ChatEvent::Failed(error.clone()));
    }
}
