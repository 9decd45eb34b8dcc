//! Chat client with streaming support.
//!
//! A [`ChatClient`] keeps the conversation history and allows at most one
//! request in flight. Each request moves through
//! `Idle -> Sending -> Streaming -> Idle`, or through `Cancelling` when
//! [`ChatClient::cancel`] is called. Every request ends with exactly one
//! terminal event, after which the client is `Idle` again.

use crate::{
    ChatEvent, ChatListener, ClientConfig, HttpTransport,
    transport::{Completion, HttpRequest, Transport, TransportEvent},
};
use compact_str::CompactString;
use futures_core::Stream;
use futures_util::StreamExt;
use parking_lot::{Mutex, RwLock};
use pcore::{
    Accumulator, ChatMessage, ChatOptions, ChatRequest, ChatResponse, ConversationHistory, Error,
    ErrorInfo, Response, Result,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Where a client is in its request lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No request in flight.
    Idle,
    /// Request sent, nothing received yet.
    Sending,
    /// Response bytes are arriving.
    Streaming,
    /// Cancel requested, waiting for the transport's terminal event.
    Cancelling,
}

/// AI chat client.
#[derive(Clone)]
pub struct ChatClient<T = HttpTransport> {
    transport: T,
    config: ClientConfig,
    model: CompactString,
    inner: Arc<Inner>,
}

impl ChatClient<HttpTransport> {
    /// Create a client over the default HTTP transport.
    pub fn http(config: ClientConfig) -> Self {
        Self::new(HttpTransport::default(), config)
    }
}

impl<T: Transport> ChatClient<T> {
    /// Create a client using the configured default chat model.
    pub fn new(transport: T, config: ClientConfig) -> Self {
        let model = config.models.chat.clone();
        Self {
            transport,
            config,
            model,
            inner: Arc::new(Inner::default()),
        }
    }

    /// Use a specific model. Empty names keep the default.
    pub fn with_model(mut self, model: impl Into<CompactString>) -> Self {
        let model = model.into();
        if !model.is_empty() {
            self.model = model;
        }
        self
    }

    /// The model this client sends requests to.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Register a listener for deltas and terminal events.
    pub fn subscribe(&self, listener: impl ChatListener + 'static) {
        self.inner.listeners.write().push(Arc::new(listener));
    }

    /// Replace or insert the system prompt.
    pub fn set_system_prompt(&self, prompt: impl Into<String>) {
        self.inner.session.lock().history.set_system_prompt(prompt);
    }

    /// Append a message to the history without sending anything.
    pub fn push_message(&self, message: ChatMessage) {
        self.inner.session.lock().history.push(message);
    }

    /// Drop the conversation, keeping the system prompt.
    pub fn clear_history(&self) {
        self.inner.session.lock().history.clear();
    }

    /// A snapshot of the conversation history.
    pub fn history(&self) -> ConversationHistory {
        self.inner.session.lock().history.clone()
    }

    /// The current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.inner.session.lock().phase
    }

    /// Whether a request is in flight.
    pub fn is_processing(&self) -> bool {
        self.phase() != Phase::Idle
    }

    /// Append `prompt` as a user message and send the whole history.
    ///
    /// Fails without side effects when a request is already in flight,
    /// the prompt is empty, or configuration is missing. Must be called
    /// from within a Tokio runtime.
    pub fn send(&self, prompt: impl Into<String>, options: ChatOptions) -> Result<RequestHandle> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(Error::InvalidRequest("prompt cannot be empty".into()));
        }
        self.begin(Turn::Prompt(ChatMessage::user(prompt)), options)
    }

    /// Send an explicit message list instead of the history.
    ///
    /// The history is left untouched apart from the assistant reply,
    /// which is appended on success.
    pub fn send_messages(
        &self,
        messages: Vec<ChatMessage>,
        options: ChatOptions,
    ) -> Result<RequestHandle> {
        if messages.is_empty() {
            return Err(Error::InvalidRequest("messages cannot be empty".into()));
        }
        self.begin(Turn::Messages(messages), options)
    }

    /// Generate a JSON document matching `schema`.
    ///
    /// Sends a one-off non-streaming request built from `prompt` and the
    /// optional `system` message; the history is neither sent nor
    /// updated. A reply whose content is not valid JSON fails with a
    /// parse error. Success is reported as [`ChatEvent::Structured`].
    /// Busy and cancel rules are the same as for [`ChatClient::send`].
    pub fn generate_structured(
        &self,
        prompt: impl Into<String>,
        schema: Value,
        system: Option<&str>,
        temperature: f32,
    ) -> Result<RequestHandle> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(Error::InvalidRequest("prompt cannot be empty".into()));
        }
        if !schema.is_object() {
            return Err(Error::InvalidRequest("schema must be a JSON object".into()));
        }

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system.filter(|s| !s.trim().is_empty()) {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(prompt));
        let options = ChatOptions::default().with_temperature(temperature);
        self.begin(Turn::Structured { messages, schema }, options)
    }

    fn begin(&self, turn: Turn, options: ChatOptions) -> Result<RequestHandle> {
        self.config.validate()?;
        let bearer = self.config.bearer()?;

        let (generation, request, cancel) = {
            let mut session = self.inner.session.lock();
            if session.phase != Phase::Idle {
                tracing::debug!("rejecting chat request: {:?} in progress", session.phase);
                return Err(Error::Busy);
            }

            let structured = matches!(turn, Turn::Structured { .. });
            let (body, prompt) = match turn {
                Turn::Prompt(message) => {
                    let mut messages = session.history.messages().to_vec();
                    messages.push(message.clone());
                    let body = ChatRequest::new(self.model.clone(), messages, &options);
                    (body, Some(message))
                }
                Turn::Messages(messages) => {
                    (ChatRequest::new(self.model.clone(), messages, &options), None)
                }
                Turn::Structured { messages, schema } => {
                    let body = ChatRequest::new(self.model.clone(), messages, &options)
                        .with_schema(schema);
                    (body, None)
                }
            };
            let request = HttpRequest::json(self.config.chat_url(), bearer, &body)?;

            if let Some(message) = prompt {
                session.history.push(message);
            }
            let cancel = CancellationToken::new();
            session.generation += 1;
            session.phase = Phase::Sending;
            session.stream = options.stream;
            session.structured = structured;
            session.accumulator = Accumulator::new();
            session.cancel = Some(cancel.clone());
            (session.generation, request, cancel)
        };

        tracing::debug!(
            "sending chat request #{generation} (model: {}, stream: {})",
            self.model,
            options.stream
        );
        let events = self.transport.post(request, cancel);
        let inner = self.inner.clone();
        let task = tokio::spawn(async move { inner.drive(generation, events).await });
        Ok(RequestHandle { generation, task })
    }

    /// Ask the transport to abort the in-flight request.
    ///
    /// Returns `false` when nothing is in flight. The client stays busy
    /// until the transport delivers its terminal event, which is reported
    /// as a `CANCELLED` error.
    pub fn cancel(&self) -> bool {
        let mut session = self.inner.session.lock();
        match session.phase {
            Phase::Idle => false,
            Phase::Cancelling => true,
            Phase::Sending | Phase::Streaming => {
                tracing::debug!("cancelling chat request #{}", session.generation);
                session.phase = Phase::Cancelling;
                if let Some(cancel) = &session.cancel {
                    cancel.cancel();
                }
                true
            }
        }
    }

    /// Feed the cumulative response body of the in-flight request.
    pub fn on_progress(&self, cumulative: &[u8]) {
        self.inner.progress(None, Feed::Cumulative(cumulative));
    }

    /// Deliver the terminal callback of the in-flight request.
    ///
    /// A second call for the same request is ignored.
    pub fn on_complete(&self, completion: Completion) {
        self.inner.complete(None, completion);
    }
}

/// Handle to a request started by [`ChatClient::send`].
#[derive(Debug)]
pub struct RequestHandle {
    generation: u64,
    task: JoinHandle<Option<ChatResponse>>,
}

impl RequestHandle {
    /// Sequence number of the request on its client.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait until the request's terminal event has been emitted.
    ///
    /// Returns the terminal record, or `None` when the request was ended
    /// through [`ChatClient::on_complete`] instead of by its transport.
    pub async fn finished(self) -> Option<ChatResponse> {
        match self.task.await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("chat request #{} driver failed: {e}", self.generation);
                None
            }
        }
    }
}

enum Turn {
    Prompt(ChatMessage),
    Messages(Vec<ChatMessage>),
    Structured {
        messages: Vec<ChatMessage>,
        schema: Value,
    },
}

enum Feed<'a> {
    Chunk(&'a [u8]),
    Cumulative(&'a [u8]),
}

#[derive(Default)]
struct Inner {
    session: Mutex<Session>,
    listeners: RwLock<Vec<Arc<dyn ChatListener>>>,
}

struct Session {
    phase: Phase,
    generation: u64,
    stream: bool,
    structured: bool,
    accumulator: Accumulator,
    cancel: Option<CancellationToken>,
    history: ConversationHistory,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            generation: 0,
            stream: false,
            structured: false,
            accumulator: Accumulator::new(),
            cancel: None,
            history: ConversationHistory::new(),
        }
    }
}

impl Session {
    /// Whether a callback for `generation` belongs to the in-flight
    /// request. `None` means the current request.
    fn accepts(&self, generation: Option<u64>) -> bool {
        self.phase != Phase::Idle && generation.is_none_or(|g| g == self.generation)
    }
}

impl Inner {
    async fn drive(
        self: Arc<Self>,
        generation: u64,
        events: impl Stream<Item = TransportEvent> + Send,
    ) -> Option<ChatResponse> {
        let mut events = std::pin::pin!(events);
        while let Some(event) = events.next().await {
            match event {
                TransportEvent::Progress(bytes) => {
                    self.progress(Some(generation), Feed::Chunk(&bytes))
                }
                TransportEvent::Complete(completion) => {
                    return self.complete(Some(generation), completion);
                }
            }
        }

        tracing::warn!("transport closed chat request #{generation} without completing");
        self.complete(
            Some(generation),
            Completion::failed("transport closed without completing"),
        )
    }

    fn progress(&self, generation: Option<u64>, feed: Feed<'_>) {
        let deltas = {
            let mut session = self.session.lock();
            if !session.accepts(generation) {
                tracing::warn!("ignoring progress for a request that is no longer in flight");
                return;
            }
            match session.phase {
                Phase::Cancelling => return,
                Phase::Sending => {
                    tracing::debug!("chat request #{} receiving", session.generation);
                    session.phase = Phase::Streaming;
                }
                Phase::Streaming | Phase::Idle => {}
            }
            if !session.stream {
                return;
            }

            let progress = match feed {
                Feed::Chunk(bytes) => session.accumulator.extend(bytes),
                Feed::Cumulative(buffer) => session.accumulator.on_progress(buffer),
            };
            progress.deltas
        };

        let events: Vec<_> = deltas.into_iter().map(ChatEvent::Delta).collect();
        self.emit(&events);
    }

    fn complete(&self, generation: Option<u64>, completion: Completion) -> Option<ChatResponse> {
        let (event, record) = {
            let mut session = self.session.lock();
            if !session.accepts(generation) {
                tracing::warn!("ignoring completion for a request that already finished");
                return None;
            }

            let phase = session.phase;
            let streaming = session.stream;
            let structured = session.structured;
            let accumulator = std::mem::take(&mut session.accumulator);
            session.phase = Phase::Idle;
            session.stream = false;
            session.structured = false;
            session.cancel = None;

            let outcome = if phase == Phase::Cancelling {
                Err(Error::Cancelled)
            } else {
                completion.into_result().and_then(|body| {
                    if streaming {
                        Ok(accumulator.finish())
                    } else {
                        Response::parse(&body)?.into_chat_response()
                    }
                })
            };

            let outcome = outcome.and_then(|response| {
                if !structured {
                    return Ok((response, None));
                }
                let value = serde_json::from_str::<Value>(response.content.trim())
                    .map_err(|e| Error::Parse(format!("structured reply is not JSON: {e}")))?;
                Ok((response, Some(value)))
            });

            match outcome {
                Ok((response, Some(value))) => {
                    tracing::debug!(
                        "structured request #{} completed ({} tokens)",
                        session.generation,
                        response.usage.total_tokens
                    );
                    (ChatEvent::Structured(value), response)
                }
                Ok((response, None)) => {
                    session.history.push(response.message());
                    tracing::debug!(
                        "chat request #{} completed ({} tokens)",
                        session.generation,
                        response.usage.total_tokens
                    );
                    (ChatEvent::Completed(response.clone()), response)
                }
                Err(e) => {
                    let record = ChatResponse::failed(&e);
                    let info = ErrorInfo::from(&e);
                    tracing::error!("chat error [{}]: {}", info.code, info.message);
                    (ChatEvent::Failed(info), record)
                }
            }
        };

        self.emit(std::slice::from_ref(&event));
        Some(record)
    }

    fn emit(&self, events: &[ChatEvent]) {
        if events.is_empty() {
            return;
        }
        let listeners = self.listeners.read().clone();
        for event in events {
            for listener in &listeners {
                event.dispatch(listener.as_ref());
            }
        }
    }
}

