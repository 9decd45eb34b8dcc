//! Scripted in-memory transport.

#![allow(dead_code)]

use async_stream::stream;
use bytes::Bytes;
use futures_core::Stream;
use parking_lot::Mutex;
use playkit_client::{ClientConfig, Completion, HttpRequest, Transport, TransportEvent};
use std::{collections::VecDeque, sync::Arc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A transport whose responses are pushed by the test through [`Script`]s.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    requests: Vec<HttpRequest>,
    scripts: VecDeque<mpsc::UnboundedReceiver<TransportEvent>>,
    aborts: usize,
}

/// Feeds one response to the next `post`.
pub struct Script {
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl Script {
    pub fn chunk(&self, bytes: &str) {
        let _ = self
            .tx
            .send(TransportEvent::Progress(Bytes::copy_from_slice(bytes.as_bytes())));
    }

    pub fn complete(&self, status: u16, body: &str) {
        let _ = self.tx.send(TransportEvent::Complete(Completion::ok(status, body)));
    }

    pub fn fail(&self, reason: &str) {
        let _ = self.tx.send(TransportEvent::Complete(Completion::failed(reason)));
    }
}

impl MockTransport {
    /// Queue a script for the next request.
    pub fn script(&self) -> Script {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().scripts.push_back(rx);
        Script { tx }
    }

    /// Queue a complete response for the next request.
    pub fn respond(&self, status: u16, body: &str) {
        self.script().complete(status, body);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().requests.clone()
    }

    /// How many requests were aborted by cancellation.
    pub fn aborts(&self) -> usize {
        self.state.lock().aborts
    }
}

impl Transport for MockTransport {
    fn post(
        &self,
        request: HttpRequest,
        cancel: CancellationToken,
    ) -> impl Stream<Item = TransportEvent> + Send + 'static {
        let script = {
            let mut state = self.state.lock();
            state.requests.push(request);
            state.scripts.pop_front()
        };
        let state = self.state.clone();

        stream! {
            let Some(mut script) = script else {
                yield TransportEvent::Complete(Completion::failed("no response scripted"));
                return;
            };
            loop {
                let next = tokio::select! {
                    _ = cancel.cancelled() => None,
                    event = script.recv() => Some(event),
                };
                match next {
                    None => {
                        state.lock().aborts += 1;
                        yield TransportEvent::Complete(Completion::failed("aborted"));
                        return;
                    }
                    Some(None) => return,
                    Some(Some(event)) => {
                        let done = matches!(event, TransportEvent::Complete(_));
                        yield event;
                        if done {
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// A ready configuration pointing at `base_url`.
pub fn config(base_url: &str) -> ClientConfig {
    ClientConfig::new("game-42")
        .base_url(base_url)
        .developer_token("dev-token")
}

/// JSON body of a recorded request.
pub fn json_body(request: &HttpRequest) -> serde_json::Value {
    match &request.body {
        playkit_client::Body::Json(bytes) => serde_json::from_slice(bytes).expect("json body"),
        playkit_client::Body::Multipart { .. } => panic!("expected a json body"),
    }
}
