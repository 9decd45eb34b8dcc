//! The HTTP collaborator contract shared by every client.
//!
//! A [`Transport`] POSTs one request and reports what it receives as a
//! stream of [`TransportEvent`]s: zero or more `Progress` events carrying
//! newly received bytes, then exactly one `Complete`.

use bytes::Bytes;
use futures_core::Stream;
use pcore::Error;
use tokio_util::sync::CancellationToken;

/// Issues POST requests on behalf of a client.
pub trait Transport: Clone + Send + Sync + 'static {
    /// Send `request`. When `cancel` fires the transport aborts and
    /// yields a failed [`Completion`] promptly.
    fn post(
        &self,
        request: HttpRequest,
        cancel: CancellationToken,
    ) -> impl Stream<Item = TransportEvent> + Send + 'static;
}

/// A request ready to send.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Target URL.
    pub url: String,
    /// Bearer token for the `Authorization` header.
    pub bearer: String,
    /// Request payload.
    pub body: Body,
}

impl HttpRequest {
    /// A JSON request.
    pub fn json(
        url: impl Into<String>,
        bearer: impl Into<String>,
        body: &impl serde::Serialize,
    ) -> Result<Self, Error> {
        let body = serde_json::to_vec(body).map_err(|e| Error::InvalidRequest(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            bearer: bearer.into(),
            body: Body::Json(Bytes::from(body)),
        })
    }
}

/// Request payload.
#[derive(Debug, Clone)]
pub enum Body {
    /// Serialized JSON.
    Json(Bytes),
    /// A multipart form with text fields and one file.
    Multipart {
        fields: Vec<(String, String)>,
        file: FilePart,
    },
}

/// The file part of a multipart body.
#[derive(Debug, Clone)]
pub struct FilePart {
    /// Form field name.
    pub field: String,
    /// File name hint for format detection.
    pub file_name: String,
    /// File contents.
    pub data: Bytes,
}

/// One step of a response.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Bytes received since the previous event.
    Progress(Bytes),
    /// The terminal event.
    Complete(Completion),
}

/// The outcome of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// Whether a response was received at all.
    pub success: bool,
    /// HTTP status code; 0 when no response arrived.
    pub status: u16,
    /// Full response body as text.
    pub body: String,
}

impl Completion {
    /// A completed response.
    pub fn ok(status: u16, body: impl Into<String>) -> Self {
        Self {
            success: true,
            status,
            body: body.into(),
        }
    }

    /// No response; `reason` describes why.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            status: 0,
            body: reason.into(),
        }
    }

    /// Classify into the body of a successful response or the error that
    /// ends the request.
    pub fn into_result(self) -> Result<String, Error> {
        if !self.success {
            let reason = if self.body.is_empty() {
                "network request failed".to_owned()
            } else {
                self.body
            };
            return Err(Error::Network(reason));
        }
        if !(200..300).contains(&self.status) {
            return Err(Error::Status {
                status: self.status,
                body: self.body,
            });
        }
        Ok(self.body)
    }
}
