//! reqwest-backed [`Transport`].
//!
//! `HttpTransport` wraps a `reqwest::Client` and reports the response
//! body incrementally as it arrives, so the same transport serves both
//! streaming and non-streaming calls.

use crate::transport::{Body, Completion, HttpRequest, Transport, TransportEvent};
use async_stream::stream;
use futures_core::Stream;
use futures_util::StreamExt;
use pcore::Error;
use reqwest::{
    Client, Method, RequestBuilder,
    header::{self, HeaderMap, HeaderValue},
    multipart::{Form, Part},
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Shared HTTP transport for every PlayKit client.
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    client: Client,
    timeout: Option<Duration>,
}

impl HttpTransport {
    /// Create a transport over an existing client.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            timeout: None,
        }
    }

    /// Abort requests that take longer than `timeout` end to end.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The configured request timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Headers attached to a request.
    pub fn headers(request: &HttpRequest) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        if let Body::Json(_) = request.body {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }
        let auth = format!("Bearer {}", request.bearer)
            .parse()
            .map_err(|_| Error::Config("authentication token is not a valid header value".into()))?;
        headers.insert(header::AUTHORIZATION, auth);
        Ok(headers)
    }

    fn build(&self, request: HttpRequest) -> Result<RequestBuilder, Error> {
        let headers = Self::headers(&request)?;
        let mut builder = self
            .client
            .request(Method::POST, &request.url)
            .headers(headers);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        builder = match request.body {
            Body::Json(bytes) => {
                tracing::trace!("request: {}", String::from_utf8_lossy(&bytes));
                builder.body(bytes)
            }
            Body::Multipart { fields, file } => {
                tracing::trace!(
                    "multipart request: {} fields, {} ({} bytes)",
                    fields.len(),
                    file.file_name,
                    file.data.len()
                );
                let part = Part::bytes(file.data.to_vec()).file_name(file.file_name);
                let form = fields
                    .into_iter()
                    .fold(Form::new(), |form, (name, value)| form.text(name, value))
                    .part(file.field, part);
                builder.multipart(form)
            }
        };
        Ok(builder)
    }
}

impl Transport for HttpTransport {
    fn post(
        &self,
        request: HttpRequest,
        cancel: CancellationToken,
    ) -> impl Stream<Item = TransportEvent> + Send + 'static {
        let url = request.url.clone();
        let builder = self.build(request);

        stream! {
            let builder = match builder {
                Ok(builder) => builder,
                Err(e) => {
                    yield TransportEvent::Complete(Completion::failed(e.to_string()));
                    return;
                }
            };

            tracing::debug!("sending request to {url}");
            let sent = tokio::select! {
                _ = cancel.cancelled() => None,
                result = builder.send() => Some(result),
            };
            let response = match sent {
                None => {
                    yield TransportEvent::Complete(Completion::failed("request cancelled"));
                    return;
                }
                Some(Err(e)) => {
                    tracing::debug!("request to {url} failed: {e}");
                    yield TransportEvent::Complete(Completion::failed(e.to_string()));
                    return;
                }
                Some(Ok(response)) => response,
            };

            let status = response.status().as_u16();
            tracing::debug!("{url} responded with status: {status}");
            let mut body = Vec::new();
            let mut stream = response.bytes_stream();
            loop {
                let next = tokio::select! {
                    _ = cancel.cancelled() => None,
                    next = stream.next() => Some(next),
                };
                match next {
                    None => {
                        yield TransportEvent::Complete(Completion::failed("request cancelled"));
                        return;
                    }
                    Some(None) => break,
                    Some(Some(Ok(bytes))) => {
                        tracing::trace!(
                            "chunk ({} bytes): {}",
                            bytes.len(),
                            String::from_utf8_lossy(&bytes)
                        );
                        body.extend_from_slice(&bytes);
                        yield TransportEvent::Progress(bytes);
                    }
                    Some(Some(Err(e))) => {
                        tracing::debug!("stream from {url} failed after {} bytes: {e}", body.len());
                        yield TransportEvent::Complete(Completion::failed(e.to_string()));
                        return;
                    }
                }
            }

            yield TransportEvent::Complete(Completion::ok(
                status,
                String::from_utf8_lossy(&body).into_owned(),
            ));
        }
    }
}
