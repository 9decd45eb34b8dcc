//! Speech-to-text client.

use crate::{
    ClientConfig, HttpTransport,
    slot::Slot,
    transport::{Body, FilePart, HttpRequest, Transport},
};
use bytes::Bytes;
use compact_str::CompactString;
use pcore::{Error, Result, TranscriptionResult};
use std::{path::Path, sync::Arc};

/// AI speech-to-text client.
#[derive(Clone)]
pub struct TranscriptionClient<T = HttpTransport> {
    transport: T,
    config: ClientConfig,
    model: CompactString,
    slot: Arc<Slot>,
}

impl TranscriptionClient<HttpTransport> {
    /// Create a client over the default HTTP transport.
    pub fn http(config: ClientConfig) -> Self {
        Self::new(HttpTransport::default(), config)
    }
}

impl<T: Transport> TranscriptionClient<T> {
    /// Create a client using the configured default transcription model.
    pub fn new(transport: T, config: ClientConfig) -> Self {
        let model = config.models.transcription.clone();
        Self {
            transport,
            config,
            model,
            slot: Arc::new(Slot::default()),
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

    /// Whether a request is in flight.
    pub fn is_processing(&self) -> bool {
        self.slot.is_busy()
    }

    /// Abort the in-flight request. Returns `false` when idle.
    pub fn cancel(&self) -> bool {
        self.slot.cancel()
    }

    /// Transcribe encoded audio. `file_name` tells the service the format.
    pub async fn transcribe(
        &self,
        audio: Bytes,
        file_name: &str,
        language: Option<&str>,
    ) -> Result<TranscriptionResult> {
        if audio.is_empty() {
            return Err(Error::InvalidRequest("audio data cannot be empty".into()));
        }
        self.config.validate()?;
        let bearer = self.config.bearer()?;
        let claim = self.slot.acquire()?;

        let mut fields = vec![
            ("model".to_owned(), self.model.to_string()),
            ("response_format".to_owned(), "verbose_json".to_owned()),
        ];
        if let Some(language) = language.filter(|l| !l.is_empty()) {
            fields.push(("language".to_owned(), language.to_owned()));
        }
        tracing::debug!(
            "transcribing {file_name} ({} bytes, model: {})",
            audio.len(),
            self.model
        );
        let request = HttpRequest {
            url: self.config.transcription_url(),
            bearer,
            body: Body::Multipart {
                fields,
                file: FilePart {
                    field: "file".to_owned(),
                    file_name: file_name.to_owned(),
                    data: audio,
                },
            },
        };

        let result = claim
            .finish(self.transport.post(request, claim.token.clone()))
            .await
            .and_then(|body| TranscriptionResult::parse(&body));

        if let Err(e) = &result {
            tracing::error!("transcription error [{}]: {}", e.code(), e.message());
        }
        result
    }

    /// Read an audio file and transcribe it.
    pub async fn transcribe_file(
        &self,
        path: impl AsRef<Path>,
        language: Option<&str>,
    ) -> Result<TranscriptionResult> {
        let path = path.as_ref();
        let audio = tokio::fs::read(path)
            .await
            .map_err(|e| Error::InvalidRequest(format!("failed to read {}: {e}", path.display())))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".to_owned());
        self.transcribe(Bytes::from(audio), &file_name, language).await
    }
}
