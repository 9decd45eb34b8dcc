//! Image generation client.

use crate::{
    ClientConfig, HttpTransport,
    slot::Slot,
    transport::{HttpRequest, Transport},
};
use compact_str::CompactString;
use pcore::{Error, GeneratedImage, ImageOptions, ImageRequest, ImageResponse, Result};
use std::sync::Arc;

/// AI image generation client.
#[derive(Clone)]
pub struct ImageClient<T = HttpTransport> {
    transport: T,
    config: ClientConfig,
    model: CompactString,
    slot: Arc<Slot>,
}

impl ImageClient<HttpTransport> {
    /// Create a client over the default HTTP transport.
    pub fn http(config: ClientConfig) -> Self {
        Self::new(HttpTransport::default(), config)
    }
}

impl<T: Transport> ImageClient<T> {
    /// Create a client using the configured default image model.
    pub fn new(transport: T, config: ClientConfig) -> Self {
        let model = config.models.image.clone();
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

    /// Generate images for `prompt`.
    ///
    /// A successful reply without entries yields an empty list.
    pub async fn generate(
        &self,
        prompt: &str,
        options: ImageOptions,
    ) -> Result<Vec<GeneratedImage>> {
        if prompt.trim().is_empty() {
            return Err(Error::InvalidRequest("prompt cannot be empty".into()));
        }
        self.config.validate()?;
        let bearer = self.config.bearer()?;
        let claim = self.slot.acquire()?;

        let body = ImageRequest::new(self.model.clone(), prompt, &options);
        let request = HttpRequest::json(self.config.image_url(), bearer, &body)?;
        tracing::debug!(
            "generating {} image(s) (model: {}, size: {})",
            body.n,
            self.model,
            body.size
        );

        let result = claim
            .finish(self.transport.post(request, claim.token.clone()))
            .await
            .and_then(|body| ImageResponse::parse(&body))
            .map(|response| response.into_images(prompt));

        if let Err(e) = &result {
            tracing::error!("image error [{}]: {}", e.code(), e.message());
        }
        result
    }

    /// Generate a single image. A reply without entries is a parse error.
    pub async fn generate_one(
        &self,
        prompt: &str,
        options: ImageOptions,
    ) -> Result<GeneratedImage> {
        let options = ImageOptions { count: 1, ..options };
        self.generate(prompt, options)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Parse("response contains no images".into()))
    }
}
