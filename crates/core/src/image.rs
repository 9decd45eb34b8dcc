//! Image generation request and response types.

use crate::Error;
use base64::{Engine, engine::general_purpose::STANDARD};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Default image size.
pub const DEFAULT_SIZE: &str = "1024x1024";

/// Upper bound on images per request.
pub const MAX_COUNT: u32 = 10;

/// Image generation options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageOptions {
    /// Image size, e.g. `1024x1024` or `1792x1024`.
    pub size: CompactString,

    /// Number of images, clamped to `1..=10`.
    pub count: u32,

    /// Seed for reproducible results.
    pub seed: Option<u32>,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE.into(),
            count: 1,
            seed: None,
        }
    }
}

/// The JSON body POSTed to the image endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRequest {
    /// The model to use.
    pub model: CompactString,

    /// What to draw.
    pub prompt: String,

    /// Number of images.
    pub n: u32,

    /// Image size.
    pub size: CompactString,

    /// Always `b64_json`.
    pub response_format: &'static str,

    /// Seed for reproducible results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
}

impl ImageRequest {
    /// Build a request body, clamping the image count.
    pub fn new(
        model: impl Into<CompactString>,
        prompt: impl Into<String>,
        options: &ImageOptions,
    ) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            n: options.count.clamp(1, MAX_COUNT),
            size: options.size.clone(),
            response_format: "b64_json",
            seed: options.seed,
        }
    }
}

/// The image endpoint's response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageResponse {
    /// Unix timestamp of generation
    #[serde(default)]
    pub created: i64,

    /// Generated images
    #[serde(default)]
    pub data: Vec<ImageData>,
}

/// One entry of [`ImageResponse::data`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageData {
    /// Base64-encoded image data
    #[serde(default)]
    pub b64_json: String,

    /// The prompt as rewritten by the model
    #[serde(default)]
    pub revised_prompt: Option<String>,
}

impl ImageResponse {
    /// Decode a response body.
    pub fn parse(body: &str) -> Result<Self, Error> {
        serde_json::from_str(body).map_err(Into::into)
    }

    /// Pair every entry with the prompt that produced it.
    pub fn into_images(self, prompt: &str) -> Vec<GeneratedImage> {
        let created = self.created;
        self.data
            .into_iter()
            .map(|data| GeneratedImage {
                image_base64: data.b64_json,
                original_prompt: prompt.to_owned(),
                revised_prompt: data.revised_prompt,
                created,
            })
            .collect()
    }
}

/// A generated image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Base64-encoded image data
    pub image_base64: String,

    /// The prompt sent with the request
    pub original_prompt: String,

    /// The prompt as rewritten by the model, if it was
    pub revised_prompt: Option<String>,

    /// Unix timestamp of generation
    pub created: i64,
}

impl GeneratedImage {
    /// Decode the base64 payload into raw image bytes.
    pub fn decode(&self) -> Result<Vec<u8>, Error> {
        if self.image_base64.is_empty() {
            return Err(Error::Parse("image data is empty".into()));
        }
        STANDARD.decode(&self.image_base64).map_err(Error::parse)
    }
}
