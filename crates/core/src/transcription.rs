//! Speech-to-text result types.

use crate::Error;
use serde::{Deserialize, Serialize};

/// A transcription result
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TranscriptionResult {
    /// The transcribed text
    pub text: String,

    /// Detected or requested language
    #[serde(default)]
    pub language: Option<String>,

    /// Audio duration in seconds
    #[serde(default)]
    pub duration: f32,

    /// Timestamped segments
    #[serde(default)]
    pub segments: Vec<TranscriptionSegment>,
}

impl TranscriptionResult {
    /// Decode a response body.
    pub fn parse(body: &str) -> Result<Self, Error> {
        serde_json::from_str(body).map_err(Into::into)
    }
}

/// A transcription segment with timestamps
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TranscriptionSegment {
    /// Segment start in seconds
    pub start: f32,

    /// Segment end in seconds
    pub end: f32,

    /// Segment text
    pub text: String,
}
