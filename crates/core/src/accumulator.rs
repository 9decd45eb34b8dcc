//! Streaming response accumulator.
//!
//! Consumes a growing response body, extracts every complete line, decodes
//! it as a [`Frame`] and folds the deltas into the final [`ChatResponse`].
//! A line only becomes actionable once its trailing `\n` has arrived, so a
//! buffer truncated mid-frame is always safe to feed.

use crate::{ChatResponse, Frame, StreamChunk, ToolCall, Usage};
use compact_str::CompactString;
use std::collections::BTreeMap;

/// Working state of one streaming request.
#[derive(Debug, Default)]
pub struct Accumulator {
    /// Everything received so far; never shrinks.
    raw: Vec<u8>,
    /// End of the last fully consumed line, `<= raw.len()`.
    consumed: usize,
    /// Concatenation of every content delta in arrival order.
    content: String,
    /// Tool call fragments keyed by their streaming index.
    tool_calls: BTreeMap<u32, ToolCall>,
    finish_reason: Option<CompactString>,
    usage: Option<Usage>,
    done: bool,
    frames: usize,
    skipped: usize,
}

/// What a single progress step extracted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Progress {
    /// Content fragments, one per decoded frame that carried content.
    pub deltas: Vec<String>,
    /// Number of frames decoded in this step.
    pub frames: usize,
    /// Whether the `[DONE]` sentinel has been seen.
    pub done: bool,
}

impl Accumulator {
    /// Create a new accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the cumulative body received so far.
    ///
    /// Only the suffix past the current buffer length is new. A snapshot
    /// shorter than what was already received is ignored.
    pub fn on_progress(&mut self, cumulative: &[u8]) -> Progress {
        if cumulative.len() < self.raw.len() {
            tracing::warn!(
                "ignoring shrinking stream buffer: {} < {} bytes",
                cumulative.len(),
                self.raw.len()
            );
            return self.progress(Vec::new(), 0);
        }
        let received = self.raw.len();
        self.extend(&cumulative[received..])
    }

    /// Feed newly received bytes.
    pub fn extend(&mut self, bytes: &[u8]) -> Progress {
        self.raw.extend_from_slice(bytes);
        self.drain()
    }

    /// Extract every complete line past `consumed`.
    fn drain(&mut self) -> Progress {
        let mut deltas = Vec::new();
        let mut frames = 0;
        while let Some(pos) = self.raw[self.consumed..].iter().position(|b| *b == b'\n') {
            let start = self.consumed;
            let end = start + pos;
            self.consumed = end + 1;
            if self.done {
                continue;
            }

            let Ok(line) = std::str::from_utf8(&self.raw[start..end]) else {
                self.skipped += 1;
                tracing::warn!("skipping stream frame with invalid utf-8 at offset {start}");
                continue;
            };
            match Frame::decode(line) {
                Ok(Some(Frame::Delta(chunk))) => {
                    frames += 1;
                    if let Some(content) = self.apply(chunk) {
                        deltas.push(content);
                    }
                }
                Ok(Some(Frame::Done)) => {
                    tracing::debug!("stream sentinel received after {} frames", self.frames);
                    self.done = true;
                }
                Ok(None) => {}
                Err(e) => {
                    self.skipped += 1;
                    tracing::warn!("failed to parse stream frame: {e}, data: {line}");
                }
            }
        }

        self.frames += frames;
        self.progress(deltas, frames)
    }

    /// Fold a chunk into the accumulated state, returning its content.
    fn apply(&mut self, chunk: StreamChunk) -> Option<String> {
        if let Some(reason) = chunk.reason() {
            self.finish_reason = Some(reason.into());
        }
        if let Some(usage) = chunk.usage {
            self.usage = Some(usage);
        }
        for call in chunk.tool_calls().unwrap_or_default() {
            self.tool_calls.entry(call.index).or_default().merge(call);
        }

        let content = chunk.content()?.to_owned();
        self.content.push_str(&content);
        Some(content)
    }

    fn progress(&self, deltas: Vec<String>, frames: usize) -> Progress {
        Progress {
            deltas,
            frames,
            done: self.done,
        }
    }

    /// Offset up to which complete lines have been consumed.
    pub fn consumed_offset(&self) -> usize {
        self.consumed
    }

    /// Number of bytes received so far.
    pub fn buffered_len(&self) -> usize {
        self.raw.len()
    }

    /// The content accumulated so far.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Whether the `[DONE]` sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Total frames decoded.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Lines dropped because they failed to decode.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Finalize into the terminal record.
    ///
    /// The accumulated content is authoritative; an undelimited tail is
    /// discarded.
    pub fn finish(self) -> ChatResponse {
        let tail = self.raw.len() - self.consumed;
        if tail > 0 {
            tracing::warn!("discarding {tail} trailing bytes without a line delimiter");
        }

        let tool_calls = self
            .tool_calls
            .into_values()
            .filter(|call| !call.function.name.is_empty())
            .collect();

        ChatResponse {
            success: true,
            content: self.content,
            finish_reason: self.finish_reason,
            tool_calls,
            usage: self.usage.unwrap_or_default(),
            error: None,
        }
    }
}
