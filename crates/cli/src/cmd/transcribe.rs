//! Speech-to-text command.

use anyhow::Result;
use clap::Args;
use client::{ClientConfig, TranscriptionClient};
use compact_str::CompactString;
use std::path::PathBuf;

/// Transcribe an audio file
#[derive(Debug, Args)]
pub struct TranscribeCmd {
    /// Audio file (wav, mp3, ogg, ...)
    pub file: PathBuf,

    /// Spoken language hint, e.g. "en"
    #[arg(short, long)]
    pub language: Option<String>,

    /// Print timestamped segments
    #[arg(long)]
    pub segments: bool,
}

impl TranscribeCmd {
    /// Transcribe the file and print the text
    pub async fn run(self, config: ClientConfig, model: Option<CompactString>) -> Result<()> {
        let client = TranscriptionClient::http(config).with_model(model.unwrap_or_default());
        let result = client
            .transcribe_file(&self.file, self.language.as_deref())
            .await?;

        if self.segments && !result.segments.is_empty() {
            for segment in &result.segments {
                println!(
                    "[{:>7.2} - {:>7.2}] {}",
                    segment.start,
                    segment.end,
                    segment.text.trim()
                );
            }
        } else {
            println!("{}", result.text);
        }
        if let Some(language) = &result.language {
            tracing::debug!("language: {language}, duration: {:.2}s", result.duration);
        }
        Ok(())
    }
}
