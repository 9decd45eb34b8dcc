//! Image generation command.

use anyhow::{Context, Result};
use clap::Args;
use client::{ClientConfig, ImageClient};
use compact_str::CompactString;
use pcore::ImageOptions;
use std::path::PathBuf;

/// Generate images from a prompt
#[derive(Debug, Args)]
pub struct ImageCmd {
    /// Image description
    pub prompt: String,

    /// Image size, e.g. 1024x1024 or 1792x1024
    #[arg(long, default_value = pcore::image::DEFAULT_SIZE)]
    pub size: CompactString,

    /// Number of images (1 - 10)
    #[arg(short = 'n', long, default_value_t = 1)]
    pub count: u32,

    /// Seed for reproducible results
    #[arg(long)]
    pub seed: Option<u32>,

    /// Directory to write the images to
    #[arg(short, long, default_value = ".")]
    pub out: PathBuf,
}

impl ImageCmd {
    /// Generate the images and write them as PNG files
    pub async fn run(self, config: ClientConfig, model: Option<CompactString>) -> Result<()> {
        let client = ImageClient::http(config).with_model(model.unwrap_or_default());
        let options = ImageOptions {
            size: self.size,
            count: self.count,
            seed: self.seed,
        };
        let images = client.generate(&self.prompt, options).await?;

        tokio::fs::create_dir_all(&self.out)
            .await
            .with_context(|| format!("creating {}", self.out.display()))?;
        for (i, image) in images.iter().enumerate() {
            let path = self.out.join(format!("image-{}-{i}.png", image.created));
            let bytes = image.decode()?;
            tokio::fs::write(&path, bytes)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            println!("{}", path.display());
            if let Some(revised) = &image.revised_prompt {
                println!("  revised prompt: {revised}");
            }
        }
        Ok(())
    }
}
