//! PlayKit CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use compact_str::CompactString;
use tracing_subscriber::{EnvFilter, fmt};
pub use cmd::{ChatCmd, ConfigCommand, ImageCmd, SendCmd, StructuredCmd, TranscribeCmd};

pub mod cmd;
pub mod config;

/// PlayKit AI command line client
#[derive(Debug, Parser)]
#[command(name = "playkit", version, about)]
pub struct App {
    /// Config file path (overrides workspace and global config)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Model name override
    #[arg(long, global = true)]
    pub model: Option<CompactString>,

    /// Verbosity level (use -v, -vv, -vvv, etc.)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start an interactive chat session
    Chat(ChatCmd),

    /// Send a one-shot chat message
    Send(SendCmd),

    /// Generate a JSON document matching a schema
    Structured(StructuredCmd),

    /// Generate images from a prompt
    Image(ImageCmd),

    /// Transcribe an audio file
    Transcribe(TranscribeCmd),

    /// Inspect the configuration
    Config {
        /// Config subcommand
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

impl App {
    /// Initialize tracing subscriber based on verbosity
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let directive = match self.verbose {
                0 => "warn",
                1 => "playkit_client=debug",
                2 => "playkit_client=trace,playkit_core=trace",
                3 => "debug",
                _ => "trace",
            };
            EnvFilter::new(directive)
        });

        fmt()
            .without_time()
            .with_env_filter(filter)
            .with_target(self.verbose != 0)
            .with_writer(std::io::stderr)
            .init();
    }

    /// Run the selected command
    pub async fn run(self) -> Result<()> {
        if let Command::Config { action } = &self.command {
            return cmd::config::run(action, self.config.as_deref());
        }

        let config = config::resolve_config(self.config.as_deref())?;
        let model = self.model;
        match self.command {
            Command::Chat(chat) => chat.run(config, model).await,
            Command::Send(send) => send.run(config, model).await,
            Command::Structured(structured) => structured.run(config, model).await,
            Command::Image(image) => image.run(config, model).await,
            Command::Transcribe(transcribe) => transcribe.run(config, model).await,
            Command::Config { .. } => Ok(()),
        }
    }
}
