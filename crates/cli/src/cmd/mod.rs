//! CLI subcommands.

use clap::Subcommand;
pub use {
    chat::{ChatArgs, ChatCmd, SendCmd, StructuredCmd},
    image::ImageCmd,
    transcribe::TranscribeCmd,
};

mod chat;
pub mod config;
mod image;
mod transcribe;

/// Config management subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration.
    Show,
    /// Print the path of the config file in use.
    Path,
    /// Write the default config template to the global path.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}
