//! Config management commands: show, path, init.

use crate::cmd::ConfigCommand;
use crate::config::{generate_default_config, global_config_path, resolve_config_path};
use anyhow::{Context, Result};
use client::ClientConfig;

/// Dispatch config management subcommands.
pub fn run(action: &ConfigCommand, config_flag: Option<&str>) -> Result<()> {
    match action {
        ConfigCommand::Show => show(config_flag),
        ConfigCommand::Path => {
            println!("{}", resolve_config_path(config_flag).display());
            Ok(())
        }
        ConfigCommand::Init { force } => init(*force),
    }
}

fn show(config_flag: Option<&str>) -> Result<()> {
    let path = resolve_config_path(config_flag);
    if !path.exists() {
        println!("No config file at {}", path.display());
        return Ok(());
    }
    let config =
        ClientConfig::load(&path).with_context(|| format!("loading {}", path.display()))?;

    println!("config:      {}", path.display());
    println!("base_url:    {}", config.base_url);
    println!("game_id:     {}", config.game_id);
    println!("token:       {}", token_source(&config));
    println!("chat model:  {}", config.models.chat);
    println!("image model: {}", config.models.image);
    println!("stt model:   {}", config.models.transcription);
    println!("ready:       {}", config.is_ready());
    Ok(())
}

/// Which token a request would carry, without printing it.
fn token_source(config: &ClientConfig) -> &'static str {
    if config.token_provider.is_some() {
        return "provider";
    }
    let developer = config.developer_token.is_some() && !config.ignore_developer_token;
    match (developer, config.player_token.is_some()) {
        (true, _) => "developer",
        (false, true) => "player",
        (false, false) => "none",
    }
}

fn init(force: bool) -> Result<()> {
    let path = global_config_path();
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    generate_default_config(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
