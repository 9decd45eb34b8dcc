//! Configuration resolution for the CLI.
//!
//! Resolves playkit.toml in priority order:
//! 1. `--config <path>` flag (explicit override)
//! 2. `{cwd}/.playkit/playkit.toml` (workspace config)
//! 3. `~/.config/playkit/playkit.toml` (global default)
//!
//! If the global default doesn't exist, it is generated automatically.

use anyhow::{Context, Result};
use client::ClientConfig;
use std::path::{Path, PathBuf};

/// Workspace config path, relative to the current directory.
pub const WORKSPACE_CONFIG: &str = ".playkit/playkit.toml";

/// Default config template generated when no config exists.
pub const DEFAULT_CONFIG: &str = r#"base_url = "https://playkit.ai"
game_id = "${PLAYKIT_GAME_ID}"
developer_token = "${PLAYKIT_DEVELOPER_TOKEN}"
player_token = "${PLAYKIT_PLAYER_TOKEN}"
ignore_developer_token = false

[models]
chat = "gpt-4o-mini"
image = "gpt-image-1"
transcription = "whisper-1"
"#;

/// Resolve the client config following the priority chain.
pub fn resolve_config(config_flag: Option<&str>) -> Result<ClientConfig> {
    if let Some(path) = config_flag {
        return ClientConfig::load(path)
            .with_context(|| format!("failed to load config from {path}"));
    }

    let workspace_path = PathBuf::from(WORKSPACE_CONFIG);
    if workspace_path.exists() {
        return ClientConfig::load(&workspace_path)
            .with_context(|| format!("failed to load workspace config from {WORKSPACE_CONFIG}"));
    }

    let global_path = global_config_path();
    if !global_path.exists() {
        generate_default_config(&global_path)?;
        tracing::info!("generated default config at {}", global_path.display());
    }
    ClientConfig::load(&global_path)
        .with_context(|| format!("failed to load config from {}", global_path.display()))
}

/// The config file `resolve_config` would read, without generating one.
pub fn resolve_config_path(config_flag: Option<&str>) -> PathBuf {
    if let Some(path) = config_flag {
        return PathBuf::from(path);
    }
    let workspace_path = PathBuf::from(WORKSPACE_CONFIG);
    if workspace_path.exists() {
        return workspace_path;
    }
    global_config_path()
}

/// Path to the global default config.
pub fn global_config_path() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("playkit")
        .join("playkit.toml")
}

/// Path of the interactive chat's input history, next to the global config.
pub fn history_file_path() -> PathBuf {
    global_config_path().with_file_name("history")
}

/// Write the default config template to `path`.
pub fn generate_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    std::fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write default config to {}", path.display()))?;
    Ok(())
}
