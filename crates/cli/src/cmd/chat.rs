//! Chat commands: interactive session and one-shot send.

use crate::config::history_file_path;
use anyhow::{Context, Result, anyhow};
use clap::Args;
use client::{ChatClient, ChatEvent, ClientConfig, Transport};
use compact_str::CompactString;
use pcore::ChatOptions;
use rustyline::{DefaultEditor, error::ReadlineError};
use serde_json::Value;
use std::{io::Write, path::PathBuf};
use tokio::sync::mpsc;

/// Options shared by the chat commands
#[derive(Debug, Clone, Args)]
pub struct ChatArgs {
    /// System prompt for the conversation
    #[arg(short, long)]
    pub system: Option<String>,

    /// Wait for the whole reply instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(short, long)]
    pub temperature: Option<f32>,

    /// Completion token limit
    #[arg(long)]
    pub max_tokens: Option<u32>,
}

impl ChatArgs {
    fn options(&self) -> ChatOptions {
        let mut options = ChatOptions {
            stream: !self.no_stream,
            ..ChatOptions::default()
        };
        if let Some(temperature) = self.temperature {
            options = options.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            options = options.with_max_tokens(max_tokens);
        }
        options
    }

    fn client(&self, config: ClientConfig, model: Option<CompactString>) -> Session {
        let client = ChatClient::http(config).with_model(model.unwrap_or_default());
        if let Some(system) = &self.system {
            client.set_system_prompt(system.as_str());
        }
        let (tx, events) = mpsc::unbounded_channel();
        client.subscribe(tx);
        Session { client, events }
    }
}

/// Start an interactive chat session
#[derive(Debug, Args)]
pub struct ChatCmd {
    #[command(flatten)]
    pub args: ChatArgs,
}

impl ChatCmd {
    /// Read prompts until Ctrl+D or `/quit`
    pub async fn run(self, config: ClientConfig, model: Option<CompactString>) -> Result<()> {
        let mut session = self.args.client(config, model);
        let options = self.args.options();
        let mut editor = DefaultEditor::new()?;
        let history_path = history_file_path();
        let _ = editor.load_history(&history_path);

        println!("PlayKit chat (Ctrl+D to exit, Ctrl+C to cancel a reply, /clear to reset)");
        loop {
            let line = match editor.readline("> ") {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            };
            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            let _ = editor.add_history_entry(input);
            match input {
                "/quit" | "/exit" => break,
                "/clear" => {
                    session.client.clear_history();
                    continue;
                }
                _ => {}
            }

            if let Err(e) = session.turn(input, options).await {
                eprintln!("error: {e}");
            }
        }

        if let Some(parent) = history_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = editor.save_history(&history_path);
        Ok(())
    }
}

/// Send a one-shot chat message
#[derive(Debug, Args)]
pub struct SendCmd {
    /// Message content
    pub prompt: String,

    #[command(flatten)]
    pub args: ChatArgs,
}

impl SendCmd {
    /// Send the prompt and print the reply
    pub async fn run(self, config: ClientConfig, model: Option<CompactString>) -> Result<()> {
        let mut session = self.args.client(config, model);
        session.turn(&self.prompt, self.args.options()).await
    }
}

/// Generate a JSON document matching a schema
#[derive(Debug, Args)]
pub struct StructuredCmd {
    /// What to generate
    pub prompt: String,

    /// JSON schema file describing the output
    #[arg(long)]
    pub schema: PathBuf,

    /// System message for the request
    #[arg(short, long)]
    pub system: Option<String>,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(short, long, default_value_t = pcore::DEFAULT_TEMPERATURE)]
    pub temperature: f32,
}

impl StructuredCmd {
    /// Send the request and pretty-print the document
    pub async fn run(self, config: ClientConfig, model: Option<CompactString>) -> Result<()> {
        let raw = std::fs::read_to_string(&self.schema)
            .with_context(|| format!("reading {}", self.schema.display()))?;
        let schema: Value = serde_json::from_str(&raw)
            .with_context(|| format!("parsing {}", self.schema.display()))?;

        let client = ChatClient::http(config).with_model(model.unwrap_or_default());
        let (tx, mut events) = mpsc::unbounded_channel();
        client.subscribe(tx);
        let handle = client.generate_structured(
            self.prompt,
            schema,
            self.system.as_deref(),
            self.temperature,
        )?;

        let outcome = loop {
            let event = tokio::select! {
                event = events.recv() => event,
                _ = tokio::signal::ctrl_c() => {
                    client.cancel();
                    continue;
                }
            };
            match event {
                Some(ChatEvent::Structured(value)) => {
                    println!("{}", serde_json::to_string_pretty(&value)?);
                    break Ok(());
                }
                Some(ChatEvent::Failed(error)) => {
                    break Err(anyhow!("[{}] {}", error.code, error.message));
                }
                Some(_) => {}
                None => break Err(anyhow!("chat client closed its event channel")),
            }
        };

        handle.finished().await;
        outcome
    }
}

struct Session<T: Transport = client::HttpTransport> {
    client: ChatClient<T>,
    events: mpsc::UnboundedReceiver<ChatEvent>,
}

impl<T: Transport> Session<T> {
    /// Send one prompt and print the reply as it arrives. Ctrl-C cancels.
    async fn turn(&mut self, prompt: &str, options: ChatOptions) -> Result<()> {
        let handle = self.client.send(prompt, options)?;
        let mut stdout = std::io::stdout();
        let mut streamed = false;

        let outcome = loop {
            let event = tokio::select! {
                event = self.events.recv() => event,
                _ = tokio::signal::ctrl_c() => {
                    self.client.cancel();
                    continue;
                }
            };
            match event {
                Some(ChatEvent::Delta(delta)) => {
                    streamed = true;
                    print!("{delta}");
                    stdout.flush()?;
                }
                Some(ChatEvent::Completed(response)) => {
                    if !streamed {
                        print!("{}", response.content);
                    }
                    println!();
                    tracing::debug!(
                        "usage: {} prompt + {} completion tokens",
                        response.usage.prompt_tokens,
                        response.usage.completion_tokens
                    );
                    break Ok(());
                }
                Some(ChatEvent::Structured(_)) => {}
                Some(ChatEvent::Failed(error)) => {
                    if streamed {
                        println!();
                    }
                    break Err(anyhow!("[{}] {}", error.code, error.message));
                }
                None => break Err(anyhow!("chat client closed its event channel")),
            }
        };

        handle.finished().await;
        outcome
    }
}
