use std::io::Write;

use anyhow::Context;
use chatline_core::session::CatalogCompletion;
use chatline_core::{ChatSession, HttpTransport, SelectedFile};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::commands::{Command, CommandError, HELP, parse_command};
use crate::render::render_assistant;

/// Line-oriented front end driving one `ChatSession`
pub struct Repl {
    session: ChatSession,
    transport: HttpTransport,
    catalog_refresh: Option<JoinHandle<CatalogCompletion>>,
}

impl Repl {
    pub fn new(session: ChatSession, transport: HttpTransport) -> Self {
        Self {
            session,
            transport,
            catalog_refresh: None,
        }
    }

    /// Fetch the remote catalog in the background; applied between commands
    fn start_catalog_refresh(&mut self) {
        if let Some(pending) = self.session.begin_catalog_refresh() {
            self.catalog_refresh = Some(tokio::spawn(pending.run()));
        }
    }

    async fn poll_catalog_refresh(&mut self) {
        if !self
            .catalog_refresh
            .as_ref()
            .is_some_and(JoinHandle::is_finished)
        {
            return;
        }
        let Some(handle) = self.catalog_refresh.take() else {
            return;
        };

        match handle.await {
            Ok(completion) => {
                self.session.finish_catalog_refresh(completion);
                if let Some(warning) = self.session.catalog_warning() {
                    println!("{}", warning);
                }
            }
            Err(e) => warn!(error = ?e, "Catalog refresh task failed"),
        }
    }

    fn prompt(&self) -> String {
        match self.session.pending_attachments().len() {
            0 => "> ".to_string(),
            n => format!("[{} attached] > ", n),
        }
    }

    pub async fn run(mut self, refresh_models: bool) -> anyhow::Result<()> {
        if refresh_models {
            self.start_catalog_refresh();
        }

        println!(
            "chatline ({}). Type /help for commands.",
            self.session.active_model().id
        );

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            self.poll_catalog_refresh().await;

            print!("{}", self.prompt());
            std::io::stdout().flush().context("failed to write prompt")?;

            let Some(line) = lines.next_line().await.context("failed to read input")? else {
                break;
            };

            match parse_command(&line) {
                Ok(Command::Quit) => break,
                Ok(command) => self.handle(command).await,
                Err(e @ CommandError::Unknown(_)) => println!("{}\n{}", e, HELP),
                Err(e) => println!("{}", e),
            }
        }

        if let Some(handle) = self.catalog_refresh.take() {
            handle.abort();
        }
        self.session.dispose();
        Ok(())
    }

    async fn handle(&mut self, command: Command) {
        debug!(command = ?command, "Handling command");
        match command {
            Command::Send(text) => self.send(text).await,
            Command::Attach(paths) => {
                let mut files = Vec::with_capacity(paths.len());
                for path in paths {
                    match SelectedFile::from_path(&path).await {
                        Ok(file) => files.push(file),
                        Err(e) => println!("Cannot read {}: {}", path.display(), e),
                    }
                }
                if !files.is_empty() {
                    self.session.add_attachments(files).await;
                }
                if let Some(error) = self.session.attachment_error() {
                    println!("{}", error);
                }
                self.print_pending();
            }
            Command::Remove(index) => match self.session.remove_attachment(index) {
                Some(removed) => println!("Removed {}", removed.name),
                None => println!("No attachment #{}", index + 1),
            },
            Command::Model(id) => {
                if self.session.select_model(&id) {
                    println!("Model: {}", self.session.active_model().id);
                } else {
                    println!("Unknown model '{}'. Use /models to list them.", id);
                }
            }
            Command::Models => self.print_models(),
            Command::Temperature(raw) => {
                if self.session.settings_mut().set_temperature_input(&raw) {
                    println!("Temperature: {}", self.session.settings().temperature());
                } else {
                    println!("'{}' is not a number", raw);
                }
            }
            Command::MaxTokens(raw) => {
                if self.session.settings_mut().set_max_output_tokens_input(&raw) {
                    println!("Max output tokens: {}", self.session.settings().max_output_tokens());
                } else {
                    println!("'{}' is not a number", raw);
                }
            }
            Command::Effort(effort) => {
                if self.session.set_reasoning_effort(effort) {
                    println!("Reasoning effort: {}", effort);
                } else {
                    println!(
                        "{} does not accept reasoning effort {}",
                        self.session.active_model().id,
                        effort
                    );
                }
            }
            Command::Web(enabled) => {
                self.session.settings_mut().web_search_enabled = enabled;
                println!("Web search: {}", if enabled { "on" } else { "off" });
            }
            Command::System(text) => {
                let cleared = text.is_empty();
                self.session.settings_mut().system_prompt = text;
                println!("{}", if cleared { "System prompt cleared" } else { "System prompt set" });
            }
            Command::Health => match self.transport.health().await {
                Ok(()) => println!("Backend at {} is healthy", self.transport.base_url()),
                Err(e) => println!("Health check failed: {}", e),
            },
            Command::Help => println!("{}", HELP),
            Command::Quit | Command::Empty => {}
        }
    }

    async fn send(&mut self, text: String) {
        self.session.set_input(text);
        if !self.session.can_send() {
            return;
        }

        println!("\x1b[2m…\x1b[0m");
        if self.session.send_message().await
            && let Some(reply) = self.session.messages().last()
        {
            print!("{}", render_assistant(reply));
        }

        let usage = self.session.usage();
        debug!(
            total_input_tokens = usage.total_input_tokens,
            total_output_tokens = usage.total_output_tokens,
            "Conversation usage"
        );
    }

    fn print_pending(&self) {
        for (index, attachment) in self.session.pending_attachments().iter().enumerate() {
            println!(
                "  {}. {} ({}, {} bytes)",
                index + 1,
                attachment.name,
                attachment.mime_type,
                attachment.size_bytes
            );
        }
    }

    fn print_models(&self) {
        let active = &self.session.active_model().id;
        for model in self.session.catalog().models() {
            let mut capabilities = Vec::new();
            if model.supports_temperature {
                capabilities.push("temperature".to_string());
            }
            if model.supports_reasoning_effort {
                let options: Vec<_> = model
                    .reasoning_effort_options
                    .iter()
                    .map(|e| e.as_str())
                    .collect();
                capabilities.push(format!("effort {}", options.join("/")));
            }
            if model.supports_web_search {
                capabilities.push("web".to_string());
            }
            let marker = if &model.id == active { "*" } else { " " };
            println!("{} {} [{}]", marker, model.id, capabilities.join(", "));
        }
    }
}
