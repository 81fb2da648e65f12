//! REPL line parsing

use std::path::PathBuf;

use chatline_core::ReasoningEffort;
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  /attach <path>...        attach PDF or image files to the next message
  /remove <n>              drop pending attachment n (1-based)
  /model <id>              switch model
  /models                  list available models
  /temperature <value>     set temperature (0-2)
  /max-tokens <value>      set max output tokens (1-4096)
  /effort <low|medium|high>
  /web <on|off>            toggle web search
  /system <text>           set the system prompt (empty to clear)
  /health                  check the backend
  /help                    show this help
  /quit                    exit
Anything else is sent as a message.";

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Attach(Vec<PathBuf>),
    /// Zero-based index
    Remove(usize),
    Model(String),
    Models,
    Temperature(String),
    MaxTokens(String),
    Effort(ReasoningEffort),
    Web(bool),
    System(String),
    Health,
    Help,
    Quit,
    Send(String),
    Empty,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("/{0} needs an argument")]
    MissingArgument(&'static str),

    #[error("'{0}' is not a valid attachment number")]
    InvalidIndex(String),

    #[error("unknown reasoning effort '{0}' (expected low, medium or high)")]
    InvalidEffort(String),

    #[error("expected on or off, got '{0}'")]
    InvalidToggle(String),

    #[error("unknown command /{0}")]
    Unknown(String),
}

fn required<'a>(name: &'static str, arg: &'a str) -> Result<&'a str, CommandError> {
    if arg.is_empty() {
        Err(CommandError::MissingArgument(name))
    } else {
        Ok(arg)
    }
}

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(Command::Empty);
    }

    let Some(rest) = trimmed.strip_prefix('/') else {
        return Ok(Command::Send(trimmed.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "attach" => Command::Attach(
            required("attach", arg)?
                .split_whitespace()
                .map(PathBuf::from)
                .collect(),
        ),
        "remove" => {
            let raw = required("remove", arg)?;
            match raw.parse::<usize>() {
                Ok(n) if n >= 1 => Command::Remove(n - 1),
                _ => return Err(CommandError::InvalidIndex(raw.to_string())),
            }
        }
        "model" => Command::Model(required("model", arg)?.to_string()),
        "models" => Command::Models,
        "temperature" => Command::Temperature(required("temperature", arg)?.to_string()),
        "max-tokens" => Command::MaxTokens(required("max-tokens", arg)?.to_string()),
        "effort" => {
            let raw = required("effort", arg)?;
            Command::Effort(
                raw.parse()
                    .map_err(|_| CommandError::InvalidEffort(raw.to_string()))?,
            )
        }
        "web" => match required("web", arg)?.to_ascii_lowercase().as_str() {
            "on" | "true" | "yes" => Command::Web(true),
            "off" | "false" | "no" => Command::Web(false),
            _ => return Err(CommandError::InvalidToggle(arg.to_string())),
        },
        "system" => Command::System(arg.to_string()),
        "health" => Command::Health,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };

    Ok(command)
}
