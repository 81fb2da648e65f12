mod commands;
mod config;
mod render;
mod repl;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chatline_core::{ChatSession, HttpTransport};
use clap::Parser;
use tracing::{info, warn};

use crate::config::{Config, ConfigStore};
use crate::repl::Repl;

#[derive(Parser, Debug)]
#[command(name = "chatline")]
#[command(version, about = "Terminal client for the chat endpoint", long_about = None)]
struct Args {
    /// Backend base URL, e.g. http://localhost:8000
    #[arg(long, env = "CHATLINE_BASE_URL")]
    base_url: Option<String>,

    /// Model to start with
    #[arg(long)]
    model: Option<String>,

    /// System prompt for this session
    #[arg(long)]
    system_prompt: Option<String>,

    /// Keep the built-in model list instead of fetching it
    #[arg(long)]
    no_model_refresh: bool,

    /// Config file (defaults to <config dir>/chatline/chatline.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Flags and environment win over the config file
    fn apply_to(&self, config: &mut Config) {
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(model) = &self.model {
            config.default_model = model.clone();
        }
        if let Some(system_prompt) = &self.system_prompt {
            config.system_prompt = system_prompt.clone();
        }
        if self.no_model_refresh {
            config.refresh_models_on_start = false;
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let store = match &args.config {
        Some(path) => ConfigStore::new(path.clone()),
        None => ConfigStore::at_default_location()?,
    };
    let mut config = store
        .load_or_init()
        .await
        .with_context(|| format!("failed to load config from {}", store.path().display()))?;
    args.apply_to(&mut config);

    info!(base_url = %config.base_url, model = %config.default_model, "Starting chatline");

    let transport = HttpTransport::new(
        &config.base_url,
        Duration::from_secs(config.request_timeout_secs),
    )
    .context("failed to build HTTP client")?;

    let mut session = ChatSession::with_settings(Arc::new(transport.clone()), config.chat_settings());
    if !session.select_model(&config.default_model) {
        warn!(model = %config.default_model, "Configured model is not in the catalog");
    }

    Repl::new(session, transport)
        .run(config.refresh_models_on_start)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::try_parse_from([
            "chatline",
            "--base-url",
            "https://chat.example.com",
            "--model",
            "gpt-5",
            "--no-model-refresh",
        ])
        .unwrap();

        let mut config = Config::default();
        args.apply_to(&mut config);

        assert_eq!(config.base_url, "https://chat.example.com");
        assert_eq!(config.default_model, "gpt-5");
        assert!(!config.refresh_models_on_start);
        assert_eq!(config.system_prompt, "");
    }

    #[test]
    fn test_no_flags_keep_config() {
        let args = Args::try_parse_from(["chatline", "-v"]).unwrap();
        let mut config = Config {
            system_prompt: "Be brief.".to_string(),
            ..Config::default()
        };
        args.apply_to(&mut config);

        assert!(args.verbose);
        assert_eq!(config.system_prompt, "Be brief.");
        assert!(config.refresh_models_on_start);
    }
}
