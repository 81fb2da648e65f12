use std::path::{Path, PathBuf};

use chatline_core::ChatSettings;
use chatline_core::models::DEFAULT_MODEL;
use chatline_core::settings::{DEFAULT_OUTPUT_TOKENS, DEFAULT_TEMPERATURE};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot determine config directory")]
    NoConfigDir,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Contents of `chatline.json`. Every field has a default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub refresh_models_on_start: bool,
    pub default_model: String,
    pub system_prompt: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub web_search_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            refresh_models_on_start: true,
            default_model: DEFAULT_MODEL.to_string(),
            system_prompt: String::new(),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_OUTPUT_TOKENS,
            web_search_enabled: true,
        }
    }
}

impl Config {
    /// Initial chat settings. Values pass through the same clamping as user edits.
    pub fn chat_settings(&self) -> ChatSettings {
        let mut settings = ChatSettings::default();
        settings.system_prompt = self.system_prompt.clone();
        settings.web_search_enabled = self.web_search_enabled;
        settings.set_temperature(self.temperature);
        settings.set_max_output_tokens(f64::from(self.max_output_tokens));
        settings
    }
}

/// JSON file holding the config, read and written on the blocking pool
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/chatline/chatline.json`
    pub fn at_default_location() -> ConfigResult<Self> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::new(config_dir.join("chatline").join("chatline.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the config. A missing file yields `None`.
    pub async fn load(&self) -> ConfigResult<Option<Config>> {
        let path = self.path.clone();
        let contents = tokio::task::spawn_blocking({
            let path = path.clone();
            move || match std::fs::read_to_string(&path) {
                Ok(contents) => Ok(Some(contents)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(source) => Err(ConfigError::Io { path, source }),
            }
        })
        .await??;

        let Some(contents) = contents else {
            debug!(path = %path.display(), "No config file");
            return Ok(None);
        };

        let config = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })?;
        Ok(Some(config))
    }

    /// Write the config atomically (temp file + rename)
    pub async fn save(&self, config: &Config) -> ConfigResult<()> {
        let json = serde_json::to_string_pretty(config).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || {
            let io_err = |source: std::io::Error| ConfigError::Io {
                path: path.clone(),
                source,
            };

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }

            let temp_path = path.with_extension("json.tmp");
            std::fs::write(&temp_path, &json).map_err(io_err)?;
            std::fs::rename(&temp_path, &path).map_err(io_err)?;
            Ok::<(), ConfigError>(())
        })
        .await??;

        Ok(())
    }

    /// Load the config, writing the defaults out on first run
    pub async fn load_or_init(&self) -> ConfigResult<Config> {
        if let Some(config) = self.load().await? {
            return Ok(config);
        }

        let config = Config::default();
        self.save(&config).await?;
        info!(path = %self.path.display(), "Wrote default config");
        Ok(config)
    }
}
