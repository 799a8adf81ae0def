use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the configured backend URL
pub const BACKEND_URL_ENV: &str = "STORYLINE_BACKEND_URL";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the chat backend
    pub backend_url: String,

    /// Generation parameters sent with every query
    pub max_tokens: u32,
    pub temperature: f32,

    /// Number of exchanges requested when opening a conversation
    pub history_limit: u32,

    /// HTTP timeout for backend calls
    pub request_timeout_secs: u64,

    /// Storyline home directory
    #[serde(skip)]
    pub storyline_home: PathBuf,

    /// UI preferences
    pub ui: UiConfig,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub show_timestamps: bool,
    pub sidebar_width: u16,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_timestamps: true,
            sidebar_width: 36,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));

        Config {
            backend_url: "http://127.0.0.1:8000".to_string(),
            max_tokens: 512,
            temperature: 0.1,
            history_limit: 50,
            request_timeout_secs: 60,
            storyline_home: home.join(".storyline"),
            ui: UiConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from `~/.storyline/config.toml`, writing defaults on first run
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Self::load_from(&home.join(".storyline"))
    }

    /// Load configuration rooted at an explicit home directory
    pub fn load_from(storyline_home: &Path) -> Result<Self> {
        fs::create_dir_all(storyline_home)
            .context("Failed to create .storyline directory")?;

        let config_path = storyline_home.join("config.toml");
        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            toml::from_str(&content)
                .context("Failed to parse config file")?
        } else {
            let config = Config {
                storyline_home: storyline_home.to_path_buf(),
                ..Config::default()
            };
            config.save()?;
            config
        };

        config.storyline_home = storyline_home.to_path_buf();

        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            config.set_backend_url(url);
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = self.storyline_home.join("config.toml");
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .context("Failed to write config file")?;
        Ok(())
    }

    /// Override the backend URL, dropping any trailing slash
    pub fn set_backend_url(&mut self, url: impl Into<String>) {
        let url = url.into();
        self.backend_url = url.trim_end_matches('/').to_string();
    }

    /// Path of the persisted key-value state file
    pub fn state_path(&self) -> PathBuf {
        self.storyline_home.join("state.json")
    }

    /// Path of the diagnostic log written while the terminal UI is running
    pub fn log_path(&self) -> PathBuf {
        self.storyline_home.join("storyline.log")
    }
}
