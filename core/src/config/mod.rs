use crate::agent::{DEFAULT_MEMORY_WINDOW, ToolCallPolicy};
use crate::providers::{ollama, openai};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const TOOLLOOP_DIR: &str = ".toolloop";
pub const DEFAULT_SERVERS_FILE: &str = "mcp.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WeatherConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub units: String,
    pub lang: String,
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openweathermap.org/data/2.5".to_string(),
            units: "metric".to_string(),
            lang: "zh_cn".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub api_key: String,
    pub base_url: Option<String>,
    /// Unset means the backend's own default.
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub system_prompt: Option<String>,
    /// Append the local time to the system prompt.
    pub include_time: bool,
    pub call_policy: ToolCallPolicy,
    /// Messages kept per thread between turns.
    pub memory_window: usize,
    pub servers_file: PathBuf,
    pub weather: WeatherConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: None,
            api_key: String::new(),
            base_url: None,
            model: None,
            temperature: None,
            system_prompt: None,
            include_time: false,
            call_policy: ToolCallPolicy::default(),
            memory_window: DEFAULT_MEMORY_WINDOW,
            servers_file: PathBuf::from(DEFAULT_SERVERS_FILE),
            weather: WeatherConfig::default(),
        }
    }
}

pub fn get_toolloop_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(TOOLLOOP_DIR)
}

pub fn get_config_path() -> PathBuf {
    get_toolloop_dir().join("config.toml")
}

pub fn ensure_toolloop_dir() -> Result<PathBuf> {
    let dir = get_toolloop_dir();

    if !dir.exists() {
        std::fs::create_dir_all(&dir).with_context(|| {
            format!("Failed to create toolloop directory at {}", dir.display())
        })?;
    }

    Ok(dir)
}

/// Loads `.env` from the working directory (or a parent) if one exists.
pub fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        debug!(path = %path.display(), "loaded environment file");
    }
}

impl Config {
    /// Config file if present, defaults otherwise, then environment overrides on top.
    pub fn load_or_init() -> Result<Self> {
        let mut config = if config_exists() {
            load_config()?
        } else {
            Config::default()
        };
        config.apply_env();
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Environment overrides. Empty values are treated as unset.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(provider) = get("LLM_PROVIDER") {
            self.provider = Some(provider);
        }
        if let Some(base_url) = get("BASE_URL") {
            self.base_url = Some(base_url);
        }
        if let Some(key) = get("OPEN_API_KEY").or_else(|| get("OPENAI_API_KEY")) {
            self.api_key = key;
        }
        if let Some(model) = get("MODEL") {
            self.model = Some(model);
        }
        if let Some(key) = get("OPENWEATHER_API_KEY") {
            self.weather.api_key = Some(key);
        }
        if let Some(servers) = get("TOOLLOOP_SERVERS") {
            self.servers_file = PathBuf::from(servers);
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.as_deref().unwrap_or("openai")
    }

    fn is_ollama(&self) -> bool {
        self.provider_name().eq_ignore_ascii_case("ollama")
    }

    /// The configured model, or the default of the selected backend.
    pub fn model_name(&self) -> &str {
        match &self.model {
            Some(model) => model,
            None if self.is_ollama() => ollama::DEFAULT_MODEL,
            None => openai::DEFAULT_MODEL,
        }
    }

    /// Whether a chat can start without onboarding: Ollama needs nothing, the
    /// OpenAI dialect needs a key.
    pub fn is_usable(&self) -> bool {
        self.is_ollama() || !self.api_key.trim().is_empty()
    }
}

pub fn load_config() -> Result<Config> {
    load_config_from(&get_config_path())
}

pub fn load_config_from(config_path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(config_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            anyhow::anyhow!(
                "Config file not found. Run 'toolloop onboard' to set up your configuration."
            )
        } else {
            anyhow::anyhow!("Failed to read config from {}: {}", config_path.display(), e)
        }
    })?;

    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", config_path.display()))
}

pub fn save_config(config: &Config) -> Result<()> {
    ensure_toolloop_dir()?;
    save_config_to(config, &get_config_path())
}

pub fn save_config_to(config: &Config, config_path: &Path) -> Result<()> {
    let content =
        toml::to_string_pretty(config).with_context(|| "Failed to serialize config to TOML")?;

    std::fs::write(config_path, content)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    Ok(())
}

pub fn config_exists() -> bool {
    get_config_path().exists()
}
