use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Environment variable that overrides the Gemini key stored on disk.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Gemini credentials and the model identifiers to try, in priority order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub suggestion_models: Vec<String>,
    pub chat_models: Vec<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            suggestion_models: vec![
                "models/gemini-2.0-flash-exp".to_string(),
                "models/gemini-2.5-flash".to_string(),
                "models/gemini-flash-latest".to_string(),
            ],
            chat_models: vec![
                "models/gemini-2.0-flash-exp".to_string(),
                "models/gemini-2.5-flash".to_string(),
                "models/gemini-2.0-flash".to_string(),
                "models/gemini-3-flash-preview".to_string(),
            ],
        }
    }
}

/// Open-Meteo endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub geocoding_url: String,
    pub forecast_url: String,
    /// Per-request timeout. Unset keeps reqwest's default of no timeout.
    pub timeout_secs: Option<u64>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            geocoding_url: "https://geocoding-api.open-meteo.com/v1/search".to_string(),
            forecast_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Directory holding the HOME/, RESULT/, ... page folders.
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            static_dir: PathBuf::from("."),
        }
    }
}

/// How the assistant introduces itself in chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    pub name: String,
    /// Optional project owner the assistant greets with extra respect.
    pub owner: Option<String>,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: "QUANTRA 0.5".to_string(),
            owner: None,
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [gemini]
/// api_key = "..."
///
/// [server]
/// bind = "127.0.0.1:8000"
/// static_dir = "/srv/quantra"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub weather: WeatherConfig,
    pub server: ServerConfig,
    pub persona: PersonaConfig,
}

impl Config {
    /// Load config from the platform config dir, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform config dir, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "quantra", "quantra")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.gemini.api_key = Some(api_key);
    }

    /// Take the key from `GEMINI_API_KEY` when it is set and non-empty.
    pub fn apply_env(&mut self) {
        self.apply_api_key_override(std::env::var(API_KEY_ENV).ok());
    }

    fn apply_api_key_override(&mut self, value: Option<String>) {
        let key = value.map(|v| v.trim().to_string());
        if let Some(key) = key.filter(|k| !k.is_empty()) {
            self.gemini.api_key = Some(key);
        }
    }

    /// The configured Gemini key, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        self.gemini
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }
}
