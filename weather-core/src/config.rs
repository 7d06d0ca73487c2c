use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::provider::openweather::{DEFAULT_BASE_URL, DEFAULT_GEO_BASE_URL, DEFAULT_LANG};

const ENV_API_KEY: &str = "OPENWEATHER_API_KEY";
const ENV_JWT_SECRET: &str = "JWT_SECRET";
const ENV_BIND_ADDR: &str = "BIND_ADDR";
const ENV_PORT: &str = "PORT";

/// OpenWeather access settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenWeatherConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub geo_base_url: String,
    /// Language of provider-supplied descriptions, passed through untouched.
    pub lang: String,
}

impl Default for OpenWeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            geo_base_url: DEFAULT_GEO_BASE_URL.to_string(),
            lang: DEFAULT_LANG.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 3000,
            allowed_origins: vec![
                "http://localhost:3001".to_string(),
                "http://127.0.0.1:3001".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub token_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_days: 7,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Defaults to `accounts.json` in the platform data directory.
    pub accounts_file: Option<PathBuf>,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [openweather]
/// api_key = "..."
///
/// [server]
/// port = 3000
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub openweather: OpenWeatherConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
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

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "weather-app", "weather-server")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Applies `OPENWEATHER_API_KEY`, `JWT_SECRET`, `BIND_ADDR` and `PORT` on top of the file.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(key) = var(ENV_API_KEY).filter(|k| !k.is_empty()) {
            self.openweather.api_key = Some(key);
        }
        if let Some(secret) = var(ENV_JWT_SECRET).filter(|s| !s.is_empty()) {
            self.auth.jwt_secret = Some(secret);
        }
        if let Some(addr) = var(ENV_BIND_ADDR) {
            self.server.bind_address = addr;
        }
        if let Some(port) = var(ENV_PORT) {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid {ENV_PORT} value: {port}"))?;
        }
        Ok(())
    }

    /// Returns the OpenWeather API key, if present and non-empty.
    pub fn openweather_api_key(&self) -> Option<&str> {
        self.openweather.api_key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn set_openweather_api_key(&mut self, api_key: String) {
        self.openweather.api_key = Some(api_key);
    }

    pub fn jwt_secret(&self) -> Result<&str> {
        self.auth.jwt_secret.as_deref().filter(|s| !s.is_empty()).ok_or_else(|| {
            anyhow!(
                "No JWT secret configured.\n\
                 Hint: set {ENV_JWT_SECRET} or run `weather-server configure`."
            )
        })
    }

    pub fn accounts_file(&self) -> Result<PathBuf> {
        match &self.storage.accounts_file {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::project_dirs()?.data_dir().join("accounts.json")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn api_key_missing_by_default() {
        let cfg = Config::default();
        assert_eq!(cfg.openweather_api_key(), None);
        assert_eq!(cfg.openweather.lang, "fr");
    }

    #[test]
    fn empty_api_key_counts_as_missing() {
        let mut cfg = Config::default();
        cfg.set_openweather_api_key(String::new());
        assert_eq!(cfg.openweather_api_key(), None);
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut cfg = Config::default();
        cfg.set_openweather_api_key("FILE_KEY".into());

        cfg.apply_overrides(env(&[
            ("OPENWEATHER_API_KEY", "ENV_KEY"),
            ("JWT_SECRET", "s3cret"),
            ("PORT", "8081"),
        ]))
        .unwrap();

        assert_eq!(cfg.openweather_api_key(), Some("ENV_KEY"));
        assert_eq!(cfg.jwt_secret().unwrap(), "s3cret");
        assert_eq!(cfg.server.port, 8081);
        assert_eq!(cfg.server.bind_address, "127.0.0.1");
    }

    #[test]
    fn invalid_port_is_an_error() {
        let mut cfg = Config::default();
        let err = cfg.apply_overrides(env(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("Invalid PORT"));
    }

    #[test]
    fn jwt_secret_errors_when_not_set() {
        let err = Config::default().jwt_secret().unwrap_err();
        assert!(err.to_string().contains("No JWT secret configured"));
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let cfg: Config = toml::from_str("[openweather]\napi_key = \"KEY\"\n").unwrap();

        assert_eq!(cfg.openweather_api_key(), Some("KEY"));
        assert_eq!(cfg.openweather.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.auth.token_ttl_days, 7);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_openweather_api_key("KEY".into());
        cfg.storage.accounts_file = Some(dir.path().join("accounts.json"));
        cfg.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }
}
