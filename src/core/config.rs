use crate::core::valuation::{ValuationAssumptions, ValuationParameters};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

/// Environment variable holding the RapidAPI key. Takes precedence over the
/// key in the configuration file.
pub const API_KEY_ENV: &str = "RAPIDAPI_KEY";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    #[serde(default = "default_yahoo_base_url")]
    pub base_url: String,
    #[serde(default = "default_yahoo_host")]
    pub host: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_yahoo_base_url() -> String {
    "https://yahoo-finance15.p.rapidapi.com".to_string()
}

fn default_yahoo_host() -> String {
    "yahoo-finance15.p.rapidapi.com".to_string()
}

impl Default for YahooProviderConfig {
    fn default() -> Self {
        YahooProviderConfig {
            base_url: default_yahoo_base_url(),
            host: default_yahoo_host(),
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub yahoo: YahooProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ValuationConfig {
    #[serde(default)]
    pub parameters: ValuationParameters,
    #[serde(default)]
    pub assumptions: ValuationAssumptions,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_tickers")]
    pub tickers: Vec<String>,
    #[serde(default = "default_ticker")]
    pub default_ticker: String,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub valuation: ValuationConfig,
}

fn default_tickers() -> Vec<String> {
    ["AAPL", "GOOGL", "MSFT", "AMZN", "TSLA"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_ticker() -> String {
    "AAPL".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            tickers: default_tickers(),
            default_ticker: default_ticker(),
            providers: ProvidersConfig::default(),
            valuation: ValuationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the configuration from the default location, falling back to
    /// built-in defaults when no file exists there.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "intrinsic", "intrinsic")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// The RapidAPI key from the environment, or else from the config file.
    pub fn api_key(&self) -> Option<String> {
        let from_env = std::env::var(API_KEY_ENV).ok();
        resolve_api_key(from_env, self.providers.yahoo.api_key.as_deref())
    }
}

fn resolve_api_key(from_env: Option<String>, from_config: Option<&str>) -> Option<String> {
    from_env
        .filter(|key| !key.trim().is_empty())
        .or_else(|| {
            from_config
                .filter(|key| !key.trim().is_empty())
                .map(String::from)
        })
}
