use crate::core::cleaning::CacheLayout;
use crate::core::rate::REFERENCE_RATE;
use crate::providers::tgju::DEFAULT_BASE_URL;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TgjuProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub tgju: Option<TgjuProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            tgju: Some(TgjuProviderConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
            }),
        }
    }
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("datasets/housePrice.csv")
}

fn default_models() -> Vec<PathBuf> {
    [
        "models/LinearRegression_pipeline.json",
        "models/GradientBoostingRegressor_pipeline.json",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

fn default_fallback_rate() -> f64 {
    REFERENCE_RATE
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,
    #[serde(default = "default_models")]
    pub models: Vec<PathBuf>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default = "default_fallback_rate")]
    pub fallback_rate: f64,
    #[serde(default)]
    pub cache_layout: CacheLayout,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            dataset_path: default_dataset_path(),
            models: default_models(),
            providers: ProvidersConfig::default(),
            fallback_rate: default_fallback_rate(),
            cache_layout: CacheLayout::default(),
        }
    }
}

impl AppConfig {
    /// Loads the config at the default location, or built-in defaults if
    /// no config file was created yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "hpx", "hpx")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn tgju_base_url(&self) -> &str {
        self.providers
            .tgju
            .as_ref()
            .map_or(DEFAULT_BASE_URL, |p| &p.base_url)
    }
}
