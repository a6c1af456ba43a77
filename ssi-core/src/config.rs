use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::{
    model::GeoPoint,
    provider::ProviderId,
    scorer::{Scorer, ScoringCurves},
};

pub const ENV_DEFAULT_LAT: &str = "DEFAULT_LAT";
pub const ENV_DEFAULT_LON: &str = "DEFAULT_LON";
pub const ENV_CACHE_DIR: &str = "CACHE_DIR";

/// Per-provider settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Overrides the provider's public endpoint, e.g. for a mirror.
    pub base_url: Option<String>,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Optional default provider id, e.g. "brightsky" or "simulated".
    pub default_provider: Option<String>,

    /// Where fetched series are cached. Falls back to the platform cache dir.
    pub cache_dir: Option<PathBuf>,

    /// Area of interest used when no coordinates are given.
    pub default_location: Option<GeoPoint>,

    /// Example TOML:
    /// [providers.brightsky]
    /// base_url = "https://api.brightsky.dev"
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(default)]
    pub scoring: ScoringCurves,
}

impl Config {
    /// Return the default provider as a strongly-typed ProviderId.
    /// Without a configured default the simulated provider is used.
    pub fn default_provider_id(&self) -> Result<ProviderId> {
        match self.default_provider.as_deref() {
            Some(s) => ProviderId::try_from(s).context(
                "Invalid default provider in config.\n\
                 Hint: run `ssi configure` to pick one of the supported providers.",
            ),
            None => Ok(ProviderId::default()),
        }
    }

    /// Store default provider as string.
    pub fn set_default_provider(&mut self, id: ProviderId) {
        self.default_provider = Some(id.as_str().to_string());
    }

    pub fn provider_config(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.get(id.as_str())
    }

    /// Returns the endpoint override for a provider, if present.
    pub fn provider_base_url(&self, id: ProviderId) -> Option<&str> {
        self.provider_config(id).and_then(|cfg| cfg.base_url.as_deref())
    }

    pub fn set_provider_base_url(&mut self, id: ProviderId, base_url: Option<String>) {
        self.providers.entry(id.as_str().to_string()).or_default().base_url = base_url;
    }

    pub fn location(&self) -> GeoPoint {
        self.default_location.unwrap_or(GeoPoint::HAMBURG)
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::project_dirs()?.cache_dir().to_path_buf()),
        }
    }

    pub fn scorer(&self) -> Result<Scorer> {
        Scorer::new(self.scoring).context("Invalid [scoring] section in config")
    }

    /// Applies `DEFAULT_LAT`, `DEFAULT_LON` and `CACHE_DIR` from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::apply_env`], reading variables through `lookup`.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lat = parse_coordinate(&lookup, ENV_DEFAULT_LAT)?;
        let lon = parse_coordinate(&lookup, ENV_DEFAULT_LON)?;

        if lat.is_some() || lon.is_some() {
            let current = self.location();
            let point = GeoPoint::new(lat.unwrap_or(current.latitude), lon.unwrap_or(current.longitude));
            point.validate().with_context(|| {
                format!("{ENV_DEFAULT_LAT}/{ENV_DEFAULT_LON} do not form a valid location")
            })?;
            self.default_location = Some(point);
        }

        if let Some(dir) = lookup(ENV_CACHE_DIR).filter(|d| !d.trim().is_empty()) {
            self.cache_dir = Some(PathBuf::from(dir));
        }

        Ok(())
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
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

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "ssi", "ssi-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }
}

fn parse_coordinate<F>(lookup: &F, key: &str) -> Result<Option<f64>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .with_context(|| format!("{key} must be a number, got '{v}'"))
        })
        .transpose()
}
