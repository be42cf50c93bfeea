//! Configuration file support for Dosis.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/dosis/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub presets: PresetConfig,

    #[serde(default)]
    pub labels: LabelConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Reference catalog source
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct CatalogConfig {
    /// JSON catalog replacing the built-in one
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PresetConfig {
    #[serde(default = "default_preset_slots")]
    pub slots: usize,
}

impl Default for PresetConfig {
    fn default() -> Self {
        Self {
            slots: default_preset_slots(),
        }
    }
}

/// Label lookup cache and throttle
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LabelConfig {
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u64,

    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            cache_ttl_hours: default_cache_ttl_hours(),
            min_interval_ms: default_min_interval_ms(),
        }
    }
}

impl LabelConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours * 3600)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("dosis")
}

fn default_preset_slots() -> usize {
    10
}

fn default_cache_ttl_hours() -> u64 {
    24
}

fn default_min_interval_ms() -> u64 {
    500
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.presets.slots == 0 {
            return Err(Error::Config("presets.slots must be at least 1".into()));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("dosis").join("config.toml")
    }

    /// Preset file inside the data directory
    pub fn presets_path(&self) -> PathBuf {
        self.data.data_dir.join("presets.json")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.presets.slots, 10);
        assert_eq!(config.labels.cache_ttl(), Duration::from_secs(24 * 3600));
        assert_eq!(config.labels.min_interval(), Duration::from_millis(500));
        assert!(config.catalog.path.is_none());
        assert!(config.presets_path().ends_with("dosis/presets.json"));
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[labels]
cache_ttl_hours = 6
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.labels.cache_ttl_hours, 6);
        assert_eq!(config.labels.min_interval_ms, 500); // default
        assert_eq!(config.presets.slots, 10);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.data.data_dir = temp_dir.path().join("data");
        config.catalog.path = Some(temp_dir.path().join("catalog.json"));
        config.presets.slots = 4;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.data.data_dir, config.data.data_dir);
        assert_eq!(loaded.catalog.path, config.catalog.path);
        assert_eq!(loaded.presets.slots, 4);
    }

    #[test]
    fn test_zero_slots_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[presets]\nslots = 0\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
