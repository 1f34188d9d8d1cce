use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const FILENAME: &str = "config.yaml";
const APP_DIR: &str = "trailshow";

/// Shortest rotation interval accepted from the config file.
pub const MIN_INTERVAL_MS: u64 = 500;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,

    /// Autoplay interval in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,

    /// Pixels subtracted from the thumbnail center when placing the arrow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrow_correction: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_paused: Option<bool>,
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR).join(FILENAME))
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::anyhow!("No config found. Run `trailshow config show` to see defaults.")
            } else {
                anyhow::anyhow!("Failed to read config: {e}")
            }
        })?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                log::debug!("Using default configuration: {e}");
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        let contents = format!("# trailshow configuration\n{yaml}");
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let defaults = self.defaults.get_or_insert_with(DefaultsConfig::default);
        match key {
            "defaults.theme" => {
                match value {
                    "light" | "dark" => {}
                    _ => anyhow::bail!("Invalid theme: {value}. Must be 'light' or 'dark'."),
                }
                defaults.theme = Some(value.to_string());
            }
            "defaults.interval_ms" => {
                let ms: u64 = value.parse().map_err(|_| {
                    anyhow::anyhow!("Invalid interval: {value}. Must be a number of milliseconds.")
                })?;
                if ms < MIN_INTERVAL_MS {
                    anyhow::bail!("Invalid interval: {value}. Must be at least {MIN_INTERVAL_MS} ms.");
                }
                defaults.interval_ms = Some(ms);
            }
            "defaults.arrow_correction" => {
                let px: f32 = value
                    .parse()
                    .ok()
                    .filter(|px: &f32| px.is_finite())
                    .ok_or_else(|| {
                        anyhow::anyhow!("Invalid arrow correction: {value}. Must be a number of pixels.")
                    })?;
                defaults.arrow_correction = Some(px);
            }
            "defaults.start_paused" => {
                let paused = match value {
                    "true" | "yes" | "on" => true,
                    "false" | "no" | "off" => false,
                    _ => anyhow::bail!("Invalid start_paused: {value}. Must be 'true' or 'false'."),
                };
                defaults.start_paused = Some(paused);
            }
            _ => anyhow::bail!(
                "Unknown config key: {key}. Valid keys: defaults.theme, defaults.interval_ms, defaults.arrow_correction, defaults.start_paused"
            ),
        }
        Ok(())
    }

    pub fn theme(&self) -> Option<&str> {
        self.defaults.as_ref().and_then(|d| d.theme.as_deref())
    }

    pub fn interval_ms(&self) -> Option<u64> {
        self.defaults.as_ref().and_then(|d| d.interval_ms)
    }

    pub fn arrow_correction(&self) -> Option<f32> {
        self.defaults.as_ref().and_then(|d| d.arrow_correction)
    }

    pub fn start_paused(&self) -> bool {
        self.defaults
            .as_ref()
            .and_then(|d| d.start_paused)
            .unwrap_or(false)
    }
}
