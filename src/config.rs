// Global configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub demo: DemoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// How long finished and pending jobs survive across restarts, in hours
    #[serde(default = "default_retention_hours")]
    pub retention_hours: i64,

    /// Queue state file location; unset means the per-OS default
    #[serde(default)]
    pub state_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Milliseconds between simulated progress ticks
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Preset used when the demo command is not given one
    #[serde(default = "default_demo_preset")]
    pub preset: String,
}

fn default_retention_hours() -> i64 {
    crate::engine::DEFAULT_RETENTION_HOURS
}

fn default_tick_ms() -> u64 {
    400
}

fn default_demo_preset() -> String {
    "WEB_HD".to_string()
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            retention_hours: default_retention_hours(),
            state_path: None,
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            preset: default_demo_preset(),
        }
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "macos") {
            dirs::home_dir()
                .context("Could not determine home directory")?
                .join(".config")
                .join("exportq")
        } else if cfg!(target_os = "windows") {
            dirs::config_dir()
                .context("Could not determine config directory")?
                .join("exportq")
        } else {
            // Linux and others
            dirs::config_dir()
                .context("Could not determine config directory")?
                .join("exportq")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from disk, or create default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;

            let config: Config = toml::from_str(&contents).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?;

            Ok(config)
        } else {
            // Create default config and save it
            let config = Config::default();

            // Try to save the default config, but don't fail if we can't
            // (e.g., if the directory isn't writable)
            if let Err(e) = config.save() {
                eprintln!("Warning: Could not create default config file: {}", e);
                eprintln!(
                    "Using built-in defaults. Run 'exportq init-config' to create a config file."
                );
            }

            Ok(config)
        }
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        // Create parent directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Check if config file exists
    pub fn exists() -> bool {
        Self::config_path().map(|p| p.exists()).unwrap_or(false)
    }

    /// Create a default config file if it doesn't exist
    pub fn ensure_default() -> Result<()> {
        if !Self::exists() {
            let config = Config::default();
            config.save()?;
        }
        Ok(())
    }
}
