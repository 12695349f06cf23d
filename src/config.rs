use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::tour::{ScrollTo, TooltipPosition};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tour: TourOptions,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub frames: FramesConfig,
}

/// Tour-wide defaults and filters, read-only to the tour itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TourOptions {
    /// Placement used when a step does not set one
    #[serde(default)]
    pub tooltip_position: TooltipPosition,
    #[serde(default)]
    pub scroll_to: ScrollTo,
    #[serde(default)]
    pub disable_interaction: bool,
    /// Only markup steps whose `data-intro-group` equals this are collected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Selector of the element whose subtree is scanned for markup steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

impl Default for TourOptions {
    fn default() -> Self {
        Self {
            tooltip_position: TooltipPosition::Bottom,
            scroll_to: ScrollTo::Element,
            disable_interaction: false,
            group: None,
            root: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramesConfig {
    /// Simulated frame interval for the tokio frame clock
    #[serde(default = "default_frame_interval")]
    pub interval_ms: u64,
}

fn default_frame_interval() -> u64 {
    16 // ~60 fps
}

impl Default for FramesConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_frame_interval(),
        }
    }
}

impl FramesConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Write logs to `directory` instead of stderr
    #[serde(default)]
    pub to_file: bool,
    #[serde(default = "default_log_directory")]
    pub directory: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_directory() -> String {
    ".tourguide/logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: false,
            directory: default_log_directory(),
        }
    }
}

impl Config {
    /// Project-local config file
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".tourguide/config.toml")
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Embedded defaults so the tool works without any config file
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        let project_config = Self::project_config_path();
        if project_config.exists() {
            builder = builder.add_source(config::File::from(project_config));
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("tourguide").join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // TOURGUIDE__TOUR__TOOLTIP_POSITION=top etc.
        builder = builder.add_source(
            config::Environment::with_prefix("TOURGUIDE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Save config to `.tourguide/config.toml`
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::project_config_path())
    }

    pub fn save_to(&self, config_path: &std::path::Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create tourguide config directory")?;
        }

        let toml_str =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        std::fs::write(config_path, toml_str).context("Failed to write config file")?;

        Ok(())
    }

    /// Absolute path to the log directory
    pub fn logs_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.logging.directory);
        if path.is_absolute() {
            path
        } else {
            std::env::current_dir().unwrap_or_default().join(path)
        }
    }
}
