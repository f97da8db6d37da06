//! Configuration management for TV Remote GW
//!
//! Handles loading, parsing, and hot-reloading of YAML configuration files.
//! Every section is optional; a missing file yields the defaults.

pub mod watcher;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::Path;
use tokio::fs;

pub use watcher::ConfigWatcher;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub joystick: JoystickConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
    /// Devices registered at start-up
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<DeviceConfig>,
}

/// HTTP listener configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Built touch client served on `/` (`null` disables static serving)
    #[serde(default = "default_static_dir")]
    pub static_dir: Option<String>,
}

/// Touch joystick geometry
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct JoystickConfig {
    /// Base diameter in pixels (radius is half of it)
    #[serde(default = "default_joystick_size")]
    pub size: f64,
    #[serde(default)]
    pub anchor: AnchorPolicy,
}

/// How the joystick anchor is determined during a gesture
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorPolicy {
    /// Re-query the surface bounds on every update
    #[default]
    Live,
    /// Capture the anchor once at gesture start
    Fixed,
}

/// Joystick to D-pad key mapping
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct NavigationConfig {
    /// Magnitude below which the joystick is neutral (0.0-1.0)
    #[serde(default = "default_deadzone")]
    pub deadzone: f64,
    /// Hold time before the first repeat
    #[serde(default = "default_repeat_delay")]
    pub repeat_delay_ms: u64,
    #[serde(default = "default_repeat_interval")]
    pub repeat_interval_ms: u64,
}

/// Statically configured device
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DeviceConfig {
    pub ip: String,
    #[serde(default = "default_device_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for JoystickConfig {
    fn default() -> Self {
        Self {
            size: default_joystick_size(),
            anchor: AnchorPolicy::default(),
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            deadzone: default_deadzone(),
            repeat_delay_ms: default_repeat_delay(),
            repeat_interval_ms: default_repeat_interval(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::from_yaml(&contents).with_context(|| format!("Invalid config file: {}", path))
    }

    /// Load configuration, falling back to defaults when the file does not exist
    pub async fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(contents: &str) -> Result<Self> {
        // An empty document is valid and means "all defaults"
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: AppConfig =
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: &str) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("server.port cannot be 0");
        }

        let size = self.joystick.size;
        if !size.is_finite() || size <= 0.0 {
            anyhow::bail!("joystick.size must be a positive number (got {})", size);
        }

        let deadzone = self.navigation.deadzone;
        if !(0.0..1.0).contains(&deadzone) {
            anyhow::bail!("navigation.deadzone must be in [0, 1) (got {})", deadzone);
        }
        if self.navigation.repeat_interval_ms == 0 {
            anyhow::bail!("navigation.repeat_interval_ms cannot be 0");
        }

        for (idx, device) in self.devices.iter().enumerate() {
            device
                .ip
                .trim()
                .parse::<Ipv4Addr>()
                .with_context(|| format!("Device {} has invalid IPv4 address '{}'", idx, device.ip))?;
            if device.port == 0 {
                anyhow::bail!("Device {} ({}) port cannot be 0", idx, device.ip);
            }
        }

        Ok(())
    }
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_static_dir() -> Option<String> { Some("frontend/dist".to_string()) }
fn default_joystick_size() -> f64 { 150.0 }
fn default_deadzone() -> f64 { 0.35 }
fn default_repeat_delay() -> u64 { 400 }
fn default_repeat_interval() -> u64 { 150 }
fn default_device_port() -> u16 { 5555 }
