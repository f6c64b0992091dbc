// Configuration structures for the tunnel status engine

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// File name of the persisted user settings, relative to the home directory
pub const SETTINGS_FILE_NAME: &str = ".ssh-tunnel-status-settings.json";

/// Default name of the inbound signal channel
pub const DEFAULT_CHANNEL: &str = "tunnel_status";

/// Connection parameters entered by the user and persisted after a successful connection
///
/// Stored as a flat JSON object: `{"host", "user", "port", "keyPath"}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    /// SSH server hostname or IP
    #[serde(default)]
    pub host: String,
    /// SSH username
    #[serde(default)]
    pub user: String,
    /// Local port to forward to, kept as entered
    #[serde(default)]
    pub port: String,
    /// Path to the SSH private key
    #[serde(default)]
    pub key_path: String,
}

/// Payload of the "start tunnel" command sent to the supervisor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartTunnelPayload {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub key_path: String,
}

impl UserSettings {
    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("Please enter an IP Address".to_string()));
        }
        if self.user.trim().is_empty() {
            return Err(Error::Config("Please enter a username".to_string()));
        }
        if self.key_path.trim().is_empty() {
            return Err(Error::Config("Please select an SSH Key file".to_string()));
        }
        self.local_port().map(|_| ())
    }

    /// Parse the local port
    pub fn local_port(&self) -> Result<u16> {
        let port = self.port.trim();
        if port.is_empty() {
            return Err(Error::Config(
                "Please enter a port to forward the connection to".to_string(),
            ));
        }
        match port.parse::<u16>() {
            Ok(0) | Err(_) => Err(Error::Config(format!("Illegal port value: {}", port))),
            Ok(port) => Ok(port),
        }
    }

    /// Build the start-tunnel payload, validating the settings first
    pub fn to_start_payload(&self) -> Result<StartTunnelPayload> {
        self.validate()?;
        Ok(StartTunnelPayload {
            host: self.host.trim().to_string(),
            user: self.user.trim().to_string(),
            port: self.local_port()?,
            key_path: self.key_path.trim().to_string(),
        })
    }
}

/// Get the default path of the persisted user settings
pub fn default_settings_path() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;
    Ok(home.join(SETTINGS_FILE_NAME))
}

/// Engine configuration, read from `config.toml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Name of the inbound signal channel
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Override for the user settings file location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_path: Option<PathBuf>,

    /// User-level switch for desktop notifications (ANDed with the OS permission)
    #[serde(default = "default_notifications")]
    pub notifications: bool,
}

fn default_channel() -> String {
    DEFAULT_CHANNEL.to_string()
}

fn default_notifications() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            settings_path: None,
            notifications: default_notifications(),
        }
    }
}

impl EngineConfig {
    /// Load the configuration from the default location, or defaults if absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load the configuration from a file, or defaults if the file doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No engine config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.channel.trim().is_empty() {
            return Err(Error::Config("Channel name cannot be empty".to_string()));
        }
        if let Some(path) = &self.settings_path {
            if path.as_os_str().is_empty() {
                return Err(Error::InvalidPath("settings_path is empty".to_string()));
            }
        }
        Ok(())
    }

    /// Resolve the user settings file location
    pub fn settings_path(&self) -> Result<PathBuf> {
        match &self.settings_path {
            Some(path) => Ok(path.clone()),
            None => default_settings_path(),
        }
    }

    /// Get the path to the engine configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("ssh-tunnel-status").join("config.toml"))
    }
}
