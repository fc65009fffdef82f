//! Application configuration
//!
//! Loaded from a TOML file. A missing file is created with the defaults so the
//! operator has something to edit.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::error::ConfigError;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub capture: CaptureConfig,
    pub player: PlayerConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_HTTP_PORT,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// External capture utility invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaptureConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            program: "parec".to_string(),
            args: vec![
                "--format=s16le".to_string(),
                format!("--rate={}", SAMPLE_RATE),
                format!("--channels={}", CHANNELS),
                format!("--latency-msec={}", CAPTURE_LATENCY_MS),
            ],
        }
    }
}

/// Native player settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    pub server_url: String,
    /// Linear output gain, 0.0 - 10.0
    pub volume: f32,
    /// Bass shelf gain in dB, -10 - 20
    pub bass_db: f32,
    /// Output device name, empty for the default device
    pub device: String,
    pub stats_interval_ms: u64,
    pub ping_interval_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            server_url: format!("http://127.0.0.1:{}", DEFAULT_HTTP_PORT),
            volume: 1.0,
            bass_db: 0.0,
            device: String::new(),
            stats_interval_ms: 1000,
            ping_interval_ms: 2000,
        }
    }
}

impl PlayerConfig {
    /// Clamp user-supplied values into the ranges the audio graph accepts
    pub fn sanitized(mut self) -> Self {
        self.volume = self.volume.clamp(0.0, 10.0);
        self.bass_db = self.bass_db.clamp(-10.0, 20.0);
        self
    }
}

impl AppConfig {
    /// Default location: the platform config dir, or `./config.toml`
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "soundsync")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(text)?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Read the config at `path`, writing defaults there if it does not exist
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                if let Err(e) = config.write(path) {
                    // A read-only location is not fatal, the defaults still apply
                    tracing::warn!("Could not write default config to {}: {}", path.display(), e);
                }
                Ok(config)
            }
            Err(source) => Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    fn write(&self, path: &Path) -> Result<(), ConfigError> {
        let text = self.to_toml()?;
        let io_err = |source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, text).map_err(io_err)
    }
}
