use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub caption: CaptionConfig,
    pub relay: RelayConfig,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// Capture source to use when a session starts.
    pub source: SourceKind,
    /// Input device name for microphone capture (None = default device).
    pub device: Option<String>,
    /// Name substring selecting an application target for system capture.
    pub target: Option<String>,
}

/// Caption display configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaptionConfig {
    /// Minimum spacing between applied partial-result updates, in milliseconds.
    pub throttle_ms: u64,
    /// Broadcast every display update over the relay automatically.
    pub auto_relay: bool,
}

/// Relay (IPtalk exchange) configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    /// UDP port for both the listener and broadcast sends.
    pub port: u16,
}

/// Audio source selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Microphone,
    SystemAudio,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Microphone,
            device: None,
            target: None,
        }
    }
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            throttle_ms: defaults::THROTTLE_INTERVAL.as_millis() as u64,
            auto_relay: false,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: defaults::RELAY_PORT,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing; invalid TOML is an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - LIVECAP_SOURCE → audio.source ("microphone" or "system_audio")
    /// - LIVECAP_AUDIO_DEVICE → audio.device
    /// - LIVECAP_RELAY_PORT → relay.port
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(source) = std::env::var("LIVECAP_SOURCE") {
            match source.as_str() {
                "microphone" => self.audio.source = SourceKind::Microphone,
                "system_audio" => self.audio.source = SourceKind::SystemAudio,
                _ => {}
            }
        }

        if let Ok(device) = std::env::var("LIVECAP_AUDIO_DEVICE") {
            if !device.is_empty() {
                self.audio.device = Some(device);
            }
        }

        if let Ok(port) = std::env::var("LIVECAP_RELAY_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.relay.port = port;
            }
        }

        self
    }

    /// Default configuration file path: `$XDG_CONFIG_HOME/livecap/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("livecap")
            .join("config.toml")
    }

    /// Throttle interval as a `Duration`.
    pub fn throttle_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.caption.throttle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.audio.source, SourceKind::Microphone);
        assert_eq!(config.audio.device, None);
        assert_eq!(config.caption.throttle_ms, 250);
        assert!(!config.caption.auto_relay);
        assert_eq!(config.relay.port, 15000);
    }

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[audio]
source = "system_audio"
target = "zoom"

[caption]
throttle_ms = 500
auto_relay = true

[relay]
port = 16000
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.audio.source, SourceKind::SystemAudio);
        assert_eq!(config.audio.target.as_deref(), Some("zoom"));
        assert_eq!(config.caption.throttle_ms, 500);
        assert!(config.caption.auto_relay);
        assert_eq!(config.relay.port, 16000);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[relay]\nport = 15001").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.relay.port, 15001);
        assert_eq!(config.audio.source, SourceKind::Microphone);
        assert_eq!(config.caption.throttle_ms, 250);
    }

    #[test]
    fn test_load_invalid_toml_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "this is not toml =").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/livecap.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_or_default_invalid_toml_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "garbage [[[").unwrap();

        assert!(Config::load_or_default(file.path()).is_err());
    }

    #[test]
    fn test_throttle_interval_conversion() {
        let mut config = Config::default();
        config.caption.throttle_ms = 100;
        assert_eq!(
            config.throttle_interval(),
            std::time::Duration::from_millis(100)
        );
    }

    #[test]
    fn test_source_kind_round_trip() {
        let config = Config {
            audio: AudioConfig {
                source: SourceKind::SystemAudio,
                ..Default::default()
            },
            ..Default::default()
        };
        let serialized = toml::to_string(&config).unwrap();
        assert!(serialized.contains("system_audio"));
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.audio.source, SourceKind::SystemAudio);
    }
}
