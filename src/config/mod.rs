//! Configuration module
//!
//! Handles loading and saving cluster-rpc configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::network::{DEFAULT_MAX_FRAME_SIZE, DEFAULT_PORT};
use crate::protocol::SlaveInfo;
use crate::types::ShardMask;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid slave {id}: {reason}")]
    InvalidSlave { id: String, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Network settings
    #[serde(default)]
    pub network: NetworkConfig,

    /// Slaves in the cluster
    #[serde(default)]
    pub slaves: Vec<SlaveConfig>,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Identifier this node sends in pings and pongs
    #[serde(default = "default_node_id")]
    pub node_id: String,
    /// Log filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_node_id() -> String {
    "master".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            log_level: default_log_level(),
        }
    }
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Interface to listen on
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest frame accepted or sent, in bytes
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
    /// Connection timeout in ms
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Request timeout in ms
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_max_frame_size() -> usize {
    DEFAULT_MAX_FRAME_SIZE
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_request_timeout() -> u64 {
    10_000
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            max_frame_size: default_max_frame_size(),
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

impl NetworkConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// One slave process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaveConfig {
    pub id: String,
    /// IPv4 or IPv6 literal
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Shard masks served, non-zero
    pub shard_masks: Vec<u32>,
}

impl SlaveConfig {
    fn invalid(&self, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidSlave {
            id: self.id.clone(),
            reason: reason.into(),
        }
    }

    pub fn ip(&self) -> ConfigResult<IpAddr> {
        self.host
            .parse()
            .map_err(|_| self.invalid(format!("host {:?} is not an IP address", self.host)))
    }

    pub fn socket_addr(&self) -> ConfigResult<SocketAddr> {
        Ok(SocketAddr::new(self.ip()?, self.port))
    }

    /// Wire descriptor for this slave
    pub fn slave_info(&self) -> ConfigResult<SlaveInfo> {
        if self.id.is_empty() {
            return Err(self.invalid("empty id"));
        }
        if self.shard_masks.is_empty() {
            return Err(self.invalid("no shard masks"));
        }
        if self.shard_masks.contains(&0) {
            return Err(self.invalid("shard mask 0 is reserved for the root chain"));
        }

        let ip = match self.ip()? {
            IpAddr::V4(v4) => u128::from(u32::from(v4)),
            IpAddr::V6(v6) => u128::from(v6),
        };
        let masks = self.shard_masks.iter().copied().map(ShardMask::new).collect();
        Ok(SlaveInfo::new(self.id.clone().into_bytes(), ip, self.port, masks))
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default location
    pub fn load_default() -> ConfigResult<Self> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("cluster-rpc/config.toml")),
            Some(PathBuf::from("./cluster-rpc.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                return Self::load(path);
            }
        }

        // Return default config if no file found
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Descriptors for every configured slave, in file order
    pub fn slave_infos(&self) -> ConfigResult<Vec<SlaveInfo>> {
        let mut ids = HashSet::new();
        self.slaves
            .iter()
            .map(|slave| {
                if !ids.insert(slave.id.as_str()) {
                    return Err(slave.invalid("duplicate id"));
                }
                slave.slave_info()
            })
            .collect()
    }

    pub fn slave(&self, id: &str) -> Option<&SlaveConfig> {
        self.slaves.iter().find(|slave| slave.id == id)
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config() -> ConfigResult<String> {
    let config = Config {
        slaves: vec![
            SlaveConfig {
                id: "S0".to_string(),
                host: "127.0.0.1".to_string(),
                port: DEFAULT_PORT,
                shard_masks: vec![0b10],
            },
            SlaveConfig {
                id: "S1".to_string(),
                host: "127.0.0.1".to_string(),
                port: DEFAULT_PORT + 1,
                shard_masks: vec![0b11],
            },
        ],
        ..Default::default()
    };

    Ok(toml::to_string_pretty(&config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};

    fn slave(id: &str, host: &str, masks: Vec<u32>) -> SlaveConfig {
        SlaveConfig {
            id: id.to_string(),
            host: host.to_string(),
            port: 38001,
            shard_masks: masks,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.network.port, DEFAULT_PORT);
        assert_eq!(config.network.max_frame_size, DEFAULT_MAX_FRAME_SIZE);
        assert_eq!(config.general.log_level, "info");
        assert!(config.slaves.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let mut config = Config::default();
        config.slaves.push(slave("S0", "10.0.0.1", vec![1]));
        let file = NamedTempFile::new().unwrap();

        config.save(file.path()).unwrap();

        let loaded = Config::load(file.path()).unwrap();
        assert_eq!(loaded.network.port, config.network.port);
        assert_eq!(loaded.slaves, config.slaves);
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/cluster-rpc.toml");
        Config::default().save(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [general]
            log_level = "debug"

            [[slaves]]
            id = "S0"
            host = "::1"
            shard_masks = [2, 3]
            "#,
        )
        .unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.network.request_timeout_ms, 10_000);
        assert_eq!(config.slaves[0].port, DEFAULT_PORT);
    }

    #[test]
    fn test_sample_config() {
        let sample = generate_sample_config().unwrap();
        let parsed: Config = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.slaves.len(), 2);
        assert_eq!(parsed.slave_infos().unwrap().len(), 2);
    }

    #[test]
    fn test_slave_info_conversion() {
        let info = slave("S0", "127.0.0.1", vec![0b10]).slave_info().unwrap();
        assert_eq!(info.id, b"S0");
        assert_eq!(info.ip, 0x7f00_0001);
        assert_eq!(info.port, 38001);
        assert_eq!(info.shard_mask_list, vec![ShardMask::new(0b10)]);

        let info = slave("S1", "::1", vec![1]).slave_info().unwrap();
        assert_eq!(info.ip, 1);
    }

    #[test]
    fn test_slave_validation() {
        assert!(slave("S0", "localhost", vec![1]).slave_info().is_err());
        assert!(slave("S0", "10.0.0.1", Vec::new()).slave_info().is_err());
        assert!(slave("S0", "10.0.0.1", vec![1, 0]).slave_info().is_err());
        assert!(slave("", "10.0.0.1", vec![1]).slave_info().is_err());

        let config = Config {
            slaves: vec![
                slave("S0", "10.0.0.1", vec![1]),
                slave("S0", "10.0.0.2", vec![1]),
            ],
            ..Default::default()
        };
        match config.slave_infos().unwrap_err() {
            ConfigError::InvalidSlave { id, reason } => {
                assert_eq!(id, "S0");
                assert_eq!(reason, "duplicate id");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(config.slave("S0").is_some());
        assert!(config.slave("S9").is_none());
    }
}
