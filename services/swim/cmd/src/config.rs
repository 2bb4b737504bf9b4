//! Configuration handling for the swim tool.
//!
//! This module reads the node identity used to stamp outgoing packets from the
//! shared config file and environment variables.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::Path;
use swim_wire::MAX_PACKET_SIZE;
use tracing::{info, warn};
use uuid::Uuid;

/// Default SWIM port
pub const DEFAULT_PORT: u16 = 3301;

/// Swim node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwimConfig {
    /// Source address advertised in the meta header and bound by `listen`/`ping`
    pub src_addr: SocketAddrV4,
    /// UUID of this member
    pub uuid: Uuid,
    /// Incarnation carried in pings and quit notices
    pub incarnation: u64,
    /// Outgoing packet budget in bytes
    pub max_packet_size: usize,
    /// Protocol version override (defaults to the crate version)
    pub version: Option<u32>,
}

impl Default for SwimConfig {
    fn default() -> Self {
        Self {
            src_addr: SocketAddrV4::new(Ipv4Addr::LOCALHOST, DEFAULT_PORT),
            uuid: Uuid::new_v4(),
            incarnation: 0,
            max_packet_size: MAX_PACKET_SIZE,
            version: None,
        }
    }
}

/// Root configuration structure (matches the YAML structure)
#[derive(Debug, Deserialize)]
struct RootConfig {
    services: Option<ServicesConfig>,
}

#[derive(Debug, Deserialize)]
struct ServicesConfig {
    swim: Option<ServiceConfig>,
}

#[derive(Debug, Deserialize)]
struct ServiceConfig {
    config: Option<HashMap<String, String>>,
}

impl SwimConfig {
    /// Load configuration from file and environment variables
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config = Self::default();

        match std::fs::read_to_string(&config_path) {
            Ok(content) => match serde_yaml::from_str::<RootConfig>(&content) {
                Ok(root_config) => {
                    config.apply_root_config(root_config);
                    info!("Loaded configuration from {:?}", config_path.as_ref());
                }
                Err(e) => warn!(
                    "Failed to parse config file {:?}, using defaults: {}",
                    config_path.as_ref(),
                    e
                ),
            },
            Err(_) => info!(
                "Config file {:?} not found, using defaults",
                config_path.as_ref()
            ),
        }

        config.apply_environment_overrides(|key| std::env::var(key).ok());

        info!(
            "Final swim configuration: src_addr={}, uuid={}, incarnation={}, max_packet_size={}",
            config.src_addr, config.uuid, config.incarnation, config.max_packet_size
        );

        Ok(config)
    }

    /// Apply configuration from the root config structure
    fn apply_root_config(&mut self, root_config: RootConfig) {
        let values = root_config
            .services
            .and_then(|services| services.swim)
            .and_then(|swim| swim.config);
        if let Some(values) = values {
            for (key, value) in values {
                if let Some(field) = key.strip_prefix("services.swim.") {
                    self.apply_value(field, &value);
                }
            }
        }
    }

    /// Apply environment variable overrides
    fn apply_environment_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        const OVERRIDES: [(&str, &str); 5] = [
            ("SWIM_SRC_ADDR", "src_addr"),
            ("SWIM_UUID", "uuid"),
            ("SWIM_INCARNATION", "incarnation"),
            ("SWIM_MAX_PACKET_SIZE", "max_packet_size"),
            ("SWIM_VERSION", "version"),
        ];
        for (var, field) in OVERRIDES {
            if let Some(value) = lookup(var) {
                if self.apply_value(field, &value) {
                    info!("{} overridden by environment: {}", field, value);
                }
            }
        }
    }

    /// Set one field from its string form; returns whether it was applied
    fn apply_value(&mut self, field: &str, value: &str) -> bool {
        let applied = match field {
            "src_addr" => match value.parse::<SocketAddrV4>() {
                // Peers drop packets whose source address is 0.0.0.0 or port 0
                Ok(v) if !v.ip().is_unspecified() && v.port() != 0 => {
                    self.src_addr = v;
                    true
                }
                _ => false,
            },
            "uuid" => value.parse::<Uuid>().map(|v| self.uuid = v).is_ok(),
            "incarnation" => value.parse::<u64>().map(|v| self.incarnation = v).is_ok(),
            "max_packet_size" => value.parse::<usize>().map(|v| self.max_packet_size = v).is_ok(),
            "version" => value.parse::<u32>().map(|v| self.version = Some(v)).is_ok(),
            _ => {
                // Ignore unknown configuration keys
                return false;
            }
        };
        if !applied {
            warn!("Ignoring invalid value {:?} for {}", value, field);
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = SwimConfig::default();
        assert_eq!(config.src_addr, SocketAddrV4::new(Ipv4Addr::LOCALHOST, 3301));
        assert!(!config.uuid.is_nil());
        assert_eq!(config.incarnation, 0);
        assert_eq!(config.max_packet_size, MAX_PACKET_SIZE);
        assert_eq!(config.version, None);
    }

    #[test]
    fn test_load_from_file() {
        let yaml_content = r#"
services:
  swim:
    enabled: true
    config:
      services.swim.src_addr: "10.1.2.3:4401"
      services.swim.uuid: "6ba7b810-9dad-11d1-80b4-00c04fd430c8"
      services.swim.incarnation: "7"
      services.swim.max_packet_size: "not-a-number"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml_content.as_bytes()).unwrap();

        let config = SwimConfig::load_from_file(temp_file.path()).unwrap();

        assert_eq!(config.src_addr, "10.1.2.3:4401".parse::<SocketAddrV4>().unwrap());
        assert_eq!(
            config.uuid,
            "6ba7b810-9dad-11d1-80b4-00c04fd430c8".parse::<Uuid>().unwrap()
        );
        assert_eq!(config.incarnation, 7);
        assert_eq!(config.max_packet_size, MAX_PACKET_SIZE);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = SwimConfig::load_from_file("/nonexistent/swim-config.yaml").unwrap();
        assert_eq!(config.max_packet_size, MAX_PACKET_SIZE);
    }

    #[test]
    fn test_environment_overrides() {
        let mut config = SwimConfig::default();
        config.apply_environment_overrides(|key| match key {
            "SWIM_SRC_ADDR" => Some("192.0.2.1:7777".to_string()),
            "SWIM_INCARNATION" => Some("42".to_string()),
            "SWIM_VERSION" => Some("bogus".to_string()),
            _ => None,
        });
        assert_eq!(config.src_addr, "192.0.2.1:7777".parse::<SocketAddrV4>().unwrap());
        assert_eq!(config.incarnation, 42);
        assert_eq!(config.version, None);
    }

    #[test]
    fn test_unroutable_src_addr_ignored() {
        let mut config = SwimConfig::default();
        config.apply_environment_overrides(|key| match key {
            "SWIM_SRC_ADDR" => Some("0.0.0.0:3301".to_string()),
            _ => None,
        });
        assert_eq!(config.src_addr, SocketAddrV4::new(Ipv4Addr::LOCALHOST, DEFAULT_PORT));

        assert!(!config.apply_value("src_addr", "10.0.0.1:0"));
        assert!(config.apply_value("src_addr", "10.0.0.1:3302"));
        assert_eq!(config.src_addr, SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 3302));
    }
}
