//! Configuration management

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub signaling: SignalingConfig,
    pub ice: IceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingConfig {
    /// WebSocket endpoint of the relay
    pub url: String,
    /// Seconds between application-level Ping messages
    pub ping_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IceConfig {
    pub stun_servers: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            signaling: SignalingConfig::default(),
            ice: IceConfig::default(),
        }
    }
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:4000/socket".to_string(),
            ping_interval_secs: 5,
        }
    }
}

impl Default for IceConfig {
    fn default() -> Self {
        Self {
            stun_servers: vec![
                "stun:stun.l.google.com:19302".to_string(),
                "stun:stun1.l.google.com:19302".to_string(),
                "stun:stun2.l.google.com:19302".to_string(),
            ],
        }
    }
}

impl Config {
    /// Load from an optional `peercast.toml` next to the binary, with
    /// `PEERCAST_*` environment variables on top; missing values fall back
    /// to the defaults above
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("peercast").required(false))
            .add_source(config::Environment::with_prefix("PEERCAST").separator("__"))
            .build()?
            .try_deserialize()
    }
}
