//! Relay configuration with validation.
//!
//! Every section has defaults, so an empty TOML document is a valid config.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Main relay configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Parcel server (TCP side)
    pub server: ServerConfig,
    /// Parcel store and TTL sweep
    pub store: StoreConfig,
    /// Parcel client used by notification holders
    pub client: ClientConfig,
    /// Manager actor
    pub manager: ManagerConfig,
}

impl RelayConfig {
    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse a TOML document.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.public_host.trim().is_empty() {
            return Err(ConfigError::InvalidLimit(
                "server.public_host cannot be empty".into(),
            ));
        }

        if self.server.read_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(
                "server.read_timeout_ms cannot be 0".into(),
            ));
        }

        if self.store.ttl_secs == 0 {
            return Err(ConfigError::InvalidTimeout(
                "store.ttl_secs cannot be 0".into(),
            ));
        }

        if self.store.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidTimeout(
                "store.sweep_interval_secs cannot be 0".into(),
            ));
        }

        if self.client.connect_timeout_ms == 0 || self.client.read_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(
                "client timeouts cannot be 0".into(),
            ));
        }

        if self.client.chunk_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "client.chunk_size cannot be 0".into(),
            ));
        }

        if self.client.max_read_attempts == 0 {
            return Err(ConfigError::InvalidLimit(
                "client.max_read_attempts cannot be 0".into(),
            ));
        }

        if self.manager.mailbox_capacity == 0 {
            return Err(ConfigError::InvalidLimit(
                "manager.mailbox_capacity cannot be 0".into(),
            ));
        }

        Ok(())
    }

    /// Short timeouts and an ephemeral loopback port.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig {
                bind_host: "127.0.0.1".to_string(),
                bind_port: 0,
                public_host: "127.0.0.1".to_string(),
                read_timeout_ms: 500,
            },
            store: StoreConfig::default(),
            client: ClientConfig {
                connect_timeout_ms: 1_000,
                read_timeout_ms: 500,
                chunk_size: 1024,
                max_read_attempts: 3,
                reread_interval_ms: 50,
                log_receive: false,
            },
            manager: ManagerConfig::default(),
        }
    }
}

/// Parcel server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to listen on
    pub bind_host: String,
    /// Port to listen on (0 = ephemeral)
    pub bind_port: u16,
    /// Host written into notifications
    pub public_host: String,
    /// How long to wait for a client to send its parcel id
    pub read_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            bind_port: 0,
            public_host: "127.0.0.1".to_string(),
            read_timeout_ms: 10_000,
        }
    }
}

impl ServerConfig {
    /// `host:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.bind_port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Parcel store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Default time a parcel waits for retrieval
    pub ttl_secs: u64,
    /// Time between eviction sweeps
    pub sweep_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            sweep_interval_secs: 60,
        }
    }
}

impl StoreConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Parcel client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub connect_timeout_ms: u64,
    /// Bound on every individual read
    pub read_timeout_ms: u64,
    /// Bytes requested per payload read
    pub chunk_size: usize,
    /// Attempts made by `fetch_with_retry`
    pub max_read_attempts: u32,
    /// Pause between retry attempts
    pub reread_interval_ms: u64,
    /// Log every received parcel at info level
    pub log_receive: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            read_timeout_ms: 10_000,
            chunk_size: 1024,
            max_read_attempts: 5,
            reread_interval_ms: 5_000,
            log_receive: false,
        }
    }
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn reread_interval(&self) -> Duration {
        Duration::from_millis(self.reread_interval_ms)
    }
}

/// Manager actor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Relay requests buffered before `tell` reports the mailbox full
    pub mailbox_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: shared_bus::DEFAULT_MAILBOX_CAPACITY,
        }
    }
}
