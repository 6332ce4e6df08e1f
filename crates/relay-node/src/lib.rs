//! # Relay Node
//!
//! Configuration loading and relay construction for the `relay-node` binary.
//!
//! ## Environment
//!
//! | Variable | Effect |
//! |---|---|
//! | `PARCEL_CONFIG` | TOML file to load instead of the defaults |
//! | `PARCEL_BIND_PORT` | overrides `server.bind_port` |
//! | `PARCEL_PUBLIC_HOST` | overrides `server.public_host` |
//! | `PARCEL_TTL_SECS` | overrides `store.ttl_secs` |

use anyhow::{Context, Result};
use parcel_relay::{BincodeCodec, ParcelRelayService, RelayConfig};
use std::sync::Arc;
use tracing::{info, warn};

pub const CONFIG_ENV: &str = "PARCEL_CONFIG";
pub const BIND_PORT_ENV: &str = "PARCEL_BIND_PORT";
pub const PUBLIC_HOST_ENV: &str = "PARCEL_PUBLIC_HOST";
pub const TTL_SECS_ENV: &str = "PARCEL_TTL_SECS";

/// Load configuration from the process environment.
pub fn load_config() -> Result<RelayConfig> {
    load_config_from(|key| std::env::var(key).ok())
}

/// Load configuration, reading variables through `lookup`.
pub fn load_config_from(lookup: impl Fn(&str) -> Option<String>) -> Result<RelayConfig> {
    let mut config = match lookup(CONFIG_ENV) {
        Some(path) => {
            let config = RelayConfig::load(&path)
                .with_context(|| format!("Failed to load relay config from {path}"))?;
            info!(path = %path, "Loaded relay config");
            config
        }
        None => RelayConfig::default(),
    };

    apply_overrides(&mut config, lookup);
    config.validate().context("Invalid relay config")?;
    Ok(config)
}

fn apply_overrides(config: &mut RelayConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(port) = lookup(BIND_PORT_ENV) {
        match port.parse() {
            Ok(p) => config.server.bind_port = p,
            Err(_) => warn!(value = %port, "{BIND_PORT_ENV} is not a valid port"),
        }
    }

    if let Some(host) = lookup(PUBLIC_HOST_ENV) {
        config.server.public_host = host;
    }

    if let Some(ttl) = lookup(TTL_SECS_ENV) {
        match ttl.parse() {
            Ok(secs) => config.store.ttl_secs = secs,
            Err(_) => warn!(value = %ttl, "{TTL_SECS_ENV} is not a number of seconds"),
        }
    }
}

/// Relay service with the node's codec.
pub fn build_service(config: RelayConfig) -> ParcelRelayService {
    ParcelRelayService::new(config, Arc::new(BincodeCodec::with_primitives()))
}
