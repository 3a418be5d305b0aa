//! Configuration type definitions for the server, database, bus, publisher
//! and logging sections.

use serde::{Deserialize, Serialize};

use crate::defaults::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub bus: BusConfig,
    #[serde(default)]
    pub publisher: PublisherConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// gRPC listen address, e.g. 0.0.0.0:50051
    #[serde(default = "default_rpc_listen")]
    pub rpc_listen: String,
    /// Health endpoint listen address, e.g. 0.0.0.0:8080
    #[serde(default = "default_health_listen")]
    pub health_listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rpc_listen: default_rpc_listen(),
            health_listen: default_health_listen(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// MongoDB connection URI.
    pub uri: String,
    #[serde(default = "default_database_name")]
    pub database: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Bounds the concurrent count + page read pair inside find.
    #[serde(default = "default_find_timeout_secs")]
    pub find_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// AMQP connection URI, e.g. amqp://localhost:5672/%2f
    pub uri: String,
    #[serde(default = "default_bus_exchange")]
    pub exchange: String,
    #[serde(default = "default_bus_routing_key")]
    pub routing_key: String,
}

/// Timing knobs for the outbox publisher pump.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Lower bound of the jittered poll interval (milliseconds).
    #[serde(default = "default_min_poll_ms")]
    pub min_poll_ms: u64,
    /// Upper bound (exclusive) of the jittered poll interval (milliseconds).
    #[serde(default = "default_max_poll_ms")]
    pub max_poll_ms: u64,
    /// Lease length for claimed outbox entries. Also the per-publish
    /// deadline; an entry whose lease expires is reclaimed by any pump.
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            min_poll_ms: default_min_poll_ms(),
            max_poll_ms: default_max_poll_ms(),
            retry_interval_secs: default_retry_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level filter (trace/debug/info/warn/error). Defaults to info.
    #[serde(default = "default_log_level_opt")]
    pub level: Option<String>,
}

fn default_log_level_opt() -> Option<String> {
    Some(default_log_level())
}
