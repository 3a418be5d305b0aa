//! CLI override definitions and application logic.

use clap::Parser;

use crate::Config;

#[derive(Debug, Clone, Parser, Default)]
pub struct CliOverrides {
    /// Override gRPC listen address, e.g. 0.0.0.0:50051
    #[arg(long)]
    pub rpc_listen: Option<String>,
    /// Override health endpoint listen address, e.g. 0.0.0.0:8080
    #[arg(long)]
    pub health_listen: Option<String>,
    /// Override MongoDB connection URI
    #[arg(long)]
    pub database_uri: Option<String>,
    /// Override MongoDB database name
    #[arg(long)]
    pub database_name: Option<String>,
    /// Override AMQP connection URI
    #[arg(long)]
    pub bus_uri: Option<String>,
    /// Override outbox retry interval (seconds)
    #[arg(long)]
    pub retry_interval_secs: Option<u64>,
    /// Override log level (trace/debug/info/warn/error)
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(rpc_listen) = &overrides.rpc_listen {
        config.server.rpc_listen = rpc_listen.clone();
    }
    if let Some(health_listen) = &overrides.health_listen {
        config.server.health_listen = health_listen.clone();
    }
    if let Some(uri) = &overrides.database_uri {
        config.database.uri = uri.clone();
    }
    if let Some(name) = &overrides.database_name {
        config.database.database = name.clone();
    }
    if let Some(uri) = &overrides.bus_uri {
        config.bus.uri = uri.clone();
    }
    if let Some(secs) = overrides.retry_interval_secs {
        config.publisher.retry_interval_secs = secs;
    }
    if let Some(level) = &overrides.log_level {
        config.logging.level = Some(level.clone());
    }
}
