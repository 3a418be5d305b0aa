//! Default configuration values and their serde default functions.

/// Default gRPC listen address.
pub const DEFAULT_RPC_LISTEN: &str = "0.0.0.0:50051";
/// Default health endpoint listen address.
pub const DEFAULT_HEALTH_LISTEN: &str = "0.0.0.0:8080";
/// Default MongoDB database name.
pub const DEFAULT_DATABASE_NAME: &str = "users";
/// Time allowed for the initial database connection.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
/// Upper bound on the concurrent count + page read pair in find.
pub const DEFAULT_FIND_TIMEOUT_SECS: u64 = 10;
/// Default AMQP exchange ("" is the AMQP default exchange).
pub const DEFAULT_BUS_EXCHANGE: &str = "";
/// Default routing key for published change events.
pub const DEFAULT_BUS_ROUTING_KEY: &str = "users.events";
/// Lower bound of the jittered outbox poll interval.
pub const DEFAULT_MIN_POLL_MS: u64 = 10;
/// Upper bound (exclusive) of the jittered outbox poll interval.
pub const DEFAULT_MAX_POLL_MS: u64 = 30;
/// Time a claimed outbox entry is owned before it may be reclaimed.
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 10;
/// Default log level filter.
pub const DEFAULT_LOG_LEVEL: &str = "info";

macro_rules! default_fns {
    ($($fn_name:ident => $const_name:ident : $ty:ty),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> $ty {
                $const_name
            }
        )*
    };
}

macro_rules! default_string_fns {
    ($($fn_name:ident => $const_name:ident),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> String {
                $const_name.to_string()
            }
        )*
    };
}

default_fns! {
    default_connect_timeout_secs => DEFAULT_CONNECT_TIMEOUT_SECS: u64,
    default_find_timeout_secs    => DEFAULT_FIND_TIMEOUT_SECS: u64,
    default_min_poll_ms          => DEFAULT_MIN_POLL_MS: u64,
    default_max_poll_ms          => DEFAULT_MAX_POLL_MS: u64,
    default_retry_interval_secs  => DEFAULT_RETRY_INTERVAL_SECS: u64,
}

default_string_fns! {
    default_rpc_listen      => DEFAULT_RPC_LISTEN,
    default_health_listen   => DEFAULT_HEALTH_LISTEN,
    default_database_name   => DEFAULT_DATABASE_NAME,
    default_bus_exchange    => DEFAULT_BUS_EXCHANGE,
    default_bus_routing_key => DEFAULT_BUS_ROUTING_KEY,
    default_log_level       => DEFAULT_LOG_LEVEL,
}
