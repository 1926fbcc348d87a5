// Configuration: agent from environment, monitoring center from TOML

mod agent;
mod server;

pub use agent::{
    AgentConfig, DEFAULT_MONITORING_CENTER_URL, DEFAULT_POLLING_INTERVAL,
    DEFAULT_REQUEST_TIMEOUT, MIN_POLLING_INTERVAL, apply_interval_floor,
};
pub use server::{
    DatabaseConfig, ListenConfig, MAX_RETENTION_HOURS, RetentionConfig, ServerConfig,
};
